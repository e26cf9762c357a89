//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopfront migrate
//! ```
//!
//! Applies the `shop` schema migrations from `crates/storefront/migrations/`
//! and creates the `tower_sessions.session` table used by the session store.

use tower_sessions_sqlx_store::PostgresStore;

use super::{DatabaseError, connect};

/// Errors from running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Could not reach the database.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The session table could not be created.
    #[error("Session table error: {0}")]
    Sessions(#[from] sqlx::Error),
}

/// Run every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
