//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! shopfront admin create -e admin@example.com -n "Admin Name" -p "a long password"
//!
//! # Promote an existing customer account
//! shopfront admin promote -e customer@example.com
//! ```

use shopfront_core::{Email, UserRole};
use shopfront_storefront::services::{AuthError, AuthService};
use shopfront_storefront::services::auth::validate_password;
use thiserror::Error;

use super::{DatabaseError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Could not reach the database.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password too short.
    #[error("{0}")]
    InvalidPassword(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No account with this email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    /// Account service failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Create a new admin account.
///
/// # Errors
///
/// Returns `AdminError` if the input is invalid, the email is taken, or the
/// database fails.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_password(password).map_err(AdminError::InvalidPassword)?;

    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&pool)
        .create_user(&email, name.trim(), password, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account has this email.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .promote_to_admin(&email)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => AdminError::UserNotFound(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!("{} is now an admin (ID: {})", user.email, user.id);
    Ok(())
}
