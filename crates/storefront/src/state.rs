//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::PgCheckoutStore;
use crate::services::CheckoutStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    checkout: Arc<dyn CheckoutStore>,
}

impl AppState {
    /// Create a new application state whose checkouts run against `pool`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let checkout = Arc::new(PgCheckoutStore::new(pool.clone()));
        Self::with_checkout_store(config, pool, checkout)
    }

    /// Create a state with a specific checkout store.
    #[must_use]
    pub fn with_checkout_store(
        config: StorefrontConfig,
        pool: PgPool,
        checkout: Arc<dyn CheckoutStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                checkout,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the store that checkouts commit through.
    #[must_use]
    pub fn checkout_store(&self) -> &dyn CheckoutStore {
        self.inner.checkout.as_ref()
    }
}
