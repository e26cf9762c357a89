//! Admin route handlers.
//!
//! Every handler takes the [`RequireAdmin`](crate::middleware::RequireAdmin)
//! extractor, so a request without a session gets 401 and a signed-in
//! customer gets 403 before any handler code runs.

pub mod cms;
pub mod collections;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Build the complete admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(products::router())
        .merge(collections::router())
        .merge(orders::router())
        .merge(cms::router())
}
