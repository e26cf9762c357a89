//! HTTP route handlers for storefront.
//!
//! Every endpoint speaks JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//! GET  /home                   - Hero, banners, featured items, settings
//!
//! # Catalog
//! GET  /products               - Product listing (filters, sort, paging)
//! GET  /products/{slug}        - Product detail
//! GET  /collections            - Collection listing
//! GET  /collections/{slug}     - Collection with its products
//!
//! # Cart (session)
//! GET  /cart                   - Cart with totals
//! POST /cart/add               - Add a variant
//! POST /cart/update            - Change a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout
//! GET  /checkout               - Cart, totals, and submit token
//! POST /checkout               - Place an order for the cart
//! POST /api/orders             - Place an order from explicit lines
//! GET  /orders/{number}        - Order confirmation
//!
//! # Auth
//! POST /auth/register          - Create an account
//! POST /auth/login             - Sign in
//! POST /auth/logout            - Sign out
//!
//! # Account (requires auth)
//! GET  /account                - Profile
//! PUT  /account                - Update profile
//! GET  /account/orders         - Order history
//! GET  /account/orders/{id}    - Order detail
//!
//! # Admin (requires admin role)
//! GET|POST            /admin/products
//! GET|PUT|DELETE      /admin/products/{id}
//! GET|POST            /admin/collections
//! PUT|DELETE          /admin/collections/{id}
//! GET                 /admin/orders
//! GET                 /admin/orders/{id}
//! PATCH               /admin/orders/{id}/status
//! GET|PUT             /admin/cms/hero
//! GET|POST            /admin/cms/banners
//! PUT|DELETE          /admin/cms/banners/{id}
//! GET|PUT             /admin/settings
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod collections;
pub mod health;
pub mod home;
pub mod orders;
pub mod products;

use axum::Router;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create all routes for the storefront.
///
/// With `rate_limit` set, auth routes and the routes that write carts or
/// orders get per-IP limits. The limiter keys on the client IP, so the
/// server must be run with connect info.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut auth = auth::router();
    let mut writes = Router::new()
        .merge(cart::router())
        .merge(checkout::router())
        .merge(orders::router());

    if rate_limit {
        auth = auth.layer(auth_rate_limiter());
        writes = writes.layer(api_rate_limiter());
    }

    Router::new()
        .merge(health::router())
        .merge(home::router())
        .merge(products::router())
        .merge(collections::router())
        .merge(account::router())
        .merge(admin::router())
        .merge(auth)
        .merge(writes)
}
