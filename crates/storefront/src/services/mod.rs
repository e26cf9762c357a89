//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration, login, and profile updates
//! - `cart_store` - Session-backed cart persistence
//! - `checkout` - Transactional order commit

pub mod auth;
pub mod cart_store;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use cart_store::{CartStore, CartStoreError, SessionCartStore};
pub use checkout::{
    Buyer, CheckoutError, CheckoutService, CheckoutStore, MemoryCheckoutStore, PlacedOrder,
};
