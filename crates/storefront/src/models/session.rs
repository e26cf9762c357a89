//! Session-related types.
//!
//! Types stored in the session for authentication and shopping state.

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Account role.
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether this user may use the admin routes.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session keys for authentication and cart data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized cart.
    pub const CART: &str = "cart";

    /// Key for the idempotency token issued by `GET /checkout`.
    pub const CHECKOUT_TOKEN: &str = "checkout_token";

    /// Key for the token of the last order placed through `POST /checkout`.
    pub const COMPLETED_CHECKOUT: &str = "completed_checkout";

    /// Key for the random token that identifies a guest buyer.
    pub const GUEST_TOKEN: &str = "guest_token";

    /// Key for order numbers placed from this session (guest confirmation access).
    pub const PLACED_ORDERS: &str = "placed_orders";
}
