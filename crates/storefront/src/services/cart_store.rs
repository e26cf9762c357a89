//! Cart persistence.
//!
//! The cart lives in the visitor's session under [`session_keys::CART`]. It
//! is a snapshot: prices and stock were copied when each line was added and
//! are only re-checked at checkout.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use thiserror::Error;
use tower_sessions::Session;
use tracing::warn;

use shopfront_core::Cart;

use crate::error::AppError;
use crate::models::session_keys;

/// Errors from reading or writing the cart.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// The session backend failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Load and save a visitor's cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The current cart. Missing or unreadable carts load as empty.
    async fn load(&self) -> Result<Cart, CartStoreError>;

    /// Replace the stored cart.
    async fn save(&self, cart: &Cart) -> Result<(), CartStoreError>;

    /// Remove the stored cart.
    async fn delete(&self) -> Result<(), CartStoreError>;
}

/// Cart stored in the tower-sessions session.
#[derive(Debug, Clone)]
pub struct SessionCartStore(Session);

impl SessionCartStore {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }
}

#[async_trait]
impl CartStore for SessionCartStore {
    async fn load(&self) -> Result<Cart, CartStoreError> {
        match self.0.get::<Cart>(session_keys::CART).await {
            Ok(cart) => Ok(cart.unwrap_or_default()),
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                warn!(error = %e, "Discarding unreadable cart");
                Ok(Cart::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStoreError> {
        self.0.insert(session_keys::CART, cart).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<(), CartStoreError> {
        self.0.remove_value(session_keys::CART).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for SessionCartStore
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use shopfront_core::{CartItem, Money, ProductId};
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn item() -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            title: "Tee".into(),
            slug: "tee".into(),
            price: Money::from_cents(1_500),
            quantity: 1,
            size: "M".into(),
            color: "Black".into(),
            image: String::new(),
            stock: 4,
        }
    }

    #[tokio::test]
    async fn test_empty_session_loads_empty_cart() {
        let store = SessionCartStore::new(session());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = SessionCartStore::new(session());
        let mut cart = Cart::new();
        cart.add(item()).unwrap();
        store.save(&cart).await.unwrap();
        assert_eq!(store.load().await.unwrap(), cart);

        store.delete().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cart_loads_empty() {
        let session = session();
        session
            .insert(session_keys::CART, serde_json::json!({"not": "a cart"}))
            .await
            .unwrap();
        let store = SessionCartStore::new(session);
        assert!(store.load().await.unwrap().is_empty());
    }
}
