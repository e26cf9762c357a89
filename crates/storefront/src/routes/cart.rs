//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Every mutation responds with
//! the full cart and its totals so the client never computes money itself.

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shopfront_core::{Cart, CartKey, CartTotals, ProductId};

use crate::error::{AppError, AppJson, Result};
use crate::services::{CartStore, SessionCartStore};
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(show))
        .route("/cart/add", post(add))
        .route("/cart/update", post(update))
        .route("/cart/remove", post(remove))
        .route("/cart/clear", post(clear))
}

/// Cart plus derived totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub cart: Cart,
    pub totals: CartTotals,
    pub item_count: u64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            success: true,
            totals: cart.totals(),
            item_count: cart.item_count(),
            cart,
        }
    }
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Quantity change request. Zero or less removes the line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCart {
    #[serde(flatten)]
    pub key: CartKey,
    pub quantity: i64,
}

/// Show the current cart.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn show(store: SessionCartStore) -> Result<Json<CartResponse>> {
    let cart = store.load().await?;
    Ok(Json(cart.into()))
}

/// Add a product variant to the cart.
///
/// The line's price and stock snapshot come from the catalog, not the
/// request.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist, 400 if it has no such size and
/// color or the quantity is zero, and 409 if the variant is out of stock.
#[instrument(skip(state, store), fields(product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    store: SessionCartStore,
    AppJson(body): AppJson<AddToCart>,
) -> Result<Json<CartResponse>> {
    let product = state
        .checkout_store()
        .find_product(body.product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let item = product
        .cart_item(&body.size, &body.color, body.quantity)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "{} is not available in {} / {}",
                product.title, body.size, body.color
            ))
        })?;

    let mut cart = store.load().await?;
    cart.add(item)?;
    store.save(&cart).await?;

    Ok(Json(cart.into()))
}

/// Change a line's quantity.
///
/// # Errors
///
/// Returns 404 if the line is not in the cart.
#[instrument(skip(store))]
pub async fn update(
    store: SessionCartStore,
    AppJson(body): AppJson<UpdateCart>,
) -> Result<Json<CartResponse>> {
    let mut cart = store.load().await?;
    cart.update(&body.key, body.quantity)?;
    store.save(&cart).await?;

    Ok(Json(cart.into()))
}

/// Remove a line. Removing a line that isn't there is not an error.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip(store))]
pub async fn remove(
    store: SessionCartStore,
    AppJson(key): AppJson<CartKey>,
) -> Result<Json<CartResponse>> {
    let mut cart = store.load().await?;
    if cart.remove(&key) {
        store.save(&cart).await?;
    }

    Ok(Json(cart.into()))
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn clear(store: SessionCartStore) -> Result<Json<CartResponse>> {
    store.delete().await?;
    Ok(Json(Cart::new().into()))
}
