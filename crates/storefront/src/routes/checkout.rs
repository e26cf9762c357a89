//! Cart checkout.
//!
//! `GET /checkout` issues a token that `POST /checkout` uses as the order's
//! idempotency key, so a retried submit returns the order it already
//! placed instead of charging stock twice. Keys are scoped to the buyer:
//! the signed-in customer, or a guest token held in the session.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use shopfront_core::order::ShippingAddressInput;
use shopfront_core::{Cart, CartTotals, OrderLineInput, OrderNumber, OrderRequest};

use crate::error::{AppJson, Result};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Order, session_keys};
use crate::services::{
    Buyer, CartStore, CheckoutError, CheckoutService, PlacedOrder, SessionCartStore,
};
use crate::state::AppState;

/// Most recent order numbers a session keeps confirmation access to.
const MAX_REMEMBERED_ORDERS: usize = 20;

/// Build the checkout router.
pub fn router() -> Router<AppState> {
    Router::new().route("/checkout", get(start).post(submit))
}

/// Checkout page data.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub token: String,
    pub cart: Cart,
    pub totals: CartTotals,
}

/// Checkout form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[serde(default)]
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub payment_method: String,
}

/// Response for a placed order.
#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub success: bool,
    pub order: Order,
}

impl IntoResponse for PlacedOrder {
    fn into_response(self) -> Response {
        let status = if self.replayed {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        };
        let body = OrderPlaced {
            success: true,
            order: self.order,
        };
        (status, Json(body)).into_response()
    }
}

/// Begin checkout: return the cart and a submit token.
///
/// The token is reused until an order is placed with it.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn start(session: Session, store: SessionCartStore) -> Result<Json<CheckoutView>> {
    let token = checkout_token(&session).await?;

    let cart = store.load().await?;
    Ok(Json(CheckoutView {
        token,
        totals: cart.totals(),
        cart,
    }))
}

/// The session's checkout token, issuing one if needed.
async fn checkout_token(session: &Session) -> Result<String> {
    if let Some(token) = session.get::<String>(session_keys::CHECKOUT_TOKEN).await? {
        return Ok(token);
    }

    let token = Uuid::new_v4().to_string();
    session.insert(session_keys::CHECKOUT_TOKEN, &token).await?;
    Ok(token)
}

/// The buyer behind a request, issuing a guest token if needed.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn buyer(
    session: &Session,
    user: Option<CurrentUser>,
) -> std::result::Result<Buyer, tower_sessions::session::Error> {
    if let Some(user) = user {
        return Ok(Buyer::Customer(user));
    }
    if let Some(token) = session.get::<String>(session_keys::GUEST_TOKEN).await? {
        return Ok(Buyer::Guest(token));
    }

    let token = Uuid::new_v4().to_string();
    session.insert(session_keys::GUEST_TOKEN, &token).await?;
    Ok(Buyer::Guest(token))
}

/// Place an order for the session cart.
///
/// The cart is cleared only after the order commits. Its token then moves
/// to `COMPLETED_CHECKOUT`, so resubmitting with the now empty cart returns
/// the same order instead of failing.
///
/// # Errors
///
/// Returns 400 for an invalid form or empty cart, 404 if a product was
/// removed from the catalog, and 409 if a line is out of stock.
#[instrument(skip(state, session, store, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    store: SessionCartStore,
    OptionalAuth(user): OptionalAuth,
    AppJson(form): AppJson<CheckoutForm>,
) -> Result<Response> {
    let cart = store.load().await?;
    let checkout = CheckoutService::new(state.checkout_store());
    let buyer = buyer(&session, user).await?;

    if cart.is_empty() {
        let completed = session
            .get::<String>(session_keys::COMPLETED_CHECKOUT)
            .await?;
        if let Some(key) = completed.as_deref()
            && let Some(order) = checkout.find_placed(&buyer, key).await?
        {
            return Ok(PlacedOrder {
                order,
                replayed: true,
            }
            .into_response());
        }
        return Err(CheckoutError::EmptyCart.into());
    }

    let token = checkout_token(&session).await?;
    let request = OrderRequest {
        items: cart.items().iter().map(line_input).collect(),
        shipping_address: form.shipping_address,
        payment_method: form.payment_method,
        idempotency_key: Some(token.clone()),
    };

    let placed = checkout.place_order(&buyer, request).await?;

    store.delete().await?;
    session
        .remove_value(session_keys::CHECKOUT_TOKEN)
        .await?;
    session
        .insert(session_keys::COMPLETED_CHECKOUT, &token)
        .await?;
    remember_order(&session, &placed.order.order_number).await?;

    Ok(placed.into_response())
}

fn line_input(item: &shopfront_core::CartItem) -> OrderLineInput {
    OrderLineInput {
        product_id: item.product_id,
        quantity: i64::from(item.quantity),
        size: item.size.clone(),
        color: item.color.clone(),
        image: Some(item.image.clone()).filter(|i| !i.is_empty()),
    }
}

/// Record that this session placed `number`, granting it access to the
/// confirmation page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn remember_order(
    session: &Session,
    number: &OrderNumber,
) -> std::result::Result<(), tower_sessions::session::Error> {
    let mut placed: Vec<String> = session
        .get(session_keys::PLACED_ORDERS)
        .await?
        .unwrap_or_default();

    if !placed.iter().any(|n| n == number.as_str()) {
        placed.push(number.as_str().to_owned());
    }
    if placed.len() > MAX_REMEMBERED_ORDERS {
        placed.drain(..placed.len() - MAX_REMEMBERED_ORDERS);
    }

    session.insert(session_keys::PLACED_ORDERS, placed).await
}

/// Whether this session placed `number`.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn placed_by_session(
    session: &Session,
    number: &OrderNumber,
) -> std::result::Result<bool, tower_sessions::session::Error> {
    let placed: Vec<String> = session
        .get(session_keys::PLACED_ORDERS)
        .await?
        .unwrap_or_default();
    Ok(placed.iter().any(|n| n == number.as_str()))
}
