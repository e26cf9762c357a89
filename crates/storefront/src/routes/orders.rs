//! Direct order placement and order confirmation.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::{OrderNumber, OrderRequest};

use super::checkout::{buyer, placed_by_session, remember_order};
use crate::error::{AppError, AppJson, Result};
use crate::middleware::OptionalAuth;
use crate::models::Order;
use crate::services::CheckoutService;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create))
        .route("/orders/{number}", get(confirmation))
}

/// Place an order from explicit lines.
///
/// Prices come from the catalog; any price in the request is ignored.
/// Clients may send an `idempotencyKey` to make retries safe. A key only
/// replays orders placed by the same customer or guest session.
///
/// # Errors
///
/// Returns 400 for an invalid request, 404 if a product doesn't exist, and
/// 409 if a line is out of stock or the key was used for different lines.
#[instrument(skip(state, session, user, request))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    AppJson(request): AppJson<OrderRequest>,
) -> Result<Response> {
    let buyer = buyer(&session, user).await?;
    let placed = CheckoutService::new(state.checkout_store())
        .place_order(&buyer, request)
        .await?;

    remember_order(&session, &placed.order.order_number).await?;

    Ok(placed.into_response())
}

/// Show an order confirmation.
///
/// Visible to the customer who owns it, to admins, and to the session that
/// placed it. Everyone else gets 404.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist or isn't visible to the caller.
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(number): Path<String>,
) -> Result<Json<Order>> {
    let number = OrderNumber::parse(&number).map_err(|_| AppError::NotFound("Order"))?;

    let order = state
        .checkout_store()
        .find_order_by_number(&number)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let visible = match &user {
        Some(user) if user.is_admin() || order.is_owned_by(user.id) => true,
        _ => placed_by_session(&session, &number).await?,
    };

    if !visible {
        return Err(AppError::NotFound("Order"));
    }

    Ok(Json(order))
}
