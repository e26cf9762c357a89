//! Order management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use tracing::instrument;

use shopfront_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, AppJson, Result};
use crate::middleware::RequireAdmin;
use crate::models::order::StatusUpdate;
use crate::models::{ADMIN_PAGE_SIZE, Order, OrderQuery, Page, paging};
use crate::state::AppState;

/// Build the order admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(index))
        .route("/admin/orders/{id}", get(show))
        .route("/admin/orders/{id}/status", patch(update_status))
}

/// List orders, newest first, optionally filtered by status or customer.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<Order>>> {
    let (page, limit) = paging(query.page, query.limit, ADMIN_PAGE_SIZE);
    let orders = OrderRepository::new(state.pool())
        .list(&query, page, limit)
        .await?;
    Ok(Json(orders))
}

/// Show one order.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    Ok(Json(order))
}

/// Move an order along its lifecycle.
///
/// Cancelling does not return stock.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist and 409 if the transition is not
/// allowed or the order changed status concurrently.
#[instrument(skip(admin, state, body), fields(admin = %admin.email, to = %body.status))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    AppJson(body): AppJson<StatusUpdate>,
) -> Result<Json<Order>> {
    let orders = OrderRepository::new(state.pool());
    let current = orders
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let from = current.order_status;
    let to = from.transition(body.status)?;

    let Some(order) = orders.update_status(id, from, to).await? else {
        tracing::warn!(order_id = %id, "Order status changed concurrently");
        return Err(AppError::Conflict(
            "Order status was changed by someone else, reload and try again".to_owned(),
        ));
    };

    tracing::info!(
        order_number = %order.order_number,
        from = %from,
        to = %to,
        "Order status updated"
    );
    Ok(Json(order))
}
