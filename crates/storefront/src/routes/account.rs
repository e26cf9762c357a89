//! Account route handlers.
//!
//! These routes require authentication.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, AppJson, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{DEFAULT_PAGE_SIZE, Order, OrderQuery, Page, ProfileUpdate, User, paging};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(profile).put(update_profile))
        .route("/account/orders", get(orders))
        .route("/account/orders/{id}", get(order))
}

/// The signed-in user's profile.
///
/// # Errors
///
/// Returns 401 without a session and 404 if the account was deleted.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;
    Ok(Json(user))
}

/// Update name, email, and phone.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the new email is taken.
#[instrument(skip(state, session, current, update), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .update_profile(current.id, update)
        .await?;

    set_current_user(&session, &user.to_current_user()).await?;

    Ok(Json(user))
}

/// The signed-in user's orders, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Query(mut query): Query<OrderQuery>,
) -> Result<Json<Page<Order>>> {
    query.user_id = Some(current.id);
    query.status = None;
    let (page, limit) = paging(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let orders = OrderRepository::new(state.pool())
        .list(&query, page, limit)
        .await?;
    Ok(Json(orders))
}

/// One of the signed-in user's orders. Admins may view any order.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist or belongs to someone else.
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|o| current.is_admin() || o.is_owned_by(current.id))
        .ok_or(AppError::NotFound("Order"))?;

    Ok(Json(order))
}
