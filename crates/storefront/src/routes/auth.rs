//! Authentication route handlers.
//!
//! Credential registration, login, and logout. The signed-in user lives in
//! the session; see [`crate::middleware::auth`] for the extractors that
//! read it.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppJson, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::User;
use crate::services::AuthService;
use crate::services::auth::{LoginInput, RegisterInput};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Response carrying the signed-in user.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: User,
}

/// Response without a payload.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create a customer account and sign it in.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the email is registered.
#[instrument(skip(state, session, input))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    AppJson(input): AppJson<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = AuthService::new(state.pool()).register(&input).await?;

    set_current_user(&session, &user.to_current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Customer registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user,
        }),
    ))
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns 401 `Invalid credentials` for an unknown email or wrong password.
#[instrument(skip(state, session, input))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(input): AppJson<LoginInput>,
) -> Result<Json<AuthResponse>> {
    let user = match AuthService::new(state.pool()).login(&input).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    set_current_user(&session, &user.to_current_user()).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(AuthResponse {
        success: true,
        user,
    }))
}

/// Sign out. The cart stays with the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn logout(session: Session) -> Result<Json<SuccessResponse>> {
    clear_current_user(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    Ok(Json(SuccessResponse { success: true }))
}
