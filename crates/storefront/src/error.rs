//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-class errors are
//! captured to Sentry before responding; clients only see a JSON body of
//! the form `{"error": "...", "fields": [...]}`.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use shopfront_core::{CartError, StatusTransitionError, ValidationError, ValidationErrors};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart_store::CartStoreError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order could not be placed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Cart operation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Cart could not be read or written.
    #[error("Cart store error: {0}")]
    CartStore(#[from] CartStoreError),

    /// Session backend failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Order status change not allowed.
    #[error("Status error: {0}")]
    StatusTransition(#[from] StatusTransitionError),

    /// Resource not found. Holds the resource name, e.g. `Product`.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// User lacks the admin role.
    #[error("Admin access required")]
    Forbidden,

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("{0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    fields: Vec<ValidationError>,
}

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(RepositoryError::NotFound | RepositoryError::Conflict(_)) => false,
            Self::Database(_) | Self::CartStore(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Checkout(err) => matches!(err, CheckoutError::Repository(_)),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Conflict(_) | Self::StatusTransition(_) => {
                StatusCode::CONFLICT
            }
            Self::Auth(err) => match err {
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_) | CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::OutOfStock { .. }
                | CheckoutError::KeyReused
                | CheckoutError::Conflict(_) => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::OutOfStock => StatusCode::CONFLICT,
                CartError::ItemNotFound => StatusCode::NOT_FOUND,
            },
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::CartStore(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(self) -> ErrorBody {
        if self.is_server_error() {
            return ErrorBody {
                error: INTERNAL_MESSAGE.to_owned(),
                fields: Vec::new(),
            };
        }

        let (error, fields) = match self {
            Self::Validation(errors)
            | Self::Auth(AuthError::Validation(errors))
            | Self::Checkout(CheckoutError::Validation(errors)) => {
                (errors.first_message().to_owned(), errors.into_iter().collect())
            }
            Self::Database(RepositoryError::Conflict(message)) => (message, Vec::new()),
            Self::Database(RepositoryError::NotFound) => ("Not found".to_owned(), Vec::new()),
            Self::Auth(AuthError::InvalidCredentials) => {
                ("Invalid credentials".to_owned(), Vec::new())
            }
            Self::Auth(AuthError::UserAlreadyExists) => (
                "User with this email already exists".to_owned(),
                Vec::new(),
            ),
            Self::Auth(AuthError::UserNotFound) => ("User not found".to_owned(), Vec::new()),
            Self::Checkout(err) => (err.user_message(), Vec::new()),
            Self::StatusTransition(err) => (
                format!("Cannot change order status from {} to {}", err.from, err.to),
                Vec::new(),
            ),
            other => (other.to_string(), Vec::new()),
        };
        ErrorBody { error, fields }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// JSON extractor whose rejections use the storefront error body.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Map a repository `NotFound` to a 404 naming the resource.
pub fn not_found(resource: &'static str) -> impl Fn(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(resource),
        other => other.into(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shopfront_core::OrderStatus;
    use shopfront_core::inventory::StockError;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "Title is required");
        errors.add("price", "Price must be greater than 0");
        let (status, body) = body_json(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title is required");
        assert_eq!(body["fields"][1]["field"], "price");
    }

    #[tokio::test]
    async fn test_auth_statuses() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert!(body.get("fields").is_none());

        let (status, body) = body_json(AppError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[tokio::test]
    async fn test_not_found_names_resource() {
        let (status, body) = body_json(AppError::NotFound("Product")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product not found");
    }

    #[tokio::test]
    async fn test_database_errors_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row".into()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An unexpected error occurred");
    }

    #[tokio::test]
    async fn test_conflicts() {
        let (status, body) = body_json(AppError::Database(RepositoryError::Conflict(
            "A collection with this slug already exists".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A collection with this slug already exists");

        let stock = CheckoutError::OutOfStock {
            title: "Tee".into(),
            source: StockError::Insufficient {
                size: "M".into(),
                color: "Black".into(),
                requested: 6,
                available: 5,
            },
        };
        let (status, _) = body_json(stock.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let transition = OrderStatus::Delivered
            .transition(OrderStatus::Pending)
            .unwrap_err();
        let (status, body) = body_json(transition.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["error"],
            "Cannot change order status from delivered to pending"
        );
    }
}
