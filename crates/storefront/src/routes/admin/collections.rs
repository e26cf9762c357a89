//! Collection management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;

use shopfront_core::CollectionId;

use crate::db::CollectionRepository;
use crate::error::{AppError, AppJson, Result, not_found};
use crate::middleware::RequireAdmin;
use crate::models::{Collection, CollectionInput};
use crate::routes::auth::SuccessResponse;
use crate::state::AppState;

/// Build the collection admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/collections", get(index).post(create))
        .route("/admin/collections/{id}", put(update).delete(destroy))
}

/// List every collection.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>> {
    let collections = CollectionRepository::new(state.pool()).list(None).await?;
    Ok(Json(collections))
}

/// Create a collection. The slug defaults to one derived from the name.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the slug is taken.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<CollectionInput>,
) -> Result<(StatusCode, Json<Collection>)> {
    let input = input.validate()?;
    let collection = CollectionRepository::new(state.pool())
        .create(&input)
        .await?;

    tracing::info!(collection_id = %collection.id, slug = %collection.slug, "Collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

/// Replace a collection's fields.
///
/// # Errors
///
/// Returns 404 if the collection doesn't exist, 400 for invalid fields, and
/// 409 if the slug is taken.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CollectionId>,
    AppJson(input): AppJson<CollectionInput>,
) -> Result<Json<Collection>> {
    let input = input.validate()?;
    let collection = CollectionRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(not_found("Collection"))?;
    Ok(Json(collection))
}

/// Delete a collection. Its products stay in the catalog, unassigned.
///
/// # Errors
///
/// Returns 404 if the collection doesn't exist.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CollectionId>,
) -> Result<Json<SuccessResponse>> {
    if !CollectionRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("Collection"));
    }
    Ok(Json(SuccessResponse { success: true }))
}
