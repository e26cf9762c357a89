//! Collection route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{CollectionRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Collection, DEFAULT_PAGE_SIZE, Page, Product, ProductQuery, paging};
use crate::state::AppState;

/// Build the collection router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collections", get(index))
        .route("/collections/{slug}", get(show))
}

/// Collection listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct CollectionFilter {
    pub featured: Option<bool>,
}

/// A collection and one page of its products.
#[derive(Debug, Serialize)]
pub struct CollectionDetail {
    pub collection: Collection,
    pub products: Page<Product>,
}

/// List collections.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<CollectionFilter>,
) -> Result<Json<Vec<Collection>>> {
    let collections = CollectionRepository::new(state.pool())
        .list(filter.featured)
        .await?;
    Ok(Json(collections))
}

/// Show a collection with its products.
///
/// Accepts the product listing filters; the collection filter is always
/// this collection.
///
/// # Errors
///
/// Returns 404 if no collection has this slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(mut query): Query<ProductQuery>,
) -> Result<Json<CollectionDetail>> {
    let collection = CollectionRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Collection"))?;

    query.collection_id = Some(collection.id);
    let (page, limit) = paging(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let products = ProductRepository::new(state.pool())
        .list(&query, page, limit)
        .await?;

    Ok(Json(CollectionDetail {
        collection,
        products,
    }))
}
