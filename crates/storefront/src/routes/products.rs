//! Catalog route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{DEFAULT_PAGE_SIZE, Page, Product, ProductQuery, paging};
use crate::state::AppState;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index))
        .route("/products/{slug}", get(show))
}

/// List products with filters, sorting, and paging.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let (page, limit) = paging(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let products = ProductRepository::new(state.pool())
        .list(&query, page, limit)
        .await?;

    Ok(Json(products))
}

/// Show a product by slug.
///
/// # Errors
///
/// Returns 404 if no product has this slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(product))
}
