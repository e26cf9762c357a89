//! Product management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use shopfront_core::ProductId;
use shopfront_core::ValidationErrors;
use shopfront_core::slug::slugify;

use crate::db::ProductRepository;
use crate::error::{AppError, AppJson, Result, not_found};
use crate::middleware::RequireAdmin;
use crate::models::{
    ADMIN_PAGE_SIZE, Page, Product, ProductInput, ProductPatch, ProductQuery, paging,
};
use crate::routes::auth::SuccessResponse;
use crate::state::AppState;

/// Build the product admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/products", get(index).post(create))
        .route(
            "/admin/products/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// Validate a product form and derive its slug from the title.
fn prepare(input: ProductInput) -> std::result::Result<(String, ProductInput), ValidationErrors> {
    input.validate()?;
    let input = input.normalized();
    let slug = slugify(&input.title);
    if slug.is_empty() {
        return Err(ValidationErrors::single(
            "title",
            "Title must contain letters or numbers",
        ));
    }
    Ok((slug, input))
}

/// List products with the catalog filters.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let (page, limit) = paging(query.page, query.limit, ADMIN_PAGE_SIZE);
    let products = ProductRepository::new(state.pool())
        .list(&query, page, limit)
        .await?;
    Ok(Json(products))
}

/// Create a product.
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if another product has the same
/// slug.
#[instrument(skip(admin, state, input), fields(admin = %admin.email))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let (slug, input) = prepare(input)?;
    let product = ProductRepository::new(state.pool())
        .create(&slug, &input)
        .await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Show one product.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist.
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(Json(product))
}

/// Update some or all fields of a product.
///
/// Omitted fields keep their current values. The slug follows the title.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist, 400 for invalid fields, and
/// 409 if the new slug is taken.
#[instrument(skip(admin, state, patch), fields(admin = %admin.email))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    AppJson(patch): AppJson<ProductPatch>,
) -> Result<Json<Product>> {
    let products = ProductRepository::new(state.pool());
    let current = products
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let (slug, input) = prepare(patch.apply(ProductInput::from(&current)))?;
    let product = products
        .update(id, &slug, &input)
        .await
        .map_err(not_found("Product"))?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// Delete a product. Orders keep their snapshot of it.
///
/// # Errors
///
/// Returns 404 if the product doesn't exist.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<SuccessResponse>> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("Product"));
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shopfront_core::{Money, Variant};

    fn input(title: &str) -> ProductInput {
        ProductInput {
            title: title.to_owned(),
            description: "Soft cotton".to_owned(),
            price: Money::from_cents(2_500),
            category: "Shirts".to_owned(),
            collection_id: None,
            sizes: vec!["M".to_owned()],
            colors: vec!["Black".to_owned()],
            images: vec!["/tee.jpg".to_owned()],
            variants: vec![Variant {
                size: "M".to_owned(),
                color: "Black".to_owned(),
                stock: 4,
            }],
            featured: false,
        }
    }

    #[test]
    fn test_prepare_derives_slug_from_title() {
        let (slug, input) = prepare(input("  Classic Tee  ")).unwrap();
        assert_eq!(slug, "classic-tee");
        assert_eq!(input.title, "Classic Tee");
    }

    #[test]
    fn test_prepare_rejects_title_without_slug() {
        let err = prepare(input("!!!")).unwrap_err();
        assert_eq!(err.first_message(), "Title must contain letters or numbers");
    }

    #[test]
    fn test_prepare_reports_field_errors() {
        let mut bad = input("Tee");
        bad.price = Money::from_cents(0);
        let err = prepare(bad).unwrap_err();
        assert_eq!(err.first_message(), "Price must be greater than 0");
    }
}
