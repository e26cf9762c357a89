//! Product repository.
//!
//! Variants are stored as a JSONB array on the product row. Stock changes
//! made during checkout go through [`super::checkout`], which locks the row;
//! this module only handles catalog reads and admin writes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use shopfront_core::inventory::Variant;
use shopfront_core::{CollectionId, Money, ProductId};

use super::{RepositoryError, conflict_on_unique, page_offset};
use crate::models::{Page, Product, ProductInput, ProductQuery};

/// Message returned when two products would share a slug.
pub const SLUG_TAKEN: &str = "A product with this title already exists";

pub(crate) const PRODUCT_COLUMNS: &str = "id, title, slug, description, price, category, collection_id, \
     sizes, colors, images, variants, featured, created_at, updated_at";

/// Shared filter for listing and counting. Unset parameters match everything.
const LIST_FILTER: &str = r"
    WHERE ($1::text IS NULL OR category = $1)
      AND ($2::uuid IS NULL OR collection_id = $2)
      AND ($3::boolean IS NULL OR featured = $3)
      AND ($4::text IS NULL OR title ILIKE $4 OR description ILIKE $4 OR category ILIKE $4)
      AND ($5::numeric IS NULL OR price >= $5)
      AND ($6::numeric IS NULL OR price <= $6)
      AND ($7::text[] IS NULL OR sizes && $7)
      AND ($8::text[] IS NULL OR colors && $8)
";

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    price: Decimal,
    category: String,
    collection_id: Option<Uuid>,
    sizes: Vec<String>,
    colors: Vec<String>,
    images: Vec<String>,
    variants: Json<Vec<Variant>>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            title: row.title,
            slug: row.slug,
            description: row.description,
            price: Money::new(row.price),
            category: row.category,
            collection_id: row.collection_id.map(CollectionId::from_uuid),
            sizes: row.sizes,
            colors: row.colors,
            images: row.images,
            variants: row.variants.0,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching the query, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &ProductQuery,
        page: u32,
        limit: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let search = query.search_text().map(like_pattern);
        let sizes = Some(query.size_list()).filter(|s| !s.is_empty());
        let colors = Some(query.color_list()).filter(|c| !c.is_empty());
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product {LIST_FILTER} ORDER BY {} LIMIT $9 OFFSET $10",
            query.sort.order_by()
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category)
            .bind(query.collection_id)
            .bind(query.featured)
            .bind(search.as_deref())
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(sizes.as_deref())
            .bind(colors.as_deref())
            .bind(i64::from(limit))
            .bind(page_offset(page, limit))
            .fetch_all(self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM shop.product {LIST_FILTER}");
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(category)
            .bind(query.collection_id)
            .bind(query.featured)
            .bind(search.as_deref())
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(sizes.as_deref())
            .bind(colors.as_deref())
            .fetch_one(self.pool)
            .await?;

        let items = rows.into_iter().map(Product::from).collect();
        Ok(Page::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            page,
            limit,
        ))
    }

    /// Newest featured products, for the homepage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE featured \
             ORDER BY created_at DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE slug = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Insert a product. The caller supplies a validated, normalized input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already used.
    pub async fn create(
        &self,
        slug: &str,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.product
                (id, title, slug, description, price, category, collection_id,
                 sizes, colors, images, variants, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ProductId::generate())
            .bind(&input.title)
            .bind(slug)
            .bind(&input.description)
            .bind(input.price)
            .bind(&input.category)
            .bind(input.collection_id)
            .bind(&input.sizes)
            .bind(&input.colors)
            .bind(&input.images)
            .bind(Json(&input.variants))
            .bind(input.featured)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

        Ok(row.into())
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is already used.
    pub async fn update(
        &self,
        id: ProductId,
        slug: &str,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.product
            SET title = $2, slug = $3, description = $4, price = $5, category = $6,
                collection_id = $7, sizes = $8, colors = $9, images = $10,
                variants = $11, featured = $12, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(slug)
            .bind(&input.description)
            .bind(input.price)
            .bind(&input.category)
            .bind(input.collection_id)
            .bind(&input.sizes)
            .bind(&input.colors)
            .bind(&input.images)
            .bind(Json(&input.variants))
            .bind(input.featured)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Wrap search text in `%` and escape LIKE metacharacters.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
