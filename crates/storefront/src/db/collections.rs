//! Collection repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shopfront_core::CollectionId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::Collection;
use crate::models::collection::ValidCollection;

/// Message returned when two collections would share a slug.
pub const SLUG_TAKEN: &str = "A collection with this slug already exists";

#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    image: Option<String>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: CollectionId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            image: row.image,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for collection database operations.
pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    /// Create a new collection repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List collections, newest first, optionally only featured ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, featured: Option<bool>) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            r"
            SELECT id, name, slug, description, image, featured, created_at, updated_at
            FROM shop.collection
            WHERE ($1::boolean IS NULL OR featured = $1)
            ORDER BY created_at DESC
            ",
        )
        .bind(featured)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Collection::from).collect())
    }

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            SELECT id, name, slug, description, image, featured, created_at, updated_at
            FROM shop.collection
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Collection::from))
    }

    /// Get a collection by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            SELECT id, name, slug, description, image, featured, created_at, updated_at
            FROM shop.collection
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Collection::from))
    }

    /// Insert a collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already used.
    pub async fn create(&self, input: &ValidCollection) -> Result<Collection, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            INSERT INTO shop.collection (id, name, slug, description, image, featured)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, slug, description, image, featured, created_at, updated_at
            ",
        )
        .bind(CollectionId::generate())
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.image.as_deref())
        .bind(input.featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

        Ok(row.into())
    }

    /// Replace a collection's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is already used.
    pub async fn update(
        &self,
        id: CollectionId,
        input: &ValidCollection,
    ) -> Result<Collection, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            UPDATE shop.collection
            SET name = $2, slug = $3, description = $4, image = $5, featured = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, slug, description, image, featured, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.image.as_deref())
        .bind(input.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

        row.map(Collection::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a collection. Its products stay in the catalog, detached.
    ///
    /// # Returns
    ///
    /// Returns `true` if the collection was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CollectionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.collection WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
