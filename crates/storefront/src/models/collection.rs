//! Product collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::slug::{is_valid_slug, slugify};
use shopfront_core::{CollectionId, ValidationErrors};

/// A named group of products (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin create/update form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInput {
    #[serde(default)]
    pub name: String,
    /// Derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

/// A collection form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCollection {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub featured: bool,
}

impl CollectionInput {
    /// Check the form and resolve the slug.
    ///
    /// # Errors
    ///
    /// Returns field errors for a missing or overlong name and a malformed
    /// slug.
    pub fn validate(self) -> Result<ValidCollection, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require(&self.name, "name", "Name is required");
        errors.check(
            self.name.trim().chars().count() > 100,
            "name",
            "Name must be at most 100 characters",
        );

        let slug = self
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| slugify(&self.name), str::to_owned);
        if !self.name.trim().is_empty() {
            errors.require(&slug, "slug", "Slug is required");
            errors.check(
                !slug.is_empty() && !is_valid_slug(&slug),
                "slug",
                "Slug may only contain lowercase letters, numbers, and hyphens",
            );
        }
        errors.finish()?;

        Ok(ValidCollection {
            name: self.name.trim().to_owned(),
            slug,
            description: self.description.trim().to_owned(),
            image: self.image.filter(|i| !i.trim().is_empty()),
            featured: self.featured,
        })
    }
}
