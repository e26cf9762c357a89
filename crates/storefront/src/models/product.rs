//! Catalog products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::inventory::{self, Variant};
use shopfront_core::{CollectionId, Money, ProductId, ValidationErrors};

/// A catalog product (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub collection_id: Option<CollectionId>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image, used as the cart and order thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }

    /// Units on hand across all variants.
    #[must_use]
    pub fn total_stock(&self) -> u64 {
        inventory::total_stock(&self.variants)
    }
}

/// Admin create/replace form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub featured: bool,
}

impl ProductInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// Returns every field error found, including duplicate variants.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require(&self.title, "title", "Title is required");
        errors.check(
            self.title.trim().chars().count() > 200,
            "title",
            "Title must be at most 200 characters",
        );
        errors.require(&self.description, "description", "Description is required");
        errors.check(
            !self.price.is_positive(),
            "price",
            "Price must be greater than 0",
        );
        errors.require(&self.category, "category", "Category is required");
        errors.check(
            self.sizes.iter().all(|s| s.trim().is_empty()),
            "sizes",
            "At least one size is required",
        );
        errors.check(
            self.colors.iter().all(|c| c.trim().is_empty()),
            "colors",
            "At least one color is required",
        );
        errors.check(
            self.images.iter().all(|i| i.trim().is_empty()),
            "images",
            "At least one image is required",
        );

        if let Err(variant_errors) = inventory::validate_variants(&self.variants) {
            for error in variant_errors {
                errors.add(error.field, error.message);
            }
        }

        errors.finish()
    }

    /// Trim text fields and drop blank list entries.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        fn clean(list: Vec<String>) -> Vec<String> {
            list.into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect()
        }

        self.title = self.title.trim().to_owned();
        self.description = self.description.trim().to_owned();
        self.category = self.category.trim().to_owned();
        self.sizes = clean(self.sizes);
        self.colors = clean(self.colors);
        self.images = clean(self.images);
        for variant in &mut self.variants {
            variant.size = variant.size.trim().to_owned();
            variant.color = variant.color.trim().to_owned();
        }
        self
    }
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            category: product.category.clone(),
            collection_id: product.collection_id,
            sizes: product.sizes.clone(),
            colors: product.colors.clone(),
            images: product.images.clone(),
            variants: product.variants.clone(),
            featured: product.featured,
        }
    }
}

/// Admin partial update. Absent fields keep their current value.
///
/// `collectionId: null` detaches the product from its collection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub collection_id: Option<Option<CollectionId>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub variants: Option<Vec<Variant>>,
    pub featured: Option<bool>,
}

impl ProductPatch {
    /// Overlay the patch on the current values.
    #[must_use]
    pub fn apply(self, mut current: ProductInput) -> ProductInput {
        if let Some(title) = self.title {
            current.title = title;
        }
        if let Some(description) = self.description {
            current.description = description;
        }
        if let Some(price) = self.price {
            current.price = price;
        }
        if let Some(category) = self.category {
            current.category = category;
        }
        if let Some(collection_id) = self.collection_id {
            current.collection_id = collection_id;
        }
        if let Some(sizes) = self.sizes {
            current.sizes = sizes;
        }
        if let Some(colors) = self.colors {
            current.colors = colors;
        }
        if let Some(images) = self.images {
            current.images = images;
        }
        if let Some(variants) = self.variants {
            current.variants = variants;
        }
        if let Some(featured) = self.featured {
            current.featured = featured;
        }
        current
    }
}

/// Distinguish a missing field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ProductSort {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
}

impl ProductSort {
    /// SQL `ORDER BY` clause for this sort.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id",
            Self::PriceAsc => "price ASC, created_at DESC",
            Self::PriceDesc => "price DESC, created_at DESC",
        }
    }
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub collection_id: Option<CollectionId>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Comma-separated sizes; a product matches if it offers any of them.
    pub sizes: Option<String>,
    /// Comma-separated colors; a product matches if it offers any of them.
    pub colors: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Parsed size filter.
    #[must_use]
    pub fn size_list(&self) -> Vec<String> {
        split_list(self.sizes.as_deref())
    }

    /// Parsed color filter.
    #[must_use]
    pub fn color_list(&self) -> Vec<String> {
        split_list(self.colors.as_deref())
    }

    /// Search text, if any.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            title: "Linen Shirt".into(),
            description: "Breathable".into(),
            price: Money::from_cents(4500),
            category: "shirts".into(),
            collection_id: None,
            sizes: vec!["M".into()],
            colors: vec!["White".into()],
            images: vec!["/img/linen.jpg".into()],
            variants: vec![Variant {
                size: "M".into(),
                color: "White".into(),
                stock: 3,
            }],
            featured: false,
        }
    }

    #[test]
    fn test_input_validates() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_input_reports_missing_fields() {
        let bad = ProductInput {
            title: String::new(),
            price: Money::ZERO,
            sizes: vec![],
            images: vec![" ".into()],
            ..input()
        };
        let err = bad.validate().unwrap_err();
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["title", "price", "sizes", "images"]);
    }

    #[test]
    fn test_input_rejects_duplicate_variants() {
        let mut dup = input();
        dup.variants.push(dup.variants[0].clone());
        let err = dup.validate().unwrap_err();
        assert_eq!(err.errors()[0].field, "variants.1");
    }

    #[test]
    fn test_patch_overlays_and_clears_collection() {
        let mut current = input();
        current.collection_id = Some(CollectionId::generate());

        let patch: ProductPatch =
            serde_json::from_value(serde_json::json!({"price": "50", "collectionId": null}))
                .unwrap();
        let merged = patch.apply(current);
        assert_eq!(merged.price, Money::from_dollars(50));
        assert_eq!(merged.collection_id, None);
        assert_eq!(merged.title, "Linen Shirt");
    }

    #[test]
    fn test_patch_missing_collection_keeps_value() {
        let id = CollectionId::generate();
        let current = ProductInput {
            collection_id: Some(id),
            ..input()
        };
        let merged = ProductPatch::default().apply(current);
        assert_eq!(merged.collection_id, Some(id));
    }

    #[test]
    fn test_query_lists() {
        let query = ProductQuery {
            sizes: Some("S, M,,L".into()),
            search: Some("  ".into()),
            ..ProductQuery::default()
        };
        assert_eq!(query.size_list(), ["S", "M", "L"]);
        assert!(query.color_list().is_empty());
        assert_eq!(query.search_text(), None);
    }

    #[test]
    fn test_sort_names() {
        let sort: ProductSort = serde_json::from_str("\"price-desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
