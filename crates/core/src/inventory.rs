//! Per-variant stock.
//!
//! A product carries an ordered list of `(size, color, stock)` variants.
//! [`reserve`] is the only way stock goes down: it decrements exactly one
//! variant and only when enough stock is on hand, so stock can never go
//! negative. The storefront calls it while holding a row lock on the
//! product, which makes the check and the decrement atomic.

use serde::{Deserialize, Serialize};

use crate::validation::ValidationErrors;

/// One sellable size/color combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
    pub stock: u32,
}

impl Variant {
    /// Whether this variant matches a size/color pair.
    #[must_use]
    pub fn matches(&self, size: &str, color: &str) -> bool {
        self.size == size && self.color == color
    }
}

/// Why stock could not be reserved.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// No variant with this size and color exists.
    #[error("variant {size}/{color} does not exist")]
    VariantNotFound { size: String, color: String },
    /// The variant exists but has fewer units than requested.
    #[error("only {available} left in {size}/{color}, {requested} requested")]
    Insufficient {
        size: String,
        color: String,
        requested: u32,
        available: u32,
    },
}

/// Decrement the matching variant by `quantity`.
///
/// Returns the remaining stock on success. On failure the list is left
/// untouched.
///
/// # Errors
///
/// Returns [`StockError::VariantNotFound`] if no variant matches and
/// [`StockError::Insufficient`] if the variant has less than `quantity`.
pub fn reserve(
    variants: &mut [Variant],
    size: &str,
    color: &str,
    quantity: u32,
) -> Result<u32, StockError> {
    let variant = variants
        .iter_mut()
        .find(|v| v.matches(size, color))
        .ok_or_else(|| StockError::VariantNotFound {
            size: size.to_owned(),
            color: color.to_owned(),
        })?;

    if variant.stock < quantity {
        return Err(StockError::Insufficient {
            size: size.to_owned(),
            color: color.to_owned(),
            requested: quantity,
            available: variant.stock,
        });
    }

    variant.stock -= quantity;
    Ok(variant.stock)
}

/// Stock on hand for a size/color pair, or `None` if the variant is absent.
#[must_use]
pub fn available(variants: &[Variant], size: &str, color: &str) -> Option<u32> {
    variants
        .iter()
        .find(|v| v.matches(size, color))
        .map(|v| v.stock)
}

/// Total units across all variants.
#[must_use]
pub fn total_stock(variants: &[Variant]) -> u64 {
    variants.iter().map(|v| u64::from(v.stock)).sum()
}

/// Check a variant list submitted from the admin product form.
///
/// # Errors
///
/// Returns field errors for blank sizes or colors and for duplicate
/// `(size, color)` pairs.
pub fn validate_variants(variants: &[Variant]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for (i, variant) in variants.iter().enumerate() {
        errors.require(&variant.size, &format!("variants.{i}.size"), "Size is required");
        errors.require(
            &variant.color,
            &format!("variants.{i}.color"),
            "Color is required",
        );

        let duplicate = variants
            .iter()
            .take(i)
            .any(|earlier| earlier.matches(&variant.size, &variant.color));
        errors.check(
            duplicate,
            &format!("variants.{i}"),
            "Each size and color combination must be unique",
        );
    }

    errors.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variants() -> Vec<Variant> {
        vec![
            Variant {
                size: "M".into(),
                color: "Black".into(),
                stock: 5,
            },
            Variant {
                size: "L".into(),
                color: "Black".into(),
                stock: 1,
            },
        ]
    }

    #[test]
    fn test_reserve_entire_stock() {
        let mut v = variants();
        assert_eq!(reserve(&mut v, "M", "Black", 5).unwrap(), 0);
        assert_eq!(available(&v, "M", "Black"), Some(0));
    }

    #[test]
    fn test_reserve_more_than_stock_leaves_stock_unchanged() {
        let mut v = variants();
        let err = reserve(&mut v, "M", "Black", 6).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                size: "M".into(),
                color: "Black".into(),
                requested: 6,
                available: 5,
            }
        );
        assert_eq!(v, variants());
    }

    #[test]
    fn test_reserve_missing_variant() {
        let mut v = variants();
        assert!(matches!(
            reserve(&mut v, "S", "Black", 1),
            Err(StockError::VariantNotFound { .. })
        ));
        assert_eq!(v, variants());
    }

    #[test]
    fn test_reserve_only_touches_matching_variant() {
        let mut v = variants();
        reserve(&mut v, "L", "Black", 1).unwrap();
        assert_eq!(available(&v, "M", "Black"), Some(5));
        assert_eq!(available(&v, "L", "Black"), Some(0));
        assert_eq!(total_stock(&v), 5);
    }

    #[test]
    fn test_validate_variants_rejects_duplicates() {
        let mut v = variants();
        assert!(validate_variants(&v).is_ok());

        v.push(Variant {
            size: "M".into(),
            color: "Black".into(),
            stock: 2,
        });
        let err = validate_variants(&v).unwrap_err();
        assert_eq!(err.errors()[0].field, "variants.2");
    }

    #[test]
    fn test_validate_variants_requires_size_and_color() {
        let v = vec![Variant {
            size: String::new(),
            color: " ".into(),
            stock: 0,
        }];
        let err = validate_variants(&v).unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }
}
