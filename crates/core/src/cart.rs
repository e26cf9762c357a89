//! The shopping cart aggregate.
//!
//! A cart belongs to exactly one session. Lines are keyed by
//! `(product_id, size, color)` and each line remembers the stock level seen
//! when it was added. Quantities are clamped to that snapshot; the live
//! stock check happens at checkout.

use serde::{Deserialize, Serialize};

use crate::pricing::{CartTotals, PricedLine};
use crate::types::{Money, ProductId};

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity must be at least one when adding.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    /// The variant had no stock when the shopper tried to add it.
    #[error("This item is out of stock")]
    OutOfStock,
    /// No line with this key.
    #[error("Item is not in the cart")]
    ItemNotFound,
}

/// Identifies one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: Money,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub image: String,
    /// Variant stock when the line was last added.
    pub stock: u32,
}

impl CartItem {
    /// The line's key.
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    fn has_key(&self, key: &CartKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Money {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// An ordered list of cart lines.
///
/// Serializes as a plain JSON array so it can be stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add a line, merging with an existing line of the same key.
    ///
    /// The merged quantity is clamped to the incoming stock snapshot, which
    /// also replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity and
    /// [`CartError::OutOfStock`] when the snapshot has no stock.
    pub fn add(&mut self, item: CartItem) -> Result<&CartItem, CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if item.stock == 0 {
            return Err(CartError::OutOfStock);
        }

        let key = item.key();
        let index = if let Some(index) = self.position(&key) {
            let existing = self
                .items
                .get_mut(index)
                .ok_or(CartError::ItemNotFound)?;
            existing.stock = item.stock;
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(item.stock);
            index
        } else {
            let quantity = item.quantity.min(item.stock);
            self.items.push(CartItem { quantity, ..item });
            self.items.len() - 1
        };

        self.items.get(index).ok_or(CartError::ItemNotFound)
    }

    /// Set a line's quantity.
    ///
    /// A quantity of zero or less removes the line; anything else is clamped
    /// to the line's stock snapshot. Returns the updated line, or `None` if
    /// it was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if no line has this key.
    pub fn update(&mut self, key: &CartKey, quantity: i64) -> Result<Option<&CartItem>, CartError> {
        let index = self.position(key).ok_or(CartError::ItemNotFound)?;

        if quantity <= 0 {
            self.items.remove(index);
            return Ok(None);
        }

        let item = self.items.get_mut(index).ok_or(CartError::ItemNotFound)?;
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        item.quantity = requested.min(item.stock);
        Ok(Some(item))
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, key: &CartKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !item.has_key(key));
        self.items.len() != before
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line.
    #[must_use]
    pub fn get(&self, key: &CartKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.has_key(key))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Price the cart.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::from_lines(&self.items)
    }

    fn position(&self, key: &CartKey) -> Option<usize> {
        self.items.iter().position(|item| item.has_key(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product_id: ProductId, quantity: u32, stock: u32) -> CartItem {
        CartItem {
            product_id,
            title: "Linen Shirt".into(),
            slug: "linen-shirt".into(),
            price: Money::from_dollars(40),
            quantity,
            size: "M".into(),
            color: "White".into(),
            image: "/img/linen.jpg".into(),
            stock,
        }
    }

    #[test]
    fn test_add_merges_same_key() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(item(id, 1, 10)).unwrap();
        cart.add(item(id, 2, 10)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_merge_clamps_to_stock_snapshot() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(item(id, 3, 4)).unwrap();
        let merged = cart.add(item(id, 3, 4)).unwrap();

        assert_eq!(merged.quantity, 4);
    }

    #[test]
    fn test_add_clamps_new_line() {
        let mut cart = Cart::new();
        let line = cart.add(item(ProductId::generate(), 9, 2)).unwrap();
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_add_distinct_variants_are_separate_lines() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        cart.add(item(id, 1, 5)).unwrap();
        cart.add(CartItem {
            size: "L".into(),
            ..item(id, 1, 5)
        })
        .unwrap();

        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_add_rejects_zero_quantity_and_no_stock() {
        let mut cart = Cart::new();
        let id = ProductId::generate();
        assert_eq!(cart.add(item(id, 0, 5)), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add(item(id, 1, 0)), Err(CartError::OutOfStock));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_clamps_and_removes() {
        let id = ProductId::generate();
        let mut cart = Cart::new();
        let key = cart.add(item(id, 1, 3)).unwrap().key();

        let updated = cart.update(&key, 10).unwrap().unwrap();
        assert_eq!(updated.quantity, 3);

        assert!(cart.update(&key, 0).unwrap().is_none());
        assert!(cart.is_empty());
        assert_eq!(cart.update(&key, 1), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_update_negative_removes() {
        let mut cart = Cart::new();
        let key = cart.add(item(ProductId::generate(), 2, 3)).unwrap().key();
        assert!(cart.update(&key, -4).unwrap().is_none());
        assert!(cart.get(&key).is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        let a = cart.add(item(ProductId::generate(), 1, 3)).unwrap().key();
        cart.add(item(ProductId::generate(), 1, 3)).unwrap();

        assert!(cart.remove(&a));
        assert!(!cart.remove(&a));
        assert_eq!(cart.items().len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        cart.add(CartItem {
            price: Money::from_dollars(60),
            ..item(ProductId::generate(), 1, 3)
        })
        .unwrap();
        cart.add(CartItem {
            price: Money::from_dollars(50),
            ..item(ProductId::generate(), 1, 3)
        })
        .unwrap();

        assert_eq!(cart.totals().total, Money::from_dollars(121));
    }

    #[test]
    fn test_serialized_shape() {
        let mut cart = Cart::new();
        cart.add(item(ProductId::generate(), 1, 3)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();

        let line = &json[0];
        assert_eq!(line["quantity"], 1);
        assert_eq!(line["price"], "40");
        assert!(line.get("productId").is_some());

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
