//! Cart and order totals.
//!
//! The same calculator prices the cart page and the committed order, so a
//! shopper is always charged what they were shown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Sales tax applied to the subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Orders with a subtotal strictly above this ship free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(10_000);

/// Flat shipping charged at or below the threshold.
pub const FLAT_SHIPPING: Money = Money::from_cents(1_000);

/// Anything with a unit price and a quantity.
pub trait PricedLine {
    /// Price of one unit.
    fn unit_price(&self) -> Money;

    /// Number of units.
    fn quantity(&self) -> u32;

    /// `unit_price * quantity`.
    fn line_total(&self) -> Money {
        self.unit_price().times(self.quantity())
    }
}

/// Derived totals for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl CartTotals {
    /// Price a sequence of lines.
    ///
    /// `subtotal = sum(price * quantity)`, `tax = subtotal * 0.10` rounded
    /// to cents, `shipping = 0` when `subtotal > 100` and `10` otherwise, and
    /// `total = subtotal + tax + shipping`. An empty cart still reports flat
    /// shipping.
    pub fn from_lines<'a, L, I>(lines: I) -> Self
    where
        L: PricedLine + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        let subtotal: Money = lines.into_iter().map(PricedLine::line_total).sum();
        Self::from_subtotal(subtotal)
    }

    /// Derive tax, shipping, and total from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = subtotal.scale(TAX_RATE).round_to_cents();
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Money::ZERO
        } else {
            FLAT_SHIPPING
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}
