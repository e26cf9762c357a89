//! Placed orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::order::{OrderItem, OrderNumber, ShippingAddress};
use shopfront_core::{CartTotals, Money, OrderId, OrderStatus, PaymentStatus, UserId};

/// A committed order (domain type).
///
/// `items` is a frozen copy of what was bought; it never follows later
/// catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    /// `None` for guest checkouts.
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user` owns this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }

    /// Whether this was a guest checkout.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

/// An order ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub totals: CartTotals,
    pub idempotency_key: Option<String>,
}

impl NewOrder {
    /// The stored form of this order, with default statuses.
    #[must_use]
    pub fn into_order(self, created_at: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items: self.items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            subtotal: self.totals.subtotal,
            tax: self.totals.tax,
            shipping_cost: self.totals.shipping,
            total: self.totals.total,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            idempotency_key: self.idempotency_key,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Admin order listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

/// Admin status change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
}
