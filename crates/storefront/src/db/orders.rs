//! Order repository: reads and status changes.
//!
//! Orders are inserted only by the checkout transaction in
//! [`super::checkout`]. Line items and the shipping address are JSONB
//! snapshots and never change after insert.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use shopfront_core::order::{OrderItem, OrderNumber, ShippingAddress};
use shopfront_core::{Money, OrderId, OrderStatus, PaymentStatus, UserId};

use super::{RepositoryError, page_offset};
use crate::models::{Order, OrderQuery, Page};

pub(crate) const ORDER_COLUMNS: &str = "id, order_number, user_id, items, shipping_address, \
     payment_method, subtotal, tax, shipping_cost, total, payment_status, order_status, \
     idempotency_key, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<Uuid>,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    subtotal: Decimal,
    tax: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let order_number = OrderNumber::parse(&row.order_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order number in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::from_uuid(row.id),
            order_number,
            user_id: row.user_id.map(UserId::from_uuid),
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            subtotal: Money::new(row.subtotal),
            tax: Money::new(row.tax),
            shipping_cost: Money::new(row.shipping_cost),
            total: Money::new(row.total),
            payment_status: row.payment_status,
            order_status: row.order_status,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders, newest first, filtered by status and customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored order is invalid.
    pub async fn list(
        &self,
        query: &OrderQuery,
        page: u32,
        limit: u32,
    ) -> Result<Page<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.order
            WHERE ($1::shop.order_status IS NULL OR order_status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(query.status)
            .bind(query.user_id)
            .bind(i64::from(limit))
            .bind(page_offset(page, limit))
            .fetch_all(self.pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM shop.order
            WHERE ($1::shop.order_status IS NULL OR order_status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ",
        )
        .bind(query.status)
        .bind(query.user_id)
        .fetch_one(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            page,
            limit,
        ))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored order is invalid.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Get an order by its customer-facing number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored order is invalid.
    pub async fn get_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE order_number = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(number)
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Get the order created for an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored order is invalid.
    pub async fn get_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.order WHERE idempotency_key = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(key)
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Move an order from `from` to `to`.
    ///
    /// The update only applies if the order is still in `from`, so two staff
    /// members racing on the same order cannot both succeed.
    ///
    /// # Returns
    ///
    /// Returns `None` if the order no longer exists or has left `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE shop.order
            SET order_status = $3, updated_at = now()
            WHERE id = $1 AND order_status = $2
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }
}
