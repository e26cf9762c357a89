//! `PostgreSQL` checkout store.
//!
//! Each checkout runs in one database transaction. Product rows are locked
//! with `SELECT ... FOR UPDATE` so concurrent checkouts of the same product
//! queue up instead of both reading the same stock.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use shopfront_core::ProductId;
use shopfront_core::inventory::Variant;
use shopfront_core::order::OrderNumber;

use super::RepositoryError;
use super::orders::{ORDER_COLUMNS, OrderRepository, OrderRow};
use super::products::{PRODUCT_COLUMNS, ProductRow};
use crate::models::{NewOrder, Order, Product};
use crate::services::checkout::{
    CheckoutStore, CheckoutTransaction, DUPLICATE_IDEMPOTENCY_KEY, DUPLICATE_ORDER_NUMBER,
    StockedProduct,
};

const IDEMPOTENCY_KEY_CONSTRAINT: &str = "order_idempotency_key_unique";

/// Checkout store over a connection pool.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    /// Create a store over a pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCheckoutTransaction { tx }))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<StockedProduct>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Product::from(r).into()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .get_by_idempotency_key(key)
            .await
    }

    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get_by_number(number).await
    }
}

struct PgCheckoutTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTransaction for PgCheckoutTransaction {
    async fn lock_product(
        &mut self,
        id: ProductId,
    ) -> Result<Option<StockedProduct>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|r| Product::from(r).into()))
    }

    async fn save_variants(
        &mut self,
        id: ProductId,
        variants: &[Variant],
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET variants = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(Json(variants))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO shop.order
                (id, order_number, user_id, items, shipping_address, payment_method,
                 subtotal, tax, shipping_cost, total, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.user_id)
            .bind(Json(&order.items))
            .bind(Json(&order.shipping_address))
            .bind(&order.payment_method)
            .bind(order.totals.subtotal)
            .bind(order.totals.tax)
            .bind(order.totals.shipping)
            .bind(order.totals.total)
            .bind(order.idempotency_key.as_deref())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    let message = if db_err.constraint() == Some(IDEMPOTENCY_KEY_CONSTRAINT) {
                        DUPLICATE_IDEMPOTENCY_KEY
                    } else {
                        DUPLICATE_ORDER_NUMBER
                    };
                    return RepositoryError::Conflict(message.to_owned());
                }
                RepositoryError::Database(e)
            })?;

        Order::try_from(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
