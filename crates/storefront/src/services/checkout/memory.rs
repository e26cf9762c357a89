//! In-memory checkout store.
//!
//! Transactions are serialized by a single async lock and buffer their
//! writes until commit, so a dropped transaction leaves no trace. Used by
//! tests and local demos that run without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use shopfront_core::ProductId;
use shopfront_core::inventory::Variant;
use shopfront_core::order::OrderNumber;

use super::{
    CheckoutStore, CheckoutTransaction, DUPLICATE_IDEMPOTENCY_KEY, DUPLICATE_ORDER_NUMBER,
    StockedProduct,
};
use crate::db::RepositoryError;
use crate::models::{NewOrder, Order};

#[derive(Debug, Default)]
struct MemoryData {
    products: HashMap<ProductId, StockedProduct>,
    orders: Vec<Order>,
}

#[derive(Debug, Default)]
struct Inner {
    data: Mutex<MemoryData>,
    writer: Arc<tokio::sync::Mutex<()>>,
}

/// Checkout store backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckoutStore {
    inner: Arc<Inner>,
}

impl MemoryCheckoutStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, MemoryData> {
        self.inner
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a product.
    pub fn insert_product(&self, product: StockedProduct) {
        self.data().products.insert(product.id, product);
    }

    /// Current state of a product.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<StockedProduct> {
        self.data().products.get(&id).cloned()
    }

    /// Every committed order, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.data().orders.clone()
    }
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
        let guard = Arc::clone(&self.inner.writer).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            _guard: guard,
            products: HashMap::new(),
            orders: Vec::new(),
        }))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<StockedProduct>, RepositoryError> {
        Ok(self.product(id))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .data()
            .orders
            .iter()
            .find(|o| o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .data()
            .orders
            .iter()
            .find(|o| &o.order_number == number)
            .cloned())
    }
}

struct MemoryTransaction {
    store: MemoryCheckoutStore,
    _guard: OwnedMutexGuard<()>,
    products: HashMap<ProductId, StockedProduct>,
    orders: Vec<Order>,
}

#[async_trait]
impl CheckoutTransaction for MemoryTransaction {
    async fn lock_product(
        &mut self,
        id: ProductId,
    ) -> Result<Option<StockedProduct>, RepositoryError> {
        if let Some(staged) = self.products.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.product(id))
    }

    async fn save_variants(
        &mut self,
        id: ProductId,
        variants: &[Variant],
    ) -> Result<(), RepositoryError> {
        let mut product = match self.products.remove(&id) {
            Some(staged) => staged,
            None => self.store.product(id).ok_or(RepositoryError::NotFound)?,
        };
        product.variants = variants.to_vec();
        self.products.insert(id, product);
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        {
            let data = self.store.data();
            let existing = data.orders.iter().chain(self.orders.iter());
            for other in existing {
                if order.idempotency_key.is_some() && other.idempotency_key == order.idempotency_key
                {
                    return Err(RepositoryError::Conflict(
                        DUPLICATE_IDEMPOTENCY_KEY.to_owned(),
                    ));
                }
                if other.order_number == order.order_number {
                    return Err(RepositoryError::Conflict(DUPLICATE_ORDER_NUMBER.to_owned()));
                }
            }
        }

        let placed = order.clone().into_order(Utc::now());
        self.orders.push(placed.clone());
        Ok(placed)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let this = *self;
        let mut data = this.store.data();
        data.products.extend(this.products);
        data.orders.extend(this.orders);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use shopfront_core::Money;

    fn shirt() -> StockedProduct {
        StockedProduct {
            id: ProductId::generate(),
            title: "Tee".into(),
            slug: "tee".into(),
            price: Money::from_cents(1_500),
            images: vec![],
            variants: vec![Variant {
                size: "M".into(),
                color: "Black".into(),
                stock: 3,
            }],
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryCheckoutStore::new();
        let product = shirt();
        store.insert_product(product.clone());

        let mut tx = store.begin().await.unwrap();
        let mut variants = product.variants.clone();
        variants[0].stock = 0;
        tx.save_variants(product.id, &variants).await.unwrap();
        assert_eq!(tx.lock_product(product.id).await.unwrap().unwrap().variants, variants);
        drop(tx);

        assert_eq!(store.product(product.id).unwrap().variants[0].stock, 3);
    }

    #[tokio::test]
    async fn test_commit_applies_writes() {
        let store = MemoryCheckoutStore::new();
        let product = shirt();
        store.insert_product(product.clone());

        let mut tx = store.begin().await.unwrap();
        let mut variants = product.variants.clone();
        variants[0].stock = 1;
        tx.save_variants(product.id, &variants).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.product(product.id).unwrap().variants[0].stock, 1);
    }
}
