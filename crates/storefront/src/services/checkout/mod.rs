//! Order commit.
//!
//! Turning a cart into an order is all-or-nothing: every line's stock is
//! checked and decremented under a row lock inside one transaction, and the
//! order row is inserted in that same transaction. If any line cannot be
//! filled the transaction is dropped and nothing changes.
//!
//! Persistence sits behind [`CheckoutStore`] so the same commit logic runs
//! against `PostgreSQL` ([`crate::db::PgCheckoutStore`]) and against
//! [`MemoryCheckoutStore`] in tests.

mod memory;

pub use memory::MemoryCheckoutStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shopfront_core::inventory::{self, StockError, Variant};
use shopfront_core::order::{OrderItem, OrderNumber, OrderRequest, ValidatedOrder};
use shopfront_core::{CartItem, CartTotals, Money, OrderId, ProductId, ValidationErrors};

use crate::db::RepositoryError;
use crate::models::{CurrentUser, NewOrder, Order, Product};

/// Conflict message for a second order with the same idempotency key.
pub const DUPLICATE_IDEMPOTENCY_KEY: &str = "duplicate idempotency key";
/// Conflict message for an order-number collision.
pub const DUPLICATE_ORDER_NUMBER: &str = "duplicate order number";

/// The parts of a product checkout and the cart need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockedProduct {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: Money,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
}

impl StockedProduct {
    /// First image, used as the line thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }

    /// Build a cart line for one variant, snapshotting price and stock.
    ///
    /// Returns `None` if the product has no such variant.
    #[must_use]
    pub fn cart_item(&self, size: &str, color: &str, quantity: u32) -> Option<CartItem> {
        let stock = inventory::available(&self.variants, size, color)?;
        Some(CartItem {
            product_id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            price: self.price,
            quantity,
            size: size.to_owned(),
            color: color.to_owned(),
            image: self.primary_image().to_owned(),
            stock,
        })
    }
}

impl From<Product> for StockedProduct {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            slug: product.slug,
            price: product.price,
            images: product.images,
            variants: product.variants,
        }
    }
}

/// Read access for checkout plus the ability to open a transaction.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError>;

    /// Read a product without locking it.
    async fn find_product(&self, id: ProductId) -> Result<Option<StockedProduct>, RepositoryError>;

    /// Find the order created for an idempotency key.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, RepositoryError>;

    /// Find an order by its number.
    async fn find_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// One checkout transaction. Dropping it without [`commit`](Self::commit)
/// rolls back every change made through it.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Read a product and hold its row lock until the transaction ends.
    async fn lock_product(
        &mut self,
        id: ProductId,
    ) -> Result<Option<StockedProduct>, RepositoryError>;

    /// Overwrite a locked product's variant list.
    async fn save_variants(
        &mut self,
        id: ProductId,
        variants: &[Variant],
    ) -> Result<(), RepositoryError>;

    /// Insert the order row.
    ///
    /// Returns `RepositoryError::Conflict` with [`DUPLICATE_IDEMPOTENCY_KEY`]
    /// or [`DUPLICATE_ORDER_NUMBER`] on a unique violation.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Make every change visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request failed validation.
    #[error("invalid order: {0}")]
    Validation(#[from] ValidationErrors),

    /// Checkout was attempted with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A line refers to a product that no longer exists.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A line cannot be filled from current stock.
    #[error("{title}: {source}")]
    OutOfStock {
        title: String,
        #[source]
        source: StockError,
    },

    /// The idempotency key already placed an order with different lines.
    #[error("idempotency key reused for a different order")]
    KeyReused,

    /// The order collided with another one being written.
    #[error("order conflict: {0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Message safe to show the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.first_message().to_owned(),
            Self::EmptyCart => "Cart is empty".to_owned(),
            Self::ProductNotFound(_) => "Product not found".to_owned(),
            Self::OutOfStock {
                title,
                source: StockError::VariantNotFound { size, color },
            } => format!("{title} is not available in {size} / {color}"),
            Self::OutOfStock {
                title,
                source:
                    StockError::Insufficient {
                        size,
                        color,
                        available,
                        ..
                    },
            } => format!("Insufficient stock for {title} ({size} / {color}): {available} left"),
            Self::KeyReused => {
                "This request was already used for a different order".to_owned()
            }
            Self::Conflict(_) => "Order could not be placed, please try again".to_owned(),
            Self::Repository(_) => "An unexpected error occurred".to_owned(),
        }
    }
}

/// A committed order and whether it was created by an earlier request.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// True when the idempotency key matched an existing order.
    pub replayed: bool,
}

/// Who is placing an order.
///
/// Idempotency keys are namespaced by buyer, so a key only ever replays
/// orders its own buyer placed.
#[derive(Debug, Clone)]
pub enum Buyer {
    /// A signed-in customer. Keys match across all of their sessions.
    Customer(CurrentUser),
    /// A guest, identified by a random token held in their session.
    Guest(String),
}

impl Buyer {
    /// The signed-in customer, if any.
    #[must_use]
    pub const fn customer(&self) -> Option<&CurrentUser> {
        match self {
            Self::Customer(user) => Some(user),
            Self::Guest(_) => None,
        }
    }

    /// The stored form of a client-supplied idempotency key.
    fn scoped_key(&self, key: &str) -> String {
        match self {
            Self::Customer(user) => format!("user:{}:{key}", user.id),
            Self::Guest(token) => format!("guest:{token}:{key}"),
        }
    }
}

/// Attempts at inserting an order before an order-number collision is
/// reported as a conflict.
const ORDER_NUMBER_ATTEMPTS: usize = 2;

/// Places orders.
pub struct CheckoutService<'a> {
    store: &'a dyn CheckoutStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service over a store.
    #[must_use]
    pub const fn new(store: &'a dyn CheckoutStore) -> Self {
        Self { store }
    }

    /// Validate and commit an order.
    ///
    /// Stock for every line is reserved in one transaction. The first line
    /// that cannot be filled aborts the whole order. A repeated idempotency
    /// key from the same buyer returns the order it already placed, as long
    /// as the lines match.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for a malformed request,
    /// `CheckoutError::ProductNotFound` or `CheckoutError::OutOfStock` if a
    /// line cannot be filled, `CheckoutError::KeyReused` if the key already
    /// placed a different order, and `CheckoutError::Conflict` if the order
    /// collided with a concurrent write that left nothing to replay.
    #[instrument(skip(self, buyer, request), fields(guest = buyer.customer().is_none()))]
    pub async fn place_order(
        &self,
        buyer: &Buyer,
        request: OrderRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let order = request.validate()?;
        let key = order.idempotency_key.as_deref().map(|k| buyer.scoped_key(k));

        if let Some(replay) = self.replay(key.as_deref(), &order).await? {
            warn!(order_number = %replay.order.order_number, "Replaying order for repeated request");
            return Ok(replay);
        }

        let mut attempt = 1;
        loop {
            let mut tx = self.store.begin().await?;
            let new_order =
                reserve_and_snapshot(tx.as_mut(), buyer.customer(), &order, key.clone()).await?;

            match tx.insert_order(&new_order).await {
                Ok(placed) => {
                    tx.commit().await?;
                    info!(
                        order_number = %placed.order_number,
                        total = %placed.total,
                        guest = placed.is_guest(),
                        "Order placed"
                    );
                    return Ok(PlacedOrder {
                        order: placed,
                        replayed: false,
                    });
                }
                Err(RepositoryError::Conflict(reason))
                    if reason == DUPLICATE_ORDER_NUMBER && attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    drop(tx);
                    warn!(order_number = %new_order.order_number, attempt, "Order number taken, retrying");
                    attempt += 1;
                }
                Err(RepositoryError::Conflict(reason)) => {
                    drop(tx);
                    if let Some(replay) = self.replay(key.as_deref(), &order).await? {
                        warn!(order_number = %replay.order.order_number, "Concurrent duplicate order, replaying winner");
                        return Ok(replay);
                    }
                    return Err(CheckoutError::Conflict(reason));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The order already placed under `key`, if its lines match `order`.
    async fn replay(
        &self,
        key: Option<&str>,
        order: &ValidatedOrder,
    ) -> Result<Option<PlacedOrder>, CheckoutError> {
        let Some(key) = key else {
            return Ok(None);
        };
        let Some(existing) = self.store.find_by_idempotency_key(key).await? else {
            return Ok(None);
        };

        if !same_lines(&existing, order) {
            warn!(order_number = %existing.order_number, "Idempotency key reused with different lines");
            return Err(CheckoutError::KeyReused);
        }

        Ok(Some(PlacedOrder {
            order: existing,
            replayed: true,
        }))
    }

    /// Replay lookup for a checkout token whose cart is already gone.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the lookup fails.
    pub async fn find_placed(
        &self,
        buyer: &Buyer,
        key: &str,
    ) -> Result<Option<Order>, CheckoutError> {
        Ok(self
            .store
            .find_by_idempotency_key(&buyer.scoped_key(key))
            .await?)
    }
}

/// Whether `existing` was placed for the same lines, in the same order.
fn same_lines(existing: &Order, order: &ValidatedOrder) -> bool {
    existing.items.len() == order.lines.len()
        && existing.items.iter().zip(&order.lines).all(|(item, line)| {
            item.product_id == line.product_id
                && item.quantity == line.quantity
                && item.size == line.size
                && item.color == line.color
        })
}

/// Lock every product the order touches, check and decrement each line,
/// then build the order snapshot priced from the locked catalog rows.
///
/// Rows are locked in product id order, each once, so two orders over the
/// same products always queue on the same first row.
async fn reserve_and_snapshot(
    tx: &mut dyn CheckoutTransaction,
    customer: Option<&CurrentUser>,
    order: &ValidatedOrder,
    idempotency_key: Option<String>,
) -> Result<NewOrder, CheckoutError> {
    let mut locked: BTreeMap<ProductId, Option<StockedProduct>> = BTreeMap::new();
    for line in &order.lines {
        locked.entry(line.product_id).or_insert(None);
    }
    for (id, slot) in &mut locked {
        *slot = tx.lock_product(*id).await?;
    }

    let mut items = Vec::with_capacity(order.lines.len());
    for line in &order.lines {
        let Some(Some(product)) = locked.get_mut(&line.product_id) else {
            warn!(product_id = %line.product_id, "Rejected order line: product not found");
            return Err(CheckoutError::ProductNotFound(line.product_id));
        };

        if let Err(source) =
            inventory::reserve(&mut product.variants, &line.size, &line.color, line.quantity)
        {
            warn!(product_id = %product.id, error = %source, "Rejected order line");
            return Err(CheckoutError::OutOfStock {
                title: product.title.clone(),
                source,
            });
        }

        let image = line
            .image
            .clone()
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| product.primary_image().to_owned());
        items.push(OrderItem {
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            quantity: line.quantity,
            size: line.size.clone(),
            color: line.color.clone(),
            image,
        });
    }

    for product in locked.values().flatten() {
        tx.save_variants(product.id, &product.variants).await?;
    }

    let totals = CartTotals::from_lines(&items);

    Ok(NewOrder {
        id: OrderId::generate(),
        order_number: OrderNumber::generate(),
        user_id: customer.map(|c| c.id),
        items,
        shipping_address: order.shipping_address.clone(),
        payment_method: order.payment_method.clone(),
        totals,
        idempotency_key,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use shopfront_core::order::{OrderLineInput, ShippingAddressInput};
    use shopfront_core::{Email, OrderStatus, PaymentStatus, UserId, UserRole};

    fn guest(token: &str) -> Buyer {
        Buyer::Guest(token.into())
    }

    fn customer() -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: Email::parse("grace@example.com").unwrap(),
            name: "Grace".into(),
            role: UserRole::User,
        }
    }

    fn product(stock: u32, price_cents: i64) -> StockedProduct {
        StockedProduct {
            id: ProductId::generate(),
            title: "Linen Shirt".into(),
            slug: "linen-shirt".into(),
            price: Money::from_cents(price_cents),
            images: vec!["/img/linen.jpg".into()],
            variants: vec![
                Variant {
                    size: "M".into(),
                    color: "White".into(),
                    stock,
                },
                Variant {
                    size: "L".into(),
                    color: "White".into(),
                    stock: 2,
                },
            ],
        }
    }

    fn address() -> ShippingAddressInput {
        ShippingAddressInput {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
            address: "12 St James's Square".into(),
            city: "London".into(),
            state: "London".into(),
            zip_code: "SW1Y 4JH".into(),
            country: "UK".into(),
        }
    }

    fn line(product: &StockedProduct, size: &str, quantity: i64) -> OrderLineInput {
        OrderLineInput {
            product_id: product.id,
            quantity,
            size: size.into(),
            color: "White".into(),
            image: None,
        }
    }

    fn request(items: Vec<OrderLineInput>, key: Option<&str>) -> OrderRequest {
        OrderRequest {
            items,
            shipping_address: address(),
            payment_method: "card".into(),
            idempotency_key: key.map(Into::into),
        }
    }

    fn stock_of(store: &MemoryCheckoutStore, id: ProductId, size: &str) -> u32 {
        let product = store.product(id).unwrap();
        inventory::available(&product.variants, size, "White").unwrap()
    }

    #[tokio::test]
    async fn test_places_order_and_decrements_stock() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 6000);
        store.insert_product(shirt.clone());

        let placed = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 2)], None))
            .await
            .unwrap();

        assert!(!placed.replayed);
        let order = placed.order;
        assert!(order.is_guest());
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.subtotal, Money::from_cents(12_000));
        assert_eq!(order.tax, Money::from_cents(1_200));
        assert_eq!(order.shipping_cost, Money::ZERO);
        assert_eq!(order.total, Money::from_cents(13_200));
        assert_eq!(order.items[0].image, "/img/linen.jpg");
        assert_eq!(stock_of(&store, shirt.id, "M"), 3);
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_every_line() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 6000);
        store.insert_product(shirt.clone());

        let err = CheckoutService::new(&store)
            .place_order(
                &guest("g1"),
                request(vec![line(&shirt, "M", 5), line(&shirt, "L", 3)], None),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::OutOfStock {
                source: StockError::Insufficient { available: 2, .. },
                ..
            }
        ));
        assert_eq!(stock_of(&store, shirt.id, "M"), 5);
        assert_eq!(stock_of(&store, shirt.id, "L"), 2);
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_missing_variant_is_rejected() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 6000);
        store.insert_product(shirt.clone());

        let err = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![line(&shirt, "XS", 1)], None))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Linen Shirt is not available in XS / White");
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let store = MemoryCheckoutStore::new();
        let ghost = product(5, 6000);

        let err = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![line(&ghost, "M", 1)], None))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ghost.id));
    }

    #[tokio::test]
    async fn test_idempotent_replay_touches_nothing() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 2000);
        store.insert_product(shirt.clone());
        let service = CheckoutService::new(&store);

        let first = service
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 1)], Some("tok-1")))
            .await
            .unwrap();
        let second = service
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 1)], Some("tok-1")))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(stock_of(&store, shirt.id, "M"), 4);
        assert_eq!(store.orders().len(), 1);
        assert_eq!(first.order.total, Money::from_cents(3_200));
    }

    #[tokio::test]
    async fn test_reprices_from_catalog_and_attributes_customer() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 6000);
        store.insert_product(shirt.clone());
        let customer = customer();

        let mut with_image = line(&shirt, "M", 1);
        with_image.image = Some("/img/chosen.jpg".into());
        let placed = CheckoutService::new(&store)
            .place_order(&Buyer::Customer(customer.clone()), request(vec![with_image], None))
            .await
            .unwrap();

        assert!(placed.order.is_owned_by(customer.id));
        assert_eq!(placed.order.items[0].price, Money::from_cents(6000));
        assert_eq!(placed.order.items[0].image, "/img/chosen.jpg");
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_any_write() {
        let store = MemoryCheckoutStore::new();
        let err = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![], None))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Order must have at least one item");
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_same_key_from_another_buyer_places_new_order() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 2000);
        store.insert_product(shirt.clone());
        let service = CheckoutService::new(&store);

        let first = service
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 1)], Some("cart-1")))
            .await
            .unwrap();
        let second = service
            .place_order(&guest("g2"), request(vec![line(&shirt, "M", 1)], Some("cart-1")))
            .await
            .unwrap();

        assert!(!second.replayed);
        assert_ne!(first.order.id, second.order.id);
        assert_eq!(stock_of(&store, shirt.id, "M"), 3);
        assert!(service.find_placed(&guest("g2"), "cart-1").await.unwrap().is_some());
        assert!(service.find_placed(&guest("g3"), "cart-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_customer_key_replays_across_sessions_only_for_that_customer() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 2000);
        store.insert_product(shirt.clone());
        let service = CheckoutService::new(&store);
        let grace = Buyer::Customer(customer());

        let first = service
            .place_order(&grace, request(vec![line(&shirt, "M", 1)], Some("k")))
            .await
            .unwrap();
        let again = service
            .place_order(&grace, request(vec![line(&shirt, "M", 1)], Some("k")))
            .await
            .unwrap();
        let other = service
            .place_order(
                &Buyer::Customer(customer()),
                request(vec![line(&shirt, "M", 1)], Some("k")),
            )
            .await
            .unwrap();

        assert!(again.replayed);
        assert_eq!(first.order.id, again.order.id);
        assert!(!other.replayed);
        assert_eq!(store.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_reused_key_with_different_lines_conflicts() {
        let store = MemoryCheckoutStore::new();
        let shirt = product(5, 2000);
        store.insert_product(shirt.clone());
        let service = CheckoutService::new(&store);

        service
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 1)], Some("k")))
            .await
            .unwrap();
        let err = service
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 3)], Some("k")))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::KeyReused));
        assert_eq!(
            err.user_message(),
            "This request was already used for a different order"
        );
        assert_eq!(stock_of(&store, shirt.id, "M"), 4);
        assert_eq!(store.orders().len(), 1);
    }

    /// Wraps the memory store, recording every row lock and failing the
    /// next `collisions` inserts with an order-number conflict.
    #[derive(Default)]
    struct ScriptedStore {
        inner: MemoryCheckoutStore,
        locks: Arc<Mutex<Vec<ProductId>>>,
        collisions: Arc<AtomicUsize>,
    }

    struct ScriptedTransaction {
        inner: Box<dyn CheckoutTransaction>,
        locks: Arc<Mutex<Vec<ProductId>>>,
        collisions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CheckoutStore for ScriptedStore {
        async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
            Ok(Box::new(ScriptedTransaction {
                inner: self.inner.begin().await?,
                locks: Arc::clone(&self.locks),
                collisions: Arc::clone(&self.collisions),
            }))
        }

        async fn find_product(
            &self,
            id: ProductId,
        ) -> Result<Option<StockedProduct>, RepositoryError> {
            self.inner.find_product(id).await
        }

        async fn find_by_idempotency_key(
            &self,
            key: &str,
        ) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_by_idempotency_key(key).await
        }

        async fn find_order_by_number(
            &self,
            number: &OrderNumber,
        ) -> Result<Option<Order>, RepositoryError> {
            self.inner.find_order_by_number(number).await
        }
    }

    #[async_trait]
    impl CheckoutTransaction for ScriptedTransaction {
        async fn lock_product(
            &mut self,
            id: ProductId,
        ) -> Result<Option<StockedProduct>, RepositoryError> {
            self.locks.lock().unwrap().push(id);
            self.inner.lock_product(id).await
        }

        async fn save_variants(
            &mut self,
            id: ProductId,
            variants: &[Variant],
        ) -> Result<(), RepositoryError> {
            self.inner.save_variants(id, variants).await
        }

        async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
            let collide = self
                .collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if collide {
                return Err(RepositoryError::Conflict(DUPLICATE_ORDER_NUMBER.to_owned()));
            }
            self.inner.insert_order(order).await
        }

        async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
            self.inner.commit().await
        }
    }

    #[tokio::test]
    async fn test_locks_each_product_once_in_id_order() {
        let store = ScriptedStore::default();
        let a = product(5, 2000);
        let b = product(5, 3000);
        store.inner.insert_product(a.clone());
        store.inner.insert_product(b.clone());
        let (low, high) = if a.id < b.id { (&a, &b) } else { (&b, &a) };

        let placed = CheckoutService::new(&store)
            .place_order(
                &guest("g1"),
                request(
                    vec![line(high, "M", 1), line(low, "M", 2), line(high, "L", 1)],
                    None,
                ),
            )
            .await
            .unwrap();

        assert_eq!(*store.locks.lock().unwrap(), vec![low.id, high.id]);
        let ordered: Vec<ProductId> = placed.order.items.iter().map(|i| i.product_id).collect();
        assert_eq!(ordered, vec![high.id, low.id, high.id]);
        assert_eq!(stock_of(&store.inner, high.id, "M"), 4);
        assert_eq!(stock_of(&store.inner, high.id, "L"), 1);
        assert_eq!(stock_of(&store.inner, low.id, "M"), 3);
    }

    #[tokio::test]
    async fn test_order_number_collision_is_retried() {
        let store = ScriptedStore::default();
        let shirt = product(5, 2000);
        store.inner.insert_product(shirt.clone());
        store.collisions.store(1, Ordering::SeqCst);

        let placed = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 2)], None))
            .await
            .unwrap();

        assert!(!placed.replayed);
        assert_eq!(stock_of(&store.inner, shirt.id, "M"), 3);
        assert_eq!(store.inner.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_order_number_collision_conflicts() {
        let store = ScriptedStore::default();
        let shirt = product(5, 2000);
        store.inner.insert_product(shirt.clone());
        store.collisions.store(ORDER_NUMBER_ATTEMPTS, Ordering::SeqCst);

        let err = CheckoutService::new(&store)
            .place_order(&guest("g1"), request(vec![line(&shirt, "M", 2)], None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Conflict(ref reason) if reason == DUPLICATE_ORDER_NUMBER
        ));
        assert_eq!(stock_of(&store.inner, shirt.id, "M"), 5);
        assert!(store.inner.orders().is_empty());
    }

    #[test]
    fn test_cart_item_snapshot() {
        let shirt = product(4, 2500);
        let item = shirt.cart_item("M", "White", 2).unwrap();
        assert_eq!(item.stock, 4);
        assert_eq!(item.image, "/img/linen.jpg");
        assert!(shirt.cart_item("M", "Red", 1).is_none());
    }
}
