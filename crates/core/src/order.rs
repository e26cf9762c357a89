//! Order input, line snapshots, and order numbers.
//!
//! An [`OrderRequest`] is what a client submits. It is checked field by field
//! into a [`ValidatedOrder`] before anything touches stock. The committed
//! order stores [`OrderItem`]s, a frozen copy of what was bought and at what
//! price, so later catalog edits never change a past order.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pricing::PricedLine;
use crate::types::{Email, Money, ProductId};
use crate::validation::ValidationErrors;

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// One requested line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub quantity: i64,
    pub size: String,
    pub color: String,
    /// Image the shopper saw; the product's first image is used otherwise.
    #[serde(default)]
    pub image: Option<String>,
}

/// Shipping address as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddressInput {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// A create-order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
    #[serde(default)]
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub payment_method: String,
    /// Client-generated token; resubmitting the same token returns the
    /// order it already created.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// A shipping address that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// A line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub image: Option<String>,
}

/// An order request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub lines: Vec<ValidatedLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub idempotency_key: Option<String>,
}

impl OrderRequest {
    /// Check every field.
    ///
    /// Text fields are trimmed. A blank idempotency key counts as absent.
    ///
    /// # Errors
    ///
    /// Returns all field errors found.
    pub fn validate(self) -> Result<ValidatedOrder, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(
            self.items.is_empty(),
            "items",
            "Order must have at least one item",
        );

        let mut lines = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.into_iter().enumerate() {
            let quantity = u32::try_from(item.quantity).ok().filter(|q| *q > 0);
            if quantity.is_none() {
                errors.add(
                    format!("items.{i}.quantity"),
                    "Quantity must be a positive integer",
                );
            }
            errors.require(&item.size, &format!("items.{i}.size"), "Size is required");
            errors.require(&item.color, &format!("items.{i}.color"), "Color is required");

            if let Some(quantity) = quantity {
                lines.push(ValidatedLine {
                    product_id: item.product_id,
                    quantity,
                    size: item.size.trim().to_owned(),
                    color: item.color.trim().to_owned(),
                    image: item.image.filter(|s| !s.trim().is_empty()),
                });
            }
        }

        let address = self.shipping_address;
        errors.require(
            &address.full_name,
            "shippingAddress.fullName",
            "Full name is required",
        );
        let email = Email::parse(&address.email);
        errors.check(email.is_err(), "shippingAddress.email", "Invalid email");
        errors.require(&address.phone, "shippingAddress.phone", "Phone is required");
        errors.require(
            &address.address,
            "shippingAddress.address",
            "Address is required",
        );
        errors.require(&address.city, "shippingAddress.city", "City is required");
        errors.require(&address.state, "shippingAddress.state", "State is required");
        errors.require(
            &address.zip_code,
            "shippingAddress.zipCode",
            "Zip code is required",
        );
        errors.require(
            &address.country,
            "shippingAddress.country",
            "Country is required",
        );
        errors.require(
            &self.payment_method,
            "paymentMethod",
            "Payment method is required",
        );

        let idempotency_key = self
            .idempotency_key
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty());
        errors.check(
            idempotency_key
                .as_ref()
                .is_some_and(|key| key.len() > MAX_IDEMPOTENCY_KEY_LEN),
            "idempotencyKey",
            "Idempotency key must be at most 128 characters",
        );

        errors.finish()?;

        let Ok(email) = email else {
            return Err(ValidationErrors::single("shippingAddress.email", "Invalid email"));
        };

        Ok(ValidatedOrder {
            lines,
            shipping_address: ShippingAddress {
                full_name: address.full_name.trim().to_owned(),
                email,
                phone: address.phone.trim().to_owned(),
                address: address.address.trim().to_owned(),
                city: address.city.trim().to_owned(),
                state: address.state.trim().to_owned(),
                zip_code: address.zip_code.trim().to_owned(),
                country: address.country.trim().to_owned(),
            },
            payment_method: self.payment_method.trim().to_owned(),
            idempotency_key,
        })
    }
}

/// A frozen copy of one purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Money,
    pub quantity: u32,
    pub size: String,
    pub color: String,
    pub image: String,
}

impl PricedLine for OrderItem {
    fn unit_price(&self) -> Money {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Error parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid order number")]
pub struct OrderNumberError;

/// Human-facing order reference: `ORD-<time>-<random>`.
///
/// `<time>` is the creation time in milliseconds and `<random>` six random
/// digits, both upper-case base 36. Two numbers generated in the same
/// millisecond collide with probability 1 in 36^6; the database's unique
/// index turns that into a failed insert rather than a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD-";
    const RANDOM_DIGITS: u32 = 6;

    /// Generate a number from the current time and thread-local randomness.
    #[must_use]
    pub fn generate() -> Self {
        let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let entropy = rand::rng().random_range(0..36_u64.pow(Self::RANDOM_DIGITS));
        Self::from_parts(millis, entropy)
    }

    /// Build a number from explicit parts.
    ///
    /// `entropy` is reduced modulo 36^6 and zero-padded to six digits.
    #[must_use]
    pub fn from_parts(millis: u64, entropy: u64) -> Self {
        let random = to_base36(entropy % 36_u64.pow(Self::RANDOM_DIGITS));
        Self(format!(
            "{}{}-{random:0>width$}",
            Self::PREFIX,
            to_base36(millis),
            width = Self::RANDOM_DIGITS as usize
        ))
    }

    /// Parse a number typed or linked by a shopper. Case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberError`] if the input is not `ORD-<a>-<b>` with
    /// non-empty alphanumeric segments.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let upper = s.trim().to_ascii_uppercase();
        let rest = upper.strip_prefix(Self::PREFIX).ok_or(OrderNumberError)?;
        let (time, random) = rest.split_once('-').ok_or(OrderNumberError)?;

        let segment_ok =
            |seg: &str| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric());
        if !segment_ok(time) || !segment_ok(random) {
            return Err(OrderNumberError);
        }

        Ok(Self(upper))
    }

    /// The number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if n == 0 {
        return "0".to_owned();
    }

    let mut out = Vec::new();
    while n > 0 {
        let digit = usize::try_from(n % 36).unwrap_or_default();
        out.push(DIGITS.get(digit).copied().unwrap_or(b'0'));
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
