//! Shopfront Core - Domain types and storefront logic.
//!
//! This crate holds everything about the shop that does not touch I/O:
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`cart`] - The per-session cart aggregate
//! - [`pricing`] - Subtotal, tax, and shipping derivation
//! - [`inventory`] - Per-variant stock reservation
//! - [`order`] - Order input validation, line snapshots, and order numbers
//! - [`validation`] - Field-level validation errors shared by all inputs
//! - [`slug`] - URL slug generation
//!
//! # Architecture
//!
//! The storefront crate owns the database, the session, and HTTP. It calls
//! into this crate for every rule that decides what a cart or an order looks
//! like, so the rules can be unit tested without a database. Enable the
//! `postgres` feature to get `sqlx` encode/decode impls for the newtypes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod inventory;
pub mod order;
pub mod pricing;
pub mod slug;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartError, CartItem, CartKey};
pub use inventory::{StockError, Variant};
pub use order::{
    OrderItem, OrderLineInput, OrderNumber, OrderRequest, ShippingAddress, ValidatedOrder,
};
pub use pricing::{CartTotals, PricedLine};
pub use types::*;
pub use validation::{ValidationError, ValidationErrors};
