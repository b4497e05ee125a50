//! # storefront-core: Pricing Engine for the Storefront
//!
//! This crate computes what a customer pays: the subtotal of a cart, the
//! discount granted by a coupon, and the resulting total. Every function is
//! pure or async only over the collaborator traits in [`repository`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP handlers / admin surface                   │   │
//! │  │    validate coupon, quote cart, place order, manage coupons     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │  coupon  │ │ pricing  │ │    checkout      │  │   │
//! │  │   │  Money   │ │  Coupon  │ │ subtotal │ │ request → cart   │  │   │
//! │  │   │  cents   │ │  rules   │ │ discount │ │ (catalog prices) │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO LOGGING                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CouponRepository / Catalog traits     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (Database Layer)                  │   │
//! │  │       SQLite repositories, atomic redemption, order placement   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Line items and the non-empty cart snapshot
//! - [`coupon`] - Coupon definition, discount rules, admin inputs
//! - [`pricing`] - Subtotal, coupon checks, discount and total
//! - [`repository`] - Collaborator traits plus in-memory implementations
//! - [`checkout`] - Client request validation and catalog-priced carts
//! - [`types`] - Products, orders, percentages
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: amounts are cents (i64); percentages are basis points
//! 2. **Server Prices**: unit prices come from the catalog, never the client
//! 3. **Pure Pricing**: pricing never consumes a coupon redemption
//! 4. **Explicit Errors**: every rejection has its own typed variant
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::types::Percentage;
//!
//! let subtotal = Money::from_cents(10000); // $100.00
//! let discount = subtotal.percentage(Percentage::from_percent(10));
//!
//! assert_eq!(discount.to_string(), "$10.00");
//! assert_eq!((subtotal - discount).to_decimal_string(), "90.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod repository;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartSnapshot, LineItem};
pub use checkout::{build_cart, CartLimits, CheckoutRequest, RequestedItem, ValidatedCheckout};
pub use coupon::{Coupon, CouponCode, CouponUpdate, DiscountRule, DiscountType, NewCoupon};
pub use error::{BoxError, CouponError, EngineResult, PricingError, ValidationError};
pub use money::Money;
pub use pricing::{
    apply_coupon, check_coupon, compute_subtotal, compute_subtotal_of, price_cart,
    price_with_coupon, resolve_coupon, resolve_coupon_code, AppliedCoupon, PricingResult,
};
pub use repository::{Catalog, CouponRepository, InMemoryCatalog, InMemoryCoupons};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of lines in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Default maximum quantity of a single line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;
