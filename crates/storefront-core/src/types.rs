//! # Domain Types
//!
//! Shared domain types used throughout the storefront.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  status         │   │  order_id (FK)  │       │
//! │  │  price_cents    │   │  subtotal_cents │   │  unit_price     │       │
//! │  │  status         │   │  discount_cents │   │  quantity       │       │
//! │  └─────────────────┘   │  coupon_code    │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Percentage    │   │  OrderStatus    │   │ PaymentStatus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Pending        │   │  Unpaid         │       │
//! │  │  1000 = 10%     │   │  Shipped ...    │   │  Paid           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart and coupon types live in [`crate::cart`] and [`crate::coupon`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so "12.5%" is exactly 1250 bps.
/// No floating point is needed to store or apply a percentage discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Percentage(u32);

impl Percentage {
    /// 100% in basis points.
    pub const FULL_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a whole number of percent (`10` → 10%).
    ///
    /// Saturates at `u32::MAX` basis points; anything above 100% fails
    /// [`is_within_full`](Self::is_within_full) either way.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Percentage(pct.saturating_mul(100))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// Checks the value lies in `[0, 100]` percent.
    #[inline]
    pub const fn is_within_full(&self) -> bool {
        self.0 <= Self::FULL_BPS
    }
}

/// Parses `"10"`, `"12.5"` or `"12.50"` (percent, at most two decimals).
impl FromStr for Percentage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Same grammar as an amount: "12.50" percent is 1250 bps.
        let as_hundredths: Money = s.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "discountValue".to_string(),
            reason: "must be a percentage with at most two decimal places".to_string(),
        })?;
        let bps = u32::try_from(as_hundredths.cents()).map_err(|_| ValidationError::OutOfRange {
            field: "discountValue".to_string(),
            min: 0,
            max: 100,
        })?;
        Ok(Percentage(bps))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// Whether a product can currently be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A catalog product. Its `price_cents` is the authoritative unit price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier.
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Active products can be added to orders.
    pub status: ProductStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if the product can be priced into a cart.
    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, not yet shipped.
    #[default]
    Pending,
    Shipped,
    Delivered,
    /// Cancelled orders keep their coupon redemption.
    Cancelled,
}

impl OrderStatus {
    /// Delivered and cancelled orders are closed to further changes.
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Checks whether moving from `self` to `next` is allowed.
    ///
    /// Any change is allowed until the order is final, including
    /// `Pending ──► Delivered` for orders handed over directly.
    ///
    /// ```text
    /// Pending ◄──► Shipped
    ///    │            │
    ///    └─────┬──────┘
    ///          ▼
    /// Delivered | Cancelled   (final)
    /// ```
    pub fn can_transition_to(self, _next: OrderStatus) -> bool {
        !self.is_final()
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order, with the pricing frozen at placement time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_provider: Option<String>,
    pub payment_transaction_id: Option<String>,
    pub address_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Coupon consumed by this order, if any.
    pub coupon_id: Option<String>,
    pub coupon_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the discount as Money.
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }
}

/// A line of a placed order.
/// Uses snapshot pattern to freeze the catalog price at time of order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Variant chosen by the customer, e.g. a size.
    pub variant_key: Option<String>,
    pub quantity: i64,
    /// Unit price in cents at time of order (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_str() {
        assert_eq!("10".parse::<Percentage>().unwrap().bps(), 1000);
        assert_eq!("12.5".parse::<Percentage>().unwrap().bps(), 1250);
        assert_eq!("0.01".parse::<Percentage>().unwrap().bps(), 1);
        assert!("-5".parse::<Percentage>().is_err());
        assert!("abc".parse::<Percentage>().is_err());
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage::from_bps(1000).to_string(), "10%");
        assert_eq!(Percentage::from_bps(1250).to_string(), "12.5%");
        assert_eq!(Percentage::from_bps(1205).to_string(), "12.05%");
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::from_percent(100).is_within_full());
        assert!(!Percentage::from_bps(10_001).is_within_full());

        let huge = Percentage::from_percent(u32::MAX);
        assert_eq!(huge.bps(), u32::MAX);
        assert!(!huge.is_within_full());
    }

    #[test]
    fn test_order_status_transitions() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Cancelled.is_final());
        assert!(!OrderStatus::Shipped.is_final());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(serde_json::to_string(&PaymentStatus::Unpaid).unwrap(), "\"unpaid\"");
    }
}
