//! # Cart Snapshot
//!
//! The priced view of a cart: the lines the engine computes over.
//!
//! ```text
//! RequestedItem (client: product + qty)
//!      │
//!      │  catalog lookup (authoritative price)
//!      ▼
//! LineItem { product_id, unit_price, quantity, variant_key }
//!      │
//!      ▼
//! CartSnapshot (non-empty, every line valid)
//! ```
//!
//! A `CartSnapshot` can only be built through [`CartSnapshot::new`], so any
//! snapshot the engine receives is already non-empty and well-formed.

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, PricingError};
use crate::money::Money;
use crate::validation::{validate_price, validate_product_id, validate_quantity};

/// One row in a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Opaque product reference.
    pub product_id: String,

    /// Unit price captured from the catalog at computation time.
    pub unit_price: Money,

    /// Quantity, at least 1.
    pub quantity: i64,

    /// Optional variant, e.g. a size.
    pub variant_key: Option<String>,
}

impl LineItem {
    /// Creates a line without a variant.
    pub fn new(product_id: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        LineItem {
            product_id: product_id.into(),
            unit_price,
            quantity,
            variant_key: None,
        }
    }

    /// Sets the variant key.
    pub fn with_variant(mut self, variant_key: impl Into<String>) -> Self {
        self.variant_key = Some(variant_key.into());
        self
    }

    /// unit_price × quantity, or `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul_quantity(self.quantity)
    }
}

/// An ordered, non-empty sequence of line items for one pricing computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Builds a snapshot, checking every line.
    ///
    /// ## Errors
    /// - `EmptyCart` when `items` is empty
    /// - `Validation` when a line has a blank product id, a quantity below 1
    ///   or a negative unit price
    pub fn new(items: Vec<LineItem>) -> EngineResult<Self> {
        if items.is_empty() {
            return Err(PricingError::EmptyCart);
        }

        for item in &items {
            validate_product_id(&item.product_id)?;
            validate_quantity(item.quantity)?;
            validate_price(item.unit_price)?;
        }

        Ok(CartSnapshot { items })
    }

    /// The lines, in the order they were added.
    #[inline]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines, saturating at `i64::MAX`.
    pub fn unit_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0_i64, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Consumes the snapshot, returning its lines.
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_empty_cart_is_rejected() {
        assert!(matches!(CartSnapshot::new(vec![]), Err(PricingError::EmptyCart)));
    }

    #[test]
    fn test_invalid_lines_are_rejected() {
        let zero_qty = LineItem::new("p1", Money::from_cents(100), 0);
        assert!(matches!(
            CartSnapshot::new(vec![zero_qty]),
            Err(PricingError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let negative_price = LineItem::new("p1", Money::from_cents(-1), 1);
        assert!(matches!(
            CartSnapshot::new(vec![negative_price]),
            Err(PricingError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let blank_id = LineItem::new("  ", Money::from_cents(100), 1);
        assert!(matches!(
            CartSnapshot::new(vec![blank_id]),
            Err(PricingError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_snapshot_keeps_order_and_variants() {
        let cart = CartSnapshot::new(vec![
            LineItem::new("shirt", Money::from_cents(1999), 2).with_variant("M"),
            LineItem::new("socks", Money::from_cents(0), 3),
        ])
        .unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.unit_count(), 5);
        assert_eq!(cart.items()[0].product_id, "shirt");
        assert_eq!(cart.items()[0].variant_key.as_deref(), Some("M"));
        assert_eq!(cart.items()[0].line_total(), Some(Money::from_cents(3998)));
    }

    #[test]
    fn test_unit_count_saturates() {
        let cart = CartSnapshot::new(vec![
            LineItem::new("free-a", Money::zero(), i64::MAX),
            LineItem::new("free-b", Money::zero(), i64::MAX),
        ])
        .unwrap();

        assert_eq!(cart.unit_count(), i64::MAX);
    }
}
