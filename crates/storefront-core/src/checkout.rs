//! # Checkout Requests
//!
//! What a client may send, and how it becomes a priced cart.
//!
//! ```text
//! CheckoutRequest (untrusted JSON)
//!      │  validate(limits)        line count, quantities, coupon code
//!      ▼
//! ValidatedCheckout
//!      │  build_cart(catalog)     unit prices from the catalog only
//!      ▼
//! CartSnapshot ──► pricing
//! ```
//!
//! A request carries no prices. Any price field a client adds is ignored
//! during deserialization; the catalog is the only source of unit prices.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CartSnapshot, LineItem};
use crate::coupon::CouponCode;
use crate::error::{CouponError, EngineResult, PricingError};
use crate::repository::Catalog;
use crate::validation::{validate_cart_size, validate_product_id, validate_quantity_within};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Size limits applied to incoming checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLimits {
    pub max_cart_items: usize,
    pub max_item_quantity: i64,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_cart_items: MAX_CART_ITEMS,
            max_item_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

/// One requested line: a product reference and a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub variant_key: Option<String>,
}

impl RequestedItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        RequestedItem {
            product_id: product_id.into(),
            quantity,
            variant_key: None,
        }
    }
}

/// A cart as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<RequestedItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// A request whose shape has been checked. Prices are still unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckout {
    items: Vec<RequestedItem>,
    coupon_code: Option<CouponCode>,
}

impl ValidatedCheckout {
    pub fn items(&self) -> &[RequestedItem] {
        &self.items
    }

    pub fn coupon_code(&self) -> Option<&CouponCode> {
        self.coupon_code.as_ref()
    }
}

impl CheckoutRequest {
    /// Checks the request against `limits`.
    ///
    /// ## Rules
    /// - at least one line, at most `max_cart_items`
    /// - every product id non-blank; every quantity in `[1, max_item_quantity]`
    /// - blank variant keys and a blank coupon code count as absent
    /// - a coupon code that is not a well-formed code is `NotFound`
    pub fn validate(self, limits: &CartLimits) -> EngineResult<ValidatedCheckout> {
        if self.items.is_empty() {
            return Err(PricingError::EmptyCart);
        }
        validate_cart_size(self.items.len(), limits.max_cart_items)?;

        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            validate_product_id(&item.product_id)?;
            validate_quantity_within(item.quantity, limits.max_item_quantity)?;

            items.push(RequestedItem {
                product_id: item.product_id.trim().to_string(),
                quantity: item.quantity,
                variant_key: item
                    .variant_key
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            });
        }

        let coupon_code = match self.coupon_code.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(CouponCode::parse(raw).map_err(|_| CouponError::NotFound {
                code: raw.to_uppercase(),
            })?),
        };

        Ok(ValidatedCheckout { items, coupon_code })
    }
}

/// Prices every requested line from `catalog`.
///
/// ## Errors
/// - `ProductNotFound` for a product the catalog does not sell
/// - `Lookup` if the catalog fails
pub async fn build_cart<C>(checkout: &ValidatedCheckout, catalog: &C) -> EngineResult<CartSnapshot>
where
    C: Catalog,
{
    let mut lines = Vec::with_capacity(checkout.items.len());

    for item in &checkout.items {
        let unit_price = catalog
            .get_unit_price(&item.product_id)
            .await
            .map_err(PricingError::lookup)?
            .ok_or_else(|| PricingError::ProductNotFound {
                product_id: item.product_id.clone(),
            })?;

        lines.push(LineItem {
            product_id: item.product_id.clone(),
            unit_price,
            quantity: item.quantity,
            variant_key: item.variant_key.clone(),
        });
    }

    CartSnapshot::new(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
