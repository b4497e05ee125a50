//! # Collaborator Traits
//!
//! The engine never talks to a database directly. It reads coupons and
//! prices through these traits; `storefront-db` implements them over SQLite
//! and the in-memory versions here back tests and small embeddings.
//!
//! ## Redemption Contract
//! ```text
//! Request A ─┐                        ┌─► rows affected 1 → true
//!            ├─► try_increment_usage ─┤
//! Request B ─┘   (atomic check+inc)   └─► rows affected 0 → false
//! ```
//! `try_increment_usage` succeeds only if the coupon is active and has a
//! remaining use, and the check and the increment happen as one step. With
//! `usage_limit = n`, at most `n` calls ever return `true`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard};

use crate::coupon::{Coupon, CouponCode};
use crate::error::BoxError;
use crate::money::Money;

// =============================================================================
// Traits
// =============================================================================

/// Read and redeem coupons.
#[allow(async_fn_in_trait)]
pub trait CouponRepository {
    type Error: Into<BoxError>;

    /// Looks up a coupon by its normalized code.
    ///
    /// Returns inactive coupons too, so callers can tell "disabled" from
    /// "unknown".
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, Self::Error>;

    /// Atomically consumes one use of the coupon.
    ///
    /// Returns `false` (and changes nothing) if the coupon is missing,
    /// inactive or has no remaining use.
    async fn try_increment_usage(&self, coupon_id: &str) -> Result<bool, Self::Error>;
}

/// Authoritative unit prices.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    type Error: Into<BoxError>;

    /// Current unit price of a product, or `None` if it does not exist or
    /// cannot be sold.
    async fn get_unit_price(&self, product_id: &str) -> Result<Option<Money>, Self::Error>;
}

// =============================================================================
// In-Memory Coupons
// =============================================================================

/// Coupons held in a mutex-guarded map, keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryCoupons {
    coupons: Mutex<HashMap<String, Coupon>>,
}

impl InMemoryCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Coupon>> {
        // A panic mid-update cannot leave a coupon half-written; the map is
        // still consistent.
        self.coupons.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts or replaces a coupon.
    pub fn insert(&self, coupon: Coupon) {
        self.lock().insert(coupon.id.clone(), coupon);
    }

    /// Snapshot of a coupon by id.
    pub fn get(&self, coupon_id: &str) -> Option<Coupon> {
        self.lock().get(coupon_id).cloned()
    }

    /// Synchronous form of [`CouponRepository::try_increment_usage`].
    pub fn increment_if_available(&self, coupon_id: &str) -> bool {
        let mut coupons = self.lock();
        let Some(coupon) = coupons.get_mut(coupon_id) else {
            return false;
        };

        if !coupon.is_active || coupon.is_exhausted() {
            return false;
        }

        coupon.usage_count += 1;
        true
    }
}

impl CouponRepository for InMemoryCoupons {
    type Error = Infallible;

    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, Infallible> {
        Ok(self.lock().values().find(|c| &c.code == code).cloned())
    }

    async fn try_increment_usage(&self, coupon_id: &str) -> Result<bool, Infallible> {
        Ok(self.increment_if_available(coupon_id))
    }
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// Fixed price list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    prices: HashMap<String, Money>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style price registration.
    pub fn with_price(mut self, product_id: impl Into<String>, price: Money) -> Self {
        self.prices.insert(product_id.into(), price);
        self
    }

    pub fn set_price(&mut self, product_id: impl Into<String>, price: Money) {
        self.prices.insert(product_id.into(), price);
    }

    /// Removes a product, as if it were deleted or deactivated.
    pub fn remove(&mut self, product_id: &str) -> Option<Money> {
        self.prices.remove(product_id)
    }
}

impl Catalog for InMemoryCatalog {
    type Error = Infallible;

    async fn get_unit_price(&self, product_id: &str) -> Result<Option<Money>, Infallible> {
        Ok(self.prices.get(product_id).copied())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
