//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── PricingError     - Anything that stops a cart from being priced   │
//! │  │   └── CouponError  - Why a specific coupon cannot be used           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - PricingError | DbError                         │
//! │                                                                         │
//! │  Every variant is recoverable and user-facing. The caller picks the    │
//! │  HTTP status or UI message; the engine only reports the kind + data.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;

/// Boxed error from a collaborator (repository, catalog).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Coupon Error
// =============================================================================

/// Reasons a coupon cannot be applied.
///
/// Each variant is its own kind. A storefront that only wants to show
/// "Invalid or expired coupon code" can map all of them to that message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// No coupon exists with this (normalized) code.
    #[error("Coupon not found: {code}")]
    NotFound { code: String },

    /// The coupon exists but was switched off by an administrator.
    #[error("Coupon {code} is not active")]
    Inactive { code: String },

    /// The current time is outside `[valid_from, valid_until]`.
    ///
    /// Covers both "not yet valid" and "expired".
    #[error("Coupon {code} is only valid from {valid_from} until {valid_until}")]
    Expired {
        code: String,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    },

    /// Every redemption allowed by `usage_limit` has been used.
    #[error("Coupon {code} has reached its usage limit of {usage_limit}")]
    Exhausted { code: String, usage_limit: i64 },

    /// The cart subtotal is below the coupon's minimum purchase.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart subtotal: 40.00, coupon SAVE10 requires 50.00
    ///      │
    ///      ▼
    /// MinimumPurchaseNotMet { required: 50.00, actual: 40.00 }
    ///      │
    ///      ▼
    /// UI shows: "Add 10.00 more to use SAVE10"
    /// ```
    #[error("Minimum purchase of {required} required, cart subtotal is {actual}")]
    MinimumPurchaseNotMet { required: Money, actual: Money },
}

impl CouponError {
    /// Stable machine-readable kind, for API payloads and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            CouponError::NotFound { .. } => "coupon_not_found",
            CouponError::Inactive { .. } => "coupon_inactive",
            CouponError::Expired { .. } => "coupon_expired",
            CouponError::Exhausted { .. } => "coupon_exhausted",
            CouponError::MinimumPurchaseNotMet { .. } => "minimum_purchase_not_met",
        }
    }
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Errors that stop a cart from being priced.
#[derive(Debug, Error)]
pub enum PricingError {
    /// The cart has no line items. An empty cart is an error, not a zero total.
    #[error("Cart is empty")]
    EmptyCart,

    /// The requested coupon cannot be applied.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// A requested product does not exist or is no longer sold.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An amount left the representable range.
    #[error("Amount overflow while pricing cart")]
    Overflow,

    /// A collaborator (coupon repository, catalog) failed.
    #[error("Lookup failed: {0}")]
    Lookup(#[source] BoxError),
}

impl PricingError {
    /// Wraps a collaborator error.
    pub fn lookup(err: impl Into<BoxError>) -> Self {
        PricingError::Lookup(err.into())
    }

    /// Returns the coupon error, if this is one.
    pub fn as_coupon(&self) -> Option<&CouponError> {
        match self {
            PricingError::Coupon(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed amount, bad coupon code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A validity window whose end is not after its start.
    #[error("validUntil ({valid_until}) must be after validFrom ({valid_from})")]
    InvalidWindow {
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with PricingError.
pub type EngineResult<T> = Result<T, PricingError>;

// =============================================================================
// Unit Tests
// =============================================================================
