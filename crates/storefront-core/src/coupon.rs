//! # Coupons
//!
//! Coupon definitions and the administrator-facing create/update inputs.
//!
//! ## Coupon Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  NewCoupon (admin) ──validate()──► Coupon { usage_count: 0 }            │
//! │                                         │                               │
//! │        CouponUpdate (admin) ──apply()──►│  code / rule / window edits   │
//! │                                         │                               │
//! │        order placed with coupon ───────►│  usage_count += 1 (atomic,    │
//! │                                         │  same transaction as order)   │
//! │                                         │                               │
//! │        usage_count is never decremented, even if the order is           │
//! │        cancelled later.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rules that decide whether a coupon may be used *now* live in
//! [`crate::pricing`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percentage;
use crate::validation::{
    validate_coupon_code, validate_non_negative, validate_usage_limit, validate_validity_window,
    ValidationResult,
};

// =============================================================================
// Coupon Code
// =============================================================================

/// A normalized coupon code: trimmed and uppercase.
///
/// Codes are matched case-insensitively by normalizing before every lookup
/// and before storage.
///
/// ```rust
/// use storefront_core::coupon::CouponCode;
///
/// let code = CouponCode::parse("  save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// assert!(CouponCode::parse("no spaces").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalizes and validates a raw code.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let normalized = raw.trim().to_uppercase();
        validate_coupon_code(&normalized)?;
        Ok(CouponCode(normalized))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CouponCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Discount Rule
// =============================================================================

/// The discount type, as stored and as sent to the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// How a coupon turns a subtotal into a discount.
///
/// A cap (`max_discount`) only exists for percentage rules; a fixed amount is
/// always capped at the subtotal instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "discountType", rename_all = "lowercase")]
pub enum DiscountRule {
    /// `rate` of the subtotal, optionally capped.
    Percentage {
        #[serde(rename = "discountValue")]
        rate: Percentage,
        #[serde(rename = "maxDiscount", default)]
        max_discount: Option<Money>,
    },
    /// A flat amount off.
    Fixed {
        #[serde(rename = "discountValue")]
        amount: Money,
    },
}

impl DiscountRule {
    /// The rule's discount type.
    pub fn discount_type(&self) -> DiscountType {
        match self {
            DiscountRule::Percentage { .. } => DiscountType::Percentage,
            DiscountRule::Fixed { .. } => DiscountType::Fixed,
        }
    }

    /// Checks the rule's own invariants.
    ///
    /// ## Rules
    /// - percentage within [0, 100]
    /// - `max_discount`, when set, non-negative
    /// - fixed amount non-negative
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            DiscountRule::Percentage { rate, max_discount } => {
                if !rate.is_within_full() {
                    return Err(ValidationError::OutOfRange {
                        field: "discountValue".to_string(),
                        min: 0,
                        max: 100,
                    });
                }
                if let Some(cap) = max_discount {
                    validate_non_negative("maxDiscount", *cap)?;
                }
                Ok(())
            }
            DiscountRule::Fixed { amount } => validate_non_negative("discountValue", *amount),
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A named discount rule with an activity window, usage cap and formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: CouponCode,
    #[serde(flatten)]
    pub rule: DiscountRule,
    /// Subtotal required before the coupon applies. Zero means none.
    pub minimum_purchase: Money,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// Maximum number of redemptions, if limited.
    pub usage_limit: Option<i64>,
    /// Redemptions so far. Only ever incremented.
    pub usage_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Checks whether every allowed redemption has been used.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.usage_count >= limit)
    }

    /// Checks whether `now` lies in `[valid_from, valid_until]`.
    #[inline]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    /// Redemptions left, `None` when unlimited.
    pub fn remaining_uses(&self) -> Option<i64> {
        self.usage_limit
            .map(|limit| (limit - self.usage_count).max(0))
    }
}

// =============================================================================
// Admin Inputs
// =============================================================================

/// Administrator input for creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    pub code: String,
    #[serde(flatten)]
    pub rule: DiscountRule,
    #[serde(default)]
    pub minimum_purchase: Money,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewCoupon {
    /// Validates the input, returning the normalized code.
    ///
    /// ## Rules
    /// - code: 1-32 chars of letters, digits, `-`, `_` (after normalizing)
    /// - rule: see [`DiscountRule::validate`]
    /// - minimum purchase non-negative
    /// - usage limit, when set, positive
    /// - `valid_until` strictly after `valid_from`
    pub fn validate(&self) -> ValidationResult<CouponCode> {
        let code = CouponCode::parse(&self.code)?;
        self.rule.validate()?;
        validate_non_negative("minimumPurchase", self.minimum_purchase)?;
        if let Some(limit) = self.usage_limit {
            validate_usage_limit(limit)?;
        }
        validate_validity_window(self.valid_from, self.valid_until)?;
        Ok(code)
    }

    /// Builds the coupon to store, after validation.
    pub fn into_coupon(self, id: String, now: DateTime<Utc>) -> ValidationResult<Coupon> {
        let code = self.validate()?;
        Ok(Coupon {
            id,
            code,
            rule: self.rule,
            minimum_purchase: self.minimum_purchase,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            usage_limit: self.usage_limit,
            usage_count: 0,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Administrator edits to an existing coupon. `None` leaves a field as is.
///
/// `usage_count` cannot be edited here; it only moves through redemption.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponUpdate {
    pub code: Option<String>,
    pub rule: Option<DiscountRule>,
    pub minimum_purchase: Option<Money>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// `Some(None)` removes the limit.
    pub usage_limit: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

impl CouponUpdate {
    /// Applies the edits to `coupon` and re-validates the merged result.
    ///
    /// The window check runs on the merged values, so moving only
    /// `valid_until` before the stored `valid_from` is rejected.
    pub fn apply(&self, coupon: &Coupon, now: DateTime<Utc>) -> ValidationResult<Coupon> {
        let mut updated = coupon.clone();

        if let Some(code) = &self.code {
            updated.code = CouponCode::parse(code)?;
        }
        if let Some(rule) = self.rule {
            rule.validate()?;
            updated.rule = rule;
        }
        if let Some(minimum) = self.minimum_purchase {
            validate_non_negative("minimumPurchase", minimum)?;
            updated.minimum_purchase = minimum;
        }
        if let Some(valid_from) = self.valid_from {
            updated.valid_from = valid_from;
        }
        if let Some(valid_until) = self.valid_until {
            updated.valid_until = valid_until;
        }
        if let Some(limit) = self.usage_limit {
            if let Some(limit) = limit {
                validate_usage_limit(limit)?;
            }
            updated.usage_limit = limit;
        }
        if let Some(active) = self.is_active {
            updated.is_active = active;
        }

        validate_validity_window(updated.valid_from, updated.valid_until)?;
        updated.updated_at = now;
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
