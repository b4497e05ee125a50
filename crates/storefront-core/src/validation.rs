//! # Validation Module
//!
//! Input validation utilities for the storefront.
//!
//! Checkout input is checked here before any catalog or coupon lookup;
//! admin input (new products, coupon edits) is checked before any write.
//! The schema repeats the hard limits as CHECK constraints, so a bypassed
//! validator still cannot store a negative price or an empty code.
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert!(validate_coupon_code("SAVE10").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

const IDENTIFIER_CHARS: &str = "must contain only letters, numbers, hyphens, and underscores";

/// Rejects blank values and values longer than `max` bytes, after trimming.
fn non_blank<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

fn identifier(field: &str, value: &str, allowed: impl Fn(char) -> bool) -> ValidationResult<()> {
    if value.chars().all(|c| allowed(c) || c == '-' || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: IDENTIFIER_CHARS.to_string(),
        })
    }
}

/// Validates a coupon code: 1-32 ASCII letters, digits, `-` or `_`.
///
/// [`CouponCode::parse`](crate::coupon::CouponCode::parse) trims and
/// uppercases before calling this.
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = non_blank("code", code, MAX_COUPON_CODE_LEN)?;
    identifier("code", code, |c| c.is_ascii_alphanumeric())
}

/// Validates a product reference from a cart: non-blank, at most 64 chars.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    non_blank("productId", id, 64).map(|_| ())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_sku;
///
/// assert!(validate_sku("TEE-BLK-M").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = non_blank("sku", sku, 50)?;
    identifier("sku", sku, char::is_alphanumeric)
}

/// Validates a product name (1-200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    non_blank("name", name, 200).map(|_| ())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: at least 1.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity against a per-line maximum.
///
/// ## User Workflow
/// ```text
/// Checkout: qty 1000 for one product, max 999
///      │
///      ▼
/// validate_quantity_within(1000, 999) ← THIS FUNCTION
///      │
///      └── Error: "quantity must be between 1 and 999"
/// ```
pub fn validate_quantity_within(qty: i64, max: i64) -> ValidationResult<()> {
    validate_quantity(qty)?;

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates a unit price: zero (free item) or more.
///
/// ## Example
/// ```rust
/// use storefront_core::money::Money;
/// use storefront_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates that an amount field is not negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a coupon usage limit: a limit of zero is a disabled coupon,
/// expressed with `is_active` instead.
pub fn validate_usage_limit(limit: i64) -> ValidationResult<()> {
    if limit <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "usageLimit".to_string(),
        });
    }

    Ok(())
}

/// Validates a validity window: `valid_until` strictly after `valid_from`.
pub fn validate_validity_window(
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> ValidationResult<()> {
    if valid_until <= valid_from {
        return Err(ValidationError::InvalidWindow {
            valid_from,
            valid_until,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a checkout.
pub fn validate_cart_size(lines: usize, max: usize) -> ValidationResult<()> {
    if lines > max {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: max as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE10").is_ok());
        assert!(validate_coupon_code("BLACK_FRIDAY-24").is_ok());

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("HAS SPACE").is_err());
        assert!(validate_coupon_code("CAFÉ").is_err());
        assert!(validate_coupon_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_product_id() {
        assert!(validate_product_id("65f1c0ffee").is_ok());
        assert!(validate_product_id("").is_err());
        assert!(validate_product_id(" ").is_err());
        assert!(validate_product_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_sku_and_name() {
        assert!(validate_sku("TEE-1").is_ok());
        assert!(validate_sku(&"A".repeat(100)).is_err());
        assert!(validate_product_name("Linen Shirt").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());

        assert!(validate_quantity_within(999, 999).is_ok());
        assert!(validate_quantity_within(1000, 999).is_err());
        assert!(validate_quantity_within(0, 999).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_non_negative("minimumPurchase", Money::from_cents(-1)).is_err());
        assert!(validate_usage_limit(1).is_ok());
        assert!(validate_usage_limit(0).is_err());
    }

    #[test]
    fn test_validate_window() {
        let start = Utc::now();
        assert!(validate_validity_window(start, start + Duration::days(1)).is_ok());
        assert!(validate_validity_window(start, start).is_err());
        assert!(validate_validity_window(start, start - Duration::days(1)).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(100, 100).is_ok());
        assert!(validate_cart_size(101, 100).is_err());
    }
}
