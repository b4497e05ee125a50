//! # Pricing Engine
//!
//! Turns a cart snapshot and an optional coupon into subtotal, discount and
//! total.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CartSnapshot ──► compute_subtotal ──► subtotal                         │
//! │                                            │                            │
//! │  coupon code? ──► resolve_coupon           │                            │
//! │                   ├── repository lookup    │                            │
//! │                   └── check_coupon ────────┤                            │
//! │                       exhausted / inactive │                            │
//! │                       / expired            ▼                            │
//! │                                      apply_coupon ──► discount          │
//! │                                      (minimum purchase, caps)           │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                               total = subtotal - discount               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! Nothing here changes coupon state. Consuming a redemption is a separate,
//! explicit step ([`CouponRepository::try_increment_usage`]) that the caller
//! performs together with creating the order, and only once per order.
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use storefront_core::cart::{CartSnapshot, LineItem};
//! use storefront_core::money::Money;
//! use storefront_core::pricing::price_with_coupon;
//!
//! let cart = CartSnapshot::new(vec![
//!     LineItem::new("tee", Money::from_cents(2500), 2),
//!     LineItem::new("cap", Money::from_cents(1500), 1),
//! ])
//! .unwrap();
//!
//! let result = price_with_coupon(&cart, None, Utc::now()).unwrap();
//! assert_eq!(result.subtotal.to_decimal_string(), "65.00");
//! assert_eq!(result.total, result.subtotal);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CartSnapshot, LineItem};
use crate::coupon::{Coupon, CouponCode, DiscountRule};
use crate::error::{CouponError, EngineResult, PricingError};
use crate::money::Money;
use crate::repository::CouponRepository;

// =============================================================================
// Pricing Result
// =============================================================================

/// The coupon that was applied to a priced cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub coupon_id: String,
    pub code: CouponCode,
    pub discount_amount: Money,
}

/// Output of pricing a cart.
///
/// ## Invariants
/// - `0 <= discount_amount <= subtotal`
/// - `total == subtotal - discount_amount`, so `total >= 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
}

impl PricingResult {
    /// A result with no discount.
    pub fn undiscounted(subtotal: Money) -> Self {
        PricingResult {
            subtotal,
            discount_amount: Money::zero(),
            total: subtotal,
            coupon: None,
        }
    }

    /// Whether a coupon was applied (the caller owes one redemption).
    #[inline]
    pub fn has_coupon(&self) -> bool {
        self.coupon.is_some()
    }
}

// =============================================================================
// Subtotal
// =============================================================================

/// Sum of `unit_price * quantity` over every line of the cart.
pub fn compute_subtotal(cart: &CartSnapshot) -> EngineResult<Money> {
    compute_subtotal_of(cart.items())
}

/// Sum of `unit_price * quantity` over raw lines.
///
/// ## Errors
/// - `EmptyCart` for zero lines
/// - `Overflow` if the sum leaves the i64 cent range
pub fn compute_subtotal_of(items: &[LineItem]) -> EngineResult<Money> {
    if items.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    items.iter().try_fold(Money::zero(), |acc, item| {
        item.line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or(PricingError::Overflow)
    })
}

// =============================================================================
// Coupon Rules
// =============================================================================

/// Decides whether `coupon` may be used at `now`.
///
/// ## Order of Checks
/// ```text
/// usage_count < limit?  no ──► Exhausted   (wins over everything else)
///      │
/// is_active?            no ──► Inactive
///      │
/// valid_from <= now
///   <= valid_until?     no ──► Expired     (also "not yet valid")
///      │
///      ▼
///     Ok
/// ```
pub fn check_coupon(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CouponError> {
    if let Some(usage_limit) = coupon.usage_limit {
        if coupon.usage_count >= usage_limit {
            return Err(CouponError::Exhausted {
                code: coupon.code.to_string(),
                usage_limit,
            });
        }
    }

    if !coupon.is_active {
        return Err(CouponError::Inactive {
            code: coupon.code.to_string(),
        });
    }

    if !coupon.is_within_window(now) {
        return Err(CouponError::Expired {
            code: coupon.code.to_string(),
            valid_from: coupon.valid_from,
            valid_until: coupon.valid_until,
        });
    }

    Ok(())
}

/// Computes the discount `coupon` grants on `subtotal`.
///
/// ## Rules
/// - `subtotal < minimum_purchase` → `MinimumPurchaseNotMet`
/// - percentage: `subtotal * rate / 100` rounded half-up to the cent, then
///   capped by `max_discount` when set
/// - fixed: `min(amount, subtotal)`
///
/// The result always lies in `[0, subtotal]`.
///
/// Does not check activity, window or usage; see [`check_coupon`].
pub fn apply_coupon(subtotal: Money, coupon: &Coupon) -> Result<Money, CouponError> {
    if subtotal < coupon.minimum_purchase {
        return Err(CouponError::MinimumPurchaseNotMet {
            required: coupon.minimum_purchase,
            actual: subtotal,
        });
    }

    let discount = match coupon.rule {
        DiscountRule::Percentage { rate, max_discount } => {
            let raw = subtotal.percentage(rate);
            match max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountRule::Fixed { amount } => amount.min(subtotal),
    };

    Ok(discount.max(Money::zero()).min(subtotal))
}

// =============================================================================
// Orchestration
// =============================================================================

/// Prices a cart with an already-loaded coupon (or none).
///
/// Runs [`check_coupon`] before [`apply_coupon`], so callers holding a
/// stale coupon still get activity, window and usage enforced.
pub fn price_with_coupon(
    cart: &CartSnapshot,
    coupon: Option<&Coupon>,
    now: DateTime<Utc>,
) -> EngineResult<PricingResult> {
    let subtotal = compute_subtotal(cart)?;

    let Some(coupon) = coupon else {
        return Ok(PricingResult::undiscounted(subtotal));
    };

    check_coupon(coupon, now)?;
    let discount_amount = apply_coupon(subtotal, coupon)?;

    Ok(PricingResult {
        subtotal,
        discount_amount,
        total: subtotal - discount_amount,
        coupon: Some(AppliedCoupon {
            coupon_id: coupon.id.clone(),
            code: coupon.code.clone(),
            discount_amount,
        }),
    })
}

/// Looks up a coupon by code and checks it can be used at `now`.
///
/// The code is normalized (trimmed, uppercased) before lookup. A code that
/// cannot be a valid coupon code at all is reported as `NotFound`.
pub async fn resolve_coupon<R>(
    code: &str,
    repository: &R,
    now: DateTime<Utc>,
) -> EngineResult<Coupon>
where
    R: CouponRepository,
{
    let code = CouponCode::parse(code).map_err(|_| CouponError::NotFound {
        code: code.trim().to_uppercase(),
    })?;
    resolve_coupon_code(&code, repository, now).await
}

/// [`resolve_coupon`] for an already-normalized code.
pub async fn resolve_coupon_code<R>(
    code: &CouponCode,
    repository: &R,
    now: DateTime<Utc>,
) -> EngineResult<Coupon>
where
    R: CouponRepository,
{
    let coupon = repository
        .find_by_code(code)
        .await
        .map_err(PricingError::lookup)?
        .ok_or_else(|| CouponError::NotFound {
            code: code.to_string(),
        })?;

    check_coupon(&coupon, now)?;
    Ok(coupon)
}

/// Prices a cart, resolving `coupon_code` through `repository` when given.
///
/// Never consumes a redemption: pricing the same cart with the same coupon
/// twice gives the same result.
pub async fn price_cart<R>(
    cart: &CartSnapshot,
    coupon_code: Option<&CouponCode>,
    repository: &R,
    now: DateTime<Utc>,
) -> EngineResult<PricingResult>
where
    R: CouponRepository,
{
    // Empty/overflowing carts fail before any lookup.
    compute_subtotal(cart)?;

    let coupon = match coupon_code {
        Some(code) => Some(resolve_coupon_code(code, repository, now).await?),
        None => None,
    };

    price_with_coupon(cart, coupon.as_ref(), now)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCoupons;
    use crate::types::Percentage;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn cart_of(subtotal_cents: i64) -> CartSnapshot {
        CartSnapshot::new(vec![LineItem::new("p1", cents(subtotal_cents), 1)]).unwrap()
    }

    fn coupon(code: &str, rule: DiscountRule) -> Coupon {
        Coupon {
            id: format!("id-{}", code.to_lowercase()),
            code: CouponCode::parse(code).unwrap(),
            rule,
            minimum_purchase: Money::zero(),
            valid_from: now() - Duration::days(30),
            valid_until: now() + Duration::days(30),
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            created_at: now() - Duration::days(30),
            updated_at: now() - Duration::days(30),
        }
    }

    fn percent(pct: u32, cap: Option<i64>) -> DiscountRule {
        DiscountRule::Percentage {
            rate: Percentage::from_percent(pct),
            max_discount: cap.map(cents),
        }
    }

    fn fixed(amount: i64) -> DiscountRule {
        DiscountRule::Fixed {
            amount: cents(amount),
        }
    }

    // -------------------------------------------------------------------------
    // Subtotal
    // -------------------------------------------------------------------------

    #[test]
    fn test_subtotal_is_exact_sum() {
        let cart = CartSnapshot::new(vec![
            LineItem::new("a", cents(1999), 3),
            LineItem::new("b", cents(10), 7),
            LineItem::new("c", cents(0), 4),
            LineItem::new("d", cents(33), 1),
        ])
        .unwrap();

        assert_eq!(compute_subtotal(&cart).unwrap(), cents(1999 * 3 + 70 + 33));
    }

    #[test]
    fn test_subtotal_of_empty_slice() {
        assert!(matches!(compute_subtotal_of(&[]), Err(PricingError::EmptyCart)));
    }

    #[test]
    fn test_subtotal_overflow_is_reported() {
        let cart = CartSnapshot::new(vec![
            LineItem::new("a", cents(i64::MAX / 2), 1),
            LineItem::new("b", cents(i64::MAX / 2), 1),
            LineItem::new("c", cents(i64::MAX / 2), 1),
        ])
        .unwrap();
        assert!(matches!(compute_subtotal(&cart), Err(PricingError::Overflow)));
    }

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    #[test]
    fn test_percentage_without_cap() {
        let ten = coupon("TEN", percent(10, None));
        let result = price_with_coupon(&cart_of(10000), Some(&ten), now()).unwrap();
        assert_eq!(result.discount_amount, cents(1000));
        assert_eq!(result.total, cents(9000));
        assert_eq!(result.total.to_decimal_string(), "90.00");
    }

    #[test]
    fn test_percentage_with_cap() {
        let result = price_with_coupon(
            &cart_of(10000),
            Some(&coupon("HALF", percent(50, Some(2000)))),
            now(),
        )
        .unwrap();
        assert_eq!(result.discount_amount, cents(2000));
        assert_eq!(result.total, cents(8000));
    }

    #[test]
    fn test_fixed_capped_at_subtotal() {
        let result = price_with_coupon(&cart_of(2000), Some(&coupon("THIRTY", fixed(3000))), now())
            .unwrap();
        assert_eq!(result.discount_amount, cents(2000));
        assert_eq!(result.total, Money::zero());
    }

    #[test]
    fn test_fixed_below_subtotal() {
        let discount = apply_coupon(cents(5000), &coupon("FIVE", fixed(500))).unwrap();
        assert_eq!(discount, cents(500));
    }

    #[test]
    fn test_minimum_purchase_not_met() {
        let mut c = coupon("MIN50", percent(10, None));
        c.minimum_purchase = cents(5000);

        let err = price_with_coupon(&cart_of(4000), Some(&c), now()).unwrap_err();
        assert_eq!(
            err.as_coupon(),
            Some(&CouponError::MinimumPurchaseNotMet {
                required: cents(5000),
                actual: cents(4000),
            })
        );

        // Exactly the minimum is enough.
        assert!(price_with_coupon(&cart_of(5000), Some(&c), now()).is_ok());
    }

    #[test]
    fn test_zero_percent_and_full_percent() {
        let zero = coupon("ZERO", percent(0, None));
        let free = coupon("FREE", percent(100, None));
        assert_eq!(apply_coupon(cents(1234), &zero).unwrap(), Money::zero());
        assert_eq!(apply_coupon(cents(1234), &free).unwrap(), cents(1234));
    }

    #[test]
    fn test_discount_rounds_once_half_up() {
        // 15% of 3.33 = 0.4995 → 0.50
        let discount = apply_coupon(cents(333), &coupon("ODD", percent(15, None))).unwrap();
        assert_eq!(discount, cents(50));
    }

    #[test]
    fn test_applied_coupon_is_reported() {
        let c = coupon("TEN", percent(10, None));
        let result = price_with_coupon(&cart_of(10000), Some(&c), now()).unwrap();
        let applied = result.coupon.unwrap();
        assert_eq!(applied.coupon_id, c.id);
        assert_eq!(applied.code.as_str(), "TEN");
        assert_eq!(applied.discount_amount, cents(1000));
    }

    // -------------------------------------------------------------------------
    // Validity
    // -------------------------------------------------------------------------

    #[test]
    fn test_exhausted_wins_over_everything_else() {
        let mut c = coupon("GONE", percent(10, None));
        c.usage_limit = Some(5);
        c.usage_count = 5;
        c.valid_until = now() - Duration::days(1);
        c.valid_from = now() - Duration::days(2);

        assert!(matches!(
            check_coupon(&c, now()),
            Err(CouponError::Exhausted { usage_limit: 5, .. })
        ));
    }

    #[test]
    fn test_exhausted_wins_over_inactive() {
        let mut c = coupon("GONE", percent(10, None));
        c.is_active = false;
        c.usage_limit = Some(3);
        c.usage_count = 3;

        assert_eq!(
            check_coupon(&c, now()),
            Err(CouponError::Exhausted {
                code: "GONE".to_string(),
                usage_limit: 3,
            })
        );
    }

    #[test]
    fn test_expired_and_not_yet_valid_share_a_kind() {
        let mut past = coupon("PAST", percent(10, None));
        past.valid_from = now() - Duration::days(10);
        past.valid_until = now() - Duration::seconds(1);
        assert!(matches!(check_coupon(&past, now()), Err(CouponError::Expired { .. })));

        let mut future = coupon("FUTURE", percent(10, None));
        future.valid_from = now() + Duration::seconds(1);
        future.valid_until = now() + Duration::days(10);
        assert!(matches!(check_coupon(&future, now()), Err(CouponError::Expired { .. })));
    }

    #[test]
    fn test_inactive_coupon() {
        let mut c = coupon("OFF", percent(10, None));
        c.is_active = false;
        assert_eq!(
            check_coupon(&c, now()),
            Err(CouponError::Inactive {
                code: "OFF".to_string()
            })
        );
    }

    // -------------------------------------------------------------------------
    // Repository-driven pricing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_price_cart_with_repository() {
        let repo = InMemoryCoupons::new();
        repo.insert(coupon("SAVE10", percent(10, None)));

        let code = CouponCode::parse("save10").unwrap();
        let result = price_cart(&cart_of(10000), Some(&code), &repo, now()).await.unwrap();
        assert_eq!(result.total, cents(9000));
    }

    #[tokio::test]
    async fn test_resolve_unknown_and_malformed_codes() {
        let repo = InMemoryCoupons::new();

        let err = resolve_coupon("nope", &repo, now()).await.unwrap_err();
        assert_eq!(
            err.as_coupon(),
            Some(&CouponError::NotFound {
                code: "NOPE".to_string()
            })
        );

        let err = resolve_coupon("10% off", &repo, now()).await.unwrap_err();
        assert!(matches!(err.as_coupon(), Some(CouponError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolve_is_case_insensitive() {
        let repo = InMemoryCoupons::new();
        repo.insert(coupon("WELCOME", fixed(500)));

        let found = resolve_coupon("  welcome ", &repo, now()).await.unwrap();
        assert_eq!(found.code.as_str(), "WELCOME");
    }

    #[tokio::test]
    async fn test_price_cart_is_idempotent() {
        let repo = InMemoryCoupons::new();
        let mut c = coupon("ONCE", percent(20, Some(1500)));
        c.usage_limit = Some(1);
        repo.insert(c);

        let cart = CartSnapshot::new(vec![
            LineItem::new("a", cents(4999), 2),
            LineItem::new("b", cents(1250), 1).with_variant("L"),
        ])
        .unwrap();
        let code = CouponCode::parse("ONCE").unwrap();

        let first = price_cart(&cart, Some(&code), &repo, now()).await.unwrap();
        let second = price_cart(&cart, Some(&code), &repo, now()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.discount_amount, cents(1500));

        // Pricing never consumed the single redemption.
        assert_eq!(repo.get("id-once").map(|c| c.usage_count), Some(0));
    }

    #[tokio::test]
    async fn test_price_cart_without_coupon() {
        let repo = InMemoryCoupons::new();
        let result = price_cart(&cart_of(1234), None, &repo, now()).await.unwrap();
        assert_eq!(result, PricingResult::undiscounted(cents(1234)));
        assert!(!result.has_coupon());
    }

    #[test]
    fn test_pricing_result_wire_shape() {
        let ten = coupon("TEN", percent(10, None));
        let result = price_with_coupon(&cart_of(10000), Some(&ten), now()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["subtotal"], 10000);
        assert_eq!(json["discountAmount"], 1000);
        assert_eq!(json["total"], 9000);
        assert_eq!(json["coupon"]["code"], "TEN");
    }
}
