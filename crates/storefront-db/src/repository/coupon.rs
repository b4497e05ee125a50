//! # Coupon Repository
//!
//! Coupon storage and the atomic redemption counter.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  One statement, no read-then-write                      │
//! │                                                                         │
//! │  UPDATE coupons                                                         │
//! │     SET usage_count = usage_count + 1                                   │
//! │   WHERE id = ?                                                          │
//! │     AND is_active = 1                                                   │
//! │     AND (usage_limit IS NULL OR usage_count < usage_limit)              │
//! │                                                                         │
//! │  rows_affected = 1  → redemption recorded                               │
//! │  rows_affected = 0  → missing, disabled or used up; nothing changed     │
//! │                                                                         │
//! │  SQLite serializes writers, so two requests racing for the last use     │
//! │  cannot both match the WHERE clause.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use std::convert::TryFrom;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use storefront_core::repository::CouponRepository as CouponStore;
use storefront_core::{
    Coupon, CouponCode, CouponUpdate, DiscountRule, DiscountType, Money, NewCoupon, Percentage,
};

const COUPON_COLUMNS: &str = "id, code, discount_type, discount_value, max_discount_cents, \
     minimum_purchase_cents, valid_from, valid_until, usage_limit, usage_count, is_active, \
     created_at, updated_at";

// =============================================================================
// Row Mapping
// =============================================================================

/// A coupon as stored. The rule is split over three columns.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    discount_type: DiscountType,
    discount_value: i64,
    max_discount_cents: Option<i64>,
    minimum_purchase_cents: i64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    usage_limit: Option<i64>,
    usage_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code =
            CouponCode::parse(&row.code).map_err(|e| DbError::corrupt("coupon", &row.id, e))?;

        let rule = match row.discount_type {
            DiscountType::Percentage => DiscountRule::Percentage {
                rate: u32::try_from(row.discount_value)
                    .map(Percentage::from_bps)
                    .map_err(|e| DbError::corrupt("coupon", &row.id, e))?,
                max_discount: row.max_discount_cents.map(Money::from_cents),
            },
            DiscountType::Fixed => DiscountRule::Fixed {
                amount: Money::from_cents(row.discount_value),
            },
        };

        Ok(Coupon {
            id: row.id,
            code,
            rule,
            minimum_purchase: Money::from_cents(row.minimum_purchase_cents),
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Splits a rule into (discount_type, discount_value, max_discount_cents).
fn rule_columns(rule: &DiscountRule) -> (DiscountType, i64, Option<i64>) {
    match *rule {
        DiscountRule::Percentage { rate, max_discount } => (
            DiscountType::Percentage,
            i64::from(rate.bps()),
            max_discount.map(|m| m.cents()),
        ),
        DiscountRule::Fixed { amount } => (DiscountType::Fixed, amount.cents(), None),
    }
}

/// Fills in the offending code on a duplicate-code error.
fn duplicate_code(err: sqlx::Error, code: &CouponCode) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("code", code.as_str()),
        other => other,
    }
}

/// Conditional increment on any executor (pool or open transaction).
pub(crate) async fn increment_usage<'e, E>(
    executor: E,
    coupon_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET usage_count = usage_count + 1,
            updated_at = ?2
        WHERE id = ?1
          AND is_active = 1
          AND (usage_limit IS NULL OR usage_count < usage_limit)
        "#,
    )
    .bind(coupon_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for coupon database operations.
///
/// ## Usage
/// ```rust,ignore
/// let coupons = db.coupons();
///
/// let coupon = coupons.create(new_coupon, Utc::now()).await?;
/// let found = coupons.find_by_code(&CouponCode::parse("save10")?).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Validates and stores a new coupon.
    ///
    /// ## Returns
    /// * `Err(DbError::Invalid)` - input failed validation
    /// * `Err(DbError::UniqueViolation)` - the normalized code is taken
    pub async fn create(&self, new: NewCoupon, now: DateTime<Utc>) -> DbResult<Coupon> {
        let coupon = new.into_coupon(generate_id(), now)?;
        self.insert(&coupon).await?;
        info!(id = %coupon.id, code = %coupon.code, "Coupon created");
        Ok(coupon)
    }

    /// Inserts an already-built coupon.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(code = %coupon.code, "Inserting coupon");

        let (discount_type, discount_value, max_discount_cents) = rule_columns(&coupon.rule);

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, discount_value, max_discount_cents,
                minimum_purchase_cents, valid_from, valid_until,
                usage_limit, usage_count, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&coupon.id)
        .bind(coupon.code.as_str())
        .bind(discount_type)
        .bind(discount_value)
        .bind(max_discount_cents)
        .bind(coupon.minimum_purchase.cents())
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, &coupon.code))?;

        Ok(())
    }

    /// Gets a coupon by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Looks up a coupon by normalized code, active or not.
    pub async fn find_by_code(&self, code: &CouponCode) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Looking up coupon");

        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Lists every coupon, newest first.
    pub async fn list(&self) -> DbResult<Vec<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC, code");
        let rows = sqlx::query_as::<_, CouponRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Applies administrator edits.
    ///
    /// `usage_count` is never written here, so a redemption that lands while
    /// the edit is in flight is kept.
    pub async fn update(
        &self,
        id: &str,
        edits: &CouponUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Coupon> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", id))?;
        let updated = edits.apply(&current, now)?;

        debug!(id = %id, "Updating coupon");

        let (discount_type, discount_value, max_discount_cents) = rule_columns(&updated.rule);

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                code = ?2,
                discount_type = ?3,
                discount_value = ?4,
                max_discount_cents = ?5,
                minimum_purchase_cents = ?6,
                valid_from = ?7,
                valid_until = ?8,
                usage_limit = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(updated.code.as_str())
        .bind(discount_type)
        .bind(discount_value)
        .bind(max_discount_cents)
        .bind(updated.minimum_purchase.cents())
        .bind(updated.valid_from)
        .bind(updated.valid_until)
        .bind(updated.usage_limit)
        .bind(updated.is_active)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, &updated.code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", id))
    }

    /// Deletes a coupon. Orders keep their copy of the code.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting coupon");

        let result = sqlx::query("DELETE FROM coupons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        Ok(())
    }

    /// Atomically consumes one use of the coupon.
    ///
    /// Returns `false` if the coupon is missing, inactive or used up.
    pub async fn try_increment_usage(&self, coupon_id: &str) -> DbResult<bool> {
        let redeemed = increment_usage(&self.pool, coupon_id, Utc::now()).await?;
        debug!(coupon_id = %coupon_id, redeemed, "Coupon usage increment");
        Ok(redeemed)
    }
}

impl CouponStore for CouponRepository {
    type Error = DbError;

    async fn find_by_code(&self, code: &CouponCode) -> DbResult<Option<Coupon>> {
        CouponRepository::find_by_code(self, code).await
    }

    async fn try_increment_usage(&self, coupon_id: &str) -> DbResult<bool> {
        CouponRepository::try_increment_usage(self, coupon_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
