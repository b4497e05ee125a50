//! # Order Repository
//!
//! Orders, their items, and the redemption that comes with them.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One transaction                                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT orders       (subtotal, discount, total frozen)            │
//! │   ├── INSERT order_items  (unit prices frozen)                          │
//! │   └── coupon attached?                                                  │
//! │        └── conditional usage_count + 1                                  │
//! │             ├── 1 row  → COMMIT   → Created(order)                      │
//! │             └── 0 rows → ROLLBACK → CouponUnavailable                   │
//! │                                                                         │
//! │  A failed order never consumes a redemption, and a consumed             │
//! │  redemption always has its order.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::coupon::increment_usage;
use crate::repository::generate_id;
use storefront_core::{
    LineItem, Order, OrderItem, OrderStatus, PaymentStatus, PricingResult, ValidationError,
};

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, payment_provider, \
     payment_transaction_id, address_id, subtotal_cents, discount_cents, total_cents, \
     coupon_id, coupon_code, created_at, updated_at";

/// Everything needed to write an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub address_id: Option<String>,
    pub payment_provider: Option<String>,
    /// Catalog-priced lines the pricing was computed over.
    pub lines: Vec<LineItem>,
    pub pricing: PricingResult,
}

/// Outcome of [`OrderRepository::create`].
#[derive(Debug, Clone)]
pub enum OrderPlacement {
    /// The order (and its redemption, if any) was committed.
    Created(Order),
    /// The attached coupon had no redemption left at commit time; nothing
    /// was written.
    CouponUnavailable,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes an order, its items and the coupon redemption atomically.
    pub async fn create(&self, new: &NewOrder, now: DateTime<Utc>) -> DbResult<OrderPlacement> {
        let pricing = &new.pricing;
        let order = Order {
            id: generate_id(),
            user_id: new.user_id.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_provider: new.payment_provider.clone(),
            payment_transaction_id: None,
            address_id: new.address_id.clone(),
            subtotal_cents: pricing.subtotal.cents(),
            discount_cents: pricing.discount_amount.cents(),
            total_cents: pricing.total.cents(),
            coupon_id: pricing.coupon.as_ref().map(|c| c.coupon_id.clone()),
            coupon_code: pricing.coupon.as_ref().map(|c| c.code.to_string()),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %order.id, user_id = %order.user_id, lines = new.lines.len(), "Creating order");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, status, payment_status, payment_provider,
                payment_transaction_id, address_id, subtotal_cents, discount_cents,
                total_cents, coupon_id, coupon_code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.payment_provider)
        .bind(&order.payment_transaction_id)
        .bind(&order.address_id)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.total_cents)
        .bind(&order.coupon_id)
        .bind(&order.coupon_code)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &new.lines {
            let line_total = line.line_total().ok_or_else(|| {
                DbError::Invalid(ValidationError::OutOfRange {
                    field: "lineTotal".to_string(),
                    min: 0,
                    max: i64::MAX,
                })
            })?;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, variant_key, quantity,
                    unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(generate_id())
            .bind(&order.id)
            .bind(&line.product_id)
            .bind(&line.variant_key)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        if let Some(coupon_id) = &order.coupon_id {
            if !increment_usage(&mut *tx, coupon_id, now).await? {
                tx.rollback()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                warn!(
                    coupon_id = %coupon_id,
                    user_id = %order.user_id,
                    "Coupon lost its last redemption before commit; order rolled back"
                );
                return Ok(OrderPlacement::CouponUnavailable);
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            id = %order.id,
            total_cents = order.total_cents,
            coupon = order.coupon_code.as_deref().unwrap_or("-"),
            "Order placed"
        );

        Ok(OrderPlacement::Created(order))
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Items of an order, in insertion order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, variant_key, quantity,
                   unit_price_cents, line_total_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Every order, newest first (admin listing).
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC");
        let orders = sqlx::query_as::<_, Order>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Moves an order to `next` unless it is already delivered or cancelled.
    ///
    /// Cancelling never gives the coupon redemption back.
    pub async fn update_status(
        &self,
        id: &str,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if !current.status.can_transition_to(next) {
            return Err(DbError::Invalid(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("cannot move from {:?} to {:?}", current.status, next),
            }));
        }

        // Guard on the status we read so concurrent updates cannot both win.
        let result = sqlx::query(
            "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(current.status)
        .bind(next)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "order {id} changed status concurrently"
            )));
        }

        debug!(id = %id, from = ?current.status, to = ?next, "Order status updated");

        Ok(Order {
            status: next,
            updated_at: now,
            ..current
        })
    }

    /// Records a successful payment.
    pub async fn mark_paid(
        &self,
        id: &str,
        provider: &str,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = 'paid',
                payment_provider = ?2,
                payment_transaction_id = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(provider)
        .bind(transaction_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        info!(id = %id, provider = %provider, "Order paid");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
