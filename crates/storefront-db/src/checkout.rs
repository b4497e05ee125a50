//! # Checkout Service
//!
//! Quotes carts, validates coupons, and places orders.
//!
//! ## Place Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CheckoutRequest                                                        │
//! │       │  validate(limits)                                               │
//! │       ▼                                                                 │
//! │  ValidatedCheckout ──► build_cart(products)   catalog prices only       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_cart(coupons)                          pure, no redemption       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  orders.create()                              one transaction:          │
//! │       │                                       order + items + coupon+1  │
//! │       ├── Created            ──► Ok(order)                              │
//! │       └── CouponUnavailable  ──► Err(Coupon(Exhausted | Inactive ...))  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::coupon::CouponRepository;
use crate::repository::order::{NewOrder, OrderPlacement, OrderRepository};
use crate::repository::product::ProductRepository;
use storefront_core::{
    build_cart, check_coupon, price_cart, CartLimits, CartSnapshot, CheckoutRequest, CouponError,
    Order, PricingError, PricingResult, ValidatedCheckout, ValidationError,
};

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart or coupon was rejected.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Storage failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<CouponError> for CheckoutError {
    fn from(err: CouponError) -> Self {
        CheckoutError::Pricing(PricingError::Coupon(err))
    }
}

impl CheckoutError {
    /// Returns the coupon error, if this is one.
    pub fn as_coupon(&self) -> Option<&CouponError> {
        match self {
            CheckoutError::Pricing(err) => err.as_coupon(),
            CheckoutError::Db(_) => None,
        }
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// An order placement request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub user_id: String,
    #[serde(default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub payment_provider: Option<String>,
    #[serde(flatten)]
    pub cart: CheckoutRequest,
}

/// Checkout orchestration over the SQLite repositories.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    products: ProductRepository,
    coupons: CouponRepository,
    orders: OrderRepository,
    limits: CartLimits,
}

impl CheckoutService {
    pub fn new(db: &Database, limits: CartLimits) -> Self {
        CheckoutService {
            products: db.products(),
            coupons: db.coupons(),
            orders: db.orders(),
            limits,
        }
    }

    /// Prices a cart without writing anything.
    ///
    /// Backs the cart view: the same request can be quoted any number of
    /// times without consuming a coupon redemption.
    pub async fn quote(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResult<PricingResult> {
        let checkout = request.validate(&self.limits)?;
        let (_, pricing) = self.price(&checkout, now).await?;
        Ok(pricing)
    }

    /// Checks that the request's coupon applies to its cart.
    ///
    /// Same pricing as [`quote`](Self::quote), but a coupon code is
    /// required. The cart is priced from the catalog; an empty cart is
    /// `EmptyCart`.
    pub async fn validate_coupon(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResult<PricingResult> {
        let checkout = request.validate(&self.limits)?;
        if checkout.coupon_code().is_none() {
            return Err(PricingError::Validation(ValidationError::Required {
                field: "couponCode".to_string(),
            })
            .into());
        }

        let (_, pricing) = self.price(&checkout, now).await?;
        Ok(pricing)
    }

    /// Validates, prices and stores an order, consuming one coupon
    /// redemption in the same transaction.
    ///
    /// ## Errors
    /// - `Pricing(EmptyCart | Validation | ProductNotFound)` for a bad cart
    /// - `Pricing(Coupon(..))` if the coupon is unusable, including when the
    ///   last redemption was taken by a concurrent order
    /// - `Db` on storage failure
    pub async fn place_order(
        &self,
        request: PlaceOrder,
        now: DateTime<Utc>,
    ) -> CheckoutResult<Order> {
        let checkout = request.cart.validate(&self.limits)?;
        let (cart, pricing) = self.price(&checkout, now).await?;

        let new_order = NewOrder {
            user_id: request.user_id,
            address_id: request.address_id,
            payment_provider: request.payment_provider,
            lines: cart.into_items(),
            pricing,
        };

        match self.orders.create(&new_order, now).await? {
            OrderPlacement::Created(order) => Ok(order),
            OrderPlacement::CouponUnavailable => {
                Err(self.lost_redemption(&new_order.pricing, now).await)
            }
        }
    }

    /// Builds the cart from catalog prices and prices it.
    async fn price(
        &self,
        checkout: &ValidatedCheckout,
        now: DateTime<Utc>,
    ) -> CheckoutResult<(CartSnapshot, PricingResult)> {
        let cart = build_cart(checkout, &self.products).await?;
        let pricing = price_cart(&cart, checkout.coupon_code(), &self.coupons, now).await?;

        debug!(
            lines = cart.len(),
            subtotal = pricing.subtotal.cents(),
            discount = pricing.discount_amount.cents(),
            "Cart priced"
        );
        Ok((cart, pricing))
    }

    /// Explains why a coupon that priced fine could not be redeemed.
    async fn lost_redemption(&self, pricing: &PricingResult, now: DateTime<Utc>) -> CheckoutError {
        let Some(applied) = &pricing.coupon else {
            let reason = "coupon redemption failed without a coupon".to_string();
            return DbError::TransactionFailed(reason).into();
        };

        let current = match self.coupons.find_by_code(&applied.code).await {
            Ok(current) => current,
            Err(err) => return err.into(),
        };

        let reason = match current {
            None => CouponError::NotFound {
                code: applied.code.to_string(),
            },
            Some(coupon) => match check_coupon(&coupon, now) {
                Err(err) => err,
                // Still looks usable: a concurrent order took the last use
                // and the limit was raised again before this read.
                Ok(()) => CouponError::Exhausted {
                    code: coupon.code.to_string(),
                    usage_limit: coupon.usage_limit.unwrap_or(coupon.usage_count),
                },
            },
        };

        warn!(code = %applied.code, kind = reason.kind(), "Order rejected at redemption");
        reason.into()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::product::NewProduct;
    use chrono::Duration;
    use storefront_core::{DiscountRule, Money, NewCoupon, Percentage, RequestedItem};

    struct Fixture {
        db: Database,
        service: CheckoutService,
        tee: String,
        cap: String,
    }

    async fn fixture() -> Fixture {
        fixture_on(Database::in_memory().await.unwrap()).await
    }

    async fn fixture_on(db: Database) -> Fixture {
        let now = Utc::now();
        let products = db.products();

        let tee = products
            .create(
                NewProduct {
                    sku: "TEE".to_string(),
                    name: "Tee".to_string(),
                    description: None,
                    price: Money::from_cents(2500),
                },
                now,
            )
            .await
            .unwrap()
            .id;
        let cap = products
            .create(
                NewProduct {
                    sku: "CAP".to_string(),
                    name: "Cap".to_string(),
                    description: None,
                    price: Money::from_cents(1500),
                },
                now,
            )
            .await
            .unwrap()
            .id;

        let service = CheckoutService::new(&db, CartLimits::default());
        Fixture { db, service, tee, cap }
    }

    async fn add_coupon(
        db: &Database,
        code: &str,
        rule: DiscountRule,
        limit: Option<i64>,
    ) -> String {
        let now = Utc::now();
        db.coupons()
            .create(
                NewCoupon {
                    code: code.to_string(),
                    rule,
                    minimum_purchase: Money::zero(),
                    valid_from: now - Duration::days(1),
                    valid_until: now + Duration::days(1),
                    usage_limit: limit,
                    is_active: true,
                },
                now,
            )
            .await
            .unwrap()
            .id
    }

    fn cart(items: Vec<RequestedItem>, coupon: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            items,
            coupon_code: coupon.map(str::to_string),
        }
    }

    fn place(request: CheckoutRequest) -> PlaceOrder {
        PlaceOrder {
            user_id: "user-1".to_string(),
            address_id: None,
            payment_provider: None,
            cart: request,
        }
    }

    #[tokio::test]
    async fn test_quote_uses_catalog_and_never_redeems() {
        let f = fixture().await;
        let coupon_id = add_coupon(
            &f.db,
            "TEN",
            DiscountRule::Percentage {
                rate: Percentage::from_percent(10),
                max_discount: None,
            },
            Some(1),
        )
        .await;

        let request = cart(
            vec![RequestedItem::new(&f.tee, 2), RequestedItem::new(&f.cap, 1)],
            Some("ten"),
        );

        for _ in 0..3 {
            let quote = f.service.quote(request.clone(), Utc::now()).await.unwrap();
            assert_eq!(quote.subtotal, Money::from_cents(6500));
            assert_eq!(quote.discount_amount, Money::from_cents(650));
            assert_eq!(quote.total, Money::from_cents(5850));
        }

        let stored = f.db.coupons().get_by_id(&coupon_id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 0);
    }

    #[tokio::test]
    async fn test_place_order_consumes_one_redemption() {
        let f = fixture().await;
        let coupon_id = add_coupon(
            &f.db,
            "FIVE",
            DiscountRule::Fixed {
                amount: Money::from_cents(500),
            },
            Some(1),
        )
        .await;

        let request = cart(vec![RequestedItem::new(&f.tee, 1)], Some("FIVE"));
        let order = f.service.place_order(place(request.clone()), Utc::now()).await.unwrap();
        assert_eq!(order.subtotal_cents, 2500);
        assert_eq!(order.discount_cents, 500);
        assert_eq!(order.total_cents, 2000);
        assert_eq!(order.coupon_code.as_deref(), Some("FIVE"));

        let stored = f.db.coupons().get_by_id(&coupon_id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);

        let err = f.service.place_order(place(request), Utc::now()).await.unwrap_err();
        assert!(matches!(err.as_coupon(), Some(CouponError::Exhausted { usage_limit: 1, .. })));
        assert_eq!(f.db.orders().list_for_user("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_share_single_use_coupon() {
        let f = fixture().await;
        let coupon_id = add_coupon(
            &f.db,
            "RACE",
            DiscountRule::Fixed {
                amount: Money::from_cents(100),
            },
            Some(1),
        )
        .await;

        assert_eq!(race_for_coupon(&f, "RACE", 8).await, 1);
        let stored = f.db.coupons().get_by_id(&coupon_id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_on_file_database() {
        let path = std::env::temp_dir().join(format!("storefront-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        let f = fixture_on(db).await;
        let coupon_id = add_coupon(
            &f.db,
            "ONCE",
            DiscountRule::Fixed {
                amount: Money::from_cents(100),
            },
            Some(1),
        )
        .await;

        let placed = race_for_coupon(&f, "ONCE", 32).await;
        let stored = f.db.coupons().get_by_id(&coupon_id).await.unwrap().unwrap();
        let orders = f.db.orders().list_all().await.unwrap();
        f.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }

        assert_eq!(placed, 1);
        assert_eq!(stored.usage_count, 1);
        assert_eq!(orders.len(), 1);
    }

    /// Places `attempts` single-cap orders with `code` at once and returns
    /// how many succeeded. Every loser must see the coupon as exhausted.
    async fn race_for_coupon(f: &Fixture, code: &str, attempts: usize) -> usize {
        let mut handles = Vec::new();
        for i in 0..attempts {
            let service = f.service.clone();
            let mut request = place(cart(vec![RequestedItem::new(&f.cap, 1)], Some(code)));
            request.user_id = format!("user-{i}");
            handles.push(tokio::spawn(async move {
                service.place_order(request, Utc::now()).await
            }));
        }

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(err) => assert!(
                    matches!(err.as_coupon(), Some(CouponError::Exhausted { .. })),
                    "{err:?}"
                ),
            }
        }
        placed
    }

    #[tokio::test]
    async fn test_place_order_rejections() {
        let f = fixture().await;

        let empty = f.service.place_order(place(cart(vec![], None)), Utc::now()).await;
        assert!(matches!(empty, Err(CheckoutError::Pricing(PricingError::EmptyCart))));

        let ghost = f
            .service
            .place_order(place(cart(vec![RequestedItem::new("ghost", 1)], None)), Utc::now())
            .await;
        assert!(matches!(
            ghost,
            Err(CheckoutError::Pricing(PricingError::ProductNotFound { .. }))
        ));

        let unknown = f
            .service
            .place_order(place(cart(vec![RequestedItem::new(&f.tee, 1)], Some("NOPE"))), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(unknown.as_coupon(), Some(CouponError::NotFound { .. })));

        assert!(f.db.orders().list_for_user("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_coupon_prices_the_catalog_cart() {
        let f = fixture().await;
        let coupon_id = add_coupon(
            &f.db,
            "HALF",
            DiscountRule::Percentage {
                rate: Percentage::from_percent(50),
                max_discount: Some(Money::from_cents(2000)),
            },
            Some(1),
        )
        .await;

        // 2 x 25.00 + 15.00 = 65.00; 50% is 32.50, capped at 20.00
        let request = cart(
            vec![RequestedItem::new(&f.tee, 2), RequestedItem::new(&f.cap, 1)],
            Some("half"),
        );
        let checked = f.service.validate_coupon(request, Utc::now()).await.unwrap();
        assert_eq!(checked.subtotal, Money::from_cents(6500));
        assert_eq!(checked.discount_amount, Money::from_cents(2000));
        assert_eq!(checked.total, Money::from_cents(4500));

        let stored = f.db.coupons().get_by_id(&coupon_id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 0);
    }

    #[tokio::test]
    async fn test_validate_coupon_rejects_empty_cart_and_missing_code() {
        let f = fixture().await;
        add_coupon(
            &f.db,
            "FIFTY",
            DiscountRule::Fixed {
                amount: Money::from_cents(5000),
            },
            None,
        )
        .await;

        let empty = f.service.validate_coupon(cart(vec![], Some("FIFTY")), Utc::now()).await;
        assert!(matches!(empty, Err(CheckoutError::Pricing(PricingError::EmptyCart))));

        let no_code = f
            .service
            .validate_coupon(cart(vec![RequestedItem::new(&f.tee, 1)], None), Utc::now())
            .await;
        assert!(matches!(
            no_code,
            Err(CheckoutError::Pricing(PricingError::Validation(ValidationError::Required { .. })))
        ));
    }

    #[test]
    fn test_place_order_wire_shape() {
        let json = r#"{
            "userId": "u1",
            "items": [{"productId": "tee", "quantity": 1}],
            "couponCode": "SAVE10"
        }"#;
        let request: PlaceOrder = serde_json::from_str(json).unwrap();
        assert_eq!(request.user_id, "u1");
        assert_eq!(request.cart.items.len(), 1);
        assert_eq!(request.cart.coupon_code.as_deref(), Some("SAVE10"));
    }
}
