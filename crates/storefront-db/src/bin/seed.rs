//! # Seed Data Generator
//!
//! Populates a development database with catalog products and sample
//! coupons, then quotes one cart to show the engine end to end.
//!
//! ## Usage
//! ```bash
//! # Seed ./storefront.db (or the path from storefront.toml / env)
//! cargo run -p storefront-db --bin seed
//!
//! # Custom config file and product count
//! cargo run -p storefront-db --bin seed -- --config ./storefront.toml --count 40
//!
//! # Verbose logging
//! RUST_LOG=storefront_db=debug cargo run -p storefront-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Products: `{STYLE}-{COLOR}` SKUs, $12.00 - $89.00
//! - Coupons:
//!   - `WELCOME10` 10% off, capped at $20.00
//!   - `FLAT5` $5.00 off orders of $25.00 or more
//!   - `LAUNCH50` 50% off, first 100 orders
//!   - `EXPIRED` a coupon whose window has closed

use chrono::{DateTime, Duration, Utc};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storefront_core::{CheckoutRequest, DiscountRule, Money, NewCoupon, Percentage, RequestedItem};
use storefront_db::{AppConfig, CheckoutService, Database, NewProduct};

/// Styles and base prices (cents).
const STYLES: &[(&str, &str, i64)] = &[
    ("TEE", "Classic Tee", 1200),
    ("POLO", "Pique Polo", 2800),
    ("HOOD", "Pullover Hoodie", 4500),
    ("JEAN", "Slim Jeans", 5900),
    ("JKT", "Field Jacket", 8900),
    ("CAP", "Six-Panel Cap", 1500),
    ("SOCK", "Crew Socks", 1200),
    ("SHRT", "Oxford Shirt", 3900),
];

/// Colors and price add-ons (cents).
const COLORS: &[(&str, &str, i64)] = &[
    ("BLK", "Black", 0),
    ("WHT", "White", 0),
    ("NVY", "Navy", 0),
    ("OLV", "Olive", 200),
    ("RST", "Rust", 200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = STYLES.len() * COLORS.len();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--config" | "-f" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>       Number of products to generate (default: all {})",
                    count
                );
                println!("  -f, --config <PATH>   TOML config file (default: built-in defaults)");
                println!("  -h, --help            Show this help message");
                println!();
                println!(
                    "Environment: STOREFRONT_DB_PATH, STOREFRONT_DB_MAX_CONNECTIONS, RUST_LOG"
                );
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = AppConfig::load(config_path.as_deref())?;
    info!(path = %config.database.path.display(), count, "Seeding storefront database");

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products; delete the file to regenerate");
        return Ok(());
    }

    let now = Utc::now();
    let products = db.products();
    let mut product_ids = Vec::new();

    'outer: for (style_code, style_name, base_price) in STYLES {
        for (color_code, color_name, addon) in COLORS {
            if product_ids.len() >= count {
                break 'outer;
            }

            let new = NewProduct {
                sku: format!("{style_code}-{color_code}"),
                name: format!("{style_name} ({color_name})"),
                description: None,
                price: Money::from_cents(base_price + addon),
            };

            match products.create(new, now).await {
                Ok(product) => product_ids.push(product.id),
                Err(e) => warn!(
                    style = %style_code,
                    color = %color_code,
                    error = %e,
                    "Failed to insert product"
                ),
            }
        }
    }

    info!(generated = product_ids.len(), "Products created");

    let coupons = db.coupons();
    for new in sample_coupons(now) {
        let code = new.code.clone();
        if let Err(e) = coupons.create(new, now).await {
            warn!(code = %code, error = %e, "Failed to create coupon");
        }
    }
    info!(count = coupons.list().await?.len(), "Coupons created");

    // End-to-end check: quote a small cart with a coupon.
    if let [first, second, ..] = product_ids.as_slice() {
        let checkout = CheckoutService::new(&db, config.cart_limits());
        let quote = checkout
            .quote(
                CheckoutRequest {
                    items: vec![RequestedItem::new(first, 2), RequestedItem::new(second, 1)],
                    coupon_code: Some("welcome10".to_string()),
                },
                now,
            )
            .await?;

        info!(
            subtotal = %quote.subtotal,
            discount = %quote.discount_amount,
            total = %quote.total,
            "Sample quote with WELCOME10"
        );
    }

    info!("Seed complete");
    Ok(())
}

fn sample_coupons(now: DateTime<Utc>) -> Vec<NewCoupon> {
    let open = now - Duration::days(1);
    let close = now + Duration::days(90);

    vec![
        NewCoupon {
            code: "WELCOME10".to_string(),
            rule: DiscountRule::Percentage {
                rate: Percentage::from_percent(10),
                max_discount: Some(Money::from_cents(2000)),
            },
            minimum_purchase: Money::zero(),
            valid_from: open,
            valid_until: close,
            usage_limit: None,
            is_active: true,
        },
        NewCoupon {
            code: "FLAT5".to_string(),
            rule: DiscountRule::Fixed {
                amount: Money::from_cents(500),
            },
            minimum_purchase: Money::from_cents(2500),
            valid_from: open,
            valid_until: close,
            usage_limit: None,
            is_active: true,
        },
        NewCoupon {
            code: "LAUNCH50".to_string(),
            rule: DiscountRule::Percentage {
                rate: Percentage::from_percent(50),
                max_discount: None,
            },
            minimum_purchase: Money::zero(),
            valid_from: open,
            valid_until: close,
            usage_limit: Some(100),
            is_active: true,
        },
        NewCoupon {
            code: "EXPIRED".to_string(),
            rule: DiscountRule::Fixed {
                amount: Money::from_cents(1000),
            },
            minimum_purchase: Money::zero(),
            valid_from: now - Duration::days(60),
            valid_until: now - Duration::days(30),
            usage_limit: None,
            is_active: true,
        },
    ]
}
