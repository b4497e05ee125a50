//! # storefront-db: Database Layer and Checkout
//!
//! SQLite implementations of the pricing engine's collaborators, plus the
//! checkout service that turns a priced cart into a persisted order.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront Data Flow                              │
//! │                                                                         │
//! │  HTTP handler / CLI (quote, place order, validate coupon)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │CheckoutService│───►│  Repositories │    │  Migrations  │  │   │
//! │  │   │ (checkout.rs) │    │ ProductRepo   │    │  (embedded)  │  │   │
//! │  │   └───────────────┘    │ CouponRepo    │    │ 001_init.sql │  │   │
//! │  │   ┌───────────────┐    │ OrderRepo     │    └──────────────┘  │   │
//! │  │   │   Database    │◄───└───────────────┘                      │   │
//! │  │   │   (pool.rs)   │                                            │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SQLite (./storefront.db or :memory:)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Database error types
//! - [`repository`] - Product, coupon and order repositories
//! - [`checkout`] - Quote, coupon preview and order placement
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{AppConfig, CheckoutService, Database};
//!
//! let config = AppConfig::load(Some("storefront.toml".as_ref()))?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let checkout = CheckoutService::new(&db, config.cart_limits());
//! let quote = checkout.quote(request, Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, CheckoutResult, CheckoutService, PlaceOrder};
pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::coupon::CouponRepository;
pub use repository::order::{NewOrder, OrderPlacement, OrderRepository};
pub use repository::product::{NewProduct, ProductRepository};
