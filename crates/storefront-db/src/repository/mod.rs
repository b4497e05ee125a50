//! # Repository Module
//!
//! SQLite-backed repositories for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and the Engine                          │
//! │                                                                         │
//! │  CheckoutService                                                        │
//! │       │                                                                 │
//! │       ├── ProductRepository ──implements──► core::Catalog               │
//! │       ├── CouponRepository  ──implements──► core::CouponRepository      │
//! │       └── OrderRepository   (order + redemption transaction)            │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon CRUD and atomic redemption
//! - [`ProductRepository`](product::ProductRepository) - Catalog products and prices
//! - [`OrderRepository`](order::OrderRepository) - Orders and order items

use uuid::Uuid;

pub mod coupon;
pub mod order;
pub mod product;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
