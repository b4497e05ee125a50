//! # Product Repository
//!
//! Database operations for catalog products, and the [`Catalog`] the pricing
//! engine reads unit prices from.
//!
//! ## Price Authority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client request: { productId: "tee", quantity: 2 }                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Catalog::get_unit_price("tee")                                         │
//! │       │  SELECT price_cents FROM products                               │
//! │       │  WHERE id = ? AND status = 'active'                             │
//! │       ▼                                                                 │
//! │  Some($25.00) ──► LineItem { unit_price: $25.00, quantity: 2 }          │
//! │  None         ──► ProductNotFound                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use storefront_core::repository::Catalog;
use storefront_core::validation::{validate_price, validate_product_name, validate_sku};
use storefront_core::{Money, Product, ProductStatus};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, price_cents, status, created_at, updated_at";

/// Fields an administrator supplies for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

impl NewProduct {
    /// Validates the input and builds an active product.
    fn into_product(self, now: DateTime<Utc>) -> DbResult<Product> {
        validate_sku(&self.sku)?;
        validate_product_name(&self.name)?;
        validate_price(self.price)?;

        Ok(Product {
            id: generate_id(),
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            price_cents: self.price.cents(),
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Validates and stores a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::Invalid)` - bad SKU, name or price
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, new: NewProduct, now: DateTime<Utc>) -> DbResult<Product> {
        let product = new.into_product(now)?;
        self.insert(&product).await
    }

    /// Inserts a product as-is.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, price_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", &product.sku),
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Gets a product by its ID, whatever its status.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE status = 'active' ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Activates or deactivates a product.
    ///
    /// Inactive products stay referenced by past orders but can no longer
    /// be priced into a cart.
    pub async fn set_status(
        &self,
        id: &str,
        status: ProductStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, ?status, "Setting product status");

        let result = sqlx::query("UPDATE products SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Current unit price of a sellable product.
    pub async fn unit_price(&self, product_id: &str) -> DbResult<Option<Money>> {
        let price: Option<i64> = sqlx::query_scalar(
            "SELECT price_cents FROM products WHERE id = ?1 AND status = 'active'",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price.map(Money::from_cents))
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

impl Catalog for ProductRepository {
    type Error = DbError;

    async fn get_unit_price(&self, product_id: &str) -> DbResult<Option<Money>> {
        self.unit_price(product_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
