//! # Database Pool Management
//!
//! Opens the storefront's SQLite database and hands out repositories.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Concurrent Checkouts                             │
//! │                                                                         │
//! │  quote()        ──► any pooled connection, reads only                   │
//! │  place_order(A) ──► BEGIN ... UPDATE coupons ... COMMIT                 │
//! │  place_order(B) ──► waits up to busy_timeout for A's write lock         │
//! │                      then re-evaluates usage_count < usage_limit        │
//! │                                                                         │
//! │  ":memory:" ──► one pinned connection; every call is serialized         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL journaling keeps quotes readable while an order commits. SQLite
//! still admits a single writer, and the conditional coupon increment is
//! evaluated under that lock.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::coupon::CouponRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;

const IN_MEMORY: &str = ":memory:";

/// Connection settings for [`Database::new`].
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/storefront/shop.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Pool size. Default: 5
    pub max_connections: u32,

    /// How long to wait for a pooled connection. Default: 30s
    pub acquire_timeout: Duration,

    /// How long a writer waits on another writer's lock before failing
    /// with `SQLITE_BUSY`. Default: 5s
    pub busy_timeout: Duration,

    /// Apply embedded migrations on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private database that lives as long as the pool.
    ///
    /// Each `:memory:` connection is its own database, so the pool holds
    /// exactly one.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Whether this configuration points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            // orders -> order_items and orders -> coupons rely on them
            .foreign_keys(true)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            // Dropping the last connection would drop the data with it.
            options.min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            options
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(30 * 60))
        }
    }
}

/// Shared database handle. Clones share one pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./storefront.db")).await?;
/// let coupon = db.coupons().find_by_code(&code).await?;
/// let checkout = CheckoutService::new(&db, CartLimits::default());
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies migrations.
    ///
    /// ## Returns
    /// * `Err(DbError::ConnectionFailed)` - file could not be opened
    /// * `Err(DbError::MigrationFailed)` - schema could not be applied
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening storefront database");

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Creates a migrated in-memory database (for tests and demos).
    pub async fn in_memory() -> DbResult<Self> {
        Database::new(DbConfig::in_memory()).await
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Products; also the pricing [`Catalog`](storefront_core::Catalog).
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Closes every connection. Repositories fail afterwards.
    pub async fn close(&self) {
        info!("Closing storefront database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_starts_empty() {
        let db = Database::in_memory().await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert!(db.coupons().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::in_memory().await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Database::in_memory().await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/storefront-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
        assert!(memory.run_migrations);
    }
}
