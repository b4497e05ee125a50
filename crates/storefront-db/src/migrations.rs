//! # Database Migrations
//!
//! The storefront schema ships inside the binary via `sqlx::migrate!`:
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   products, coupons, orders, order_items
//! ```
//!
//! Applied versions are recorded in `_sqlx_migrations`. Released files are
//! never edited; schema changes go in the next numbered file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if total == applied {
        debug!(total, "Schema up to date");
        return Ok(());
    }

    info!(pending = total - applied, "Applying storefront migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// A database that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master \
         WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    if !has_table {
        return Ok((total, 0));
    }

    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((total, usize::try_from(applied).unwrap_or_default()))
}
