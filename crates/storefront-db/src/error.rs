//! # Database Error Types
//!
//! ```text
//! sqlx::Error / MigrateError / ValidationError
//!       │
//!       ▼
//!   DbError ──► CheckoutError::Db       (checkout flow)
//!           └─► PricingError::Lookup    (through the core repository traits)
//! ```
//!
//! Constraint failures are classified by [`sqlx::error::ErrorKind`] so
//! callers can tell a duplicate coupon code from a missing product without
//! parsing SQLite messages.

use sqlx::error::ErrorKind;
use storefront_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A normalized coupon code or SKU that already exists.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// An order line pointing at a product that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A row rejected by a schema CHECK (negative price,
    /// `total <> subtotal - discount`, ...).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin/commit/rollback failed, or a guarded write lost a race.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored row that no longer satisfies domain invariants
    /// (e.g. a coupon with an unparsable code).
    #[error("Corrupt {entity} row {id}: {reason}")]
    Corrupt {
        entity: String,
        id: String,
        reason: String,
    },

    /// Input rejected before it reached the database.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: coupons.code"
                    ErrorKind::UniqueViolation => {
                        let field = message
                            .rsplit(": ")
                            .next()
                            .unwrap_or("unknown")
                            .to_string();
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
