//! # Errors
//!
//! Two layers: [`DbError`] classifies what SQLite reported, and
//! [`LedgerError`] is what the ledger and recorder hand back to callers.
//!
//! ```text
//!   sqlx::Error ──► DbError ──┬── Conflict ──► retried, then ConflictRetriesExhausted
//!                             └── others ────► LedgerError::Persistence   (server side)
//!   CoreError ───────────────────────────────► LedgerError::Domain        (caller's fault)
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use tpv_core::CoreError;

/// Persistence failures, categorized from the SQLite error.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the requested key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint or index rejected the row. `field` is the
    /// `table.column` SQLite names; `value` is filled in by the repository
    /// when it knows it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A conditional write lost against a concurrent writer: the closure
    /// version moved, or another process opened a period first.
    #[error("Concurrent update of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file could not be opened (permissions, disk, bad path).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement failure, including CHECK constraints.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be decoded, e.g. ticket lines JSON.
    #[error("Corrupt {entity} row: {message}")]
    Corrupt { entity: String, message: String },

    #[error("Connection pool exhausted")]
    PoolExhausted,

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

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether retrying against fresh state may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        // "UNIQUE constraint failed: tickets.ticket_date, tickets.seq"
                        let field = message
                            .split_once(": ")
                            .map(|(_, columns)| columns.to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors returned by [`CashierLedger`](crate::ledger::CashierLedger) and
/// [`TicketRecorder`](crate::recorder::TicketRecorder).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A ledger rule rejected the request. Nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The database failed underneath the request.
    #[error(transparent)]
    Persistence(#[from] DbError),

    /// Every attempt lost against a concurrent writer.
    #[error("Gave up after {attempts} conflicting writes")]
    ConflictRetriesExhausted { attempts: u32 },
}

impl LedgerError {
    /// True for errors caused by the request itself (invalid state,
    /// validation, insufficient funds, nothing to read). Everything else is
    /// a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, LedgerError::Domain(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tpv_core::Money;

    #[test]
    fn test_client_errors() {
        let insufficient = LedgerError::from(CoreError::InsufficientFunds {
            max_withdrawable: Money::from_cents(7500),
        });
        assert!(insufficient.is_client_error());
        assert_eq!(
            insufficient.to_string(),
            "Not enough cash, you can only withdraw 75.00€"
        );

        let conflict = LedgerError::from(DbError::conflict("CashierClosure", "c-1"));
        assert!(!conflict.is_client_error());
        assert!(!LedgerError::ConflictRetriesExhausted { attempts: 3 }.is_client_error());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(!err.is_conflict());
    }
}
