//! # Cashier Closure Repository
//!
//! Rows of `cashier_closures` and their `cash_movements` audit trail.
//!
//! ## Versioned Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read  (version = 4) ──► pure transition ──► UPDATE … WHERE id = ?      │
//! │                                                   AND version = 4       │
//! │                                                   SET version = 5       │
//! │                                                                         │
//! │  rows_affected == 1  → persisted                                       │
//! │  rows_affected == 0  → DbError::Conflict (someone else wrote first)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take any SQLite executor so the ledger and the ticket
//! recorder can run them inside their own transactions.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tpv_core::{CashMovement, CashierClosure};

const ENTITY: &str = "CashierClosure";

// =============================================================================
// Executor-level queries
// =============================================================================

/// Latest closure by opening date, ties broken by insertion order.
pub(crate) async fn fetch_latest<'e, E>(executor: E) -> DbResult<Option<CashierClosure>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let closure = sqlx::query_as::<_, CashierClosure>(
        r#"
        SELECT
            id, status, opening_date, closing_date,
            initial_cash, sales_cash, sales_card, used_vouchers,
            deposit, withdrawal, final_cash, final_card,
            comment, version
        FROM cashier_closures
        ORDER BY opening_date DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(executor)
    .await?;

    Ok(closure)
}

/// Inserts a freshly opened closure.
///
/// A second open row violates the single-open index and is reported as a
/// conflict: another writer opened a period first.
pub(crate) async fn insert<'e, E>(executor: E, closure: &CashierClosure) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %closure.id, initial_cash = %closure.initial_cash, "Inserting cashier closure");

    sqlx::query(
        r#"
        INSERT INTO cashier_closures (
            id, status, opening_date, closing_date,
            initial_cash, sales_cash, sales_card, used_vouchers,
            deposit, withdrawal, final_cash, final_card,
            comment, version
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12,
            ?13, ?14
        )
        "#,
    )
    .bind(&closure.id)
    .bind(closure.status)
    .bind(closure.opening_date)
    .bind(closure.closing_date)
    .bind(closure.initial_cash)
    .bind(closure.sales_cash)
    .bind(closure.sales_card)
    .bind(closure.used_vouchers)
    .bind(closure.deposit)
    .bind(closure.withdrawal)
    .bind(closure.final_cash)
    .bind(closure.final_card)
    .bind(&closure.comment)
    .bind(closure.version)
    .execute(executor)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. }
            if field.contains("status") || field.contains("single_open") =>
        {
            DbError::conflict(ENTITY, &closure.id)
        }
        other => other,
    })?;

    Ok(())
}

/// Writes `closure` if its row still carries `closure.version`.
///
/// Returns the closure with the bumped version.
pub(crate) async fn update_versioned<'e, E>(
    executor: E,
    closure: &CashierClosure,
) -> DbResult<CashierClosure>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %closure.id, version = closure.version, "Updating cashier closure");

    let result = sqlx::query(
        r#"
        UPDATE cashier_closures SET
            status = ?1,
            closing_date = ?2,
            sales_cash = ?3,
            sales_card = ?4,
            used_vouchers = ?5,
            deposit = ?6,
            withdrawal = ?7,
            final_cash = ?8,
            final_card = ?9,
            comment = ?10,
            version = version + 1
        WHERE id = ?11 AND version = ?12
        "#,
    )
    .bind(closure.status)
    .bind(closure.closing_date)
    .bind(closure.sales_cash)
    .bind(closure.sales_card)
    .bind(closure.used_vouchers)
    .bind(closure.deposit)
    .bind(closure.withdrawal)
    .bind(closure.final_cash)
    .bind(closure.final_card)
    .bind(&closure.comment)
    .bind(&closure.id)
    .bind(closure.version)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict(ENTITY, &closure.id));
    }

    Ok(CashierClosure {
        version: closure.version + 1,
        ..closure.clone()
    })
}

/// Appends a deposit or withdrawal to the audit trail.
pub(crate) async fn insert_movement<'e, E>(executor: E, movement: &CashMovement) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO cash_movements (id, closure_id, kind, amount, comment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.closure_id)
    .bind(movement.kind)
    .bind(movement.amount)
    .bind(&movement.comment)
    .bind(movement.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to closures and movements.
///
/// Writes go through [`CashierLedger`](crate::ledger::CashierLedger), which
/// adds the writer lock and conflict retries.
#[derive(Debug, Clone)]
pub struct CashierClosureRepository {
    pool: SqlitePool,
}

impl CashierClosureRepository {
    /// Creates a new CashierClosureRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashierClosureRepository { pool }
    }

    /// Most recently opened closure, open or closed.
    pub async fn latest(&self) -> DbResult<Option<CashierClosure>> {
        fetch_latest(&self.pool).await
    }

    /// Gets a closure by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashierClosure>> {
        let closure = sqlx::query_as::<_, CashierClosure>(
            r#"
            SELECT
                id, status, opening_date, closing_date,
                initial_cash, sales_cash, sales_card, used_vouchers,
                deposit, withdrawal, final_cash, final_card,
                comment, version
            FROM cashier_closures
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(closure)
    }

    /// All closures, oldest first.
    pub async fn list(&self) -> DbResult<Vec<CashierClosure>> {
        let closures = sqlx::query_as::<_, CashierClosure>(
            r#"
            SELECT
                id, status, opening_date, closing_date,
                initial_cash, sales_cash, sales_card, used_vouchers,
                deposit, withdrawal, final_cash, final_card,
                comment, version
            FROM cashier_closures
            ORDER BY opening_date ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(closures)
    }

    /// Number of closures currently open. Never more than one.
    pub async fn count_open(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cashier_closures WHERE closing_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Deposits and withdrawals of a closure, in the order they happened.
    pub async fn movements(&self, closure_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(
            r#"
            SELECT id, closure_id, kind, amount, comment, created_at
            FROM cash_movements
            WHERE closure_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(closure_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
