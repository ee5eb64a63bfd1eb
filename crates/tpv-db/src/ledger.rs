//! # Cashier Ledger
//!
//! Serialized read-modify-write service over the latest cashier closure.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One mutating call                                  │
//! │                                                                         │
//! │  acquire writer lock (shared by every ledger/recorder of a Database)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──► fetch latest closure (by opening date)                           │
//! │  │        │                                                             │
//! │  │        ▼                                                             │
//! │  │    pure transition (tpv-core) ── rule broken? ──► Domain error      │
//! │  │        │                                                             │
//! │  │        ▼                                                             │
//! │  │    BEGIN; UPDATE … WHERE version = ?; INSERT movement; COMMIT       │
//! │  │        │                                                             │
//! │  └─ conflict (another process wrote first), up to N attempts          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │      persisted closure                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock serializes writers inside one process; the version check
//! catches writers in other processes sharing the same database file.
//! Reads take neither: a single-row SELECT is already a consistent snapshot.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::cashier_closure;
use tpv_core::{
    CashMovement, CashierClosure, CashierLast, CashierState, CloseRequest, CoreError, CoreResult,
    Money, SaleTender,
};

/// Latest closure, or `NotFound` when none was ever opened.
pub(crate) async fn current_closure(pool: &SqlitePool) -> LedgerResult<CashierClosure> {
    cashier_closure::fetch_latest(pool)
        .await?
        .ok_or_else(|| CoreError::not_found("CashierClosure", "last").into())
}

/// Something a transition produces that must be persisted alongside the
/// closure row.
trait Effect {
    fn movement(&self) -> Option<&CashMovement> {
        None
    }
}

impl Effect for () {}

impl Effect for CashMovement {
    fn movement(&self) -> Option<&CashMovement> {
        Some(self)
    }
}

/// The cashier ledger.
///
/// Obtain one with [`Database::ledger`](crate::Database::ledger).
#[derive(Debug, Clone)]
pub struct CashierLedger {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
    max_attempts: u32,
}

impl CashierLedger {
    pub(crate) fn new(pool: SqlitePool, writer: Arc<Mutex<()>>, max_attempts: u32) -> Self {
        CashierLedger {
            pool,
            writer,
            max_attempts,
        }
    }

    /// Opens a new period carrying the previous period's declared cash.
    ///
    /// ## Errors
    /// - `InvalidState` when the latest closure is still open
    pub async fn open(&self) -> LedgerResult<CashierClosure> {
        let _guard = self.writer.lock().await;

        for attempt in 1..=self.max_attempts {
            let latest = cashier_closure::fetch_latest(&self.pool).await?;
            let closure = CashierClosure::open_after(latest.as_ref(), Utc::now())?;

            match cashier_closure::insert(&self.pool, &closure).await {
                Ok(()) => {
                    info!(
                        closure_id = %closure.id,
                        initial_cash = %closure.initial_cash,
                        "Cashier opened"
                    );
                    return Ok(closure);
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempt, "Another writer opened a period first, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.exhausted("open"))
    }

    /// Accumulates a sale's tender split into the open period.
    ///
    /// Amounts are trusted; [`TicketRecorder`](crate::recorder::TicketRecorder)
    /// validates them before calling into the ledger rules.
    pub async fn record_sale(&self, tender: SaleTender) -> LedgerResult<CashierClosure> {
        let (closure, ()) = self
            .mutate("record_sale", |closure, _now| closure.record_sale(tender))
            .await?;
        info!(
            closure_id = %closure.id,
            cash = %tender.cash,
            card = %tender.card,
            voucher = %tender.voucher,
            "Sale recorded"
        );
        Ok(closure)
    }

    /// Adds cash to the drawer.
    ///
    /// ## Errors
    /// - `Validation` when `amount` is not positive
    /// - `InvalidState` when no period is open
    pub async fn deposit(&self, amount: Money, comment: Option<&str>) -> LedgerResult<CashMovement> {
        let (closure, movement) = self
            .mutate("deposit", |closure, now| closure.deposit(amount, comment, now))
            .await?;
        info!(closure_id = %closure.id, amount = %amount, "Cash deposited");
        Ok(movement)
    }

    /// Takes cash out of the drawer.
    ///
    /// ## Errors
    /// - `Validation` when `amount` is not positive
    /// - `InvalidState` when no period is open
    /// - `InsufficientFunds` when `amount` exceeds the running cash
    pub async fn withdraw(&self, amount: Money, comment: Option<&str>) -> LedgerResult<CashMovement> {
        let (closure, movement) = self
            .mutate("withdraw", |closure, now| closure.withdraw(amount, comment, now))
            .await?;
        info!(
            closure_id = %closure.id,
            amount = %amount,
            running_cash = %closure.running_cash(),
            "Cash withdrawn"
        );
        Ok(movement)
    }

    /// Closes the open period with the operator's declared counts.
    ///
    /// ## Errors
    /// - `Validation` when a declared count is negative
    /// - `InvalidState` when no period is open
    pub async fn close(&self, request: &CloseRequest) -> LedgerResult<CashierLast> {
        let (closure, ()) = self
            .mutate("close", |closure, now| closure.close(request, now))
            .await?;
        let last = CashierLast::from(&closure);
        info!(
            closure_id = %closure.id,
            final_cash = ?last.final_cash,
            discrepancy = ?last.cash_discrepancy,
            "Cashier closed"
        );
        Ok(last)
    }

    /// In-progress totals of the open period.
    ///
    /// ## Errors
    /// - `InvalidState` when the latest period is closed
    /// - `NotFound` when no period was ever opened
    pub async fn read_state(&self) -> LedgerResult<CashierState> {
        Ok(current_closure(&self.pool).await?.state()?)
    }

    /// The latest period, open or closed.
    ///
    /// ## Errors
    /// - `NotFound` when no period was ever opened
    pub async fn read_last(&self) -> LedgerResult<CashierLast> {
        let closure = current_closure(&self.pool).await?;
        Ok(CashierLast::from(&closure))
    }

    /// Runs `transition` against the latest closure and persists the result
    /// with a version-conditional update, retrying on conflict.
    async fn mutate<T, F>(
        &self,
        operation: &'static str,
        mut transition: F,
    ) -> LedgerResult<(CashierClosure, T)>
    where
        T: Effect,
        F: FnMut(&mut CashierClosure, DateTime<Utc>) -> CoreResult<T>,
    {
        let _guard = self.writer.lock().await;

        for attempt in 1..=self.max_attempts {
            let mut closure = current_closure(&self.pool).await?;
            let effect = transition(&mut closure, Utc::now())?;

            let mut tx = self.pool.begin().await.map_err(DbError::from)?;

            let stored = match cashier_closure::update_versioned(&mut *tx, &closure).await {
                Ok(stored) => stored,
                Err(e) if e.is_conflict() => {
                    warn!(
                        operation,
                        attempt,
                        closure_id = %closure.id,
                        "Closure changed underneath, retrying"
                    );
                    tx.rollback().await.map_err(DbError::from)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(movement) = effect.movement() {
                cashier_closure::insert_movement(&mut *tx, movement).await?;
            }

            tx.commit().await.map_err(DbError::from)?;
            return Ok((stored, effect));
        }

        Err(self.exhausted(operation))
    }

    fn exhausted(&self, operation: &'static str) -> LedgerError {
        warn!(
            operation,
            attempts = self.max_attempts,
            "Giving up after repeated write conflicts"
        );
        LedgerError::ConflictRetriesExhausted {
            attempts: self.max_attempts,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tpv_core::ExpectedState;

    fn eur(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_before_first_open_are_not_found() {
        let db = setup().await;
        let ledger = db.ledger();

        let err = ledger.read_last().await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::NotFound { .. })));
        assert!(err.is_client_error());

        let err = ledger.deposit(eur(100), None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let db = setup().await;
        let ledger = db.ledger();
        let first = ledger.open().await.unwrap();

        let err = ledger.open().await.unwrap_err();
        match err {
            LedgerError::Domain(CoreError::InvalidState {
                expected,
                closure_id,
            }) => {
                assert_eq!(expected, ExpectedState::Closed);
                assert_eq!(closure_id, first.id);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.closures().count_open().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_movements_are_audited() {
        let db = setup().await;
        let ledger = db.ledger();
        let closure = ledger.open().await.unwrap();

        ledger.deposit(eur(5000), Some("float top-up")).await.unwrap();
        ledger.withdraw(eur(2000), Some("bank")).await.unwrap();

        let movements = db.closures().movements(&closure.id).await.unwrap();
        let comments: Vec<_> = movements.iter().map(|m| m.comment.as_deref()).collect();
        assert_eq!(comments, vec![Some("float top-up"), Some("bank")]);

        let stored = db.closures().latest().await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.running_cash(), eur(3000));
    }

    #[tokio::test]
    async fn test_rejected_withdrawal_writes_nothing() {
        let db = setup().await;
        let ledger = db.ledger();
        let closure = ledger.open().await.unwrap();
        ledger.deposit(eur(1000), None).await.unwrap();

        let err = ledger.withdraw(eur(1001), None).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InsufficientFunds { max_withdrawable }) if max_withdrawable == eur(1000)
        ));

        let stored = db.closures().latest().await.unwrap().unwrap();
        assert_eq!(stored.withdrawal, Money::zero());
        assert_eq!(stored.version, 1);
        assert_eq!(db.closures().movements(&closure.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_state_after_close_is_invalid_state() {
        let db = setup().await;
        let ledger = db.ledger();
        ledger.open().await.unwrap();
        ledger
            .close(&CloseRequest::new(eur(0), eur(0), None))
            .await
            .unwrap();

        let err = ledger.read_state().await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::InvalidState {
                expected: ExpectedState::Open,
                ..
            })
        ));

        let last = ledger.read_last().await.unwrap();
        assert!(last.closed);
    }
}
