//! # Ticket Recorder
//!
//! Records a sale: ledger accumulation, daily ticket number, stock
//! decrement and the ticket row, all in one transaction.
//!
//! ## All-or-Nothing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewTicket ── validate ──► writer lock                                 │
//! │                               │                                         │
//! │  BEGIN ───────────────────────┼──────────────────────────────────┐     │
//! │  │  closure.record_sale(cash, card, voucher)   (versioned UPDATE) │     │
//! │  │  next number = last ticket of today + 1, or 1                 │     │
//! │  │  stock -= amount   for every line (unknown code → NotFound)   │     │
//! │  │  INSERT ticket                                                │     │
//! │  COMMIT ─────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Any failure rolls back: no sale in the ledger without its ticket,     │
//! │  no ticket without its sale.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::ledger::current_closure;
use crate::repository::{article, cashier_closure, ticket};
use tpv_core::{CoreError, NewTicket, Ticket, TicketNumber};

/// Records tickets against the open cashier closure.
///
/// Obtain one with [`Database::recorder`](crate::Database::recorder); it
/// shares the writer lock of the ledger from the same handle.
#[derive(Debug, Clone)]
pub struct TicketRecorder {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
    max_attempts: u32,
}

impl TicketRecorder {
    pub(crate) fn new(pool: SqlitePool, writer: Arc<Mutex<()>>, max_attempts: u32) -> Self {
        TicketRecorder {
            pool,
            writer,
            max_attempts,
        }
    }

    /// Records a sale and returns the numbered ticket.
    ///
    /// ## Errors
    /// - `Validation` for an empty cart, a non-positive line amount, a
    ///   negative tender part or a discount above 100%
    /// - `InvalidState` when no period is open
    /// - `NotFound` for an unknown article code or before the first open
    pub async fn record(&self, new_ticket: NewTicket) -> LedgerResult<Ticket> {
        new_ticket.validate()?;

        let _guard = self.writer.lock().await;

        for attempt in 1..=self.max_attempts {
            let mut closure = current_closure(&self.pool).await?;
            closure.record_sale(new_ticket.tender)?;
            let now = Utc::now();

            let mut tx = self.pool.begin().await.map_err(DbError::from)?;

            match cashier_closure::update_versioned(&mut *tx, &closure).await {
                Ok(_) => {}
                Err(e) if e.is_conflict() => {
                    warn!(attempt, closure_id = %closure.id, "Closure changed underneath, retrying");
                    tx.rollback().await.map_err(DbError::from)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let last = ticket::last_number(&mut *tx).await?;
            let number = TicketNumber::next(last, now.date_naive());

            for line in &new_ticket.lines {
                match article::decrement_stock(&mut *tx, &line.code, line.amount).await {
                    Ok(()) => {}
                    Err(DbError::NotFound { .. }) => {
                        return Err(CoreError::not_found("Article", &line.code).into());
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let recorded = new_ticket.clone().into_ticket(number, now)?;
            match ticket::insert(&mut *tx, &recorded).await {
                Ok(()) => {}
                Err(DbError::UniqueViolation { .. }) => {
                    // Another process took this number between our read and insert.
                    warn!(attempt, number = %number, "Ticket number taken, retrying");
                    tx.rollback().await.map_err(DbError::from)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit().await.map_err(DbError::from)?;

            info!(
                ticket = %recorded.id,
                closure_id = %closure.id,
                total = %recorded.total,
                "Ticket recorded"
            );
            return Ok(recorded);
        }

        warn!(attempts = self.max_attempts, "Giving up recording ticket");
        Err(LedgerError::ConflictRetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
