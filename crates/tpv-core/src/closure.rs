//! # Cashier Closure
//!
//! The ledger period of a cash drawer and its pure state transitions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cashier Closure Lifecycle                           │
//! │                                                                         │
//! │  open_after(previous)          initial_cash = previous.final_cash       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────┐  record_sale / deposit / withdraw                          │
//! │  │  OPEN   │◄──────────────┐                                            │
//! │  └────┬────┘───────────────┘                                            │
//! │       │ close(final_card, final_cash, comment)                          │
//! │       ▼                                                                 │
//! │  ┌─────────┐                                                            │
//! │  │ CLOSED  │  terminal: every mutation fails with InvalidState          │
//! │  └─────────┘                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Running Cash
//! `running_cash = initial_cash + sales_cash + deposit − withdrawal`
//!
//! Card sales and vouchers never enter the drawer, so they count towards
//! the sales total but not towards running cash.
//!
//! Every transition validates first and mutates last: a rejected call
//! leaves the closure exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_comment, validate_declared_amount, validate_movement_amount, ValidationResult,
};

// =============================================================================
// Closure Status
// =============================================================================

/// Lifecycle state of a closure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ClosureStatus {
    /// Period in progress; accepts sales and cash movements.
    Open,
    /// Period reconciled and closed. Terminal.
    Closed,
}

// =============================================================================
// Sale Tender
// =============================================================================

/// How a sale was paid: the split reported by the ticket recorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleTender {
    pub cash: Money,
    pub card: Money,
    pub voucher: Money,
}

impl SaleTender {
    pub fn new(cash: Money, card: Money, voucher: Money) -> Self {
        SaleTender {
            cash,
            card,
            voucher,
        }
    }

    /// Total amount paid across the three tenders.
    pub fn total(&self) -> Money {
        self.cash + self.card + self.voucher
    }

    /// Total amount paid, `None` on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.cash.checked_add(self.card)?.checked_add(self.voucher)
    }
}

// =============================================================================
// Cash Movements
// =============================================================================

/// Direction of a manual cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MovementKind {
    Deposit,
    Withdrawal,
}

/// Audit entry for a deposit or withdrawal, carrying the operator comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub closure_id: String,
    pub kind: MovementKind,
    pub amount: Money,
    pub comment: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Operator-declared counts submitted when closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    pub final_card: Money,
    pub final_cash: Money,
    pub comment: Option<String>,
}

impl CloseRequest {
    pub fn new(final_card: Money, final_cash: Money, comment: Option<&str>) -> Self {
        CloseRequest {
            final_card,
            final_cash,
            comment: comment.map(str::to_string),
        }
    }

    fn validated(&self) -> ValidationResult<CloseRequest> {
        validate_declared_amount("finalCard", self.final_card)?;
        validate_declared_amount("finalCash", self.final_cash)?;
        Ok(CloseRequest {
            final_card: self.final_card,
            final_cash: self.final_cash,
            comment: validate_comment(self.comment.as_deref())?,
        })
    }
}

// =============================================================================
// Cashier Closure
// =============================================================================

/// One ledger period, from opening to close.
///
/// `version` is bumped on every persisted change; the database layer uses
/// it for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashierClosure {
    pub id: String,
    pub status: ClosureStatus,
    #[ts(as = "String")]
    pub opening_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closing_date: Option<DateTime<Utc>>,
    pub initial_cash: Money,
    pub sales_cash: Money,
    pub sales_card: Money,
    pub used_vouchers: Money,
    pub deposit: Money,
    pub withdrawal: Money,
    pub final_cash: Option<Money>,
    pub final_card: Option<Money>,
    pub comment: Option<String>,
    pub version: i64,
}

impl CashierClosure {
    /// Creates a fresh open period with the given starting cash.
    pub fn new_open(id: impl Into<String>, initial_cash: Money, now: DateTime<Utc>) -> Self {
        CashierClosure {
            id: id.into(),
            status: ClosureStatus::Open,
            opening_date: now,
            closing_date: None,
            initial_cash,
            sales_cash: Money::zero(),
            sales_card: Money::zero(),
            used_vouchers: Money::zero(),
            deposit: Money::zero(),
            withdrawal: Money::zero(),
            final_cash: None,
            final_card: None,
            comment: None,
            version: 0,
        }
    }

    /// Opens the period that follows `previous` (the latest closure, if any).
    ///
    /// ## Carry-Forward
    /// `initial_cash` is the previous period's declared `final_cash`, or
    /// zero when no period exists yet.
    ///
    /// ## Errors
    /// `InvalidState` when `previous` is still open.
    pub fn open_after(
        previous: Option<&CashierClosure>,
        now: DateTime<Utc>,
    ) -> CoreResult<CashierClosure> {
        let initial_cash = match previous {
            Some(prev) if prev.is_open() => return Err(CoreError::expected_closed(&prev.id)),
            Some(prev) => prev.final_cash.unwrap_or_default(),
            None => Money::zero(),
        };
        Ok(CashierClosure::new_open(
            Uuid::new_v4().to_string(),
            initial_cash,
            now,
        ))
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ClosureStatus::Open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == ClosureStatus::Closed
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::expected_open(&self.id))
        }
    }

    /// Expected cash in the drawer right now.
    pub fn running_cash(&self) -> Money {
        self.initial_cash + self.sales_cash + self.deposit - self.withdrawal
    }

    /// Card + cash + vouchers sold in this period.
    pub fn sales_total(&self) -> Money {
        self.sales_card + self.sales_cash + self.used_vouchers
    }

    /// Declared minus projected cash, once closed. Informational only.
    pub fn cash_discrepancy(&self) -> Option<Money> {
        self.final_cash.map(|declared| declared - self.running_cash())
    }

    /// Accumulates a sale. Amounts are trusted as already validated.
    ///
    /// ## Errors
    /// - `InvalidState` when the period is closed
    /// - `Validation` (`OutOfRange`) when a total would overflow
    pub fn record_sale(&mut self, tender: SaleTender) -> CoreResult<()> {
        self.ensure_open()?;

        let mut next = self.clone();
        next.sales_cash = accumulate("sales cash", self.sales_cash, tender.cash)?;
        next.sales_card = accumulate("sales card", self.sales_card, tender.card)?;
        next.used_vouchers = accumulate("used vouchers", self.used_vouchers, tender.voucher)?;
        next.ensure_totals_fit()?;

        *self = next;
        Ok(())
    }

    /// Adds cash to the drawer.
    ///
    /// ## Errors
    /// - `Validation` when `amount` is not positive
    /// - `InvalidState` when the period is closed
    pub fn deposit(
        &mut self,
        amount: Money,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<CashMovement> {
        validate_movement_amount(amount)?;
        let comment = validate_comment(comment)?;
        self.ensure_open()?;

        let mut next = self.clone();
        next.deposit = accumulate("deposit", self.deposit, amount)?;
        next.ensure_totals_fit()?;

        *self = next;
        Ok(self.movement(MovementKind::Deposit, amount, comment, now))
    }

    /// Takes cash out of the drawer.
    ///
    /// ## Errors
    /// - `Validation` when `amount` is not positive
    /// - `InvalidState` when the period is closed
    /// - `InsufficientFunds` when `amount` exceeds the running cash
    pub fn withdraw(
        &mut self,
        amount: Money,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<CashMovement> {
        validate_movement_amount(amount)?;
        let comment = validate_comment(comment)?;
        self.ensure_open()?;

        let available = self.running_cash();
        if amount > available {
            return Err(CoreError::InsufficientFunds {
                max_withdrawable: available,
            });
        }

        self.withdrawal += amount;
        Ok(self.movement(MovementKind::Withdrawal, amount, comment, now))
    }

    /// Closes the period with the operator's declared counts.
    ///
    /// The declared `final_cash` is authoritative; a difference from
    /// `running_cash` is kept for audit (`cash_discrepancy`) and is not an
    /// error.
    pub fn close(&mut self, request: &CloseRequest, now: DateTime<Utc>) -> CoreResult<()> {
        let request = request.validated()?;
        self.ensure_open()?;

        self.final_card = Some(request.final_card);
        self.final_cash = Some(request.final_cash);
        self.comment = request.comment;
        self.closing_date = Some(now);
        self.status = ClosureStatus::Closed;
        Ok(())
    }

    /// In-progress totals of the open period.
    pub fn state(&self) -> CoreResult<CashierState> {
        self.ensure_open()?;
        Ok(CashierState {
            sales_total: self.sales_total(),
            sales_card: self.sales_card,
            final_cash_projected: self.running_cash(),
            used_vouchers: self.used_vouchers,
        })
    }

    /// Running cash and sales total must stay representable.
    fn ensure_totals_fit(&self) -> CoreResult<()> {
        let running = self
            .initial_cash
            .checked_add(self.sales_cash)
            .and_then(|m| m.checked_add(self.deposit))
            .and_then(|m| m.checked_sub(self.withdrawal));
        if running.is_none() {
            return Err(out_of_range("running cash"));
        }
        let sales = self
            .sales_card
            .checked_add(self.sales_cash)
            .and_then(|m| m.checked_add(self.used_vouchers));
        if sales.is_none() {
            return Err(out_of_range("sales total"));
        }
        Ok(())
    }

    fn movement(
        &self,
        kind: MovementKind,
        amount: Money,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> CashMovement {
        CashMovement {
            id: Uuid::new_v4().to_string(),
            closure_id: self.id.clone(),
            kind,
            amount,
            comment,
            created_at: now,
        }
    }
}

fn out_of_range(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

fn accumulate(field: &str, current: Money, amount: Money) -> CoreResult<Money> {
    current
        .checked_add(amount)
        .ok_or_else(|| out_of_range(field))
}

// =============================================================================
// Read Models
// =============================================================================

/// Totals of the open period (`GET /cashier-closures/last/state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashierState {
    pub sales_total: Money,
    pub sales_card: Money,
    pub final_cash_projected: Money,
    pub used_vouchers: Money,
}

/// Audit view of the latest period (`GET /cashier-closures/last`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashierLast {
    pub id: String,
    pub closed: bool,
    #[ts(as = "String")]
    pub opening_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closing_date: Option<DateTime<Utc>>,
    pub initial_cash: Money,
    pub running_cash: Money,
    pub sales_total: Money,
    pub final_cash: Option<Money>,
    pub final_card: Option<Money>,
    pub cash_discrepancy: Option<Money>,
    pub comment: Option<String>,
}

impl From<&CashierClosure> for CashierLast {
    fn from(closure: &CashierClosure) -> Self {
        CashierLast {
            id: closure.id.clone(),
            closed: closure.is_closed(),
            opening_date: closure.opening_date,
            closing_date: closure.closing_date,
            initial_cash: closure.initial_cash,
            running_cash: closure.running_cash(),
            sales_total: closure.sales_total(),
            final_cash: closure.final_cash,
            final_card: closure.final_card,
            cash_discrepancy: closure.cash_discrepancy(),
            comment: closure.comment.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
