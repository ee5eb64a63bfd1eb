//! # Tickets
//!
//! Sale tickets, their shopping lines, and the daily ticket numbering rule.
//!
//! ## Daily Numbering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  last ticket            today          next number                      │
//! │  ─────────────────      ──────────     ───────────────                  │
//! │  (none)                 2019-01-12  →  201901121                        │
//! │  2019-01-12 #1          2019-01-12  →  201901122                        │
//! │  2019-01-12 #3          2019-01-13  →  201901131   (day rolled over)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reference is the UTC date as `YYYYMMDD` followed by the sequence
//! number without padding.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::closure::SaleTender;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_article_code, validate_comment, validate_discount_bps, validate_line_amount,
    validate_tender_part,
};

// =============================================================================
// Ticket Number
// =============================================================================

/// Daily sequential ticket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketNumber {
    pub date: NaiveDate,
    pub seq: u32,
}

impl TicketNumber {
    /// Next number given the latest issued one.
    ///
    /// Restarts at 1 whenever `today` differs from the latest ticket's date.
    pub fn next(last: Option<TicketNumber>, today: NaiveDate) -> TicketNumber {
        let seq = match last {
            Some(last) if last.date == today => last.seq + 1,
            _ => 1,
        };
        TicketNumber { date: today, seq }
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.date.format("%Y%m%d"), self.seq)
    }
}

// =============================================================================
// Shopping Lines
// =============================================================================

/// Whether the customer took the goods with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ShoppingState {
    Committed,
    NotCommitted,
}

/// One line of a ticket. Description and price are snapshots taken at sale
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShoppingLine {
    pub code: String,
    pub description: String,
    pub retail_price: Money,
    pub amount: i64,
    /// Discount in basis points (1000 = 10%).
    pub discount_bps: u32,
    pub state: ShoppingState,
}

impl ShoppingLine {
    /// `retail_price × amount`, minus the line discount.
    ///
    /// Saturates instead of overflowing; validated lines never reach the
    /// bound.
    pub fn line_total(&self) -> Money {
        self.retail_price
            .saturating_multiply_quantity(self.amount)
            .apply_percentage_discount(self.discount_bps)
    }

    /// Like [`line_total`](Self::line_total), `None` when `price × amount`
    /// does not fit in i64 cents.
    pub fn checked_line_total(&self) -> Option<Money> {
        self.retail_price
            .checked_multiply_quantity(self.amount)
            .map(|gross| gross.apply_percentage_discount(self.discount_bps))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_article_code(&self.code)?;
        validate_line_amount(self.amount)?;
        validate_discount_bps(self.discount_bps)?;
        if self.retail_price.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "retail price".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// A sale as submitted by a terminal, before numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub lines: Vec<ShoppingLine>,
    pub tender: SaleTender,
    pub user_mobile: Option<String>,
    pub note: Option<String>,
}

impl NewTicket {
    /// Checks the cart and tender before any state is touched.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(ValidationError::Required {
                field: "shopping cart".to_string(),
            }
            .into());
        }
        for line in &self.lines {
            line.validate()?;
        }
        if self.checked_total().is_none() {
            return Err(too_large("ticket total").into());
        }
        validate_tender_part("cash", self.tender.cash)?;
        validate_tender_part("card", self.tender.card)?;
        validate_tender_part("voucher", self.tender.voucher)?;
        if self.tender.checked_total().is_none() {
            return Err(too_large("tender total").into());
        }
        validate_comment(self.note.as_deref())?;
        Ok(())
    }

    /// Sum of line totals, saturating at the i64 bound.
    pub fn total(&self) -> Money {
        self.lines
            .iter()
            .map(ShoppingLine::line_total)
            .fold(Money::zero(), Money::saturating_add)
    }

    /// Sum of line totals, `None` on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.lines.iter().try_fold(Money::zero(), |acc, line| {
            acc.checked_add(line.checked_line_total()?)
        })
    }

    /// Assigns the ticket number and creation time.
    ///
    /// ## Errors
    /// - `Validation` when the note is too long
    pub fn into_ticket(self, number: TicketNumber, now: DateTime<Utc>) -> CoreResult<Ticket> {
        let note = validate_comment(self.note.as_deref())?;
        let total = self.total();
        Ok(Ticket {
            id: number.to_string(),
            ticket_date: number.date,
            seq: number.seq,
            creation_date: now,
            lines: self.lines,
            tender: self.tender,
            total,
            user_mobile: self.user_mobile,
            note,
        })
    }
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ticket {
    /// Reference, e.g. `201901123`.
    pub id: String,
    #[ts(as = "String")]
    pub ticket_date: NaiveDate,
    pub seq: u32,
    #[ts(as = "String")]
    pub creation_date: DateTime<Utc>,
    pub lines: Vec<ShoppingLine>,
    pub tender: SaleTender,
    pub total: Money,
    pub user_mobile: Option<String>,
    pub note: Option<String>,
}

impl Ticket {
    pub fn number(&self) -> TicketNumber {
        TicketNumber {
            date: self.ticket_date,
            seq: self.seq,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
