//! # tpv-core: Pure Business Logic for the TPV Back Office
//!
//! This crate holds the cashier-closure ledger rules, cash arithmetic, ticket
//! numbering and the article-family tree as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TPV Back Office                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (cashier CLI, HTTP controller)               │   │
//! │  │   open ──► deposit/withdraw ──► record ticket ──► close         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        tpv-db: CashierLedger, TicketRecorder, repositories      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tpv-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  closure  │  │   money   │  │  ticket   │  │  family   │  │   │
//! │  │   │ lifecycle │  │   Money   │  │ numbering │  │   tree    │  │   │
//! │  │   │ read view │  │  parsing  │  │   lines   │  │  walking  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`article`] - Catalog articles sold through tickets
//! - [`closure`] - Cashier closure state machine and read models
//! - [`money`] - Money type with integer cents
//! - [`ticket`] - Tickets, shopping lines, daily numbering
//! - [`family`] - Article family tree
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules checked before any state is read
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tpv_core::{CashierClosure, Money, SaleTender};
//!
//! let mut closure = CashierClosure::open_after(None, Utc::now()).unwrap();
//! closure
//!     .record_sale(SaleTender::new(Money::from_cents(2500), Money::from_cents(1000), Money::zero()))
//!     .unwrap();
//! closure.deposit(Money::from_cents(5000), None, Utc::now()).unwrap();
//!
//! assert_eq!(closure.running_cash().to_string(), "75.00€");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod article;
pub mod closure;
pub mod error;
pub mod family;
pub mod money;
pub mod ticket;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use article::Article;
pub use closure::{
    CashMovement, CashierClosure, CashierLast, CashierState, CloseRequest, ClosureStatus,
    MovementKind, SaleTender,
};
pub use error::{CoreError, CoreResult, ExpectedState, ValidationError};
pub use family::{FamilyId, FamilyNode, FamilyTree};
pub use money::Money;
pub use ticket::{NewTicket, ShoppingLine, ShoppingState, Ticket, TicketNumber};
