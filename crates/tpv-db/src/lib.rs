//! # tpv-db: Database Layer for the TPV Back Office
//!
//! SQLite persistence for cashier closures, cash movements, articles and
//! tickets, and the two services that write them: [`CashierLedger`] and
//! [`TicketRecorder`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TPV Data Flow                                    │
//! │                                                                         │
//! │  Operator (cashier CLI / controller)      Terminal (sale finalized)    │
//! │       │                                         │                       │
//! │       ▼                                         ▼                       │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tpv-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────┐     │   │
//! │  │   │ CashierLedger │   │ TicketRecorder│   │  Migrations  │     │   │
//! │  │   │  (ledger.rs)  │   │ (recorder.rs) │   │  (embedded)  │     │   │
//! │  │   └───────┬───────┘   └───────┬───────┘   └──────────────┘     │   │
//! │  │           │  shared writer    │                                │   │
//! │  │           ▼      lock         ▼                                │   │
//! │  │   ┌─────────────────────────────────────┐   ┌──────────────┐  │   │
//! │  │   │ Repositories (closure/ticket/article)│──►│  Database    │  │   │
//! │  │   └─────────────────────────────────────┘   │  (pool.rs)   │  │   │
//! │  │                                              └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - Cashier ledger (open, sale, deposit, withdraw, close, reads)
//! - [`recorder`] - Ticket recorder
//! - [`config`] - Environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tpv_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! db.ledger().open().await?;
//! db.ledger().deposit(Money::from_cents(5000), Some("float top-up")).await?;
//! let state = db.ledger().read_state().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod recorder;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::CashierLedger;
pub use pool::{Database, DbConfig};
pub use recorder::TicketRecorder;

// Repository re-exports for convenience
pub use repository::article::ArticleRepository;
pub use repository::cashier_closure::CashierClosureRepository;
pub use repository::ticket::TicketRepository;
