//! # Repository Module
//!
//! Database repository implementations for the TPV back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two levels of access                                 │
//! │                                                                         │
//! │  Repository structs (pool-backed, read side)                           │
//! │  ├── CashierClosureRepository::latest / get_by_id / movements          │
//! │  ├── TicketRepository::get_by_id / list_for_day                        │
//! │  └── ArticleRepository::insert / get_by_code                           │
//! │                                                                         │
//! │  Executor-level functions (crate-private, write side)                  │
//! │  ├── cashier_closure::insert / update_versioned / insert_movement      │
//! │  ├── ticket::last_number / insert                                      │
//! │  └── article::decrement_stock                                          │
//! │       │                                                                 │
//! │       └── run inside the ledger's and recorder's transactions          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`cashier_closure::CashierClosureRepository`] - Closures and cash movements
//! - [`ticket::TicketRepository`] - Recorded tickets
//! - [`article::ArticleRepository`] - Catalog and stock

pub mod article;
pub mod cashier_closure;
pub mod ticket;
