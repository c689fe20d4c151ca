//! Core ledger engine for Frostbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the [`store::LedgerStore`] port.
//!
//! # Modules
//!
//! - `ledger` - Permission matrix and balance validation of entries
//! - `currency` - Exact conversion and exchange rate derivation
//! - `fiscal` - Frozen period closing and time groups
//! - `reports` - Multi-currency financial statements
//! - `store` - Persistence port
//! - `context` - Per-request context

pub mod context;
pub mod currency;
pub mod fiscal;
pub mod ledger;
pub mod reports;
pub mod store;

pub use context::LedgerContext;
pub use currency::{CurrencyService, ExchangeRateDerivator, ExchangeRateError};
pub use fiscal::{ClosingService, FiscalError, PeriodComputation, TimeGroupManager};
pub use ledger::{LedgerError, LedgerService};
pub use reports::{ReportError, ReportService, Statement, StatementOutcome};
pub use store::{LedgerStore, StoreError};
