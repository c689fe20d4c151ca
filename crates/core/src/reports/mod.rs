//! Financial statement generation.
//!
//! For each time group and source currency this module builds:
//! - Unadjusted and adjusted trial balances
//! - Income statement
//! - Balance sheet with income folded into equity
//! - Cash flow statement

pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
