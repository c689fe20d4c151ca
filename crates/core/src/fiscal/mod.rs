//! Frozen periods: closing, carry-forward and time groups.

pub mod calculator;
pub mod error;
pub mod period;
pub mod service;
pub mod time_group;

pub use calculator::{
    CalculatorInput, CurrencyTrialBalance, FrozenPeriodCalculator, PeriodComputation,
};
pub use error::FiscalError;
pub use period::{
    FlowCalculation, FrozenAccountHash, FrozenPeriod, FrozenPeriodDraft, SummaryCalculation,
};
pub use service::ClosingService;
pub use time_group::{Figure, TimeGroup, TimeGroupManager};
