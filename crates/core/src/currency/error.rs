//! Exchange rate error types.

use chrono::{DateTime, Utc};
use frostbook_shared::AppError;
use frostbook_shared::types::{CurrencyId, FinancialEntryId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while deriving exchange rates.
#[derive(Debug, Error)]
pub enum ExchangeRateError {
    /// No chain of exchanges links the two currencies.
    #[error("No exchange rate path from currency {source_currency_id} to {destination_currency_id} as of {as_of}")]
    Unreachable {
        /// Currency converted from.
        source_currency_id: CurrencyId,
        /// Currency converted to.
        destination_currency_id: CurrencyId,
        /// Instant the rates were taken at.
        as_of: DateTime<Utc>,
    },

    /// An exchange entry cannot be read as a rate.
    #[error("Exchange entry {entry_id} is malformed: {reason}")]
    MalformedExchange {
        /// Offending entry.
        entry_id: FinancialEntryId,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Loading exchange entries failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExchangeRateError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "EXCHANGE_RATE_UNREACHABLE",
            Self::MalformedExchange { .. } => "MALFORMED_EXCHANGE",
            Self::Store(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Unreachable { .. } => 422,
            Self::MalformedExchange { .. } => 500,
            Self::Store(err) => err.http_status_code(),
        }
    }
}

impl From<ExchangeRateError> for AppError {
    fn from(err: ExchangeRateError) -> Self {
        match err {
            ExchangeRateError::Unreachable { .. } => Self::BusinessRule(err.to_string()),
            ExchangeRateError::MalformedExchange { .. } => Self::Internal(err.to_string()),
            ExchangeRateError::Store(inner) => inner.into(),
        }
    }
}
