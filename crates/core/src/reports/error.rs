//! Report error types.

use frostbook_shared::AppError;
use frostbook_shared::types::CurrencyId;
use thiserror::Error;

use crate::fiscal::FiscalError;

/// Errors that can occur during statement generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The destination currency is not one of the user's.
    #[error("Currency not found: {0}")]
    UnknownCurrency(CurrencyId),

    /// Loading or computing a time group failed.
    #[error(transparent)]
    Fiscal(#[from] FiscalError),
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCurrency(_) => "CURRENCY_NOT_FOUND",
            Self::Fiscal(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::UnknownCurrency(_) => 404,
            Self::Fiscal(err) => err.http_status_code(),
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::UnknownCurrency(_) => Self::NotFound(err.to_string()),
            ReportError::Fiscal(inner) => inner.into(),
        }
    }
}
