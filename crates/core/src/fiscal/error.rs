//! Fiscal (period closing) error types.

use chrono::{DateTime, Utc};
use frostbook_shared::types::{AccountId, CurrencyId, FinancialEntryId, ModifierAtomId, ModifierId};
use frostbook_shared::{AppError, Rational};
use thiserror::Error;

use crate::currency::ExchangeRateError;
use crate::store::StoreError;

/// Errors raised while computing or freezing a period.
#[derive(Debug, Error)]
pub enum FiscalError {
    // ========== Period Boundaries ==========
    /// The period has no duration.
    #[error("Period must end after it starts ({started_at} .. {finished_at})")]
    EmptyPeriod {
        /// Requested start.
        started_at: DateTime<Utc>,
        /// Requested end.
        finished_at: DateTime<Utc>,
    },

    /// The period ends after now.
    #[error("Period cannot end in the future ({finished_at} is after {now})")]
    EndInFuture {
        /// Requested end.
        finished_at: DateTime<Utc>,
        /// The current instant.
        now: DateTime<Utc>,
    },

    /// The period starts after the last frozen period ends.
    #[error("Period leaves a gap: expected start {expected}, got {started_at}")]
    Gap {
        /// End of the last frozen period.
        expected: DateTime<Utc>,
        /// Requested start.
        started_at: DateTime<Utc>,
    },

    /// The period starts before the last frozen period ends.
    #[error("Period overlaps a frozen period: expected start {expected}, got {started_at}")]
    Overlap {
        /// End of the last frozen period.
        expected: DateTime<Utc>,
        /// Requested start.
        started_at: DateTime<Utc>,
    },

    /// The first period would leave earlier entries outside every period.
    #[error("Entries exist before the first period's start {started_at}")]
    UncoveredEntries {
        /// Requested start.
        started_at: DateTime<Utc>,
    },

    // ========== Entry Data ==========
    /// An entry references a modifier that was not loaded.
    #[error("Modifier {modifier_id} of entry {entry_id} not found")]
    MissingModifier {
        /// Entry being processed.
        entry_id: FinancialEntryId,
        /// Missing modifier.
        modifier_id: ModifierId,
    },

    /// A modifier atom references an account that was not loaded.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A posting entry lacks a value for one of its real atoms.
    #[error("Entry {entry_id} has no value for modifier atom {modifier_atom_id}")]
    MissingEntryValue {
        /// Entry being processed.
        entry_id: FinancialEntryId,
        /// Atom without a value.
        modifier_atom_id: ModifierAtomId,
    },

    /// A close entry's modifier lacks a real debit or credit leg.
    #[error("Close entry {0} needs one real debit and one real credit atom")]
    MalformedClose(FinancialEntryId),

    /// A close entry moves value across currencies.
    #[error("Close entry {0} links accounts of different currencies")]
    CloseAcrossCurrencies(FinancialEntryId),

    /// A time group index past the end of the manager's groups.
    #[error("Time group {0} does not exist")]
    UnknownTimeGroup(usize),

    // ========== Freeze Gate ==========
    /// The period's movement does not balance in one currency.
    #[error("Period does not balance in currency {currency_id}. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Currency that does not balance.
        currency_id: CurrencyId,
        /// Debit movement.
        debit: Rational,
        /// Credit movement.
        credit: Rational,
    },

    /// A temporary account still carries a balance after closing.
    #[error("Temporary account {account_id} was not closed (net {net})")]
    TemporaryAccountNotClosed {
        /// Offending account.
        account_id: AccountId,
        /// Closed debit minus closed credit.
        net: Rational,
    },

    // ========== Collaborators ==========
    /// Conversion failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeRateError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyPeriod { .. } => "EMPTY_PERIOD",
            Self::EndInFuture { .. } => "PERIOD_END_IN_FUTURE",
            Self::Gap { .. } => "PERIOD_GAP",
            Self::Overlap { .. } => "PERIOD_OVERLAP",
            Self::UncoveredEntries { .. } => "UNCOVERED_ENTRIES",
            Self::MissingModifier { .. } => "MODIFIER_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::MissingEntryValue { .. } => "MISSING_ENTRY_VALUE",
            Self::MalformedClose(_) => "MALFORMED_CLOSE",
            Self::CloseAcrossCurrencies(_) => "CLOSE_ACROSS_CURRENCIES",
            Self::UnknownTimeGroup(_) => "TIME_GROUP_NOT_FOUND",
            Self::Unbalanced { .. } => "PERIOD_UNBALANCED",
            Self::TemporaryAccountNotClosed { .. } => "TEMPORARY_ACCOUNT_NOT_CLOSED",
            Self::Exchange(err) => err.error_code(),
            Self::Store(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::EmptyPeriod { .. } | Self::EndInFuture { .. } => 400,
            Self::Gap { .. }
            | Self::Overlap { .. }
            | Self::UncoveredEntries { .. }
            | Self::Unbalanced { .. }
            | Self::TemporaryAccountNotClosed { .. }
            | Self::CloseAcrossCurrencies(_) => 422,
            Self::MissingModifier { .. }
            | Self::AccountNotFound(_)
            | Self::UnknownTimeGroup(_) => 404,
            Self::MissingEntryValue { .. } | Self::MalformedClose(_) => 500,
            Self::Exchange(err) => err.http_status_code(),
            Self::Store(err) => err.http_status_code(),
        }
    }

    /// Returns true if the period itself cannot be reconciled.
    #[must_use]
    pub fn is_irreconcilable(&self) -> bool {
        matches!(
            self,
            Self::Gap { .. }
                | Self::Overlap { .. }
                | Self::UncoveredEntries { .. }
                | Self::Unbalanced { .. }
                | Self::TemporaryAccountNotClosed { .. }
        )
    }
}

impl From<FiscalError> for AppError {
    fn from(err: FiscalError) -> Self {
        match err {
            FiscalError::Exchange(inner) => inner.into(),
            FiscalError::Store(inner) => inner.into(),
            FiscalError::EmptyPeriod { .. } | FiscalError::EndInFuture { .. } => {
                Self::Validation(err.to_string())
            }
            FiscalError::MissingModifier { .. }
            | FiscalError::AccountNotFound(_)
            | FiscalError::UnknownTimeGroup(_) => Self::NotFound(err.to_string()),
            FiscalError::MissingEntryValue { .. } | FiscalError::MalformedClose(_) => {
                Self::Internal(err.to_string())
            }
            _ => Self::BusinessRule(err.to_string()),
        }
    }
}
