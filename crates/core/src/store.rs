//! Persistence port consumed by the engine.
//!
//! The engine never talks to a database directly. Callers hand it an
//! implementation of [`LedgerStore`]; the in-memory one lives in
//! `frostbook-db`.

use chrono::{DateTime, Utc};
use frostbook_shared::AppError;
use frostbook_shared::types::{AccountId, ModifierId, UserId};
use thiserror::Error;

use crate::fiscal::period::{
    FlowCalculation, FrozenAccountHash, FrozenPeriod, FrozenPeriodDraft, SummaryCalculation,
};
use crate::ledger::types::{Account, Currency, FinancialEntry, Modifier};

/// Errors surfaced by a store. Passed through the engine unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Raw identifier.
        id: u64,
    },

    /// The entity belongs to another user.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The write lost a race or broke a uniqueness rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Backend(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::Backend(_) => 500,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Forbidden(msg) => Self::Forbidden(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Backend(msg) => Self::Database(msg),
        }
    }
}

/// Loads and saves the entities the engine works on.
///
/// Reads are scoped to one user. Implementations must give at least
/// read-committed isolation for the duration of one computation.
pub trait LedgerStore {
    /// Every currency owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_currencies(&self, user_id: UserId) -> Result<Vec<Currency>, StoreError>;

    /// The given accounts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::Forbidden` for an account of another user.
    fn load_accounts(&self, user_id: UserId, ids: &[AccountId])
    -> Result<Vec<Account>, StoreError>;

    /// Every account owned by the user, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_all_accounts(&self, user_id: UserId) -> Result<Vec<Account>, StoreError>;

    /// The given modifiers with their atoms.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::Forbidden` as for accounts.
    fn load_modifiers(
        &self,
        user_id: UserId,
        ids: &[ModifierId],
    ) -> Result<Vec<Modifier>, StoreError>;

    /// Entries transacted in `[started_at, finished_at)`, with their atoms.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_financial_entries(
        &self,
        user_id: UserId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<Vec<FinancialEntry>, StoreError>;

    /// Returns true if any entry was transacted before `instant`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn has_entries_before(&self, user_id: UserId, instant: DateTime<Utc>)
    -> Result<bool, StoreError>;

    /// Entries of `exchange` modifiers transacted at or before `until`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_exchange_entries(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEntry>, StoreError>;

    /// Frozen periods of the user, ordered by start.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_frozen_periods(&self, user_id: UserId) -> Result<Vec<FrozenPeriod>, StoreError>;

    /// Summary rows for the given keys. Unknown keys are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_summary_calculations(
        &self,
        hashes: &[FrozenAccountHash],
    ) -> Result<Vec<SummaryCalculation>, StoreError>;

    /// Flow rows for the given keys. Unknown keys are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend fails.
    fn load_flow_calculations(
        &self,
        hashes: &[FrozenAccountHash],
    ) -> Result<Vec<FlowCalculation>, StoreError>;

    /// Persists a period and all of its rows atomically.
    ///
    /// Either everything becomes visible or nothing does.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the draft no longer follows the
    /// last frozen period.
    fn commit_frozen_period(&mut self, draft: FrozenPeriodDraft)
    -> Result<FrozenPeriod, StoreError>;
}
