//! Per-request ledger context.

use chrono::{DateTime, Utc};
use frostbook_shared::ExchangeRateBasis;
use frostbook_shared::types::UserId;

/// Everything a computation needs to know about who is asking and when.
///
/// Built by the caller for one request and passed explicitly to every
/// service. Nothing in the engine reads the clock or a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerContext {
    /// Owner of the ledger being read.
    pub user_id: UserId,
    /// The instant treated as "now".
    pub now: DateTime<Utc>,
    /// Exchange rate basis for conversions.
    pub basis: ExchangeRateBasis,
}

impl LedgerContext {
    /// Creates a context with the default (periodic) basis.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            now,
            basis: ExchangeRateBasis::default(),
        }
    }

    /// Returns a copy using the given basis.
    #[must_use]
    pub const fn with_basis(mut self, basis: ExchangeRateBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Effective as-of instant for a group ending at `finished_at`.
    ///
    /// `None` means the group is still open and ends now.
    #[must_use]
    pub fn as_of(&self, finished_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
        match (self.basis, finished_at) {
            (ExchangeRateBasis::Periodic, Some(end)) => end,
            _ => self.now,
        }
    }
}
