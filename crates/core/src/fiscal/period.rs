//! Frozen period types.

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{AccountId, CashFlowActivityId, FrozenPeriodId, UserId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An immutable, closed accounting interval `[started_at, finished_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenPeriod {
    /// Unique identifier.
    pub id: FrozenPeriodId,
    /// Owner of the period.
    pub owner_id: UserId,
    /// Inclusive start.
    pub started_at: DateTime<Utc>,
    /// Exclusive end.
    pub finished_at: DateTime<Utc>,
}

impl FrozenPeriod {
    /// Returns true if the instant falls inside this period.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.started_at && instant < self.finished_at
    }
}

/// Key tying one account to one period's calculated rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrozenAccountHash(String);

impl FrozenAccountHash {
    /// Derives the hash from the period boundaries and the account.
    ///
    /// Boundaries rather than the period id are hashed so rows can be keyed
    /// before the period is persisted.
    #[must_use]
    pub fn derive(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        account_id: AccountId,
    ) -> Self {
        let digest = Sha256::digest(format!(
            "{}|{}|{account_id}",
            started_at.to_rfc3339(),
            finished_at.to_rfc3339()
        ));
        Self(format!("{digest:x}"))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrozenAccountHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opened, unadjusted and closed totals of one account in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCalculation {
    /// Period/account key.
    pub frozen_account_hash: FrozenAccountHash,
    /// Account the totals belong to.
    pub account_id: AccountId,
    /// Debit carried in from the prior period.
    pub opened_debit_amount: Rational,
    /// Credit carried in from the prior period.
    pub opened_credit_amount: Rational,
    /// Opened debit plus real debits posted in the period.
    pub unadjusted_debit_amount: Rational,
    /// Opened credit plus real credits posted in the period.
    pub unadjusted_credit_amount: Rational,
    /// Unadjusted debit after closing entries.
    pub closed_debit_amount: Rational,
    /// Unadjusted credit after closing entries.
    pub closed_credit_amount: Rational,
}

impl SummaryCalculation {
    /// Closed debit minus closed credit.
    #[must_use]
    pub fn closed_net_debit(&self) -> Rational {
        &self.closed_debit_amount - &self.closed_credit_amount
    }

    /// Returns true if every total is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        [
            &self.opened_debit_amount,
            &self.opened_credit_amount,
            &self.unadjusted_debit_amount,
            &self.unadjusted_credit_amount,
            &self.closed_debit_amount,
            &self.closed_credit_amount,
        ]
        .iter()
        .all(|amount| amount.is_zero())
    }
}

/// Net liquid movement attributed to one account and cash flow activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCalculation {
    /// Period/account key.
    pub frozen_account_hash: FrozenAccountHash,
    /// Counterparty account of the liquid movement.
    pub account_id: AccountId,
    /// Activity the movement is reported under.
    pub cash_flow_activity_id: CashFlowActivityId,
    /// Positive when cash came in.
    pub net_amount: Rational,
}

/// A period and its rows, ready to be persisted in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenPeriodDraft {
    /// Owner of the period.
    pub owner_id: UserId,
    /// Inclusive start.
    pub started_at: DateTime<Utc>,
    /// Exclusive end.
    pub finished_at: DateTime<Utc>,
    /// One row per account.
    pub summary_calculations: Vec<SummaryCalculation>,
    /// One row per account and activity.
    pub flow_calculations: Vec<FlowCalculation>,
}
