//! JSON snapshot of one owner's ledger.
//!
//! A snapshot is the fixture format of the workspace: tests and the `closer`
//! binary load one into a [`MemoryStore`], and a freeze can be written back.
//! Loading replays every record through the store's validation, so a
//! snapshot that loads is a consistent ledger.

use std::fs;
use std::path::Path;

use frostbook_core::fiscal::{FlowCalculation, FrozenPeriod, SummaryCalculation};
use frostbook_core::ledger::{Account, Currency, FinancialEntry, Modifier};
use frostbook_shared::types::UserId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SnapshotError;
use crate::memory::{FrozenPeriodRows, MemoryStore};

/// A frozen period and its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenPeriodRecord {
    /// The period.
    #[serde(flatten)]
    pub period: FrozenPeriod,
    /// Summary rows.
    #[serde(default)]
    pub summary_calculations: Vec<SummaryCalculation>,
    /// Flow rows.
    #[serde(default)]
    pub flow_calculations: Vec<FlowCalculation>,
}

/// Everything one owner has recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Owner of every record.
    pub owner_id: UserId,
    /// Currencies.
    #[serde(default)]
    pub currencies: Vec<Currency>,
    /// Accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Modifiers.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Financial entries.
    #[serde(default)]
    pub financial_entries: Vec<FinancialEntry>,
    /// Frozen periods, oldest first.
    #[serde(default)]
    pub frozen_periods: Vec<FrozenPeriodRecord>,
}

impl Snapshot {
    /// Parses a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` for malformed input.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the snapshot as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Io` or `SnapshotError::Json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading snapshot");
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Writes the snapshot to a file.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Io` or `SnapshotError::Json`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "writing snapshot");
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Replays every record into a fresh store.
    ///
    /// Entries go in before frozen periods so that the store's frozen-date
    /// guard does not refuse them.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Record` for the first record the store
    /// refuses.
    pub fn into_store(self) -> Result<MemoryStore, SnapshotError> {
        let mut store = MemoryStore::new();
        for currency in self.currencies {
            store.insert_currency(currency)?;
        }
        for account in self.accounts {
            store.insert_account(account)?;
        }
        for modifier in self.modifiers {
            store.insert_modifier(self.owner_id, modifier)?;
        }
        for entry in self.financial_entries {
            store.insert_financial_entry(self.owner_id, entry)?;
        }
        for record in self.frozen_periods {
            store.restore_frozen_period(FrozenPeriodRows {
                period: record.period,
                summary_calculations: record.summary_calculations,
                flow_calculations: record.flow_calculations,
            })?;
        }
        Ok(store)
    }

    /// Captures one owner's records from a store.
    #[must_use]
    pub fn capture(store: &MemoryStore, owner_id: UserId) -> Self {
        let records = store.export(owner_id);
        Self {
            owner_id,
            currencies: records.currencies,
            accounts: records.accounts,
            modifiers: records.modifiers,
            financial_entries: records.financial_entries,
            frozen_periods: records
                .frozen_periods
                .into_iter()
                .map(|rows| FrozenPeriodRecord {
                    period: rows.period,
                    summary_calculations: rows.summary_calculations,
                    flow_calculations: rows.flow_calculations,
                })
                .collect(),
        }
    }
}
