//! In-memory implementation of the ledger store.
//!
//! Every read is scoped to one owner: asking for another owner's account or
//! modifier is `Forbidden`, asking for an unknown one is `NotFound`. Entries
//! and modifiers pass the ledger validators before they are stored, and a
//! frozen period is committed in one step after every row has been checked.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use frostbook_core::fiscal::{
    FlowCalculation, FrozenAccountHash, FrozenPeriod, FrozenPeriodDraft, SummaryCalculation,
};
use frostbook_core::ledger::{
    Account, Currency, FinancialEntry, LedgerService, Modifier, ModifierAction,
};
use frostbook_core::{LedgerStore, StoreError};
use frostbook_shared::types::{
    AccountId, CurrencyId, FinancialEntryId, FrozenPeriodId, ModifierId, UserId,
};
use tracing::{debug, info};

use crate::error::RecordError;

/// Number of store round trips, by kind.
///
/// Used to check that callers cache what they load.
#[derive(Debug, Default)]
pub struct LoadCounters {
    summary_loads: AtomicUsize,
    flow_loads: AtomicUsize,
    entry_loads: AtomicUsize,
    exchange_loads: AtomicUsize,
}

impl LoadCounters {
    /// Calls to `load_summary_calculations`.
    #[must_use]
    pub fn summary_loads(&self) -> usize {
        self.summary_loads.load(Ordering::Relaxed)
    }

    /// Calls to `load_flow_calculations`.
    #[must_use]
    pub fn flow_loads(&self) -> usize {
        self.flow_loads.load(Ordering::Relaxed)
    }

    /// Calls to `load_financial_entries`.
    #[must_use]
    pub fn entry_loads(&self) -> usize {
        self.entry_loads.load(Ordering::Relaxed)
    }

    /// Calls to `load_exchange_entries`.
    #[must_use]
    pub fn exchange_loads(&self) -> usize {
        self.exchange_loads.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A frozen period with its rows, as restored from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenPeriodRows {
    /// The period.
    pub period: FrozenPeriod,
    /// Its summary rows.
    pub summary_calculations: Vec<SummaryCalculation>,
    /// Its flow rows.
    pub flow_calculations: Vec<FlowCalculation>,
}

/// Ledger store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    currencies: BTreeMap<CurrencyId, Currency>,
    accounts: BTreeMap<AccountId, Account>,
    modifiers: BTreeMap<ModifierId, (UserId, Modifier)>,
    entries: BTreeMap<FinancialEntryId, (UserId, FinancialEntry)>,
    frozen_periods: BTreeMap<FrozenPeriodId, FrozenPeriod>,
    summaries: HashMap<FrozenAccountHash, SummaryCalculation>,
    flows: HashMap<FrozenAccountHash, Vec<FlowCalculation>>,
    counters: LoadCounters,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Round trip counters.
    #[must_use]
    pub fn counters(&self) -> &LoadCounters {
        &self.counters
    }

    /// Adds a currency.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id is taken.
    pub fn insert_currency(&mut self, currency: Currency) -> Result<(), RecordError> {
        if self.currencies.contains_key(&currency.id) {
            return Err(conflict("currency", currency.id.into_inner()));
        }
        debug!(currency_id = %currency.id, code = %currency.code, "currency recorded");
        self.currencies.insert(currency.id, currency);
        Ok(())
    }

    /// Adds an account. Its owner is the owner of its currency.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id is taken and
    /// `StoreError::NotFound` for an unknown currency.
    pub fn insert_account(&mut self, account: Account) -> Result<(), RecordError> {
        if self.accounts.contains_key(&account.id) {
            return Err(conflict("account", account.id.into_inner()));
        }
        if !self.currencies.contains_key(&account.currency_id) {
            return Err(not_found("currency", account.currency_id.into_inner()).into());
        }
        debug!(account_id = %account.id, kind = ?account.kind, "account recorded");
        self.accounts.insert(account.id, account);
        Ok(())
    }

    /// Adds a modifier after checking it against the permission matrix.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` for an unknown or foreign account and a
    /// `LedgerError` when the matrix rejects the atoms.
    pub fn insert_modifier(
        &mut self,
        owner_id: UserId,
        modifier: Modifier,
    ) -> Result<(), RecordError> {
        if self.modifiers.contains_key(&modifier.id) {
            return Err(conflict("modifier", modifier.id.into_inner()));
        }
        let ids: Vec<AccountId> = modifier.atoms.iter().map(|atom| atom.account_id).collect();
        let accounts = self.account_index(owner_id, &ids)?;
        LedgerService::validate_modifier(&modifier, &accounts)?;

        debug!(modifier_id = %modifier.id, action = ?modifier.action, "modifier recorded");
        self.modifiers.insert(modifier.id, (owner_id, modifier));
        Ok(())
    }

    /// Adds a financial entry after full validation.
    ///
    /// Entries dated inside a frozen period are refused.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` for an unknown or foreign modifier, a clash
    /// with a frozen period or a taken id, and a `LedgerError` when the
    /// values break the ledger rules.
    pub fn insert_financial_entry(
        &mut self,
        owner_id: UserId,
        entry: FinancialEntry,
    ) -> Result<(), RecordError> {
        if self.entries.contains_key(&entry.id) {
            return Err(conflict("financial entry", entry.id.into_inner()));
        }
        if let Some(last) = self.last_frozen_period(owner_id)
            && entry.transacted_at < last.finished_at
        {
            return Err(StoreError::Conflict(format!(
                "financial entry {} is dated inside frozen period {}",
                entry.id, last.id
            ))
            .into());
        }

        let modifier = self.owned_modifier(owner_id, entry.modifier_id)?;
        let ids: Vec<AccountId> = modifier.atoms.iter().map(|atom| atom.account_id).collect();
        let accounts = self.account_index(owner_id, &ids)?;
        LedgerService::validate_financial_entry(modifier, &accounts, &entry)?;

        debug!(entry_id = %entry.id, modifier_id = %entry.modifier_id, "financial entry recorded");
        self.entries.insert(entry.id, (owner_id, entry));
        Ok(())
    }

    /// Restores a frozen period with rows computed elsewhere.
    ///
    /// Goes through the same checks as a fresh commit but keeps the id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id is taken or the period does
    /// not follow the last one, or any row check error.
    pub fn restore_frozen_period(&mut self, rows: FrozenPeriodRows) -> Result<(), RecordError> {
        if self.frozen_periods.contains_key(&rows.period.id) {
            return Err(conflict("frozen period", rows.period.id.into_inner()));
        }
        let FrozenPeriodRows {
            period,
            summary_calculations,
            flow_calculations,
        } = rows;
        let draft = FrozenPeriodDraft {
            owner_id: period.owner_id,
            started_at: period.started_at,
            finished_at: period.finished_at,
            summary_calculations,
            flow_calculations,
        };
        self.check_draft(&draft)?;
        self.apply_draft(period.id, draft);
        Ok(())
    }

    /// Every currency, account, modifier, entry and frozen period of an owner.
    #[must_use]
    pub fn export(&self, owner_id: UserId) -> OwnerRecords {
        let currencies: Vec<Currency> = self
            .currencies
            .values()
            .filter(|currency| currency.owner_id == owner_id)
            .cloned()
            .collect();
        let accounts = self
            .accounts
            .values()
            .filter(|account| self.owner_of_account(account.id) == Some(owner_id))
            .cloned()
            .collect();
        let modifiers = self
            .modifiers
            .values()
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, modifier)| modifier.clone())
            .collect();
        let financial_entries = self
            .entries
            .values()
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, entry)| entry.clone())
            .collect();
        let frozen_periods = self
            .owned_periods(owner_id)
            .into_iter()
            .map(|period| self.period_rows(period))
            .collect();

        OwnerRecords {
            currencies,
            accounts,
            modifiers,
            financial_entries,
            frozen_periods,
        }
    }

    fn period_rows(&self, period: &FrozenPeriod) -> FrozenPeriodRows {
        let mut summary_calculations: Vec<SummaryCalculation> = Vec::new();
        let mut flow_calculations: Vec<FlowCalculation> = Vec::new();
        for account_id in self.accounts.keys() {
            let hash = FrozenAccountHash::derive(period.started_at, period.finished_at, *account_id);
            if let Some(row) = self.summaries.get(&hash) {
                summary_calculations.push(row.clone());
            }
            if let Some(rows) = self.flows.get(&hash) {
                flow_calculations.extend(rows.iter().cloned());
            }
        }
        FrozenPeriodRows {
            period: period.clone(),
            summary_calculations,
            flow_calculations,
        }
    }

    fn owner_of_account(&self, account_id: AccountId) -> Option<UserId> {
        let account = self.accounts.get(&account_id)?;
        self.currencies
            .get(&account.currency_id)
            .map(|currency| currency.owner_id)
    }

    fn owned_account(&self, owner_id: UserId, account_id: AccountId) -> Result<&Account, StoreError> {
        let account = self
            .accounts
            .get(&account_id)
            .ok_or_else(|| not_found("account", account_id.into_inner()))?;
        if self.owner_of_account(account_id) == Some(owner_id) {
            Ok(account)
        } else {
            Err(StoreError::Forbidden(format!("account {account_id}")))
        }
    }

    fn owned_modifier(
        &self,
        owner_id: UserId,
        modifier_id: ModifierId,
    ) -> Result<&Modifier, StoreError> {
        match self.modifiers.get(&modifier_id) {
            None => Err(not_found("modifier", modifier_id.into_inner())),
            Some((owner, modifier)) if *owner == owner_id => Ok(modifier),
            Some(_) => Err(StoreError::Forbidden(format!("modifier {modifier_id}"))),
        }
    }

    fn account_index(
        &self,
        owner_id: UserId,
        ids: &[AccountId],
    ) -> Result<HashMap<AccountId, Account>, StoreError> {
        ids.iter()
            .map(|id| {
                self.owned_account(owner_id, *id)
                    .map(|account| (account.id, account.clone()))
            })
            .collect()
    }

    fn owned_periods(&self, owner_id: UserId) -> Vec<&FrozenPeriod> {
        let mut periods: Vec<&FrozenPeriod> = self
            .frozen_periods
            .values()
            .filter(|period| period.owner_id == owner_id)
            .collect();
        periods.sort_by_key(|period| period.started_at);
        periods
    }

    fn last_frozen_period(&self, owner_id: UserId) -> Option<&FrozenPeriod> {
        self.owned_periods(owner_id).pop()
    }

    fn owned_entries(&self, owner_id: UserId) -> impl Iterator<Item = &FinancialEntry> {
        self.entries
            .values()
            .filter(move |(owner, _)| *owner == owner_id)
            .map(|(_, entry)| entry)
    }

    /// Checks a draft without touching any state.
    fn check_draft(&self, draft: &FrozenPeriodDraft) -> Result<(), StoreError> {
        if draft.finished_at <= draft.started_at {
            return Err(StoreError::Conflict(format!(
                "period {} .. {} is empty",
                draft.started_at, draft.finished_at
            )));
        }
        match self.last_frozen_period(draft.owner_id) {
            Some(last) if last.finished_at != draft.started_at => {
                return Err(StoreError::Conflict(format!(
                    "period must start at {}, not {}",
                    last.finished_at, draft.started_at
                )));
            }
            Some(_) => {}
            None => {
                if self
                    .owned_entries(draft.owner_id)
                    .any(|entry| entry.transacted_at < draft.started_at)
                {
                    return Err(StoreError::Conflict(format!(
                        "entries exist before the first period's start {}",
                        draft.started_at
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for row in &draft.summary_calculations {
            self.check_row(draft, &row.frozen_account_hash, row.account_id)?;
            if !seen.insert(&row.frozen_account_hash) {
                return Err(StoreError::Conflict(format!(
                    "duplicate summary row for account {}",
                    row.account_id
                )));
            }
        }
        for row in &draft.flow_calculations {
            self.check_row(draft, &row.frozen_account_hash, row.account_id)?;
        }
        Ok(())
    }

    fn check_row(
        &self,
        draft: &FrozenPeriodDraft,
        hash: &FrozenAccountHash,
        account_id: AccountId,
    ) -> Result<(), StoreError> {
        self.owned_account(draft.owner_id, account_id)?;
        if *hash != FrozenAccountHash::derive(draft.started_at, draft.finished_at, account_id) {
            return Err(StoreError::Conflict(format!(
                "row key of account {account_id} does not match the period"
            )));
        }
        if self.summaries.contains_key(hash) || self.flows.contains_key(hash) {
            return Err(StoreError::Conflict(format!(
                "rows of account {account_id} are already frozen"
            )));
        }
        Ok(())
    }

    /// Makes a checked draft visible.
    fn apply_draft(&mut self, id: FrozenPeriodId, draft: FrozenPeriodDraft) -> FrozenPeriod {
        let period = FrozenPeriod {
            id,
            owner_id: draft.owner_id,
            started_at: draft.started_at,
            finished_at: draft.finished_at,
        };
        for row in draft.summary_calculations {
            self.summaries.insert(row.frozen_account_hash.clone(), row);
        }
        for row in draft.flow_calculations {
            self.flows
                .entry(row.frozen_account_hash.clone())
                .or_default()
                .push(row);
        }
        self.frozen_periods.insert(id, period.clone());
        period
    }
}

/// Everything one owner has recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecords {
    /// Currencies.
    pub currencies: Vec<Currency>,
    /// Accounts.
    pub accounts: Vec<Account>,
    /// Modifiers.
    pub modifiers: Vec<Modifier>,
    /// Financial entries.
    pub financial_entries: Vec<FinancialEntry>,
    /// Frozen periods with their rows, oldest first.
    pub frozen_periods: Vec<FrozenPeriodRows>,
}

fn not_found(entity: &'static str, id: u64) -> StoreError {
    StoreError::NotFound { entity, id }
}

fn conflict(entity: &str, id: u64) -> RecordError {
    StoreError::Conflict(format!("{entity} {id} already exists")).into()
}

impl LedgerStore for MemoryStore {
    fn load_currencies(&self, user_id: UserId) -> Result<Vec<Currency>, StoreError> {
        Ok(self
            .currencies
            .values()
            .filter(|currency| currency.owner_id == user_id)
            .cloned()
            .collect())
    }

    fn load_accounts(
        &self,
        user_id: UserId,
        ids: &[AccountId],
    ) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.account_index(user_id, ids)?.into_values().collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }

    fn load_all_accounts(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .accounts
            .values()
            .filter(|account| self.owner_of_account(account.id) == Some(user_id))
            .cloned()
            .collect())
    }

    fn load_modifiers(
        &self,
        user_id: UserId,
        ids: &[ModifierId],
    ) -> Result<Vec<Modifier>, StoreError> {
        let mut modifiers = ids
            .iter()
            .map(|id| self.owned_modifier(user_id, *id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        modifiers.sort_by_key(|modifier| modifier.id);
        modifiers.dedup_by_key(|modifier| modifier.id);
        Ok(modifiers)
    }

    fn load_financial_entries(
        &self,
        user_id: UserId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<Vec<FinancialEntry>, StoreError> {
        LoadCounters::bump(&self.counters.entry_loads);
        let mut entries: Vec<FinancialEntry> = self
            .owned_entries(user_id)
            .filter(|entry| entry.transacted_at >= started_at && entry.transacted_at < finished_at)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.transacted_at, entry.id));
        Ok(entries)
    }

    fn has_entries_before(
        &self,
        user_id: UserId,
        instant: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .owned_entries(user_id)
            .any(|entry| entry.transacted_at < instant))
    }

    fn load_exchange_entries(
        &self,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> Result<Vec<FinancialEntry>, StoreError> {
        LoadCounters::bump(&self.counters.exchange_loads);
        let mut entries: Vec<FinancialEntry> = self
            .owned_entries(user_id)
            .filter(|entry| entry.transacted_at <= until)
            .filter(|entry| {
                self.modifiers
                    .get(&entry.modifier_id)
                    .is_some_and(|(_, modifier)| modifier.action == ModifierAction::Exchange)
            })
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.transacted_at, entry.id));
        Ok(entries)
    }

    fn load_frozen_periods(&self, user_id: UserId) -> Result<Vec<FrozenPeriod>, StoreError> {
        Ok(self
            .owned_periods(user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    fn load_summary_calculations(
        &self,
        hashes: &[FrozenAccountHash],
    ) -> Result<Vec<SummaryCalculation>, StoreError> {
        LoadCounters::bump(&self.counters.summary_loads);
        Ok(hashes
            .iter()
            .filter_map(|hash| self.summaries.get(hash))
            .cloned()
            .collect())
    }

    fn load_flow_calculations(
        &self,
        hashes: &[FrozenAccountHash],
    ) -> Result<Vec<FlowCalculation>, StoreError> {
        LoadCounters::bump(&self.counters.flow_loads);
        Ok(hashes
            .iter()
            .filter_map(|hash| self.flows.get(hash))
            .flatten()
            .cloned()
            .collect())
    }

    fn commit_frozen_period(
        &mut self,
        draft: FrozenPeriodDraft,
    ) -> Result<FrozenPeriod, StoreError> {
        self.check_draft(&draft)?;

        let id = FrozenPeriodId::new(
            self.frozen_periods
                .keys()
                .next_back()
                .map_or(1, |last| last.into_inner() + 1),
        );
        let rows = draft.summary_calculations.len() + draft.flow_calculations.len();
        let period = self.apply_draft(id, draft);

        info!(
            period_id = %period.id,
            owner_id = %period.owner_id,
            rows,
            "frozen period committed"
        );
        Ok(period)
    }
}
