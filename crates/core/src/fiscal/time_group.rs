//! Time groups: frozen periods plus the open tail, read lazily.
//!
//! A manager is built for one request. It knows every group's boundaries up
//! front but loads summary and flow rows only for the accounts a caller
//! asks about, and only once per account. The open tail is never persisted;
//! it is computed from live entries the first time any account is loaded.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{AccountId, CashFlowActivityId, CurrencyId, FrozenPeriodId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calculator::PeriodComputation;
use super::error::FiscalError;
use super::period::{FlowCalculation, FrozenAccountHash, FrozenPeriod, SummaryCalculation};
use super::service::ClosingService;
use crate::context::LedgerContext;
use crate::currency::{CurrencyService, ExchangeRateDerivator};
use crate::ledger::types::{Account, Currency};
use crate::store::LedgerStore;

/// One of the six totals kept per account and group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Figure {
    /// Debit carried in.
    OpenedDebit,
    /// Credit carried in.
    OpenedCredit,
    /// Debit before closing.
    UnadjustedDebit,
    /// Credit before closing.
    UnadjustedCredit,
    /// Debit after closing.
    ClosedDebit,
    /// Credit after closing.
    ClosedCredit,
}

impl Figure {
    /// Reads this figure from a summary row.
    #[must_use]
    pub fn of(self, row: &SummaryCalculation) -> &Rational {
        match self {
            Self::OpenedDebit => &row.opened_debit_amount,
            Self::OpenedCredit => &row.opened_credit_amount,
            Self::UnadjustedDebit => &row.unadjusted_debit_amount,
            Self::UnadjustedCredit => &row.unadjusted_credit_amount,
            Self::ClosedDebit => &row.closed_debit_amount,
            Self::ClosedCredit => &row.closed_credit_amount,
        }
    }
}

/// A frozen period or the open tail, with the rows loaded so far.
#[derive(Debug, Clone)]
pub struct TimeGroup {
    /// Inclusive start.
    pub started_at: DateTime<Utc>,
    /// Exclusive end.
    pub finished_at: DateTime<Utc>,
    /// The persisted period, or `None` for a computed group.
    pub frozen_period: Option<FrozenPeriod>,
    summaries: HashMap<AccountId, SummaryCalculation>,
    flows: HashMap<AccountId, Vec<FlowCalculation>>,
}

impl TimeGroup {
    fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        frozen_period: Option<FrozenPeriod>,
    ) -> Self {
        Self {
            started_at,
            finished_at,
            frozen_period,
            summaries: HashMap::new(),
            flows: HashMap::new(),
        }
    }

    /// Returns true for persisted periods.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen_period.is_some()
    }

    /// Id of the persisted period, if any.
    #[must_use]
    pub fn frozen_period_id(&self) -> Option<FrozenPeriodId> {
        self.frozen_period.as_ref().map(|period| period.id)
    }

    /// Loaded summary row of an account.
    #[must_use]
    pub fn summary(&self, account_id: AccountId) -> Option<&SummaryCalculation> {
        self.summaries.get(&account_id)
    }

    /// Loaded flow rows of an account.
    #[must_use]
    pub fn flows(&self, account_id: AccountId) -> &[FlowCalculation] {
        self.flows.get(&account_id).map_or(&[], Vec::as_slice)
    }

    /// Replaces the rows of `accounts` with the given ones.
    fn absorb(
        &mut self,
        accounts: &BTreeSet<AccountId>,
        summaries: Vec<SummaryCalculation>,
        flows: Vec<FlowCalculation>,
    ) {
        for account_id in accounts {
            self.summaries.remove(account_id);
            self.flows.remove(account_id);
        }
        for row in summaries {
            self.summaries.insert(row.account_id, row);
        }
        for row in flows {
            self.flows.entry(row.account_id).or_default().push(row);
        }
    }
}

/// The computed last group and what it needs to be computed.
#[derive(Debug)]
struct LiveGroup {
    previous: Option<FrozenPeriod>,
    computation: Option<PeriodComputation>,
}

/// Request-scoped reader over every time group of one user.
pub struct TimeGroupManager<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    ctx: LedgerContext,
    accounts: HashMap<AccountId, Account>,
    currencies: Vec<Currency>,
    groups: Vec<TimeGroup>,
    live: Option<LiveGroup>,
    loaded_account_ids: HashSet<AccountId>,
    derivators: HashMap<DateTime<Utc>, ExchangeRateDerivator>,
    rates: HashMap<(usize, CurrencyId, CurrencyId), Rational>,
}

impl<'a, S: LedgerStore + ?Sized> TimeGroupManager<'a, S> {
    /// Frozen periods followed by the open tail up to now.
    ///
    /// The tail starts at the last frozen end, or at the earliest
    /// representable instant when nothing is frozen. It is left out when the
    /// last period already ends now.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::Store` if loading fails.
    pub fn new(store: &'a S, ctx: LedgerContext) -> Result<Self, FiscalError> {
        let frozen = store.load_frozen_periods(ctx.user_id)?;
        let previous = frozen.last().cloned();
        let started_at = previous
            .as_ref()
            .map_or(DateTime::<Utc>::MIN_UTC, |period| period.finished_at);

        let mut manager = Self::with_frozen(store, ctx, frozen)?;
        if started_at < ctx.now {
            manager.groups.push(TimeGroup::new(started_at, ctx.now, None));
            manager.live = Some(LiveGroup {
                previous,
                computation: None,
            });
        }
        Ok(manager)
    }

    /// Frozen periods followed by an already computed candidate period.
    ///
    /// Used for dry runs: the candidate is read like a frozen period but
    /// nothing about it is persisted.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::Store` if loading fails.
    pub fn with_candidate(
        store: &'a S,
        ctx: LedgerContext,
        candidate: PeriodComputation,
    ) -> Result<Self, FiscalError> {
        let frozen = store.load_frozen_periods(ctx.user_id)?;
        let previous = frozen.last().cloned();

        let mut manager = Self::with_frozen(store, ctx, frozen)?;
        manager.groups.push(TimeGroup::new(
            candidate.started_at,
            candidate.finished_at,
            None,
        ));
        manager.live = Some(LiveGroup {
            previous,
            computation: Some(candidate),
        });
        Ok(manager)
    }

    fn with_frozen(
        store: &'a S,
        ctx: LedgerContext,
        frozen: Vec<FrozenPeriod>,
    ) -> Result<Self, FiscalError> {
        let accounts = ClosingService::load_account_index(store, &ctx)?;
        let currencies = store.load_currencies(ctx.user_id)?;
        let groups = frozen
            .into_iter()
            .map(|period| TimeGroup::new(period.started_at, period.finished_at, Some(period)))
            .collect();

        Ok(Self {
            store,
            ctx,
            accounts,
            currencies,
            groups,
            live: None,
            loaded_account_ids: HashSet::new(),
            derivators: HashMap::new(),
            rates: HashMap::new(),
        })
    }

    /// The request context.
    #[must_use]
    pub const fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    /// Every group, oldest first.
    #[must_use]
    pub fn groups(&self) -> &[TimeGroup] {
        &self.groups
    }

    /// Every account of the user.
    #[must_use]
    pub fn accounts(&self) -> &HashMap<AccountId, Account> {
        &self.accounts
    }

    /// Every currency of the user.
    #[must_use]
    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    /// Returns true once the account's rows are in every group.
    #[must_use]
    pub fn is_loaded(&self, account_id: AccountId) -> bool {
        self.loaded_account_ids.contains(&account_id)
    }

    /// Group at `index`.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::UnknownTimeGroup` past the last group.
    pub fn group(&self, index: usize) -> Result<&TimeGroup, FiscalError> {
        self.groups
            .get(index)
            .ok_or(FiscalError::UnknownTimeGroup(index))
    }

    /// Loads the rows of accounts not loaded yet into every group.
    ///
    /// Accounts already loaded are skipped, so repeating a call costs no
    /// store round trip.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::AccountNotFound` for an account of another user
    /// or an unknown id, or any error of the store or the calculator.
    pub fn load(&mut self, ids: &[AccountId]) -> Result<(), FiscalError> {
        let pending: BTreeSet<AccountId> = ids
            .iter()
            .copied()
            .filter(|id| !self.loaded_account_ids.contains(id))
            .collect();
        if pending.is_empty() {
            debug!(requested = ids.len(), "time group rows already loaded");
            return Ok(());
        }
        if let Some(unknown) = pending.iter().find(|id| !self.accounts.contains_key(id)) {
            return Err(FiscalError::AccountNotFound(*unknown));
        }

        // Nothing is absorbed until every load has succeeded.
        let store = self.store;
        let mut staged = Vec::with_capacity(self.groups.len());
        for (index, group) in self.groups.iter().enumerate() {
            if !group.is_frozen() {
                continue;
            }
            let hashes: Vec<FrozenAccountHash> = pending
                .iter()
                .map(|id| FrozenAccountHash::derive(group.started_at, group.finished_at, *id))
                .collect();
            let summaries = store.load_summary_calculations(&hashes)?;
            let flows = store.load_flow_calculations(&hashes)?;
            staged.push((index, summaries, flows));
        }

        if let Some(live) = self.live.as_mut() {
            let Some(index) = self.groups.len().checked_sub(1) else {
                return Err(FiscalError::UnknownTimeGroup(0));
            };
            let group = &self.groups[index];
            if live.computation.is_none() {
                debug!(
                    period_start = %group.started_at,
                    period_end = %group.finished_at,
                    "computing open time group"
                );
                live.computation = Some(ClosingService::compute_window(
                    store,
                    &self.ctx,
                    live.previous.as_ref(),
                    group.started_at,
                    group.finished_at,
                    &self.accounts,
                )?);
            }
            if let Some(computation) = &live.computation {
                let summaries = computation
                    .summary_calculations
                    .iter()
                    .filter(|row| pending.contains(&row.account_id))
                    .cloned()
                    .collect();
                let flows = computation
                    .flow_calculations
                    .iter()
                    .filter(|row| pending.contains(&row.account_id))
                    .cloned()
                    .collect();
                staged.push((index, summaries, flows));
            }
        }

        for (index, summaries, flows) in staged {
            self.groups[index].absorb(&pending, summaries, flows);
        }

        debug!(
            accounts = pending.len(),
            groups = self.groups.len(),
            "time group rows loaded"
        );
        self.loaded_account_ids.extend(pending);
        Ok(())
    }

    /// Units of `destination` per unit of `source` for one group.
    ///
    /// The derivator is built for the group's effective as-of instant and
    /// shared with every group resolving to the same instant.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::Exchange` when no path links the currencies.
    pub fn exchange_rate(
        &mut self,
        index: usize,
        source: CurrencyId,
        destination: CurrencyId,
    ) -> Result<Rational, FiscalError> {
        if source == destination {
            return Ok(Rational::one());
        }
        if let Some(rate) = self.rates.get(&(index, source, destination)) {
            return Ok(rate.clone());
        }

        let as_of = self.ctx.as_of(Some(self.group(index)?.finished_at));
        let derivator = match self.derivators.entry(as_of) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(CurrencyService::build_derivator(self.store, &self.ctx, as_of)?)
            }
        };
        let rate = derivator.derive_exchange_rate(source, destination)?;
        self.rates.insert((index, source, destination), rate.clone());
        Ok(rate)
    }

    /// Sum of one figure over the accounts in one group, in `destination`.
    ///
    /// Every account needs a rate, even one without a row in the group.
    ///
    /// # Errors
    ///
    /// Returns a loading error or `FiscalError::Exchange`.
    pub fn group_total(
        &mut self,
        index: usize,
        figure: Figure,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Rational, FiscalError> {
        self.load(ids)?;
        let mut total = Rational::zero();
        for id in ids.iter().collect::<BTreeSet<_>>() {
            let rate = self.rate_for(index, *id, destination)?;
            if let Some(row) = self.group(index)?.summary(*id) {
                total += figure.of(row) * &rate;
            }
        }
        Ok(total)
    }

    /// Net cash flow of the accounts in one group, in `destination`.
    ///
    /// `activity` narrows the sum to one cash flow activity.
    ///
    /// # Errors
    ///
    /// Returns a loading error or `FiscalError::Exchange`.
    pub fn group_net_cash_flow(
        &mut self,
        index: usize,
        ids: &[AccountId],
        destination: CurrencyId,
        activity: Option<CashFlowActivityId>,
    ) -> Result<Rational, FiscalError> {
        self.load(ids)?;
        let mut total = Rational::zero();
        for id in ids.iter().collect::<BTreeSet<_>>() {
            let rate = self.rate_for(index, *id, destination)?;
            let net: Rational = self
                .group(index)?
                .flows(*id)
                .iter()
                .filter(|row| activity.is_none_or(|wanted| row.cash_flow_activity_id == wanted))
                .map(|row| &row.net_amount)
                .sum();
            total += net * &rate;
        }
        Ok(total)
    }

    /// Activities with a flow row for any of the accounts in one group.
    ///
    /// # Errors
    ///
    /// Returns a loading error.
    pub fn group_activities(
        &mut self,
        index: usize,
        ids: &[AccountId],
    ) -> Result<BTreeSet<CashFlowActivityId>, FiscalError> {
        self.load(ids)?;
        let group = self.group(index)?;
        Ok(ids
            .iter()
            .flat_map(|id| group.flows(*id))
            .map(|row| row.cash_flow_activity_id)
            .collect())
    }

    /// One figure per group, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a loading error or `FiscalError::Exchange`.
    pub fn totals(
        &mut self,
        figure: Figure,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        (0..self.groups.len())
            .map(|index| self.group_total(index, figure, ids, destination))
            .collect()
    }

    /// Opened debit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_opened_debit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::OpenedDebit, ids, destination)
    }

    /// Opened credit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_opened_credit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::OpenedCredit, ids, destination)
    }

    /// Unadjusted debit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_unadjusted_debit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::UnadjustedDebit, ids, destination)
    }

    /// Unadjusted credit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_unadjusted_credit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::UnadjustedCredit, ids, destination)
    }

    /// Closed debit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_closed_debit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::ClosedDebit, ids, destination)
    }

    /// Closed credit per group.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_closed_credit_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
    ) -> Result<Vec<Rational>, FiscalError> {
        self.totals(Figure::ClosedCredit, ids, destination)
    }

    /// Net cash flow per group, optionally for one activity.
    ///
    /// # Errors
    ///
    /// See [`Self::totals`].
    pub fn total_net_cash_flow_amount(
        &mut self,
        ids: &[AccountId],
        destination: CurrencyId,
        activity: Option<CashFlowActivityId>,
    ) -> Result<Vec<Rational>, FiscalError> {
        (0..self.groups.len())
            .map(|index| self.group_net_cash_flow(index, ids, destination, activity))
            .collect()
    }

    fn rate_for(
        &mut self,
        index: usize,
        account_id: AccountId,
        destination: CurrencyId,
    ) -> Result<Rational, FiscalError> {
        let currency_id = self
            .accounts
            .get(&account_id)
            .map(|account| account.currency_id)
            .ok_or(FiscalError::AccountNotFound(account_id))?;
        self.exchange_rate(index, currency_id, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row() -> SummaryCalculation {
        SummaryCalculation {
            frozen_account_hash: FrozenAccountHash::derive(
                DateTime::<Utc>::MIN_UTC,
                DateTime::<Utc>::MAX_UTC,
                AccountId::new(1),
            ),
            account_id: AccountId::new(1),
            opened_debit_amount: Rational::from(1),
            opened_credit_amount: Rational::from(2),
            unadjusted_debit_amount: Rational::from(3),
            unadjusted_credit_amount: Rational::from(4),
            closed_debit_amount: Rational::from(5),
            closed_credit_amount: Rational::from(6),
        }
    }

    #[rstest]
    #[case(Figure::OpenedDebit, 1)]
    #[case(Figure::OpenedCredit, 2)]
    #[case(Figure::UnadjustedDebit, 3)]
    #[case(Figure::UnadjustedCredit, 4)]
    #[case(Figure::ClosedDebit, 5)]
    #[case(Figure::ClosedCredit, 6)]
    fn test_figure_reads_its_column(#[case] figure: Figure, #[case] expected: i64) {
        assert_eq!(figure.of(&row()), &Rational::from(expected));
    }

    #[test]
    fn test_group_absorbs_rows_by_account() {
        let mut group = TimeGroup::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC, None);
        let flow = FlowCalculation {
            frozen_account_hash: row().frozen_account_hash,
            account_id: AccountId::new(1),
            cash_flow_activity_id: CashFlowActivityId::new(9),
            net_amount: Rational::from(-5),
        };
        let accounts = BTreeSet::from([AccountId::new(1)]);
        group.absorb(&accounts, vec![row()], vec![flow.clone(), flow.clone()]);

        assert!(!group.is_frozen());
        assert_eq!(group.frozen_period_id(), None);
        assert_eq!(group.summary(AccountId::new(1)), Some(&row()));
        assert_eq!(group.flows(AccountId::new(1)).len(), 2);
        assert!(group.flows(AccountId::new(2)).is_empty());

        // Absorbing the same account again replaces its rows.
        group.absorb(&accounts, vec![row()], vec![flow]);
        assert_eq!(group.flows(AccountId::new(1)).len(), 1);
    }
}
