//! Closing service: validate, compute and freeze periods.
//!
//! Both the dry run and the freeze go through the same boundary checks and
//! the same calculator. Only the freeze writes, and it writes everything in
//! one store commit.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use frostbook_shared::types::{AccountId, CurrencyId, ModifierId};
use tracing::{debug, info, warn};

use super::calculator::{CalculatorInput, FrozenPeriodCalculator, PeriodComputation};
use super::error::FiscalError;
use super::period::{FrozenAccountHash, FrozenPeriod};
use super::time_group::TimeGroupManager;
use crate::context::LedgerContext;
use crate::ledger::types::Account;
use crate::reports::{PeriodStatements, ReportError, ReportService};
use crate::store::LedgerStore;

/// Closing service for frozen periods.
pub struct ClosingService;

impl ClosingService {
    /// Checks that `[started_at, finished_at)` may become the next period.
    ///
    /// Returns the last frozen period, if any.
    ///
    /// # Errors
    ///
    /// - `EmptyPeriod` if the period does not end after it starts
    /// - `EndInFuture` if it ends after now
    /// - `Gap` / `Overlap` if it does not start where the last period ended
    /// - `UncoveredEntries` if it is the first period and entries precede it
    pub fn check_boundaries<S>(
        store: &S,
        ctx: &LedgerContext,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<Option<FrozenPeriod>, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        if finished_at <= started_at {
            return Err(FiscalError::EmptyPeriod {
                started_at,
                finished_at,
            });
        }
        if finished_at > ctx.now {
            return Err(FiscalError::EndInFuture {
                finished_at,
                now: ctx.now,
            });
        }

        let last = store.load_frozen_periods(ctx.user_id)?.pop();
        match &last {
            Some(period) if started_at > period.finished_at => Err(FiscalError::Gap {
                expected: period.finished_at,
                started_at,
            }),
            Some(period) if started_at < period.finished_at => Err(FiscalError::Overlap {
                expected: period.finished_at,
                started_at,
            }),
            Some(_) => Ok(last),
            None => {
                if store.has_entries_before(ctx.user_id, started_at)? {
                    Err(FiscalError::UncoveredEntries { started_at })
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Computes a candidate period without persisting anything.
    ///
    /// # Errors
    ///
    /// Returns a boundary error, a loading error, or a calculator error. An
    /// unbalanced period is reported through `balanced`, not as an error.
    pub fn compute_frozen_period<S>(
        store: &S,
        ctx: &LedgerContext,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<PeriodComputation, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        let last = Self::check_boundaries(store, ctx, started_at, finished_at)?;
        let accounts = Self::load_account_index(store, ctx)?;
        let computation =
            Self::compute_window(store, ctx, last.as_ref(), started_at, finished_at, &accounts)?;

        debug!(
            period_start = %started_at,
            period_end = %finished_at,
            accounts = computation.summary_calculations.len(),
            balanced = computation.balanced,
            "period computed"
        );
        Ok(computation)
    }

    /// Computes and persists the next frozen period.
    ///
    /// # Errors
    ///
    /// Returns every error of [`Self::compute_frozen_period`], plus
    /// `Unbalanced` / `TemporaryAccountNotClosed` when the gate rejects the
    /// period. Nothing is written on error.
    pub fn freeze_period<S>(
        store: &mut S,
        ctx: &LedgerContext,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<FrozenPeriod, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        let computation = Self::compute_frozen_period(&*store, ctx, started_at, finished_at)?;

        if let Some(violation) = computation.first_violation() {
            warn!(
                period_start = %started_at,
                period_end = %finished_at,
                error = %violation,
                "freeze rejected"
            );
            return Err(violation);
        }

        let draft = computation.into_draft(ctx.user_id);
        let rows = draft.summary_calculations.len();
        let period = store.commit_frozen_period(draft)?;

        info!(
            period_id = %period.id,
            period_start = %period.started_at,
            period_end = %period.finished_at,
            rows,
            "period frozen"
        );
        Ok(period)
    }

    /// Statements of a candidate period, without persisting it.
    ///
    /// The candidate is read after every frozen period, as if it had been
    /// frozen. It does not have to pass the freeze gate.
    ///
    /// # Errors
    ///
    /// Returns every error of [`Self::compute_frozen_period`] wrapped in
    /// `ReportError::Fiscal`, or `ReportError::UnknownCurrency`.
    pub fn dry_run_statements<S>(
        store: &S,
        ctx: &LedgerContext,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        destination: CurrencyId,
    ) -> Result<PeriodStatements, ReportError>
    where
        S: LedgerStore + ?Sized,
    {
        let computation = Self::compute_frozen_period(store, ctx, started_at, finished_at)?;
        let mut manager = TimeGroupManager::with_candidate(store, *ctx, computation)?;
        let candidate = manager.groups().len().saturating_sub(1);
        ReportService::generate_group_statements(&mut manager, candidate, destination)
    }

    /// Every account of the user, keyed by id.
    pub(crate) fn load_account_index<S>(
        store: &S,
        ctx: &LedgerContext,
    ) -> Result<HashMap<AccountId, Account>, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        Ok(store
            .load_all_accounts(ctx.user_id)?
            .into_iter()
            .map(|account| (account.id, account))
            .collect())
    }

    /// Loads a window's data and runs the calculator. No boundary checks.
    pub(crate) fn compute_window<S>(
        store: &S,
        ctx: &LedgerContext,
        last: Option<&FrozenPeriod>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        accounts: &HashMap<AccountId, Account>,
    ) -> Result<PeriodComputation, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        let previous = match last {
            Some(period) => {
                let hashes: Vec<FrozenAccountHash> = accounts
                    .keys()
                    .map(|id| FrozenAccountHash::derive(period.started_at, period.finished_at, *id))
                    .collect();
                store.load_summary_calculations(&hashes)?
            }
            None => Vec::new(),
        };

        let entries = store.load_financial_entries(ctx.user_id, started_at, finished_at)?;
        let modifier_ids: Vec<ModifierId> = entries
            .iter()
            .map(|entry| entry.modifier_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let modifiers = if modifier_ids.is_empty() {
            HashMap::new()
        } else {
            store
                .load_modifiers(ctx.user_id, &modifier_ids)?
                .into_iter()
                .map(|modifier| (modifier.id, modifier))
                .collect()
        };

        FrozenPeriodCalculator::compute(&CalculatorInput {
            started_at,
            finished_at,
            accounts,
            modifiers: &modifiers,
            previous: &previous,
            entries: &entries,
        })
    }
}
