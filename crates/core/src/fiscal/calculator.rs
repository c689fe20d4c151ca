//! Frozen period calculator.
//!
//! Turns the prior period's closing balances and the entries of one window
//! into per-account summary rows and per-activity flow rows. Pure: all data
//! is loaded by the caller.
//!
//! Rules:
//! - Opened totals carry the prior closed balance of permanent accounts,
//!   netted to one side. Temporary accounts always open at zero.
//! - Unadjusted totals are opened totals plus every real posting of the
//!   window. Close entries do not post.
//! - Closed totals start from the unadjusted ones and are moved by close
//!   entries, processed in `(transacted_at, id)` order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{AccountId, CashFlowActivityId, CurrencyId, ModifierId, UserId};
use serde::{Deserialize, Serialize};

use super::error::FiscalError;
use super::period::{FlowCalculation, FrozenAccountHash, FrozenPeriodDraft, SummaryCalculation};
use crate::ledger::types::{
    Account, AccountKind, EntryType, FinancialEntry, Modifier, ModifierAction, ModifierAtomKind,
    NormalSide,
};

/// Data the calculator works on.
#[derive(Debug, Clone, Copy)]
pub struct CalculatorInput<'a> {
    /// Inclusive window start.
    pub started_at: DateTime<Utc>,
    /// Exclusive window end.
    pub finished_at: DateTime<Utc>,
    /// Every account that may appear.
    pub accounts: &'a HashMap<AccountId, Account>,
    /// Modifiers of the window's entries.
    pub modifiers: &'a HashMap<ModifierId, Modifier>,
    /// Summary rows of the prior period.
    pub previous: &'a [SummaryCalculation],
    /// Entries of the window.
    pub entries: &'a [FinancialEntry],
}

/// Per-currency trial balance of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTrialBalance {
    /// Currency the figures are in.
    pub currency_id: CurrencyId,
    /// Sum of unadjusted nets of debit-normal accounts.
    pub unadjusted_debit: Rational,
    /// Sum of unadjusted nets of credit-normal accounts.
    pub unadjusted_credit: Rational,
    /// Sum of closed nets of debit-normal accounts.
    pub adjusted_debit: Rational,
    /// Sum of closed nets of credit-normal accounts.
    pub adjusted_credit: Rational,
    /// Real debits posted in the window, exchange legs excluded.
    pub movement_debit: Rational,
    /// Real credits posted in the window, exchange legs excluded.
    pub movement_credit: Rational,
}

impl CurrencyTrialBalance {
    fn new(currency_id: CurrencyId) -> Self {
        Self {
            currency_id,
            unadjusted_debit: Rational::zero(),
            unadjusted_credit: Rational::zero(),
            adjusted_debit: Rational::zero(),
            adjusted_credit: Rational::zero(),
            movement_debit: Rational::zero(),
            movement_credit: Rational::zero(),
        }
    }

    /// Returns true if the window's own postings balance.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.movement_debit == self.movement_credit
    }
}

/// Result of computing one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodComputation {
    /// Inclusive window start.
    pub started_at: DateTime<Utc>,
    /// Exclusive window end.
    pub finished_at: DateTime<Utc>,
    /// One row per touched or carried account, ordered by account id.
    pub summary_calculations: Vec<SummaryCalculation>,
    /// One row per account and activity with a non-zero net.
    pub flow_calculations: Vec<FlowCalculation>,
    /// Trial balance per currency, ordered by currency id.
    pub trial_balances: Vec<CurrencyTrialBalance>,
    /// Temporary accounts left with a balance, and that balance.
    pub unclosed_temporary_accounts: Vec<(AccountId, Rational)>,
    /// True when every currency balances and every temporary account closed.
    pub balanced: bool,
}

impl PeriodComputation {
    /// The reason this window cannot be frozen, if any.
    #[must_use]
    pub fn first_violation(&self) -> Option<FiscalError> {
        if let Some((account_id, net)) = self.unclosed_temporary_accounts.first() {
            return Some(FiscalError::TemporaryAccountNotClosed {
                account_id: *account_id,
                net: net.clone(),
            });
        }
        self.trial_balances
            .iter()
            .find(|balance| !balance.is_balanced())
            .map(|balance| FiscalError::Unbalanced {
                currency_id: balance.currency_id,
                debit: balance.movement_debit.clone(),
                credit: balance.movement_credit.clone(),
            })
    }

    /// Summary row of an account, if it has one.
    #[must_use]
    pub fn summary_of(&self, account_id: AccountId) -> Option<&SummaryCalculation> {
        self.summary_calculations
            .iter()
            .find(|row| row.account_id == account_id)
    }

    /// Packs the rows for persistence.
    #[must_use]
    pub fn into_draft(self, owner_id: UserId) -> FrozenPeriodDraft {
        FrozenPeriodDraft {
            owner_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            summary_calculations: self.summary_calculations,
            flow_calculations: self.flow_calculations,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Totals {
    opened_debit: Rational,
    opened_credit: Rational,
    unadjusted_debit: Rational,
    unadjusted_credit: Rational,
    closed_debit: Rational,
    closed_credit: Rational,
}

impl Totals {
    fn opened(net_debit: &Rational) -> Self {
        let (debit, credit) = if net_debit.is_positive() {
            (net_debit.clone(), Rational::zero())
        } else {
            (Rational::zero(), -net_debit)
        };
        Self {
            opened_debit: debit.clone(),
            opened_credit: credit.clone(),
            unadjusted_debit: debit.clone(),
            unadjusted_credit: credit.clone(),
            closed_debit: debit,
            closed_credit: credit,
        }
    }

    fn post(&mut self, side: EntryType, value: &Rational) {
        match side {
            EntryType::Debit => {
                self.unadjusted_debit += value;
                self.closed_debit += value;
            }
            EntryType::Credit => {
                self.unadjusted_credit += value;
                self.closed_credit += value;
            }
        }
    }

    fn closed_net_debit(&self) -> Rational {
        &self.closed_debit - &self.closed_credit
    }

    /// Moves a closing amount onto the closed totals, eating into the
    /// opposite side first.
    fn receive(&mut self, side: EntryType, amount: &Rational) {
        let (same, opposite) = match side {
            EntryType::Debit => (&mut self.closed_debit, &mut self.closed_credit),
            EntryType::Credit => (&mut self.closed_credit, &mut self.closed_debit),
        };
        if *opposite >= *amount {
            *opposite -= amount;
        } else {
            *same += &(amount - &*opposite);
            *opposite = Rational::zero();
        }
    }

    fn empty_closed(&mut self) {
        self.closed_debit = Rational::zero();
        self.closed_credit = Rational::zero();
    }

    fn into_row(self, hash: FrozenAccountHash, account_id: AccountId) -> SummaryCalculation {
        SummaryCalculation {
            frozen_account_hash: hash,
            account_id,
            opened_debit_amount: self.opened_debit,
            opened_credit_amount: self.opened_credit,
            unadjusted_debit_amount: self.unadjusted_debit,
            unadjusted_credit_amount: self.unadjusted_credit,
            closed_debit_amount: self.closed_debit,
            closed_credit_amount: self.closed_credit,
        }
    }
}

/// Frozen period calculator.
pub struct FrozenPeriodCalculator;

impl FrozenPeriodCalculator {
    /// Computes summary and flow rows for one window.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError` if an entry references missing data or a close
    /// entry is malformed. An unbalanced window is not an error here; it is
    /// reported through [`PeriodComputation::balanced`].
    pub fn compute(input: &CalculatorInput<'_>) -> Result<PeriodComputation, FiscalError> {
        let account = |id: AccountId| {
            input
                .accounts
                .get(&id)
                .ok_or(FiscalError::AccountNotFound(id))
        };

        let mut totals: BTreeMap<AccountId, Totals> = BTreeMap::new();
        for row in input.previous {
            if !account(row.account_id)?.kind.is_permanent() {
                continue;
            }
            let net = row.closed_net_debit();
            if !net.is_zero() {
                totals.insert(row.account_id, Totals::opened(&net));
            }
        }

        let mut entries: Vec<&FinancialEntry> = input
            .entries
            .iter()
            .filter(|entry| {
                entry.transacted_at >= input.started_at && entry.transacted_at < input.finished_at
            })
            .collect();
        entries.sort_by_key(|entry| (entry.transacted_at, entry.id));

        let mut movement: BTreeMap<CurrencyId, (Rational, Rational)> = BTreeMap::new();
        let mut flows: BTreeMap<(AccountId, CashFlowActivityId), Rational> = BTreeMap::new();

        for entry in entries {
            let modifier = input.modifiers.get(&entry.modifier_id).ok_or(
                FiscalError::MissingModifier {
                    entry_id: entry.id,
                    modifier_id: entry.modifier_id,
                },
            )?;

            if modifier.action == ModifierAction::Close {
                Self::apply_close(entry, modifier, input.accounts, &mut totals)?;
                continue;
            }

            let mut postings = Vec::new();
            for atom in modifier.atoms.iter().filter(|atom| atom.kind.is_real()) {
                let value = entry
                    .value_of(atom.id)
                    .ok_or(FiscalError::MissingEntryValue {
                        entry_id: entry.id,
                        modifier_atom_id: atom.id,
                    })?;
                postings.push((atom, account(atom.account_id)?, value));
            }

            let liquid_adjacent = postings
                .iter()
                .any(|(_, account, _)| account.kind == AccountKind::LiquidAsset);

            for (atom, account, value) in postings {
                let Some(side) = atom.kind.entry_type() else {
                    continue;
                };
                totals.entry(account.id).or_default().post(side, value);

                if modifier.action != ModifierAction::Exchange {
                    let (debit, credit) = movement.entry(account.currency_id).or_default();
                    match side {
                        EntryType::Debit => *debit += value,
                        EntryType::Credit => *credit += value,
                    }
                }

                if let (true, Some(activity)) = (liquid_adjacent, atom.cash_flow_activity_id) {
                    let net = flows.entry((account.id, activity)).or_default();
                    match side {
                        EntryType::Credit => *net += value,
                        EntryType::Debit => *net -= value,
                    }
                }
            }
        }

        let mut balances: BTreeMap<CurrencyId, CurrencyTrialBalance> = BTreeMap::new();
        let mut unclosed = Vec::new();
        for (id, row) in &totals {
            let account = account(*id)?;
            let balance = balances
                .entry(account.currency_id)
                .or_insert_with(|| CurrencyTrialBalance::new(account.currency_id));
            let side = account.kind.normal_side();
            let unadjusted = side.balance(&row.unadjusted_debit, &row.unadjusted_credit);
            let adjusted = side.balance(&row.closed_debit, &row.closed_credit);
            match side {
                NormalSide::DebitNormal => {
                    balance.unadjusted_debit += unadjusted;
                    balance.adjusted_debit += adjusted;
                }
                NormalSide::CreditNormal => {
                    balance.unadjusted_credit += unadjusted;
                    balance.adjusted_credit += adjusted;
                }
            }

            if account.kind == AccountKind::Temporary {
                let net = row.closed_net_debit();
                if !net.is_zero() {
                    unclosed.push((*id, net));
                }
            }
        }
        for (currency_id, (debit, credit)) in movement {
            let balance = balances
                .entry(currency_id)
                .or_insert_with(|| CurrencyTrialBalance::new(currency_id));
            balance.movement_debit = debit;
            balance.movement_credit = credit;
        }

        let trial_balances: Vec<CurrencyTrialBalance> = balances.into_values().collect();
        let balanced = unclosed.is_empty() && trial_balances.iter().all(CurrencyTrialBalance::is_balanced);

        let hash = |id: AccountId| FrozenAccountHash::derive(input.started_at, input.finished_at, id);
        let summary_calculations = totals
            .into_iter()
            .map(|(id, row)| row.into_row(hash(id), id))
            .collect();
        let flow_calculations = flows
            .into_iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|((account_id, activity), net_amount)| FlowCalculation {
                frozen_account_hash: hash(account_id),
                account_id,
                cash_flow_activity_id: activity,
                net_amount,
            })
            .collect();

        Ok(PeriodComputation {
            started_at: input.started_at,
            finished_at: input.finished_at,
            summary_calculations,
            flow_calculations,
            trial_balances,
            unclosed_temporary_accounts: unclosed,
            balanced,
        })
    }

    /// Empties the close source into the receiver.
    ///
    /// The source is the atom whose account has the higher close priority
    /// (temporary, then revenue/expense, then equity); ties go to the
    /// credited account.
    fn apply_close(
        entry: &FinancialEntry,
        modifier: &Modifier,
        accounts: &HashMap<AccountId, Account>,
        totals: &mut BTreeMap<AccountId, Totals>,
    ) -> Result<(), FiscalError> {
        let debited = close_leg(entry, modifier, accounts, ModifierAtomKind::RealDebit)?;
        let credited = close_leg(entry, modifier, accounts, ModifierAtomKind::RealCredit)?;

        if debited.currency_id != credited.currency_id {
            return Err(FiscalError::CloseAcrossCurrencies(entry.id));
        }

        let (source, receiver) = if debited.kind.close_priority() > credited.kind.close_priority() {
            (debited, credited)
        } else {
            (credited, debited)
        };

        let net = match totals.get_mut(&source.id) {
            Some(row) => {
                let net = row.closed_net_debit();
                row.empty_closed();
                net
            }
            None => return Ok(()),
        };

        if net.is_zero() {
            return Ok(());
        }

        let receiver_row = totals.entry(receiver.id).or_default();
        if net.is_positive() {
            receiver_row.receive(EntryType::Debit, &net);
        } else {
            receiver_row.receive(EntryType::Credit, &-&net);
        }
        Ok(())
    }
}

fn close_leg<'a>(
    entry: &FinancialEntry,
    modifier: &Modifier,
    accounts: &'a HashMap<AccountId, Account>,
    kind: ModifierAtomKind,
) -> Result<&'a Account, FiscalError> {
    let atom = modifier
        .first_atom_of(kind)
        .ok_or(FiscalError::MalformedClose(entry.id))?;
    accounts
        .get(&atom.account_id)
        .ok_or(FiscalError::AccountNotFound(atom.account_id))
}
