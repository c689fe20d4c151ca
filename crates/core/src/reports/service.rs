//! Statement generation service.

use std::collections::BTreeMap;

use frostbook_shared::Rational;
use frostbook_shared::types::{AccountId, CurrencyId};
use tracing::{debug, info, warn};

use super::error::ReportError;
use super::types::{
    BalanceSheet, CashFlowStatement, CashFlowSubtotal, IncomeStatement, KindFigures,
    PeriodStatements, Statement, StatementOutcome, StatementScope, TrialBalance,
};
use crate::currency::ExchangeRateError;
use crate::fiscal::{Figure, FiscalError, TimeGroupManager};
use crate::ledger::types::{AccountKind, NormalSide};
use crate::store::LedgerStore;

/// Service for generating financial statements.
pub struct ReportService;

impl ReportService {
    /// Statements of every time group, one per source currency.
    ///
    /// A source currency without a rate to `destination` yields an
    /// `Unreachable` outcome; the other statements are still built.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::UnknownCurrency` for a destination the user
    /// does not own, or any loading error.
    pub fn generate_statements<S>(
        manager: &mut TimeGroupManager<'_, S>,
        destination: CurrencyId,
    ) -> Result<Vec<PeriodStatements>, ReportError>
    where
        S: LedgerStore + ?Sized,
    {
        Self::ensure_currency(manager, destination)?;

        let periods = (0..manager.groups().len())
            .map(|index| Self::generate_group_statements(manager, index, destination))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            destination_currency_id = %destination,
            groups = periods.len(),
            "statements generated"
        );
        Ok(periods)
    }

    /// Statements of one time group, one per source currency.
    ///
    /// # Errors
    ///
    /// As for [`Self::generate_statements`].
    pub fn generate_group_statements<S>(
        manager: &mut TimeGroupManager<'_, S>,
        index: usize,
        destination: CurrencyId,
    ) -> Result<PeriodStatements, ReportError>
    where
        S: LedgerStore + ?Sized,
    {
        Self::ensure_currency(manager, destination)?;

        let mut sources: Vec<CurrencyId> = manager
            .currencies()
            .iter()
            .map(|currency| currency.id)
            .collect();
        sources.sort_unstable();

        let mut outcomes = Vec::new();
        for source in sources {
            match Self::build_statement(manager, index, Some(source), destination) {
                Ok(Some(statement)) => {
                    outcomes.push(StatementOutcome::Generated(Box::new(statement)));
                }
                Ok(None) => {}
                Err(FiscalError::Exchange(ExchangeRateError::Unreachable {
                    source_currency_id,
                    destination_currency_id,
                    as_of,
                })) => {
                    warn!(
                        source_currency_id = %source_currency_id,
                        destination_currency_id = %destination_currency_id,
                        %as_of,
                        "statement omitted, no exchange rate path"
                    );
                    outcomes.push(StatementOutcome::Unreachable {
                        source_currency_id,
                        destination_currency_id,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }

        let group = manager.group(index)?;
        Ok(PeriodStatements {
            started_at: group.started_at,
            finished_at: group.finished_at,
            frozen_period_id: group.frozen_period_id(),
            outcomes,
        })
    }

    fn ensure_currency<S>(
        manager: &TimeGroupManager<'_, S>,
        currency_id: CurrencyId,
    ) -> Result<(), ReportError>
    where
        S: LedgerStore + ?Sized,
    {
        if manager
            .currencies()
            .iter()
            .any(|currency| currency.id == currency_id)
        {
            Ok(())
        } else {
            Err(ReportError::UnknownCurrency(currency_id))
        }
    }

    /// Statement of one time group.
    ///
    /// `source` keeps only accounts kept in that currency; `None` keeps
    /// every account. Returns `None` when no account matches, which is not
    /// the same as a statement full of zeros.
    ///
    /// # Errors
    ///
    /// Returns `FiscalError::Exchange` when an account's currency cannot be
    /// converted, or any loading error.
    pub fn build_statement<S>(
        manager: &mut TimeGroupManager<'_, S>,
        index: usize,
        source: Option<CurrencyId>,
        destination: CurrencyId,
    ) -> Result<Option<Statement>, FiscalError>
    where
        S: LedgerStore + ?Sized,
    {
        let mut by_kind: BTreeMap<AccountKind, Vec<AccountId>> = BTreeMap::new();
        for account in manager.accounts().values() {
            if source.is_none_or(|wanted| account.currency_id == wanted) {
                by_kind.entry(account.kind).or_default().push(account.id);
            }
        }
        if by_kind.is_empty() {
            debug!(?source, "no accounts match the source currency");
            return Ok(None);
        }

        let exchange_rate = source
            .map(|wanted| manager.exchange_rate(index, wanted, destination))
            .transpose()?;

        let mut kinds = BTreeMap::new();
        for (kind, ids) in &mut by_kind {
            ids.sort_unstable();
            let figures = KindFigures {
                opened_debit: manager.group_total(index, Figure::OpenedDebit, ids, destination)?,
                opened_credit: manager.group_total(index, Figure::OpenedCredit, ids, destination)?,
                unadjusted_debit: manager.group_total(
                    index,
                    Figure::UnadjustedDebit,
                    ids,
                    destination,
                )?,
                unadjusted_credit: manager.group_total(
                    index,
                    Figure::UnadjustedCredit,
                    ids,
                    destination,
                )?,
                closed_debit: manager.group_total(index, Figure::ClosedDebit, ids, destination)?,
                closed_credit: manager.group_total(index, Figure::ClosedCredit, ids, destination)?,
            };
            kinds.insert(*kind, figures);
        }

        let ids: Vec<AccountId> = by_kind.values().flatten().copied().collect();
        let mut subtotals = Vec::new();
        for activity in manager.group_activities(index, &ids)? {
            let net_amount = manager.group_net_cash_flow(index, &ids, destination, Some(activity))?;
            subtotals.push(CashFlowSubtotal {
                cash_flow_activity_id: activity,
                net_amount,
            });
        }

        let group = manager.group(index)?;
        let scope = StatementScope {
            started_at: group.started_at,
            finished_at: group.finished_at,
            frozen_period_id: group.frozen_period_id(),
            source_currency_id: source,
            destination_currency_id: destination,
            exchange_rate,
        };
        Ok(Some(Self::assemble(scope, &kinds, subtotals)))
    }

    /// Builds a statement from converted per-kind figures and flow subtotals.
    ///
    /// Subtotals that net to exactly zero are dropped.
    #[must_use]
    pub fn assemble(
        scope: StatementScope,
        kinds: &BTreeMap<AccountKind, KindFigures>,
        subtotals: Vec<CashFlowSubtotal>,
    ) -> Statement {
        let debit_normal = |kind: AccountKind| kind.normal_side() == NormalSide::DebitNormal;
        let credit_normal = |kind: AccountKind| kind.normal_side() == NormalSide::CreditNormal;

        let unadjusted_trial_balance = TrialBalance::new(
            total_of(kinds, &debit_normal, KindFigures::unadjusted_net),
            total_of(kinds, &credit_normal, KindFigures::unadjusted_net),
        );
        let adjusted_trial_balance = TrialBalance::new(
            total_of(kinds, &debit_normal, KindFigures::closed_net),
            total_of(kinds, &credit_normal, KindFigures::closed_net),
        );

        let of = |kind: AccountKind| {
            total_of(
                kinds,
                &|other: AccountKind| other == kind,
                KindFigures::unadjusted_net,
            )
        };
        let general_revenue = of(AccountKind::GeneralRevenue);
        let direct_revenue = of(AccountKind::DirectRevenue);
        let general_expense = of(AccountKind::GeneralExpense);
        let direct_expense = of(AccountKind::DirectExpense);
        let total_revenue = &general_revenue + &direct_revenue;
        let total_expense = &general_expense + &direct_expense;
        let income_statement = IncomeStatement {
            gross_profit: &direct_revenue - &direct_expense,
            net_income: &total_revenue - &total_expense,
            general_revenue,
            direct_revenue,
            total_revenue,
            general_expense,
            direct_expense,
            total_expense,
        };

        let total_assets = total_of(kinds, &AccountKind::is_asset, KindFigures::unadjusted_net);
        let total_liabilities = of(AccountKind::Liability);
        let equity = of(AccountKind::Equity);
        let temporary_balance = of(AccountKind::Temporary);
        let net_income = income_statement.net_income.clone();
        let total_equity = &(&equity + &net_income) - &temporary_balance;
        let liabilities_and_equity = &total_liabilities + &total_equity;
        let balance_sheet = BalanceSheet {
            liquid_assets: of(AccountKind::LiquidAsset),
            is_balanced: total_assets == liabilities_and_equity,
            total_assets,
            total_liabilities,
            equity,
            net_income,
            temporary_balance,
            total_equity,
            liabilities_and_equity,
        };

        let is_liquid = |kind: AccountKind| kind == AccountKind::LiquidAsset;
        let subtotals: Vec<CashFlowSubtotal> = subtotals
            .into_iter()
            .filter(|subtotal| !subtotal.net_amount.is_zero())
            .collect();
        let cash_flow_statement = CashFlowStatement {
            opened_liquid_amount: total_of(kinds, &is_liquid, KindFigures::opened_net),
            closed_liquid_amount: total_of(kinds, &is_liquid, KindFigures::closed_net),
            net_cash_flow: subtotals.iter().map(|subtotal| &subtotal.net_amount).sum(),
            subtotals,
        };

        Statement {
            scope,
            unadjusted_trial_balance,
            adjusted_trial_balance,
            income_statement,
            balance_sheet,
            cash_flow_statement,
        }
    }
}

/// Sum of one net over the kinds accepted by `wanted`.
fn total_of(
    kinds: &BTreeMap<AccountKind, KindFigures>,
    wanted: &dyn Fn(AccountKind) -> bool,
    net: fn(&KindFigures, AccountKind) -> Rational,
) -> Rational {
    kinds
        .iter()
        .filter(|(kind, _)| wanted(**kind))
        .map(|(kind, figures)| net(figures, *kind))
        .sum()
}
