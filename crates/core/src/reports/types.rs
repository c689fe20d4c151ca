//! Statement data types.

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{CashFlowActivityId, CurrencyId, FrozenPeriodId};
use serde::{Deserialize, Serialize};

use crate::ledger::types::AccountKind;

/// Converted totals of every account of one kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindFigures {
    /// Opened debit.
    pub opened_debit: Rational,
    /// Opened credit.
    pub opened_credit: Rational,
    /// Unadjusted debit.
    pub unadjusted_debit: Rational,
    /// Unadjusted credit.
    pub unadjusted_credit: Rational,
    /// Closed debit.
    pub closed_debit: Rational,
    /// Closed credit.
    pub closed_credit: Rational,
}

impl KindFigures {
    /// Opened balance on the kind's normal side.
    #[must_use]
    pub fn opened_net(&self, kind: AccountKind) -> Rational {
        kind.normal_side()
            .balance(&self.opened_debit, &self.opened_credit)
    }

    /// Unadjusted balance on the kind's normal side.
    #[must_use]
    pub fn unadjusted_net(&self, kind: AccountKind) -> Rational {
        kind.normal_side()
            .balance(&self.unadjusted_debit, &self.unadjusted_credit)
    }

    /// Closed balance on the kind's normal side.
    #[must_use]
    pub fn closed_net(&self, kind: AccountKind) -> Rational {
        kind.normal_side()
            .balance(&self.closed_debit, &self.closed_credit)
    }
}

/// What a statement covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementScope {
    /// Inclusive start of the time group.
    pub started_at: DateTime<Utc>,
    /// Exclusive end of the time group.
    pub finished_at: DateTime<Utc>,
    /// Persisted period, `None` for the open tail or a dry run.
    pub frozen_period_id: Option<FrozenPeriodId>,
    /// Currency the accounts were filtered by, `None` for every account.
    pub source_currency_id: Option<CurrencyId>,
    /// Currency every figure is expressed in.
    pub destination_currency_id: CurrencyId,
    /// Units of destination per unit of source, when filtered by source.
    pub exchange_rate: Option<Rational>,
}

/// Debit-normal balances against credit-normal balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Sum of debit-normal balances.
    pub debit_total: Rational,
    /// Sum of credit-normal balances.
    pub credit_total: Rational,
    /// Whether both sides are equal.
    pub is_balanced: bool,
}

impl TrialBalance {
    /// Builds a trial balance from its two sides.
    #[must_use]
    pub fn new(debit_total: Rational, credit_total: Rational) -> Self {
        let is_balanced = debit_total == credit_total;
        Self {
            debit_total,
            credit_total,
            is_balanced,
        }
    }
}

/// Income statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// General revenue.
    pub general_revenue: Rational,
    /// Direct revenue.
    pub direct_revenue: Rational,
    /// All revenue.
    pub total_revenue: Rational,
    /// General expense.
    pub general_expense: Rational,
    /// Direct expense.
    pub direct_expense: Rational,
    /// All expense.
    pub total_expense: Rational,
    /// Direct revenue minus direct expense.
    pub gross_profit: Rational,
    /// All revenue minus all expense.
    pub net_income: Rational,
}

/// Balance sheet with the period's income folded into equity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Liquid assets.
    pub liquid_assets: Rational,
    /// All assets.
    pub total_assets: Rational,
    /// Liabilities.
    pub total_liabilities: Rational,
    /// Equity accounts alone.
    pub equity: Rational,
    /// Net income of the period.
    pub net_income: Rational,
    /// Balance still parked in temporary accounts.
    pub temporary_balance: Rational,
    /// Equity plus net income minus the temporary balance.
    pub total_equity: Rational,
    /// Liabilities plus total equity.
    pub liabilities_and_equity: Rational,
    /// Whether assets equal liabilities plus equity.
    pub is_balanced: bool,
}

/// Net cash flow of one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowSubtotal {
    /// Activity the flow is reported under.
    pub cash_flow_activity_id: CashFlowActivityId,
    /// Positive when cash came in.
    pub net_amount: Rational,
}

/// Cash flow statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    /// Liquid balance at the start.
    pub opened_liquid_amount: Rational,
    /// Liquid balance at the end.
    pub closed_liquid_amount: Rational,
    /// Non-zero subtotals, ordered by activity.
    pub subtotals: Vec<CashFlowSubtotal>,
    /// Sum of the subtotals.
    pub net_cash_flow: Rational,
}

/// Every statement of one time group for one source currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// What the statement covers.
    pub scope: StatementScope,
    /// Trial balance before closing.
    pub unadjusted_trial_balance: TrialBalance,
    /// Trial balance after closing.
    pub adjusted_trial_balance: TrialBalance,
    /// Income statement.
    pub income_statement: IncomeStatement,
    /// Balance sheet.
    pub balance_sheet: BalanceSheet,
    /// Cash flow statement.
    pub cash_flow_statement: CashFlowStatement,
}

/// Result of one statement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementOutcome {
    /// The statement was built.
    Generated(Box<Statement>),
    /// No rate links the two currencies; the statement was left out.
    Unreachable {
        /// Currency the accounts are kept in.
        source_currency_id: CurrencyId,
        /// Currency requested.
        destination_currency_id: CurrencyId,
    },
}

impl StatementOutcome {
    /// The statement, if it was built.
    #[must_use]
    pub fn statement(&self) -> Option<&Statement> {
        match self {
            Self::Generated(statement) => Some(statement),
            Self::Unreachable { .. } => None,
        }
    }
}

/// Outcomes of one time group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStatements {
    /// Inclusive start.
    pub started_at: DateTime<Utc>,
    /// Exclusive end.
    pub finished_at: DateTime<Utc>,
    /// Persisted period, if any.
    pub frozen_period_id: Option<FrozenPeriodId>,
    /// One outcome per source currency with accounts, ordered by currency.
    pub outcomes: Vec<StatementOutcome>,
}
