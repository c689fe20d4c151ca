//! Plain-text statement rendering.

use std::fmt::{self, Write};

use frostbook_core::ledger::Currency;
use frostbook_core::reports::PeriodStatements;
use frostbook_core::{CurrencyService, Statement, StatementOutcome};
use frostbook_shared::Rational;
use frostbook_shared::types::CurrencyId;

fn code(currencies: &[Currency], id: CurrencyId) -> String {
    currencies
        .iter()
        .find(|currency| currency.id == id)
        .map_or_else(|| format!("#{id}"), |currency| currency.code.clone())
}

/// Renders every period's outcomes at `scale` decimal places.
pub fn statements(
    periods: &[PeriodStatements],
    currencies: &[Currency],
    scale: u32,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for period in periods {
        let frozen = period
            .frozen_period_id
            .map_or_else(|| "open".to_string(), |id| format!("frozen #{id}"));
        writeln!(
            out,
            "Period {} .. {} ({frozen})",
            period.started_at.to_rfc3339(),
            period.finished_at.to_rfc3339()
        )?;

        for outcome in &period.outcomes {
            match outcome {
                StatementOutcome::Generated(statement) => {
                    statement_block(&mut out, statement, currencies, scale)?;
                }
                StatementOutcome::Unreachable {
                    source_currency_id,
                    destination_currency_id,
                } => writeln!(
                    out,
                    "  {} -> {}: no exchange rate, statement omitted",
                    code(currencies, *source_currency_id),
                    code(currencies, *destination_currency_id)
                )?,
            }
        }
        writeln!(out)?;
    }
    Ok(out)
}

fn statement_block(
    out: &mut String,
    statement: &Statement,
    currencies: &[Currency],
    scale: u32,
) -> fmt::Result {
    let amount = |value: &Rational| CurrencyService::render(value, scale);
    let scope = &statement.scope;
    let source = scope
        .source_currency_id
        .map_or_else(|| "all".to_string(), |id| code(currencies, id));
    let rate = scope
        .exchange_rate
        .as_ref()
        .map_or_else(String::new, |value| format!(" @ {value}"));
    writeln!(
        out,
        "  {source} -> {}{rate}",
        code(currencies, scope.destination_currency_id)
    )?;

    for (label, balance) in [
        ("Unadjusted trial balance", &statement.unadjusted_trial_balance),
        ("Adjusted trial balance", &statement.adjusted_trial_balance),
    ] {
        writeln!(
            out,
            "    {label:<26}{:>16}{:>16}{}",
            amount(&balance.debit_total),
            amount(&balance.credit_total),
            if balance.is_balanced { "" } else { "  UNBALANCED" }
        )?;
    }

    let income = &statement.income_statement;
    writeln!(out, "    Income statement")?;
    for (label, value) in [
        ("Revenue", &income.total_revenue),
        ("Expense", &income.total_expense),
        ("Gross profit", &income.gross_profit),
        ("Net income", &income.net_income),
    ] {
        writeln!(out, "      {label:<24}{:>16}", amount(value))?;
    }

    let sheet = &statement.balance_sheet;
    writeln!(out, "    Balance sheet")?;
    for (label, value) in [
        ("Assets", &sheet.total_assets),
        ("Liabilities", &sheet.total_liabilities),
        ("Equity", &sheet.total_equity),
        ("Liabilities and equity", &sheet.liabilities_and_equity),
    ] {
        writeln!(out, "      {label:<24}{:>16}", amount(value))?;
    }

    let cash_flow = &statement.cash_flow_statement;
    writeln!(out, "    Cash flow")?;
    writeln!(
        out,
        "      {:<24}{:>16}",
        "Opening liquid",
        amount(&cash_flow.opened_liquid_amount)
    )?;
    for subtotal in &cash_flow.subtotals {
        writeln!(
            out,
            "      {:<24}{:>16}",
            format!("Activity {}", subtotal.cash_flow_activity_id),
            amount(&subtotal.net_amount)
        )?;
    }
    writeln!(
        out,
        "      {:<24}{:>16}",
        "Closing liquid",
        amount(&cash_flow.closed_liquid_amount)
    )
}
