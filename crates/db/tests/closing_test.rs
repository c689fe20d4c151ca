//! Period closing against the in-memory store.
//!
//! Covers the freeze gate, period boundaries, carried balances and dry runs.

#![allow(clippy::similar_names)]

mod common;

use common::{
    CAPITAL, CASH, INVEST, Ledger, OWNER, PHP, SUPPLIES, bookshop, ctx, day, january, r,
};
use frostbook_core::fiscal::{FrozenAccountHash, SummaryCalculation};
use frostbook_core::ledger::{AccountKind, FinancialEntry};
use frostbook_core::{ClosingService, FiscalError, LedgerStore};
use frostbook_shared::types::{
    AccountId, CashFlowActivityId, FinancialEntryId, FrozenPeriodId, ModifierId,
};
use frostbook_shared::Rational;
use rust_decimal_macros::dec;

fn row(store: &impl LedgerStore, start: u32, end: u32, account: u64) -> SummaryCalculation {
    let hash = FrozenAccountHash::derive(day(start, 1), day(end, 1), AccountId::new(account));
    store
        .load_summary_calculations(&[hash])
        .unwrap()
        .pop()
        .unwrap()
}

#[test]
fn test_january_freezes_with_closed_expense() {
    let mut ledger = bookshop();
    january(&mut ledger);

    let period =
        ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
            .unwrap();
    assert_eq!(period.id, FrozenPeriodId::new(1));
    assert_eq!(period.owner_id, OWNER);

    let cash = row(&ledger.store, 1, 2, CASH);
    assert_eq!(cash.opened_debit_amount, Rational::zero());
    assert_eq!(cash.unadjusted_debit_amount, r(dec!(1000)));
    assert_eq!(cash.unadjusted_credit_amount, r(dec!(250)));
    assert_eq!(cash.closed_debit_amount, r(dec!(1000)));
    assert_eq!(cash.closed_credit_amount, r(dec!(250)));

    let capital = row(&ledger.store, 1, 2, CAPITAL);
    assert_eq!(capital.unadjusted_credit_amount, r(dec!(1000)));
    assert_eq!(capital.closed_debit_amount, Rational::zero());
    assert_eq!(capital.closed_credit_amount, r(dec!(750)));

    let supplies = row(&ledger.store, 1, 2, SUPPLIES);
    assert_eq!(supplies.unadjusted_debit_amount, r(dec!(250)));
    assert!(supplies.closed_debit_amount.is_zero());
    assert!(supplies.closed_credit_amount.is_zero());
}

#[test]
fn test_january_flows_follow_counterparties() {
    let mut ledger = bookshop();
    january(&mut ledger);

    let computation =
        ClosingService::compute_frozen_period(&ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
            .unwrap();
    assert!(computation.balanced);

    let flows: Vec<(u64, u64, Rational)> = computation
        .flow_calculations
        .iter()
        .map(|row| {
            (
                row.account_id.into_inner(),
                row.cash_flow_activity_id.into_inner(),
                row.net_amount.clone(),
            )
        })
        .collect();
    assert_eq!(
        flows,
        vec![
            (CAPITAL, 20, r(dec!(1000))),
            (SUPPLIES, 30, r(dec!(-250))),
        ]
    );
}

#[test]
fn test_second_period_opens_with_carried_balances() {
    let mut ledger = bookshop();
    january(&mut ledger);
    let now = ctx(day(3, 1));
    ClosingService::freeze_period(&mut ledger.store, &now, day(1, 1), day(2, 1)).unwrap();

    ledger.post(INVEST, day(2, 10), dec!(2750));
    let period = ClosingService::freeze_period(&mut ledger.store, &now, day(2, 1), day(3, 1))
        .unwrap();
    assert_eq!(period.id, FrozenPeriodId::new(2));

    let cash = row(&ledger.store, 2, 3, CASH);
    assert_eq!(cash.opened_debit_amount, r(dec!(750)));
    assert_eq!(cash.opened_credit_amount, Rational::zero());
    assert_eq!(cash.unadjusted_debit_amount, r(dec!(3500)));
    assert_eq!(cash.closed_debit_amount, r(dec!(3500)));

    let capital = row(&ledger.store, 2, 3, CAPITAL);
    assert_eq!(capital.opened_credit_amount, r(dec!(750)));
    assert_eq!(capital.closed_credit_amount, r(dec!(3500)));

    // Expenses do not carry over.
    let supplies = FrozenAccountHash::derive(day(2, 1), day(3, 1), AccountId::new(SUPPLIES));
    assert!(
        ledger
            .store
            .load_summary_calculations(&[supplies])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_boundaries_are_enforced() {
    let mut ledger = bookshop();
    january(&mut ledger);
    let now = ctx(day(3, 1));

    let err = ClosingService::freeze_period(&mut ledger.store, &now, day(1, 3), day(2, 1))
        .unwrap_err();
    assert!(matches!(err, FiscalError::UncoveredEntries { .. }));

    let err = ClosingService::freeze_period(&mut ledger.store, &now, day(2, 1), day(2, 1))
        .unwrap_err();
    assert!(matches!(err, FiscalError::EmptyPeriod { .. }));

    let err = ClosingService::freeze_period(&mut ledger.store, &now, day(1, 1), day(4, 1))
        .unwrap_err();
    assert!(matches!(err, FiscalError::EndInFuture { .. }));

    ClosingService::freeze_period(&mut ledger.store, &now, day(1, 1), day(2, 1)).unwrap();

    let err = ClosingService::freeze_period(&mut ledger.store, &now, day(2, 2), day(3, 1))
        .unwrap_err();
    assert!(matches!(err, FiscalError::Gap { expected, .. } if expected == day(2, 1)));

    let err = ClosingService::freeze_period(&mut ledger.store, &now, day(1, 15), day(3, 1))
        .unwrap_err();
    assert!(matches!(err, FiscalError::Overlap { expected, .. } if expected == day(2, 1)));

    assert_eq!(ledger.store.load_frozen_periods(OWNER).unwrap().len(), 1);
}

#[test]
fn test_period_may_end_now() {
    let mut ledger = bookshop();
    january(&mut ledger);
    ClosingService::freeze_period(&mut ledger.store, &ctx(day(2, 1)), day(1, 1), day(2, 1))
        .unwrap();
}

#[test]
fn test_empty_first_period_freezes_without_rows() {
    let mut ledger = bookshop();
    ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
        .unwrap();

    let records = ledger.store.export(OWNER);
    assert_eq!(records.frozen_periods.len(), 1);
    assert!(records.frozen_periods[0].summary_calculations.is_empty());
    assert!(records.frozen_periods[0].flow_calculations.is_empty());
}

const SUSPENSE: u64 = 4;
const PARK: u64 = 4;
const CLEAR: u64 = 5;

fn with_suspense() -> Ledger {
    let mut ledger = bookshop();
    ledger
        .account(SUSPENSE, PHP, AccountKind::Temporary)
        .record(PARK, CASH, SUSPENSE, 40)
        .close(CLEAR, SUSPENSE, CAPITAL);
    ledger.post(PARK, day(1, 5), dec!(100));
    ledger
}

#[test]
fn test_unclosed_temporary_account_blocks_the_freeze() {
    let mut ledger = with_suspense();

    let err =
        ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
            .unwrap_err();
    match err {
        FiscalError::TemporaryAccountNotClosed { account_id, net } => {
            assert_eq!(account_id, AccountId::new(SUSPENSE));
            assert_eq!(net, r(dec!(-100)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(nothing_frozen(&ledger));
}

fn nothing_frozen(ledger: &Ledger) -> bool {
    ledger.store.load_frozen_periods(OWNER).unwrap().is_empty()
        && ledger.store.export(OWNER).frozen_periods.is_empty()
}

#[test]
fn test_closing_the_temporary_account_unblocks_the_freeze() {
    let mut ledger = with_suspense();
    ledger.close_at(CLEAR, day(1, 6));

    ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
        .unwrap();

    let suspense = row(&ledger.store, 1, 2, SUSPENSE);
    assert_eq!(suspense.unadjusted_credit_amount, r(dec!(100)));
    assert!(suspense.closed_debit_amount.is_zero());
    assert!(suspense.closed_credit_amount.is_zero());

    let capital = row(&ledger.store, 1, 2, CAPITAL);
    assert!(capital.unadjusted_credit_amount.is_zero());
    assert_eq!(capital.closed_credit_amount, r(dec!(100)));
}

#[test]
fn test_dry_run_persists_nothing() {
    let mut ledger = bookshop();
    january(&mut ledger);

    let computation =
        ClosingService::compute_frozen_period(&ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
            .unwrap();
    assert_eq!(computation.summary_calculations.len(), 3);
    assert!(computation.first_violation().is_none());
    assert!(ledger.store.load_frozen_periods(OWNER).unwrap().is_empty());

    // The dry run did not block later entries inside the window.
    ledger.post(INVEST, day(1, 20), dec!(5));
}

#[test]
fn test_frozen_window_refuses_new_entries() {
    let mut ledger = bookshop();
    january(&mut ledger);
    ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
        .unwrap();

    let late = FinancialEntry {
        id: FinancialEntryId::new(99),
        modifier_id: ModifierId::new(INVEST),
        transacted_at: day(1, 31),
        atoms: Vec::new(),
    };
    assert!(ledger.store.insert_financial_entry(OWNER, late).is_err());
}

#[test]
fn test_flows_are_stored_with_the_period() {
    let mut ledger = bookshop();
    january(&mut ledger);
    ClosingService::freeze_period(&mut ledger.store, &ctx(day(3, 1)), day(1, 1), day(2, 1))
        .unwrap();

    let hash = FrozenAccountHash::derive(day(1, 1), day(2, 1), AccountId::new(CAPITAL));
    let flows = ledger.store.load_flow_calculations(&[hash]).unwrap();
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0].cash_flow_activity_id, CashFlowActivityId::new(20));
    assert_eq!(flows[0].net_amount, r(dec!(1000)));
}
