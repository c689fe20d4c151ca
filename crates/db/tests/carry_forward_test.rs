//! Property tests for balances carried from one frozen period to the next.

mod common;

use common::{
    CAPITAL, CASH, CLOSE_SUPPLIES, INVEST, SPEND, SUPPLIES, bookshop, ctx, day, r,
};
use frostbook_core::fiscal::{FrozenAccountHash, SummaryCalculation};
use frostbook_core::{ClosingService, LedgerStore};
use frostbook_db::MemoryStore;
use frostbook_shared::Rational;
use frostbook_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn row(store: &MemoryStore, month: u32, account: u64) -> Option<SummaryCalculation> {
    let hash = FrozenAccountHash::derive(day(month, 1), day(month + 1, 1), AccountId::new(account));
    store.load_summary_calculations(&[hash]).unwrap().pop()
}

fn opened_net(row: Option<SummaryCalculation>) -> Rational {
    row.map_or_else(Rational::zero, |row| {
        &row.opened_debit_amount - &row.opened_credit_amount
    })
}

fn closed_net(row: Option<SummaryCalculation>) -> Rational {
    row.map_or_else(Rational::zero, |row| row.closed_net_debit())
}

fn movements() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 1i64..1_000_000), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each month opens with the previous month's closed permanent balances.
    #[test]
    fn prop_next_period_opens_at_previous_close(
        january in movements(),
        february in movements(),
    ) {
        let mut ledger = bookshop();
        let now = ctx(day(4, 1));
        let mut expected_equity = Rational::zero();

        for (month, movements) in [(1, &january), (2, &february)] {
            for (index, (spend, cents)) in movements.iter().enumerate() {
                let amount = Decimal::new(*cents, 2);
                let at = day(month, 2 + u32::try_from(index).unwrap());
                if *spend {
                    ledger.post(SPEND, at, amount);
                    expected_equity -= r(amount);
                } else {
                    ledger.post(INVEST, at, amount);
                    expected_equity += r(amount);
                }
            }
            ledger.close_at(CLOSE_SUPPLIES, day(month, 20));
            ClosingService::freeze_period(&mut ledger.store, &now, day(month, 1), day(month + 1, 1))
                .unwrap();

            // Closing folds expenses into equity, so capital tracks cash.
            prop_assert_eq!(closed_net(row(&ledger.store, month, CAPITAL)), -&expected_equity);
            prop_assert_eq!(closed_net(row(&ledger.store, month, CASH)), expected_equity.clone());
            prop_assert!(closed_net(row(&ledger.store, month, SUPPLIES)).is_zero());
        }

        for account in [CASH, CAPITAL] {
            prop_assert_eq!(
                opened_net(row(&ledger.store, 2, account)),
                closed_net(row(&ledger.store, 1, account))
            );
        }
        prop_assert!(opened_net(row(&ledger.store, 2, SUPPLIES)).is_zero());
    }
}
