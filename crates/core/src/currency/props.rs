//! Property-based tests for exchange rate derivation.
//!
//! Rates are generated along a chain of currencies so that every pair is
//! reachable through exactly one path.

use chrono::{TimeZone, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{CurrencyId, FinancialEntryId};
use proptest::prelude::*;

use super::derivator::ExchangeRateDerivator;
use super::exchange::ExchangeEdge;
use super::service::CurrencyService;

/// Strategy for a positive traded amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Rational> {
    (1i64..100_000_000i64).prop_map(|cents| Rational::fraction(cents, 100).unwrap_or_default())
}

/// Strategy for a chain of trades linking currencies 1..=n in a random order.
fn chained_trades() -> impl Strategy<Value = (usize, Vec<ExchangeEdge>)> {
    (3usize..7).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((positive_amount(), positive_amount(), any::<bool>()), n - 1),
            Just((1..=n as u64).collect::<Vec<_>>()).prop_shuffle(),
        )
            .prop_map(|(n, amounts, order)| {
                let day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
                let edges = order
                    .windows(2)
                    .zip(amounts)
                    .enumerate()
                    .map(|(index, (pair, (give, take, flip)))| {
                        let (source, destination) = if flip { (pair[1], pair[0]) } else { (pair[0], pair[1]) };
                        ExchangeEdge {
                            entry_id: FinancialEntryId::new(index as u64 + 1),
                            transacted_at: day,
                            source_currency_id: CurrencyId::new(source),
                            source_amount: give,
                            destination_currency_id: CurrencyId::new(destination),
                            destination_amount: take,
                        }
                    })
                    .collect();
                (n, edges)
            })
    })
}

fn derivator(edges: Vec<ExchangeEdge>) -> ExchangeRateDerivator {
    ExchangeRateDerivator::new(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), edges)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// rate(A, C) == rate(A, B) * rate(B, C) for any three currencies.
    #[test]
    fn prop_rates_are_transitive(
        (n, edges) in chained_trades(),
        picks in (0usize..100, 0usize..100, 0usize..100),
    ) {
        let derivator = derivator(edges);
        let currency = |pick: usize| CurrencyId::new((pick % n) as u64 + 1);
        let (a, b, c) = (currency(picks.0), currency(picks.1), currency(picks.2));

        let direct = derivator.derive_exchange_rate(a, c).unwrap();
        let via = derivator.derive_exchange_rate(a, b).unwrap()
            * derivator.derive_exchange_rate(b, c).unwrap();
        prop_assert_eq!(direct, via);
    }

    /// Converting to another currency and back returns the original amount.
    #[test]
    fn prop_conversion_round_trips(
        (n, edges) in chained_trades(),
        amount in positive_amount(),
        picks in (0usize..100, 0usize..100),
    ) {
        let derivator = derivator(edges);
        let origin = CurrencyId::new((picks.0 % n) as u64 + 1);
        let target = CurrencyId::new((picks.1 % n) as u64 + 1);

        let there = CurrencyService::convert(&amount, &derivator.derive_exchange_rate(origin, target).unwrap());
        let back = CurrencyService::convert(&there, &derivator.derive_exchange_rate(target, origin).unwrap());
        prop_assert_eq!(back, amount);
    }

    /// Reversing a pair yields the exact reciprocal.
    #[test]
    fn prop_reverse_rate_is_reciprocal((n, edges) in chained_trades()) {
        let derivator = derivator(edges);
        let first = CurrencyId::new(1);
        let last = CurrencyId::new(n as u64);

        let forward = derivator.derive_exchange_rate(first, last).unwrap();
        let backward = derivator.derive_exchange_rate(last, first).unwrap();
        prop_assert_eq!(forward * backward, Rational::one());
    }
}
