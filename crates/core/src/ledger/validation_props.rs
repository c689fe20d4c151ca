//! Property-based tests for entry balance and permission rules.

use frostbook_shared::Rational;
use frostbook_shared::types::{CashFlowActivityId, CurrencyId};
use proptest::prelude::*;

use super::error::LedgerError;
use super::permission::{ProposedAtom, validate_permissions};
use super::types::{AccountKind, ModifierAction, ModifierAtomKind};
use super::validation::{ValuedAtom, validate_balance};

/// Strategy for a strictly positive fraction with a small denominator.
fn positive_value() -> impl Strategy<Value = Rational> {
    (1i64..10_000_000i64, 1i64..1_000i64)
        .prop_map(|(numer, denom)| Rational::fraction(numer, denom).unwrap_or_default())
}

/// Strategy for a list of positive values split across debit legs.
fn debit_legs() -> impl Strategy<Value = Vec<Rational>> {
    prop::collection::vec(positive_value(), 1..6)
}

fn any_account_kind() -> impl Strategy<Value = AccountKind> {
    prop::sample::select(AccountKind::ALL.to_vec())
}

fn record(debits: &[Rational], credits: &[Rational]) -> Vec<ValuedAtom> {
    debits
        .iter()
        .map(|v| ValuedAtom::new(ModifierAtomKind::RealDebit, v.clone()))
        .chain(
            credits
                .iter()
                .map(|v| ValuedAtom::new(ModifierAtomKind::RealCredit, v.clone())),
        )
        .collect()
}

fn proposed(kind: ModifierAtomKind, account_kind: AccountKind, currency: u64) -> ProposedAtom {
    let needs_activity = kind.is_real() && account_kind != AccountKind::LiquidAsset;
    ProposedAtom {
        kind,
        account_kind,
        currency_id: CurrencyId::new(currency),
        cash_flow_activity_id: needs_activity.then_some(CashFlowActivityId::new(1)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any split of one total into debit legs balances a single credit leg.
    #[test]
    fn prop_balanced_record_accepted(debits in debit_legs()) {
        let total: Rational = debits.iter().sum();
        let values = record(&debits, &[total]);

        let result = validate_balance(ModifierAction::Record, &values);
        prop_assert!(result.is_ok(), "balanced record rejected: {:?}", result);
    }

    /// Accepted records always have equal real debit and credit sums.
    #[test]
    fn prop_accepted_records_balance_exactly(
        debits in debit_legs(),
        credits in debit_legs(),
    ) {
        let values = record(&debits, &credits);
        let debit_sum: Rational = debits.iter().sum();
        let credit_sum: Rational = credits.iter().sum();

        let result = validate_balance(ModifierAction::Record, &values);
        prop_assert_eq!(result.is_ok(), debit_sum == credit_sum);
    }

    /// Nudging one side by any positive amount breaks the balance.
    #[test]
    fn prop_perturbed_record_rejected(
        debits in debit_legs(),
        nudge in positive_value(),
    ) {
        let total: Rational = debits.iter().sum();
        let values = record(&debits, &[total + nudge]);

        let result = validate_balance(ModifierAction::Record, &values);
        prop_assert!(
            matches!(result, Err(LedgerError::UnbalancedEntry { .. })),
            "perturbed record accepted: {:?}",
            result
        );
    }

    /// A zero leg is rejected no matter how the rest balances.
    #[test]
    fn prop_zero_leg_rejected(value in positive_value()) {
        let mut values = record(&[value.clone()], &[value]);
        values.push(ValuedAtom::new(ModifierAtomKind::RealCredit, Rational::zero()));

        let result = validate_balance(ModifierAction::Record, &values);
        prop_assert!(
            matches!(result, Err(LedgerError::ZeroValue { index: 2 })),
            "zero leg accepted: {:?}",
            result
        );
    }

    /// Exchanges between accounts of one currency never pass the matrix.
    #[test]
    fn prop_same_currency_exchange_rejected(
        debit_kind in any_account_kind(),
        credit_kind in any_account_kind(),
        currency in 1u64..50,
    ) {
        let atoms = [
            proposed(ModifierAtomKind::RealDebit, debit_kind, currency),
            proposed(ModifierAtomKind::RealCredit, credit_kind, currency),
        ];
        prop_assert!(validate_permissions(ModifierAction::Exchange, &atoms).is_err());
    }

    /// Record accepts one debit and one credit on any postable pair.
    #[test]
    fn prop_record_accepts_postable_pairs(
        debit_kind in any_account_kind(),
        credit_kind in any_account_kind(),
    ) {
        let atoms = [
            proposed(ModifierAtomKind::RealDebit, debit_kind, 1),
            proposed(ModifierAtomKind::RealCredit, credit_kind, 1),
        ];
        let postable = |kind: AccountKind| kind != AccountKind::ItemizedAsset;

        let result = validate_permissions(ModifierAction::Record, &atoms);
        prop_assert_eq!(result.is_ok(), postable(debit_kind) && postable(credit_kind));
    }
}
