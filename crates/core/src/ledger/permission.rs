//! Account-kind permission matrix.
//!
//! Every modifier action owns a static rule set describing which atom kinds it
//! may carry and which account kinds each atom kind may post to. The
//! validator is a single interpreter over these tables; there is no per-action
//! code path.
//!
//! A rule set is a list of [`AtomRule`]s, one per allowed atom kind. Each
//! atom rule holds condition groups:
//!
//! - `All`: every listed account kind must be observed, and each kind's count
//!   must be inside the group's range.
//! - `Any`: the summed count of the listed kinds must be inside the range.
//!
//! Atom kinds missing from the rule set and account kinds not named by any
//! group of their atom kind are forbidden.

use std::collections::HashMap;

use frostbook_shared::types::{CashFlowActivityId, CurrencyId};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{AccountKind, ModifierAction, ModifierAtomKind};

/// How the account kinds of a group are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Each listed kind must appear, each count in range.
    All,
    /// The summed count of listed kinds must be in range.
    Any,
}

/// Inclusive count range. `max: None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Minimum count.
    pub min: usize,
    /// Maximum count, if bounded.
    pub max: Option<usize>,
}

impl CountRange {
    /// Exactly `n`.
    #[must_use]
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// `n` or more.
    #[must_use]
    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    /// Zero up to `n`.
    #[must_use]
    pub const fn at_most(n: usize) -> Self {
        Self {
            min: 0,
            max: Some(n),
        }
    }

    /// Returns true if `count` lies inside the range.
    #[must_use]
    pub const fn contains(&self, count: usize) -> bool {
        if count < self.min {
            return false;
        }
        match self.max {
            Some(max) => count <= max,
            None => true,
        }
    }
}

impl std::fmt::Display for CountRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {max}"),
            Some(max) => write!(f, "{}..={max}", self.min),
            None => write!(f, "{}..", self.min),
        }
    }
}

/// A set of account kinds and how many of them an atom kind may use.
#[derive(Debug, Clone, Copy)]
pub struct ConditionGroup {
    /// Counting mode.
    pub condition: Condition,
    /// Account kinds named by the group.
    pub account_kinds: &'static [AccountKind],
    /// Allowed count.
    pub range: CountRange,
}

/// Condition groups for one atom kind.
#[derive(Debug, Clone, Copy)]
pub struct AtomRule {
    /// Atom kind governed by this rule.
    pub atom_kind: ModifierAtomKind,
    /// Groups that must all hold.
    pub groups: &'static [ConditionGroup],
}

/// Rules spanning several atoms that cannot be phrased as count groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraRule {
    /// Exactly two real atoms whose currencies differ.
    DistinctRealCurrencies,
    /// All real atoms share one currency.
    SharedRealCurrency,
    /// At least one real atom posts to a nominal account.
    NominalCloseSource,
}

/// Complete rule set of one action.
#[derive(Debug, Clone, Copy)]
pub struct ActionRules {
    /// Action governed by this rule set.
    pub action: ModifierAction,
    /// Allowed atom kinds.
    pub atoms: &'static [AtomRule],
    /// Additional cross-atom rules.
    pub extra: &'static [ExtraRule],
}

impl ActionRules {
    /// Rule for an atom kind, if the action allows it.
    #[must_use]
    pub fn atom_rule(&self, kind: ModifierAtomKind) -> Option<&AtomRule> {
        self.atoms.iter().find(|rule| rule.atom_kind == kind)
    }
}

/// One proposed atom as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposedAtom {
    /// Atom kind.
    pub kind: ModifierAtomKind,
    /// Kind of the linked account.
    pub account_kind: AccountKind,
    /// Currency of the linked account.
    pub currency_id: CurrencyId,
    /// Cash flow activity attached to the atom.
    pub cash_flow_activity_id: Option<CashFlowActivityId>,
}

const POSTABLE: &[AccountKind] = &[
    AccountKind::GeneralAsset,
    AccountKind::LiquidAsset,
    AccountKind::DepreciativeAsset,
    AccountKind::Liability,
    AccountKind::Equity,
    AccountKind::GeneralExpense,
    AccountKind::DirectExpense,
    AccountKind::GeneralRevenue,
    AccountKind::DirectRevenue,
    AccountKind::Temporary,
];

const CLOSABLE: &[AccountKind] = &[
    AccountKind::Equity,
    AccountKind::GeneralExpense,
    AccountKind::DirectExpense,
    AccountKind::GeneralRevenue,
    AccountKind::DirectRevenue,
    AccountKind::Temporary,
];

const EXCHANGEABLE: &[AccountKind] = &[AccountKind::LiquidAsset, AccountKind::GeneralAsset];
const ITEMIZED: &[AccountKind] = &[AccountKind::ItemizedAsset];
const EXPENSES: &[AccountKind] = &[AccountKind::GeneralExpense, AccountKind::DirectExpense];
const REVENUES_OR_EQUITY: &[AccountKind] = &[
    AccountKind::GeneralRevenue,
    AccountKind::DirectRevenue,
    AccountKind::Equity,
];

macro_rules! any_of {
    ($kinds:expr, $range:expr $(,)?) => {
        ConditionGroup {
            condition: Condition::Any,
            account_kinds: $kinds,
            range: $range,
        }
    };
}

macro_rules! all_of {
    ($kinds:expr, $range:expr $(,)?) => {
        ConditionGroup {
            condition: Condition::All,
            account_kinds: $kinds,
            range: $range,
        }
    };
}

macro_rules! atom_rule {
    ($kind:ident, [$($group:expr),+ $(,)?]) => {
        AtomRule {
            atom_kind: ModifierAtomKind::$kind,
            groups: &[$($group),+],
        }
    };
}

static RECORD: ActionRules = ActionRules {
    action: ModifierAction::Record,
    atoms: &[
        atom_rule!(RealDebit, [any_of!(POSTABLE, CountRange::at_least(1))]),
        atom_rule!(RealCredit, [any_of!(POSTABLE, CountRange::at_least(1))]),
        atom_rule!(ImaginaryDebit, [any_of!(POSTABLE, CountRange::at_least(0))]),
        atom_rule!(ImaginaryCredit, [any_of!(POSTABLE, CountRange::at_least(0))]),
    ],
    extra: &[],
};

static CLOSE: ActionRules = ActionRules {
    action: ModifierAction::Close,
    atoms: &[
        atom_rule!(RealDebit, [any_of!(CLOSABLE, CountRange::exactly(1))]),
        atom_rule!(RealCredit, [any_of!(CLOSABLE, CountRange::exactly(1))]),
    ],
    extra: &[ExtraRule::SharedRealCurrency, ExtraRule::NominalCloseSource],
};

static EXCHANGE: ActionRules = ActionRules {
    action: ModifierAction::Exchange,
    atoms: &[
        atom_rule!(RealDebit, [any_of!(EXCHANGEABLE, CountRange::exactly(1))]),
        atom_rule!(RealCredit, [any_of!(EXCHANGEABLE, CountRange::exactly(1))]),
    ],
    extra: &[ExtraRule::DistinctRealCurrencies],
};

static BID: ActionRules = ActionRules {
    action: ModifierAction::Bid,
    atoms: &[
        atom_rule!(RealDebit, [all_of!(ITEMIZED, CountRange::exactly(1))]),
        atom_rule!(
            RealCredit,
            [any_of!(
                &[
                    AccountKind::LiquidAsset,
                    AccountKind::GeneralAsset,
                    AccountKind::Liability,
                ],
                CountRange::at_least(1),
            )]
        ),
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::exactly(1))]),
        atom_rule!(Price, [any_of!(ITEMIZED, CountRange::at_most(1))]),
    ],
    extra: &[],
};

static ASK: ActionRules = ActionRules {
    action: ModifierAction::Ask,
    atoms: &[
        atom_rule!(
            RealDebit,
            [any_of!(
                &[
                    AccountKind::LiquidAsset,
                    AccountKind::GeneralAsset,
                    AccountKind::DirectExpense,
                ],
                CountRange::at_least(1),
            )]
        ),
        atom_rule!(
            RealCredit,
            [
                all_of!(ITEMIZED, CountRange::exactly(1)),
                any_of!(&[AccountKind::DirectRevenue], CountRange::at_most(1)),
            ]
        ),
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::exactly(1))]),
        atom_rule!(Price, [any_of!(ITEMIZED, CountRange::at_most(1))]),
    ],
    extra: &[],
};

static TRANSFORM: ActionRules = ActionRules {
    action: ModifierAction::Transform,
    atoms: &[
        atom_rule!(RealDebit, [all_of!(ITEMIZED, CountRange::at_least(1))]),
        atom_rule!(RealCredit, [all_of!(ITEMIZED, CountRange::at_least(1))]),
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::at_least(2))]),
    ],
    extra: &[],
};

static THROW: ActionRules = ActionRules {
    action: ModifierAction::Throw,
    atoms: &[
        atom_rule!(RealDebit, [any_of!(EXPENSES, CountRange::exactly(1))]),
        atom_rule!(RealCredit, [all_of!(ITEMIZED, CountRange::exactly(1))]),
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::exactly(1))]),
    ],
    extra: &[],
};

static CATCH: ActionRules = ActionRules {
    action: ModifierAction::Catch,
    atoms: &[
        atom_rule!(RealDebit, [all_of!(ITEMIZED, CountRange::exactly(1))]),
        atom_rule!(RealCredit, [any_of!(REVENUES_OR_EQUITY, CountRange::exactly(1))]),
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::exactly(1))]),
    ],
    extra: &[],
};

static CONDENSE: ActionRules = ActionRules {
    action: ModifierAction::Condense,
    atoms: &[
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::at_least(2))]),
        atom_rule!(Price, [any_of!(ITEMIZED, CountRange::at_most(1))]),
    ],
    extra: &[],
};

static DILUTE: ActionRules = ActionRules {
    action: ModifierAction::Dilute,
    atoms: &[
        atom_rule!(ItemCount, [all_of!(ITEMIZED, CountRange::at_least(2))]),
        atom_rule!(Price, [all_of!(ITEMIZED, CountRange::at_least(1))]),
    ],
    extra: &[],
};

/// Returns the static rule set of an action.
#[must_use]
pub fn rules_for(action: ModifierAction) -> &'static ActionRules {
    match action {
        ModifierAction::Record => &RECORD,
        ModifierAction::Close => &CLOSE,
        ModifierAction::Exchange => &EXCHANGE,
        ModifierAction::Bid => &BID,
        ModifierAction::Ask => &ASK,
        ModifierAction::Transform => &TRANSFORM,
        ModifierAction::Throw => &THROW,
        ModifierAction::Catch => &CATCH,
        ModifierAction::Condense => &CONDENSE,
        ModifierAction::Dilute => &DILUTE,
    }
}

/// Validates proposed atoms against an action's rule set.
///
/// # Errors
///
/// Returns the first violated rule as a `LedgerError`.
pub fn validate_permissions(
    action: ModifierAction,
    atoms: &[ProposedAtom],
) -> Result<(), LedgerError> {
    check_rules(rules_for(action), atoms)
}

/// Interprets an arbitrary rule set against proposed atoms.
///
/// Checks run in a fixed order: per-atom legality, cash flow links, group
/// counts, then extra rules.
///
/// # Errors
///
/// Returns the first violated rule as a `LedgerError`.
pub fn check_rules(rules: &ActionRules, atoms: &[ProposedAtom]) -> Result<(), LedgerError> {
    let mut tally: HashMap<(ModifierAtomKind, AccountKind), usize> = HashMap::new();

    for (index, atom) in atoms.iter().enumerate() {
        let Some(atom_rule) = rules.atom_rule(atom.kind) else {
            return Err(LedgerError::ForbiddenAtomKind {
                action: rules.action,
                atom_kind: atom.kind,
            });
        };

        let named = atom_rule
            .groups
            .iter()
            .any(|group| group.account_kinds.contains(&atom.account_kind));
        if !named {
            return Err(LedgerError::ForbiddenAccountKind {
                action: rules.action,
                atom_kind: atom.kind,
                account_kind: atom.account_kind,
            });
        }

        check_cash_flow_link(index, atom)?;

        *tally.entry((atom.kind, atom.account_kind)).or_default() += 1;
    }

    for atom_rule in rules.atoms {
        for group in atom_rule.groups {
            check_group(rules.action, atom_rule.atom_kind, group, &tally)?;
        }
    }

    for extra in rules.extra {
        check_extra(*extra, atoms)?;
    }

    Ok(())
}

/// A real atom on a non-liquid account needs a cash flow activity; any other
/// atom must not carry one.
fn check_cash_flow_link(index: usize, atom: &ProposedAtom) -> Result<(), LedgerError> {
    let required = atom.kind.is_real() && atom.account_kind != AccountKind::LiquidAsset;
    match (required, atom.cash_flow_activity_id.is_some()) {
        (true, false) => Err(LedgerError::CashFlowActivityRequired { index }),
        (false, true) => Err(LedgerError::CashFlowActivityForbidden { index }),
        _ => Ok(()),
    }
}

fn check_group(
    action: ModifierAction,
    atom_kind: ModifierAtomKind,
    group: &ConditionGroup,
    tally: &HashMap<(ModifierAtomKind, AccountKind), usize>,
) -> Result<(), LedgerError> {
    let count_of = |kind: &AccountKind| tally.get(&(atom_kind, *kind)).copied().unwrap_or(0);

    match group.condition {
        Condition::All => {
            for kind in group.account_kinds {
                let count = count_of(kind);
                if count == 0 && group.range.min > 0 {
                    return Err(LedgerError::MissingAccountKind {
                        action,
                        atom_kind,
                        account_kind: *kind,
                    });
                }
                if !group.range.contains(count) {
                    return Err(LedgerError::AtomCountOutOfRange {
                        action,
                        atom_kind,
                        count,
                        range: group.range,
                    });
                }
            }
        }
        Condition::Any => {
            let count: usize = group.account_kinds.iter().map(count_of).sum();
            if !group.range.contains(count) {
                return Err(LedgerError::AtomCountOutOfRange {
                    action,
                    atom_kind,
                    count,
                    range: group.range,
                });
            }
        }
    }

    Ok(())
}

fn check_extra(extra: ExtraRule, atoms: &[ProposedAtom]) -> Result<(), LedgerError> {
    let real: Vec<&ProposedAtom> = atoms.iter().filter(|atom| atom.kind.is_real()).collect();

    match extra {
        ExtraRule::DistinctRealCurrencies => {
            if real.len() != 2 {
                return Err(LedgerError::ExchangeRequiresTwoRealAtoms { found: real.len() });
            }
            if real[0].currency_id == real[1].currency_id {
                return Err(LedgerError::ExchangeCurrenciesMustDiffer);
            }
        }
        ExtraRule::SharedRealCurrency => {
            if let Some(first) = real.first() {
                if real.iter().any(|atom| atom.currency_id != first.currency_id) {
                    return Err(LedgerError::CloseCurrenciesMustMatch);
                }
            }
        }
        ExtraRule::NominalCloseSource => {
            if !real.iter().any(|atom| atom.account_kind.is_nominal()) {
                return Err(LedgerError::CloseRequiresNominalAccount);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PHP: CurrencyId = CurrencyId(1);
    const USD: CurrencyId = CurrencyId(2);
    const ACTIVITY: Option<CashFlowActivityId> = Some(CashFlowActivityId(1));

    fn atom(kind: ModifierAtomKind, account_kind: AccountKind) -> ProposedAtom {
        atom_in(kind, account_kind, PHP)
    }

    fn atom_in(
        kind: ModifierAtomKind,
        account_kind: AccountKind,
        currency_id: CurrencyId,
    ) -> ProposedAtom {
        let needs_activity = kind.is_real() && account_kind != AccountKind::LiquidAsset;
        ProposedAtom {
            kind,
            account_kind,
            currency_id,
            cash_flow_activity_id: if needs_activity { ACTIVITY } else { None },
        }
    }

    #[test]
    fn test_every_action_has_its_own_rules() {
        for action in ModifierAction::ALL {
            assert_eq!(rules_for(action).action, action);
        }
    }

    #[test]
    fn test_record_equity_to_liability_accepted() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::Equity),
            atom(ModifierAtomKind::RealCredit, AccountKind::Liability),
        ];
        assert!(validate_permissions(ModifierAction::Record, &atoms).is_ok());
    }

    #[test]
    fn test_same_atoms_as_exchange_rejected() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::Equity),
            atom(ModifierAtomKind::RealCredit, AccountKind::Liability),
        ];
        assert!(validate_permissions(ModifierAction::Exchange, &atoms).is_err());
    }

    #[test]
    fn test_exchange_same_currency_rejected() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::LiquidAsset),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Exchange, &atoms),
            Err(LedgerError::ExchangeCurrenciesMustDiffer)
        ));
    }

    #[test]
    fn test_exchange_distinct_currencies_accepted() {
        let atoms = [
            atom_in(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset, USD),
            atom_in(ModifierAtomKind::RealCredit, AccountKind::LiquidAsset, PHP),
        ];
        assert!(validate_permissions(ModifierAction::Exchange, &atoms).is_ok());
    }

    #[test]
    fn test_record_requires_both_sides() {
        let atoms = [atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset)];
        assert!(matches!(
            validate_permissions(ModifierAction::Record, &atoms),
            Err(LedgerError::AtomCountOutOfRange {
                atom_kind: ModifierAtomKind::RealCredit,
                count: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_record_forbids_itemized_accounts() {
        let kind = AccountKind::ItemizedAsset;
        let atoms = [
            atom(ModifierAtomKind::RealDebit, kind),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Record, &atoms),
            Err(LedgerError::ForbiddenAccountKind { .. })
        ));
    }

    #[test]
    fn test_record_forbids_item_count() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
            atom(ModifierAtomKind::ItemCount, AccountKind::GeneralAsset),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Record, &atoms),
            Err(LedgerError::ForbiddenAtomKind {
                atom_kind: ModifierAtomKind::ItemCount,
                ..
            })
        ));
    }

    #[test]
    fn test_record_allows_imaginary_memo_legs() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
            atom(ModifierAtomKind::ImaginaryDebit, AccountKind::GeneralExpense),
            atom(ModifierAtomKind::ImaginaryCredit, AccountKind::Liability),
        ];
        assert!(validate_permissions(ModifierAction::Record, &atoms).is_ok());
    }

    #[test]
    fn test_cash_flow_activity_required_on_non_liquid_real_atom() {
        let mut atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
        ];
        atoms[1].cash_flow_activity_id = None;
        assert!(matches!(
            validate_permissions(ModifierAction::Record, &atoms),
            Err(LedgerError::CashFlowActivityRequired { index: 1 })
        ));
    }

    #[rstest]
    #[case(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset)]
    #[case(ModifierAtomKind::ImaginaryDebit, AccountKind::GeneralExpense)]
    fn test_cash_flow_activity_forbidden_elsewhere(
        #[case] kind: ModifierAtomKind,
        #[case] account_kind: AccountKind,
    ) {
        let mut atoms = vec![
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
        ];
        atoms.push(ProposedAtom {
            cash_flow_activity_id: ACTIVITY,
            ..atom(kind, account_kind)
        });
        assert!(matches!(
            validate_permissions(ModifierAction::Record, &atoms),
            Err(LedgerError::CashFlowActivityForbidden { index: 2 })
        ));
    }

    #[test]
    fn test_close_needs_nominal_source() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::Equity),
            atom(ModifierAtomKind::RealCredit, AccountKind::Equity),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Close, &atoms),
            Err(LedgerError::CloseRequiresNominalAccount)
        ));
    }

    #[test]
    fn test_close_equity_from_expense_accepted() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::Equity),
            atom(ModifierAtomKind::RealCredit, AccountKind::GeneralExpense),
        ];
        assert!(validate_permissions(ModifierAction::Close, &atoms).is_ok());
    }

    #[test]
    fn test_close_across_currencies_rejected() {
        let atoms = [
            atom_in(ModifierAtomKind::RealDebit, AccountKind::Equity, PHP),
            atom_in(ModifierAtomKind::RealCredit, AccountKind::Temporary, USD),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Close, &atoms),
            Err(LedgerError::CloseCurrenciesMustMatch)
        ));
    }

    #[test]
    fn test_bid_lot_purchase() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::Price, AccountKind::ItemizedAsset),
        ];
        assert!(validate_permissions(ModifierAction::Bid, &atoms).is_ok());
    }

    #[test]
    fn test_bid_without_item_count_reports_missing_kind() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::LiquidAsset),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Bid, &atoms),
            Err(LedgerError::MissingAccountKind {
                atom_kind: ModifierAtomKind::ItemCount,
                account_kind: AccountKind::ItemizedAsset,
                ..
            })
        ));
    }

    #[test]
    fn test_ask_allows_at_most_one_direct_revenue() {
        let base = vec![
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::DirectRevenue),
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
        ];
        assert!(validate_permissions(ModifierAction::Ask, &base).is_ok());

        let mut doubled = base;
        doubled.push(atom(ModifierAtomKind::RealCredit, AccountKind::DirectRevenue));
        assert!(matches!(
            validate_permissions(ModifierAction::Ask, &doubled),
            Err(LedgerError::AtomCountOutOfRange { count: 2, .. })
        ));
    }

    #[test]
    fn test_transform_needs_two_item_counts() {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::RealCredit, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
        ];
        assert!(matches!(
            validate_permissions(ModifierAction::Transform, &atoms),
            Err(LedgerError::AtomCountOutOfRange { count: 1, .. })
        ));
    }

    #[rstest]
    #[case(ModifierAction::Throw, AccountKind::GeneralExpense, AccountKind::ItemizedAsset)]
    #[case(ModifierAction::Catch, AccountKind::ItemizedAsset, AccountKind::GeneralRevenue)]
    fn test_write_off_and_receive(
        #[case] action: ModifierAction,
        #[case] debit: AccountKind,
        #[case] credit: AccountKind,
    ) {
        let atoms = [
            atom(ModifierAtomKind::RealDebit, debit),
            atom(ModifierAtomKind::RealCredit, credit),
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
        ];
        assert!(validate_permissions(action, &atoms).is_ok());
    }

    #[test]
    fn test_condense_and_dilute_are_quantity_only() {
        let counts = [
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
            atom(ModifierAtomKind::ItemCount, AccountKind::ItemizedAsset),
        ];
        assert!(validate_permissions(ModifierAction::Condense, &counts).is_ok());
        assert!(validate_permissions(ModifierAction::Dilute, &counts).is_err());

        let mut with_price = counts.to_vec();
        with_price.push(atom(ModifierAtomKind::Price, AccountKind::ItemizedAsset));
        assert!(validate_permissions(ModifierAction::Dilute, &with_price).is_ok());

        with_price.push(atom(ModifierAtomKind::RealDebit, AccountKind::ItemizedAsset));
        assert!(matches!(
            validate_permissions(ModifierAction::Condense, &with_price),
            Err(LedgerError::ForbiddenAtomKind { .. })
        ));
    }

    #[test]
    fn test_custom_rule_table() {
        static ONLY_CASH: ActionRules = ActionRules {
            action: ModifierAction::Record,
            atoms: &[atom_rule!(
                RealDebit,
                [all_of!(
                    &[AccountKind::LiquidAsset, AccountKind::GeneralAsset],
                    CountRange::exactly(1),
                )]
            )],
            extra: &[],
        };

        let both = [
            atom(ModifierAtomKind::RealDebit, AccountKind::LiquidAsset),
            atom(ModifierAtomKind::RealDebit, AccountKind::GeneralAsset),
        ];
        assert!(check_rules(&ONLY_CASH, &both).is_ok());
        assert!(matches!(
            check_rules(&ONLY_CASH, &both[..1]),
            Err(LedgerError::MissingAccountKind {
                account_kind: AccountKind::GeneralAsset,
                ..
            })
        ));
    }

    #[rstest]
    #[case(CountRange::exactly(1), 1, true)]
    #[case(CountRange::exactly(1), 2, false)]
    #[case(CountRange::at_least(2), 7, true)]
    #[case(CountRange::at_least(2), 1, false)]
    #[case(CountRange::at_most(1), 0, true)]
    fn test_count_range(#[case] range: CountRange, #[case] count: usize, #[case] inside: bool) {
        assert_eq!(range.contains(count), inside);
    }

    #[test]
    fn test_count_range_display() {
        assert_eq!(CountRange::exactly(1).to_string(), "exactly 1");
        assert_eq!(CountRange::at_least(2).to_string(), "2..");
        assert_eq!(CountRange::at_most(1).to_string(), "0..=1");
    }
}
