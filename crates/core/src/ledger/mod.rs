//! Double-entry bookkeeping rules.
//!
//! This module implements the structural side of the ledger:
//! - Domain types (accounts, currencies, modifiers, financial entries)
//! - The table-driven account-kind permission matrix
//! - The balance validator for entry values
//! - Ledger service for modifier and entry validation

pub mod error;
pub mod permission;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use permission::{
    ActionRules, AtomRule, Condition, ConditionGroup, CountRange, ExtraRule, ProposedAtom,
    check_rules, rules_for, validate_permissions,
};
pub use service::LedgerService;
pub use types::{
    Account, AccountKind, Currency, EntryType, FinancialEntry, FinancialEntryAtom, Modifier,
    ModifierAction, ModifierAtom, ModifierAtomKind, NormalSide,
};
pub use validation::{ValuedAtom, validate_balance};
