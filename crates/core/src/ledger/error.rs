//! Ledger error types for structural validation.
//!
//! Everything here is a client error: the proposed atoms or values break the
//! permission matrix or the balance rule, and nothing is persisted.

use frostbook_shared::{AppError, Rational};
use frostbook_shared::types::{AccountId, ModifierAtomId, ModifierId};
use thiserror::Error;

use super::permission::CountRange;
use super::types::{AccountKind, ModifierAction, ModifierAtomKind};

/// Errors raised while validating modifiers and financial entries.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Permission Matrix ==========
    /// The action does not allow this atom kind at all.
    #[error("{action:?} modifiers cannot carry {atom_kind:?} atoms")]
    ForbiddenAtomKind {
        /// Action being validated.
        action: ModifierAction,
        /// Offending atom kind.
        atom_kind: ModifierAtomKind,
    },

    /// The atom kind may not post to this account kind.
    #[error("{action:?} modifiers cannot link {atom_kind:?} atoms to {account_kind:?} accounts")]
    ForbiddenAccountKind {
        /// Action being validated.
        action: ModifierAction,
        /// Atom kind of the offending atom.
        atom_kind: ModifierAtomKind,
        /// Offending account kind.
        account_kind: AccountKind,
    },

    /// An `all` group names an account kind that no atom uses.
    #[error("{action:?} modifiers need a {atom_kind:?} atom on a {account_kind:?} account")]
    MissingAccountKind {
        /// Action being validated.
        action: ModifierAction,
        /// Atom kind of the group.
        atom_kind: ModifierAtomKind,
        /// Required account kind.
        account_kind: AccountKind,
    },

    /// A group's count fell outside its range.
    #[error("{action:?} modifiers allow {range} {atom_kind:?} atoms in this group, found {count}")]
    AtomCountOutOfRange {
        /// Action being validated.
        action: ModifierAction,
        /// Atom kind of the group.
        atom_kind: ModifierAtomKind,
        /// Observed count.
        count: usize,
        /// Allowed range.
        range: CountRange,
    },

    /// Exchange modifiers need exactly one real debit and one real credit.
    #[error("Exchange requires exactly two real atoms, found {found}")]
    ExchangeRequiresTwoRealAtoms {
        /// Number of real atoms found.
        found: usize,
    },

    /// Both sides of an exchange use one currency.
    #[error("Exchange accounts must use different currencies")]
    ExchangeCurrenciesMustDiffer,

    /// A close moves value between currencies.
    #[error("Close accounts must share one currency")]
    CloseCurrenciesMustMatch,

    /// A close has nothing to empty.
    #[error("Close requires a revenue, expense or temporary account")]
    CloseRequiresNominalAccount,

    /// Real atom on a non-liquid account without a cash flow activity.
    #[error("Atom #{index} must name a cash flow activity")]
    CashFlowActivityRequired {
        /// Position of the atom.
        index: usize,
    },

    /// Cash flow activity on an atom that cannot carry one.
    #[error("Atom #{index} cannot name a cash flow activity")]
    CashFlowActivityForbidden {
        /// Position of the atom.
        index: usize,
    },

    // ========== Balance ==========
    /// Zero value on a record entry.
    #[error("Atom value #{index} cannot be zero")]
    ZeroValue {
        /// Position of the value.
        index: usize,
    },

    /// Negative value on a record entry.
    #[error("Atom value #{index} cannot be negative")]
    NegativeValue {
        /// Position of the value.
        index: usize,
    },

    /// Real debits and credits differ.
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Sum of real debit values.
        debit: Rational,
        /// Sum of real credit values.
        credit: Rational,
    },

    /// Imaginary debits and credits differ.
    #[error("Imaginary legs are not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedImaginary {
        /// Sum of imaginary debit values.
        debit: Rational,
        /// Sum of imaginary credit values.
        credit: Rational,
    },

    /// Values supplied for a close entry.
    #[error("Close entries are computed and cannot carry values")]
    CloseValuesNotAllowed,

    // ========== Entry Mapping ==========
    /// A modifier atom received no value.
    #[error("No value given for modifier atom {0}")]
    MissingAtomValue(ModifierAtomId),

    /// A modifier atom received more than one value.
    #[error("Modifier atom {0} was given more than one value")]
    DuplicateAtomValue(ModifierAtomId),

    /// A value is keyed to an atom of another modifier.
    #[error("Modifier atom {0} does not belong to the entry's modifier")]
    UnknownModifierAtom(ModifierAtomId),

    /// The entry names a different modifier than the one supplied.
    #[error("Entry belongs to modifier {actual}, not {expected}")]
    ModifierMismatch {
        /// Modifier passed to validation.
        expected: ModifierId,
        /// Modifier named by the entry.
        actual: ModifierId,
    },

    /// A modifier atom links an account that was not loaded.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ForbiddenAtomKind { .. } => "FORBIDDEN_ATOM_KIND",
            Self::ForbiddenAccountKind { .. } => "FORBIDDEN_ACCOUNT_KIND",
            Self::MissingAccountKind { .. } => "MISSING_ACCOUNT_KIND",
            Self::AtomCountOutOfRange { .. } => "ATOM_COUNT_OUT_OF_RANGE",
            Self::ExchangeRequiresTwoRealAtoms { .. } => "EXCHANGE_REQUIRES_TWO_REAL_ATOMS",
            Self::ExchangeCurrenciesMustDiffer => "EXCHANGE_CURRENCIES_MUST_DIFFER",
            Self::CloseCurrenciesMustMatch => "CLOSE_CURRENCIES_MUST_MATCH",
            Self::CloseRequiresNominalAccount => "CLOSE_REQUIRES_NOMINAL_ACCOUNT",
            Self::CashFlowActivityRequired { .. } => "CASH_FLOW_ACTIVITY_REQUIRED",
            Self::CashFlowActivityForbidden { .. } => "CASH_FLOW_ACTIVITY_FORBIDDEN",
            Self::ZeroValue { .. } => "ZERO_VALUE",
            Self::NegativeValue { .. } => "NEGATIVE_VALUE",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::UnbalancedImaginary { .. } => "UNBALANCED_IMAGINARY",
            Self::CloseValuesNotAllowed => "CLOSE_VALUES_NOT_ALLOWED",
            Self::MissingAtomValue(_) => "MISSING_ATOM_VALUE",
            Self::DuplicateAtomValue(_) => "DUPLICATE_ATOM_VALUE",
            Self::UnknownModifierAtom(_) => "UNKNOWN_MODIFIER_ATOM",
            Self::ModifierMismatch { .. } => "MODIFIER_MISMATCH",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            _ => 400,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}
