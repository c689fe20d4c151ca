//! Balance rules for financial entry values.

use frostbook_shared::Rational;

use super::error::LedgerError;
use super::types::{ModifierAction, ModifierAtomKind};

/// One value of a proposed entry, paired with its atom kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuedAtom {
    /// Kind of the modifier atom the value fills.
    pub kind: ModifierAtomKind,
    /// The value.
    pub value: Rational,
}

impl ValuedAtom {
    /// Creates a valued atom.
    #[must_use]
    pub const fn new(kind: ModifierAtomKind, value: Rational) -> Self {
        Self { kind, value }
    }
}

/// Validates the arithmetic of an entry's values.
///
/// - `record`: every value strictly positive; real debits equal real credits
///   and imaginary debits equal imaginary credits, exactly.
/// - `close`: no values at all.
/// - anything else: real values strictly positive, no value negative.
///
/// # Errors
///
/// Returns the first broken rule.
pub fn validate_balance(action: ModifierAction, values: &[ValuedAtom]) -> Result<(), LedgerError> {
    match action {
        ModifierAction::Record => validate_record(values),
        ModifierAction::Close => {
            if values.is_empty() {
                Ok(())
            } else {
                Err(LedgerError::CloseValuesNotAllowed)
            }
        }
        _ => validate_signs(values),
    }
}

fn validate_signs(values: &[ValuedAtom]) -> Result<(), LedgerError> {
    for (index, atom) in values.iter().enumerate() {
        if atom.value.is_negative() {
            return Err(LedgerError::NegativeValue { index });
        }
        let real = matches!(
            atom.kind,
            ModifierAtomKind::RealDebit | ModifierAtomKind::RealCredit
        );
        if real && atom.value.is_zero() {
            return Err(LedgerError::ZeroValue { index });
        }
    }
    Ok(())
}

fn validate_record(values: &[ValuedAtom]) -> Result<(), LedgerError> {
    let mut real_debit = Rational::zero();
    let mut real_credit = Rational::zero();
    let mut imaginary_debit = Rational::zero();
    let mut imaginary_credit = Rational::zero();

    for (index, atom) in values.iter().enumerate() {
        if atom.value.is_zero() {
            return Err(LedgerError::ZeroValue { index });
        }
        if atom.value.is_negative() {
            return Err(LedgerError::NegativeValue { index });
        }

        match atom.kind {
            ModifierAtomKind::RealDebit => real_debit += &atom.value,
            ModifierAtomKind::RealCredit => real_credit += &atom.value,
            ModifierAtomKind::ImaginaryDebit => imaginary_debit += &atom.value,
            ModifierAtomKind::ImaginaryCredit => imaginary_credit += &atom.value,
            ModifierAtomKind::ItemCount | ModifierAtomKind::Price => {}
        }
    }

    if real_debit != real_credit {
        return Err(LedgerError::UnbalancedEntry {
            debit: real_debit,
            credit: real_credit,
        });
    }

    if imaginary_debit != imaginary_credit {
        return Err(LedgerError::UnbalancedImaginary {
            debit: imaginary_debit,
            credit: imaginary_credit,
        });
    }

    Ok(())
}
