//! Ledger service for modifier and financial entry validation.
//!
//! Runs before anything is persisted: a modifier must pass the permission
//! matrix when it is created, and every financial entry must pass the matrix
//! of its modifier, map one value onto each atom, and satisfy the balance
//! rule.

use std::collections::{HashMap, HashSet};

use frostbook_shared::types::AccountId;
use tracing::debug;

use super::error::LedgerError;
use super::permission::{ProposedAtom, validate_permissions};
use super::types::{Account, FinancialEntry, Modifier, ModifierAction};
use super::validation::{ValuedAtom, validate_balance};

/// Ledger service for structural validation.
///
/// Pure business logic with no persistence; accounts are handed in already
/// loaded.
pub struct LedgerService;

impl LedgerService {
    /// Validates proposed atoms for an action against the permission matrix.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if any rule of the action is broken.
    pub fn validate_modifier_atoms(
        action: ModifierAction,
        atoms: &[ProposedAtom],
    ) -> Result<(), LedgerError> {
        validate_permissions(action, atoms)
    }

    /// Resolves a modifier's atoms into the shape the matrix checks.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if an atom links an account
    /// missing from `accounts`.
    pub fn proposed_atoms(
        modifier: &Modifier,
        accounts: &HashMap<AccountId, Account>,
    ) -> Result<Vec<ProposedAtom>, LedgerError> {
        modifier
            .atoms
            .iter()
            .map(|atom| {
                let account = accounts
                    .get(&atom.account_id)
                    .ok_or(LedgerError::AccountNotFound(atom.account_id))?;
                Ok(ProposedAtom {
                    kind: atom.kind,
                    account_kind: account.kind,
                    currency_id: account.currency_id,
                    cash_flow_activity_id: atom.cash_flow_activity_id,
                })
            })
            .collect()
    }

    /// Validates a whole modifier.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if an account is missing or the matrix rejects
    /// the atoms.
    pub fn validate_modifier(
        modifier: &Modifier,
        accounts: &HashMap<AccountId, Account>,
    ) -> Result<(), LedgerError> {
        let proposed = Self::proposed_atoms(modifier, accounts)?;
        Self::validate_modifier_atoms(modifier.action, &proposed)
    }

    /// Validates a financial entry against its modifier.
    ///
    /// Steps:
    /// 1. The entry must name the given modifier
    /// 2. The modifier's atoms must pass the permission matrix
    /// 3. Close entries carry no values; every other entry gives exactly one
    ///    value to each modifier atom and nothing else
    /// 4. The values must satisfy the balance rule of the action
    ///
    /// # Errors
    ///
    /// Returns the first broken rule.
    pub fn validate_financial_entry(
        modifier: &Modifier,
        accounts: &HashMap<AccountId, Account>,
        entry: &FinancialEntry,
    ) -> Result<(), LedgerError> {
        if entry.modifier_id != modifier.id {
            return Err(LedgerError::ModifierMismatch {
                expected: modifier.id,
                actual: entry.modifier_id,
            });
        }

        Self::validate_modifier(modifier, accounts)?;

        if modifier.action == ModifierAction::Close {
            if !entry.atoms.is_empty() {
                return Err(LedgerError::CloseValuesNotAllowed);
            }
            return Ok(());
        }

        let values = Self::map_values(modifier, entry)?;
        validate_balance(modifier.action, &values)?;

        debug!(
            entry_id = %entry.id,
            modifier_id = %modifier.id,
            values = values.len(),
            "financial entry validated"
        );
        Ok(())
    }

    /// Pairs each entry value with the kind of the atom it fills.
    fn map_values(
        modifier: &Modifier,
        entry: &FinancialEntry,
    ) -> Result<Vec<ValuedAtom>, LedgerError> {
        let mut seen = HashSet::with_capacity(entry.atoms.len());
        let mut values = Vec::with_capacity(entry.atoms.len());

        for value in &entry.atoms {
            let atom = modifier
                .atom(value.modifier_atom_id)
                .ok_or(LedgerError::UnknownModifierAtom(value.modifier_atom_id))?;
            if !seen.insert(atom.id) {
                return Err(LedgerError::DuplicateAtomValue(atom.id));
            }
            values.push(ValuedAtom::new(atom.kind, value.numerical_value.clone()));
        }

        if let Some(missing) = modifier.atoms.iter().find(|atom| !seen.contains(&atom.id)) {
            return Err(LedgerError::MissingAtomValue(missing.id));
        }

        Ok(values)
    }
}
