//! Ledger domain types.
//!
//! This module defines the entities the engine reasons about: currencies,
//! accounts, modifiers (transaction templates) with their atoms, and the
//! financial entries instantiated from them.

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{
    AccountId, CashFlowActivityId, CurrencyId, FinancialEntryId, ModifierAtomId, ModifierId,
    UserId,
};
use serde::{Deserialize, Serialize};

/// Debit or credit side of a posting.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit side.
    Debit,
    /// Credit side.
    Credit,
}

/// Normal balance side of an account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalSide {
    /// Assets, expenses and temporary accounts.
    DebitNormal,
    /// Liabilities, equity and revenues.
    CreditNormal,
}

impl NormalSide {
    /// Balance of the given totals, positive when on the normal side.
    ///
    /// - DebitNormal: debit - credit
    /// - CreditNormal: credit - debit
    #[must_use]
    pub fn balance(self, debit: &Rational, credit: &Rational) -> Rational {
        match self {
            Self::DebitNormal => debit - credit,
            Self::CreditNormal => credit - debit,
        }
    }
}

/// Kind of an account. Determines normal balance side, whether the balance
/// carries across periods, and where the account lands on statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Asset that is neither cash nor inventory.
    GeneralAsset,
    /// Cash and cash equivalents.
    LiquidAsset,
    /// Asset that loses value over time.
    DepreciativeAsset,
    /// Inventory tracked by lots.
    ItemizedAsset,
    /// Liability.
    Liability,
    /// Owner's equity.
    Equity,
    /// Operating expense.
    GeneralExpense,
    /// Cost of goods sold style expense.
    DirectExpense,
    /// Other revenue.
    GeneralRevenue,
    /// Sales revenue.
    DirectRevenue,
    /// Clearing account that must be closed every period.
    Temporary,
}

impl AccountKind {
    /// Every account kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::GeneralAsset,
        Self::LiquidAsset,
        Self::DepreciativeAsset,
        Self::ItemizedAsset,
        Self::Liability,
        Self::Equity,
        Self::GeneralExpense,
        Self::DirectExpense,
        Self::GeneralRevenue,
        Self::DirectRevenue,
        Self::Temporary,
    ];

    /// Returns the normal balance side.
    #[must_use]
    pub const fn normal_side(self) -> NormalSide {
        match self {
            Self::GeneralAsset
            | Self::LiquidAsset
            | Self::DepreciativeAsset
            | Self::ItemizedAsset
            | Self::GeneralExpense
            | Self::DirectExpense
            | Self::Temporary => NormalSide::DebitNormal,
            Self::Liability | Self::Equity | Self::GeneralRevenue | Self::DirectRevenue => {
                NormalSide::CreditNormal
            }
        }
    }

    /// Returns true if closing balances carry into the next period.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        !matches!(self, Self::Temporary)
    }

    /// Returns true for accounts that a `close` entry may empty.
    #[must_use]
    pub const fn is_nominal(self) -> bool {
        matches!(
            self,
            Self::GeneralExpense
                | Self::DirectExpense
                | Self::GeneralRevenue
                | Self::DirectRevenue
                | Self::Temporary
        )
    }

    /// Returns true for the four asset kinds.
    #[must_use]
    pub const fn is_asset(self) -> bool {
        matches!(
            self,
            Self::GeneralAsset | Self::LiquidAsset | Self::DepreciativeAsset | Self::ItemizedAsset
        )
    }

    /// Returns true for general and direct revenue.
    #[must_use]
    pub const fn is_revenue(self) -> bool {
        matches!(self, Self::GeneralRevenue | Self::DirectRevenue)
    }

    /// Returns true for general and direct expense.
    #[must_use]
    pub const fn is_expense(self) -> bool {
        matches!(self, Self::GeneralExpense | Self::DirectExpense)
    }

    /// Which side of a `close` entry is emptied: the higher priority wins.
    #[must_use]
    pub const fn close_priority(self) -> u8 {
        match self {
            Self::Temporary => 2,
            Self::GeneralExpense
            | Self::DirectExpense
            | Self::GeneralRevenue
            | Self::DirectRevenue => 1,
            _ => 0,
        }
    }
}

/// What a modifier does with its atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierAction {
    /// Plain balanced journal entry.
    Record,
    /// Empties a nominal account into another account.
    Close,
    /// Trades one currency for another.
    Exchange,
    /// Acquires an inventory lot.
    Bid,
    /// Disposes an inventory lot.
    Ask,
    /// Converts lots into other lots.
    Transform,
    /// Writes off items.
    Throw,
    /// Receives items without purchase.
    Catch,
    /// Merges lots.
    Condense,
    /// Splits a lot.
    Dilute,
}

impl ModifierAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Record,
        Self::Close,
        Self::Exchange,
        Self::Bid,
        Self::Ask,
        Self::Transform,
        Self::Throw,
        Self::Catch,
        Self::Condense,
        Self::Dilute,
    ];
}

/// Role of one modifier atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierAtomKind {
    /// Debit that posts to the account.
    RealDebit,
    /// Credit that posts to the account.
    RealCredit,
    /// Memo debit; never posts.
    ImaginaryDebit,
    /// Memo credit; never posts.
    ImaginaryCredit,
    /// Quantity of items in a lot.
    ItemCount,
    /// Unit price of a lot.
    Price,
}

impl ModifierAtomKind {
    /// Every atom kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::RealDebit,
        Self::RealCredit,
        Self::ImaginaryDebit,
        Self::ImaginaryCredit,
        Self::ItemCount,
        Self::Price,
    ];

    /// Returns true for atoms that post to account totals.
    #[must_use]
    pub const fn is_real(self) -> bool {
        matches!(self, Self::RealDebit | Self::RealCredit)
    }

    /// Debit or credit side, if the atom has one.
    #[must_use]
    pub const fn entry_type(self) -> Option<EntryType> {
        match self {
            Self::RealDebit | Self::ImaginaryDebit => Some(EntryType::Debit),
            Self::RealCredit | Self::ImaginaryCredit => Some(EntryType::Credit),
            Self::ItemCount | Self::Price => None,
        }
    }
}

/// A currency owned by one ledger user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique identifier.
    pub id: CurrencyId,
    /// Owner of the currency.
    pub owner_id: UserId,
    /// Short code (e.g., "PHP").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Decimal places shown for this currency.
    pub presentational_precision: u32,
}

/// An account with a fixed currency and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Currency of every amount posted here.
    pub currency_id: CurrencyId,
    /// Account name.
    pub name: String,
    /// Account kind.
    pub kind: AccountKind,
}

/// One leg of a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierAtom {
    /// Unique identifier.
    pub id: ModifierAtomId,
    /// Role of this leg.
    pub kind: ModifierAtomKind,
    /// Account the leg posts to.
    pub account_id: AccountId,
    /// Cash flow activity, present exactly for real legs on non-liquid accounts.
    #[serde(default)]
    pub cash_flow_activity_id: Option<CashFlowActivityId>,
}

/// A named transaction template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Unique identifier.
    pub id: ModifierId,
    /// Modifier name.
    pub name: String,
    /// What the modifier does.
    pub action: ModifierAction,
    /// The legs of the template.
    pub atoms: Vec<ModifierAtom>,
}

impl Modifier {
    /// Finds an atom of this modifier by id.
    #[must_use]
    pub fn atom(&self, id: ModifierAtomId) -> Option<&ModifierAtom> {
        self.atoms.iter().find(|atom| atom.id == id)
    }

    /// The first atom of the given kind, if any.
    #[must_use]
    pub fn first_atom_of(&self, kind: ModifierAtomKind) -> Option<&ModifierAtom> {
        self.atoms.iter().find(|atom| atom.kind == kind)
    }
}

/// One numeric value of a financial entry, keyed to a modifier atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEntryAtom {
    /// The modifier atom this value fills.
    pub modifier_atom_id: ModifierAtomId,
    /// The exact value.
    pub numerical_value: Rational,
}

/// A dated instantiation of a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialEntry {
    /// Unique identifier.
    pub id: FinancialEntryId,
    /// Template this entry instantiates.
    pub modifier_id: ModifierId,
    /// When the transaction happened.
    pub transacted_at: DateTime<Utc>,
    /// Values for the modifier's atoms. Empty for `close` entries.
    #[serde(default)]
    pub atoms: Vec<FinancialEntryAtom>,
}

impl FinancialEntry {
    /// Value recorded for a modifier atom, if any.
    #[must_use]
    pub fn value_of(&self, atom_id: ModifierAtomId) -> Option<&Rational> {
        self.atoms
            .iter()
            .find(|atom| atom.modifier_atom_id == atom_id)
            .map(|atom| &atom.numerical_value)
    }
}
