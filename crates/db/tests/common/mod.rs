//! Ledger fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use frostbook_core::LedgerContext;
use frostbook_core::ledger::{
    Account, AccountKind, Currency, FinancialEntry, FinancialEntryAtom, Modifier, ModifierAction,
    ModifierAtom, ModifierAtomKind,
};
use frostbook_db::{MemoryStore, RecordError};
use frostbook_shared::Rational;
use frostbook_shared::types::{
    AccountId, CashFlowActivityId, CurrencyId, FinancialEntryId, ModifierAtomId, ModifierId,
    UserId,
};
use rust_decimal::Decimal;

pub const OWNER: UserId = UserId::new(1);

pub const PHP: CurrencyId = CurrencyId::new(1);
pub const USD: CurrencyId = CurrencyId::new(2);
pub const JPY: CurrencyId = CurrencyId::new(3);
pub const EUR: CurrencyId = CurrencyId::new(4);

/// Midnight UTC of a day in 2024.
pub fn day(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
}

pub fn r(value: Decimal) -> Rational {
    Rational::from(value)
}

pub fn ctx(now: DateTime<Utc>) -> LedgerContext {
    LedgerContext::new(OWNER, now)
}

/// Builds a ledger through the store's validating inserts.
pub struct Ledger {
    pub store: MemoryStore,
    kinds: HashMap<AccountId, AccountKind>,
    next_entry: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            kinds: HashMap::new(),
            next_entry: 1,
        }
    }

    pub fn currency(&mut self, id: CurrencyId, code: &str) -> &mut Self {
        self.store
            .insert_currency(Currency {
                id,
                owner_id: OWNER,
                code: code.to_string(),
                name: code.to_string(),
                presentational_precision: 2,
            })
            .unwrap();
        self
    }

    pub fn account(&mut self, id: u64, currency_id: CurrencyId, kind: AccountKind) -> &mut Self {
        self.store
            .insert_account(Account {
                id: AccountId::new(id),
                currency_id,
                name: format!("{kind:?} {id}"),
                kind,
            })
            .unwrap();
        self.kinds.insert(AccountId::new(id), kind);
        self
    }

    fn atom(&self, id: u64, kind: ModifierAtomKind, account: u64, activity: u64) -> ModifierAtom {
        let liquid = self.kinds.get(&AccountId::new(account)) == Some(&AccountKind::LiquidAsset);
        ModifierAtom {
            id: ModifierAtomId::new(id),
            kind,
            account_id: AccountId::new(account),
            cash_flow_activity_id: (!liquid).then_some(CashFlowActivityId::new(activity)),
        }
    }

    /// A two-legged modifier. Atom ids are `id * 10 + 1` (debit) and
    /// `id * 10 + 2` (credit). Non-liquid legs get `activity`.
    pub fn modifier(
        &mut self,
        id: u64,
        action: ModifierAction,
        debit: u64,
        credit: u64,
        activity: u64,
    ) -> &mut Self {
        let modifier = Modifier {
            id: ModifierId::new(id),
            name: format!("{action:?} {id}"),
            action,
            atoms: vec![
                self.atom(id * 10 + 1, ModifierAtomKind::RealDebit, debit, activity),
                self.atom(id * 10 + 2, ModifierAtomKind::RealCredit, credit, activity),
            ],
        };
        self.store.insert_modifier(OWNER, modifier).unwrap();
        self
    }

    pub fn record(&mut self, id: u64, debit: u64, credit: u64, activity: u64) -> &mut Self {
        self.modifier(id, ModifierAction::Record, debit, credit, activity)
    }

    pub fn close(&mut self, id: u64, debit: u64, credit: u64) -> &mut Self {
        self.modifier(id, ModifierAction::Close, debit, credit, 1)
    }

    pub fn exchange(&mut self, id: u64, debit: u64, credit: u64) -> &mut Self {
        self.modifier(id, ModifierAction::Exchange, debit, credit, 1)
    }

    fn next_entry(&mut self) -> FinancialEntryId {
        let id = FinancialEntryId::new(self.next_entry);
        self.next_entry += 1;
        id
    }

    /// Instantiates a two-legged modifier with one value per leg.
    pub fn trade(
        &mut self,
        modifier: u64,
        at: DateTime<Utc>,
        debit: Decimal,
        credit: Decimal,
    ) -> FinancialEntryId {
        self.try_trade(modifier, at, debit, credit).unwrap()
    }

    /// Like [`Ledger::trade`], returning the store's verdict. A rejected
    /// entry does not use up an id.
    pub fn try_trade(
        &mut self,
        modifier: u64,
        at: DateTime<Utc>,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<FinancialEntryId, RecordError> {
        let id = FinancialEntryId::new(self.next_entry);
        self.store.insert_financial_entry(
            OWNER,
            FinancialEntry {
                id,
                modifier_id: ModifierId::new(modifier),
                transacted_at: at,
                atoms: vec![
                    FinancialEntryAtom {
                        modifier_atom_id: ModifierAtomId::new(modifier * 10 + 1),
                        numerical_value: r(debit),
                    },
                    FinancialEntryAtom {
                        modifier_atom_id: ModifierAtomId::new(modifier * 10 + 2),
                        numerical_value: r(credit),
                    },
                ],
            },
        )?;
        self.next_entry += 1;
        Ok(id)
    }

    /// Records a balanced entry.
    pub fn post(&mut self, modifier: u64, at: DateTime<Utc>, amount: Decimal) -> FinancialEntryId {
        self.trade(modifier, at, amount, amount)
    }

    /// Records a close entry, which carries no values.
    pub fn close_at(&mut self, modifier: u64, at: DateTime<Utc>) -> FinancialEntryId {
        let id = self.next_entry();
        self.store
            .insert_financial_entry(
                OWNER,
                FinancialEntry {
                    id,
                    modifier_id: ModifierId::new(modifier),
                    transacted_at: at,
                    atoms: Vec::new(),
                },
            )
            .unwrap();
        id
    }
}

pub const CASH: u64 = 1;
pub const CAPITAL: u64 = 2;
pub const SUPPLIES: u64 = 3;

pub const INVEST: u64 = 1;
pub const SPEND: u64 = 2;
pub const CLOSE_SUPPLIES: u64 = 3;

/// Cash, capital and an expense in PHP with their three modifiers.
///
/// Capital receipts are reported under activity 20, supply purchases
/// under activity 30.
pub fn bookshop() -> Ledger {
    let mut ledger = Ledger::new();
    ledger
        .currency(PHP, "PHP")
        .account(CASH, PHP, AccountKind::LiquidAsset)
        .account(CAPITAL, PHP, AccountKind::Equity)
        .account(SUPPLIES, PHP, AccountKind::GeneralExpense)
        .record(INVEST, CASH, CAPITAL, 20)
        .record(SPEND, SUPPLIES, CASH, 30)
        .close(CLOSE_SUPPLIES, CAPITAL, SUPPLIES);
    ledger
}

/// The January scenario: invest 1000, spend 250, close the expense.
pub fn january(ledger: &mut Ledger) {
    ledger.post(INVEST, day(1, 2), rust_decimal_macros::dec!(1000));
    ledger.post(SPEND, day(1, 3), rust_decimal_macros::dec!(250));
    ledger.close_at(CLOSE_SUPPLIES, day(1, 4));
}

pub const DOLLARS: u64 = 5;
pub const BUY_DOLLARS: u64 = 5;

/// Adds a USD wallet funded from the PHP cash account.
pub fn with_dollars(ledger: &mut Ledger) {
    ledger
        .currency(USD, "USD")
        .account(DOLLARS, USD, AccountKind::LiquidAsset)
        .exchange(BUY_DOLLARS, DOLLARS, CASH);
}
