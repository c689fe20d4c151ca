//! Exchange rate edges observed in `exchange` entries.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{AccountId, CurrencyId, FinancialEntryId};
use serde::{Deserialize, Serialize};

use super::error::ExchangeRateError;
use crate::ledger::types::{Account, FinancialEntry, Modifier, ModifierAtomKind};

/// One observed trade between two currencies.
///
/// The credited account gives up `source_amount` of its currency; the
/// debited account receives `destination_amount` of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeEdge {
    /// Entry the edge was read from.
    pub entry_id: FinancialEntryId,
    /// When the trade happened.
    pub transacted_at: DateTime<Utc>,
    /// Currency given up.
    pub source_currency_id: CurrencyId,
    /// Amount given up.
    pub source_amount: Rational,
    /// Currency received.
    pub destination_currency_id: CurrencyId,
    /// Amount received.
    pub destination_amount: Rational,
}

impl ExchangeEdge {
    /// Reads the edge of an exchange entry.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::MalformedExchange` if the entry lacks a
    /// real leg, a value, or a positive amount on either side.
    pub fn from_entry(
        entry: &FinancialEntry,
        modifier: &Modifier,
        accounts: &HashMap<AccountId, Account>,
    ) -> Result<Self, ExchangeRateError> {
        let malformed = |reason: &'static str| ExchangeRateError::MalformedExchange {
            entry_id: entry.id,
            reason,
        };

        let leg = |kind: ModifierAtomKind| -> Result<(CurrencyId, Rational), ExchangeRateError> {
            let atom = modifier
                .first_atom_of(kind)
                .ok_or_else(|| malformed("missing real leg"))?;
            let account = accounts
                .get(&atom.account_id)
                .ok_or_else(|| malformed("unknown account"))?;
            let value = entry
                .value_of(atom.id)
                .ok_or_else(|| malformed("missing value"))?;
            if !value.is_positive() {
                return Err(malformed("non-positive amount"));
            }
            Ok((account.currency_id, value.clone()))
        };

        let (source_currency_id, source_amount) = leg(ModifierAtomKind::RealCredit)?;
        let (destination_currency_id, destination_amount) = leg(ModifierAtomKind::RealDebit)?;

        if source_currency_id == destination_currency_id {
            return Err(malformed("same currency on both legs"));
        }

        Ok(Self {
            entry_id: entry.id,
            transacted_at: entry.transacted_at,
            source_currency_id,
            source_amount,
            destination_currency_id,
            destination_amount,
        })
    }

    /// Units of destination currency per unit of source currency.
    ///
    /// `None` unless both amounts are positive.
    #[must_use]
    pub fn rate(&self) -> Option<Rational> {
        if !self.source_amount.is_positive() || !self.destination_amount.is_positive() {
            return None;
        }
        self.destination_amount.checked_div(&self.source_amount)
    }

    /// The pair ordered (lower id, higher id) and the rate in that direction.
    ///
    /// `None` when the edge has no rate or joins a currency to itself.
    #[must_use]
    pub fn normalized(&self) -> Option<((CurrencyId, CurrencyId), Rational)> {
        let rate = self.rate()?;
        match self.source_currency_id.cmp(&self.destination_currency_id) {
            Ordering::Less => Some(((self.source_currency_id, self.destination_currency_id), rate)),
            Ordering::Greater => Some((
                (self.destination_currency_id, self.source_currency_id),
                rate.recip()?,
            )),
            Ordering::Equal => None,
        }
    }

    /// Ordering key: later trades win, ties go to the higher entry id.
    #[must_use]
    pub fn recency(&self) -> (DateTime<Utc>, FinancialEntryId) {
        (self.transacted_at, self.entry_id)
    }
}
