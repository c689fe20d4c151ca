//! Currency service for exact conversion and rate derivation.
//!
//! Conversion never rounds: amounts and rates are exact rationals, and
//! rounding happens only when a value is rendered for people.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use frostbook_shared::types::{AccountId, CurrencyId, ModifierId};
use frostbook_shared::{ExchangeRateBasis, Rational};

use super::derivator::ExchangeRateDerivator;
use super::error::ExchangeRateError;
use super::exchange::ExchangeEdge;
use crate::context::LedgerContext;
use crate::store::LedgerStore;

/// Currency service for conversion and rate derivation.
pub struct CurrencyService;

impl CurrencyService {
    /// Convert an amount with a rate, exactly.
    ///
    /// # Example
    ///
    /// ```
    /// use frostbook_core::currency::CurrencyService;
    /// use frostbook_shared::Rational;
    ///
    /// let third = Rational::fraction(1, 3).unwrap();
    /// let result = CurrencyService::convert(&Rational::from(100_i64), &third);
    /// assert_eq!(result, Rational::fraction(100, 3).unwrap());
    /// ```
    #[must_use]
    pub fn convert(amount: &Rational, rate: &Rational) -> Rational {
        amount * rate
    }

    /// Render an amount at `scale` decimal places using Banker's Rounding.
    #[must_use]
    pub fn render(amount: &Rational, scale: u32) -> String {
        amount.to_decimal_string(scale)
    }

    /// Instant a rate should be taken at for the given basis.
    ///
    /// `periodic` uses the requested instant, `latest` always uses now.
    #[must_use]
    pub fn effective_as_of(
        basis: ExchangeRateBasis,
        as_of: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        match basis {
            ExchangeRateBasis::Periodic => as_of,
            ExchangeRateBasis::Latest => now,
        }
    }

    /// Loads every exchange edge observed at or before `until`.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError` if loading fails or an entry is malformed.
    pub fn load_edges<S>(
        store: &S,
        ctx: &LedgerContext,
        until: DateTime<Utc>,
    ) -> Result<Vec<ExchangeEdge>, ExchangeRateError>
    where
        S: LedgerStore + ?Sized,
    {
        let entries = store.load_exchange_entries(ctx.user_id, until)?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let modifier_ids: Vec<ModifierId> = entries
            .iter()
            .map(|entry| entry.modifier_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let modifiers: HashMap<_, _> = store
            .load_modifiers(ctx.user_id, &modifier_ids)?
            .into_iter()
            .map(|modifier| (modifier.id, modifier))
            .collect();

        let account_ids: Vec<AccountId> = modifiers
            .values()
            .flat_map(|modifier| modifier.atoms.iter().map(|atom| atom.account_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let accounts: HashMap<_, _> = store
            .load_accounts(ctx.user_id, &account_ids)?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        entries
            .iter()
            .map(|entry| {
                let modifier = modifiers.get(&entry.modifier_id).ok_or(
                    ExchangeRateError::MalformedExchange {
                        entry_id: entry.id,
                        reason: "unknown modifier",
                    },
                )?;
                ExchangeEdge::from_entry(entry, modifier, &accounts)
            })
            .collect()
    }

    /// Builds a derivator for one as-of instant.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError` if the edges cannot be loaded.
    pub fn build_derivator<S>(
        store: &S,
        ctx: &LedgerContext,
        as_of: DateTime<Utc>,
    ) -> Result<ExchangeRateDerivator, ExchangeRateError>
    where
        S: LedgerStore + ?Sized,
    {
        let edges = Self::load_edges(store, ctx, as_of)?;
        Ok(ExchangeRateDerivator::new(as_of, edges))
    }

    /// Units of `destination` per unit of `source` under a basis.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::Unreachable` when no path exists, or a
    /// loading error.
    pub fn derive_exchange_rate<S>(
        store: &S,
        ctx: &LedgerContext,
        source: CurrencyId,
        destination: CurrencyId,
        as_of: DateTime<Utc>,
        basis: ExchangeRateBasis,
    ) -> Result<Rational, ExchangeRateError>
    where
        S: LedgerStore + ?Sized,
    {
        if source == destination {
            return Ok(Rational::one());
        }
        let effective = Self::effective_as_of(basis, as_of, ctx.now);
        Self::build_derivator(store, ctx, effective)?.derive_exchange_rate(source, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_keeps_every_digit() {
        let rate = Rational::from(dec!(56.123456789));
        let result = CurrencyService::convert(&Rational::from(dec!(100)), &rate);
        assert_eq!(result, Rational::from(dec!(5612.3456789)));
    }

    #[test]
    fn test_render_uses_bankers_rounding() {
        assert_eq!(CurrencyService::render(&Rational::from(dec!(2.5)), 0), "2");
        assert_eq!(CurrencyService::render(&Rational::from(dec!(3.5)), 0), "4");
        assert_eq!(CurrencyService::render(&Rational::from(dec!(2.25)), 1), "2.2");
        assert_eq!(CurrencyService::render(&Rational::from(dec!(2.35)), 1), "2.4");
        assert_eq!(
            CurrencyService::render(&Rational::fraction(2, 3).unwrap(), 2),
            "0.67"
        );
    }

    #[test]
    fn test_effective_as_of() {
        let then = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            CurrencyService::effective_as_of(ExchangeRateBasis::Periodic, then, now),
            then
        );
        assert_eq!(
            CurrencyService::effective_as_of(ExchangeRateBasis::Latest, then, now),
            now
        );
    }
}
