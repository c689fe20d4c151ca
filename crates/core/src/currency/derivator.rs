//! Exchange rate derivation over a graph of observed trades.
//!
//! A derivator is built for one as-of instant and never mutated. Each
//! unordered currency pair keeps only its most recent trade; rates between
//! currencies that never traded directly are found by a breadth-first search
//! and multiplied along the path.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use frostbook_shared::Rational;
use frostbook_shared::types::{CurrencyId, FinancialEntryId};
use tracing::debug;

use super::error::ExchangeRateError;
use super::exchange::ExchangeEdge;

/// Rate lookup for one as-of instant.
#[derive(Debug, Clone)]
pub struct ExchangeRateDerivator {
    as_of: DateTime<Utc>,
    /// Rate from the lower to the higher currency id of each pair.
    rates: BTreeMap<(CurrencyId, CurrencyId), Rational>,
    adjacency: BTreeMap<CurrencyId, BTreeSet<CurrencyId>>,
}

impl ExchangeRateDerivator {
    /// Builds a derivator from edges, ignoring those after `as_of`.
    #[must_use]
    pub fn new(as_of: DateTime<Utc>, edges: impl IntoIterator<Item = ExchangeEdge>) -> Self {
        let mut latest: HashMap<(CurrencyId, CurrencyId), ((DateTime<Utc>, FinancialEntryId), Rational)> =
            HashMap::new();

        for edge in edges {
            if edge.transacted_at > as_of {
                continue;
            }
            let Some((pair, rate)) = edge.normalized() else {
                debug!(entry_id = %edge.entry_id, "exchange edge without a rate skipped");
                continue;
            };
            let recency = edge.recency();
            match latest.get(&pair) {
                Some((seen, _)) if *seen >= recency => {}
                _ => {
                    latest.insert(pair, (recency, rate));
                }
            }
        }

        let mut rates = BTreeMap::new();
        let mut adjacency: BTreeMap<CurrencyId, BTreeSet<CurrencyId>> = BTreeMap::new();
        for ((low, high), (_, rate)) in latest {
            adjacency.entry(low).or_default().insert(high);
            adjacency.entry(high).or_default().insert(low);
            rates.insert((low, high), rate);
        }

        debug!(%as_of, pairs = rates.len(), "exchange rate derivator built");

        Self {
            as_of,
            rates,
            adjacency,
        }
    }

    /// Instant the derivator was built for.
    #[must_use]
    pub const fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Number of currency pairs with a direct rate.
    #[must_use]
    pub fn known_pairs(&self) -> usize {
        self.rates.len()
    }

    /// Units of `destination` per unit of `source`.
    ///
    /// Returns one for identical currencies. The search always runs from the
    /// lower currency id so that `rate(b, a)` is exactly `1 / rate(a, b)`.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::Unreachable` when no chain of trades links
    /// the two currencies. A missing rate is never treated as one.
    pub fn derive_exchange_rate(
        &self,
        source: CurrencyId,
        destination: CurrencyId,
    ) -> Result<Rational, ExchangeRateError> {
        if source == destination {
            return Ok(Rational::one());
        }

        let (low, high) = if source < destination {
            (source, destination)
        } else {
            (destination, source)
        };

        let forward = self
            .search(low, high)
            .ok_or(ExchangeRateError::Unreachable {
                source_currency_id: source,
                destination_currency_id: destination,
                as_of: self.as_of,
            })?;

        if source == low {
            Ok(forward)
        } else {
            forward.recip().ok_or(ExchangeRateError::Unreachable {
                source_currency_id: source,
                destination_currency_id: destination,
                as_of: self.as_of,
            })
        }
    }

    /// Converts an amount exactly.
    ///
    /// # Errors
    ///
    /// Returns `ExchangeRateError::Unreachable` as for [`Self::derive_exchange_rate`].
    pub fn convert(
        &self,
        amount: &Rational,
        source: CurrencyId,
        destination: CurrencyId,
    ) -> Result<Rational, ExchangeRateError> {
        Ok(amount * &self.derive_exchange_rate(source, destination)?)
    }

    /// Rate of one hop, inverting stored pairs when walked backwards.
    fn hop(&self, from: CurrencyId, to: CurrencyId) -> Option<Rational> {
        if from < to {
            self.rates.get(&(from, to)).cloned()
        } else {
            self.rates.get(&(to, from)).and_then(Rational::recip)
        }
    }

    /// Shortest-hop path product from `from` to `to`.
    fn search(&self, from: CurrencyId, to: CurrencyId) -> Option<Rational> {
        let mut previous: HashMap<CurrencyId, CurrencyId> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut visited = BTreeSet::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                break;
            }
            for next in self.adjacency.get(&current).into_iter().flatten() {
                if visited.insert(*next) {
                    previous.insert(*next, current);
                    queue.push_back(*next);
                }
            }
        }

        if !visited.contains(&to) {
            return None;
        }

        let mut path = vec![to];
        let mut cursor = to;
        while let Some(step) = previous.get(&cursor) {
            path.push(*step);
            cursor = *step;
        }
        path.reverse();

        path.windows(2).try_fold(Rational::one(), |rate, pair| {
            Some(rate * self.hop(pair[0], pair[1])?)
        })
    }
}
