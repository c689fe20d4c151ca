//! Multi-currency conversion and exchange rate derivation.

pub mod derivator;
pub mod error;
pub mod exchange;
pub mod service;

#[cfg(test)]
mod props;

pub use derivator::ExchangeRateDerivator;
pub use error::ExchangeRateError;
pub use exchange::ExchangeEdge;
pub use service::CurrencyService;
