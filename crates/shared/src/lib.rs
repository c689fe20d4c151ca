//! Shared types, errors, and configuration for Frostbook.
//!
//! This crate provides common types used across all other crates:
//! - Exact rational numbers for every monetary value
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ExchangeRateBasis};
pub use error::{AppError, AppResult};
pub use types::Rational;
