//! Common types used across the application.

pub mod id;
pub mod rational;

pub use id::*;
pub use rational::{RATIONAL_SCALE, Rational, RationalParseError};
