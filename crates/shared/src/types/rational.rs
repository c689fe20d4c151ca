//! Exact rational numbers for monetary values.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount in the ledger is a fraction of two arbitrary-precision
//! integers, so sums, products and currency conversions never lose a cent.
//! Values cross process boundaries as plain decimal strings rendered at
//! [`RATIONAL_SCALE`] decimal places.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of decimal places used when a rational is written to a string
/// for storage or transport.
pub const RATIONAL_SCALE: u32 = 12;

/// Errors raised while parsing a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RationalParseError {
    /// The input was empty (or only a sign).
    #[error("Empty numeric string")]
    Empty,

    /// The input contained something other than an optional sign,
    /// digits and at most one decimal point.
    #[error("Invalid numeric string: {0}")]
    Invalid(String),
}

/// Exact, arbitrary-precision fraction.
///
/// Always kept in lowest terms with a positive denominator, so structural
/// equality is numeric equality.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

fn pow10(exponent: u32) -> BigInt {
    BigInt::from(10u32).pow(exponent)
}

impl Rational {
    /// Returns zero.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// Returns one.
    #[must_use]
    pub fn one() -> Self {
        Self(BigRational::one())
    }

    /// Creates `numer / denom`, or `None` when `denom` is zero.
    #[must_use]
    pub fn fraction(numer: i64, denom: i64) -> Option<Self> {
        if denom == 0 {
            return None;
        }
        Some(Self(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }

    /// Returns true if the value is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Returns true if the value is strictly less than zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Sign of the value relative to zero.
    #[must_use]
    pub fn sign(&self) -> Ordering {
        self.0.cmp(&BigRational::zero())
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiplicative inverse, or `None` for zero.
    #[must_use]
    pub fn recip(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(Self(self.0.recip()))
        }
    }

    /// Exact division, or `None` when dividing by zero.
    #[must_use]
    pub fn checked_div(&self, divisor: &Self) -> Option<Self> {
        if divisor.is_zero() {
            None
        } else {
            Some(Self(&self.0 / &divisor.0))
        }
    }

    /// Returns the larger of `self` and zero.
    #[must_use]
    pub fn clamp_to_positive(&self) -> Self {
        if self.is_positive() { self.clone() } else { Self::zero() }
    }

    /// Reduces the fraction to lowest terms.
    ///
    /// Arithmetic already keeps values reduced; this exists for values
    /// assembled from raw parts.
    #[must_use]
    pub fn simplified(&self) -> Self {
        Self(BigRational::new(self.0.numer().clone(), self.0.denom().clone()))
    }

    /// Numerator in lowest terms.
    #[must_use]
    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    /// Denominator in lowest terms (always positive).
    #[must_use]
    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    /// Renders the value with exactly `scale` decimal places using
    /// banker's rounding (round half to even).
    #[must_use]
    pub fn to_decimal_string(&self, scale: u32) -> String {
        let scaled = &self.0 * BigRational::from_integer(pow10(scale));
        let floor = scaled.floor();
        let fraction = &scaled - &floor;
        let half = BigRational::new(BigInt::one(), BigInt::from(2));
        let mut units = floor.to_integer();
        match fraction.cmp(&half) {
            Ordering::Greater => units += BigInt::one(),
            Ordering::Equal => {
                if !(&units % BigInt::from(2)).is_zero() {
                    units += BigInt::one();
                }
            }
            Ordering::Less => {}
        }

        let negative = units.is_negative();
        let digits = units.abs().to_string();
        let width = usize::try_from(scale).unwrap_or(usize::MAX).saturating_add(1);
        let padded = format!("{digits:0>width$}");
        let (whole, decimals) = padded.split_at(padded.len() - (width - 1));
        let sign = if negative { "-" } else { "" };
        if decimals.is_empty() {
            format!("{sign}{whole}")
        } else {
            format!("{sign}{whole}.{decimals}")
        }
    }

    /// Converts to a `Decimal` rounded to `scale` places.
    ///
    /// Returns `None` when the value does not fit `Decimal`'s 96-bit mantissa.
    #[must_use]
    pub fn to_decimal(&self, scale: u32) -> Option<Decimal> {
        Decimal::from_str(&self.to_decimal_string(scale)).ok()
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.0.numer(), self.0.denom())
    }
}

/// Renders at [`RATIONAL_SCALE`] places, or at the formatter's precision
/// when one is given (`{:.2}`).
impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = f
            .precision()
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(RATIONAL_SCALE);
        f.write_str(&self.to_decimal_string(scale))
    }
}

impl FromStr for Rational {
    type Err = RationalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if unsigned.is_empty() {
            return Err(RationalParseError::Empty);
        }

        let (whole, decimals) = match unsigned.split_once('.') {
            Some((whole, decimals)) => (whole, decimals),
            None => (unsigned, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && decimals.is_empty()) || !all_digits(whole) || !all_digits(decimals)
        {
            return Err(RationalParseError::Invalid(s.to_string()));
        }

        let digits = format!("{whole}{decimals}");
        let mut numer = BigInt::from_str(&digits)
            .map_err(|_| RationalParseError::Invalid(s.to_string()))?;
        if negative {
            numer = -numer;
        }
        let scale =
            u32::try_from(decimals.len()).map_err(|_| RationalParseError::Invalid(s.to_string()))?;

        Ok(Self(BigRational::new(numer, pow10(scale))))
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self(BigRational::from_integer(BigInt::from(value)))
    }
}

impl From<Decimal> for Rational {
    fn from(value: Decimal) -> Self {
        Self(BigRational::new(
            BigInt::from(value.mantissa()),
            pow10(value.scale()),
        ))
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational(-&self.0)
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl $trait for Rational {
            type Output = Rational;

            fn $method(self, rhs: Rational) -> Rational {
                Rational(self.0.$method(rhs.0))
            }
        }

        impl<'a> $trait<&'a Rational> for Rational {
            type Output = Rational;

            fn $method(self, rhs: &'a Rational) -> Rational {
                Rational(self.0.$method(&rhs.0))
            }
        }

        impl<'a> $trait<&'a Rational> for &Rational {
            type Output = Rational;

            fn $method(self, rhs: &'a Rational) -> Rational {
                Rational((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        self.0 += rhs.0;
    }
}

impl<'a> AddAssign<&'a Rational> for Rational {
    fn add_assign(&mut self, rhs: &'a Rational) {
        self.0 += &rhs.0;
    }
}

impl SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        self.0 -= rhs.0;
    }
}

impl<'a> SubAssign<&'a Rational> for Rational {
    fn sub_assign(&mut self, rhs: &'a Rational) {
        self.0 -= &rhs.0;
    }
}

impl Sum for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, value| acc + value)
    }
}

impl<'a> Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, value| acc + value)
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string(RATIONAL_SCALE))
    }
}

struct RationalVisitor;

impl Visitor<'_> for RationalVisitor {
    type Value = Rational;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a decimal string or an integer")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Rational, E> {
        Rational::from_str(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Rational, E> {
        Ok(Rational::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Rational, E> {
        Ok(Rational(BigRational::from_integer(BigInt::from(value))))
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RationalVisitor)
    }
}
