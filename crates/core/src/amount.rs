//! Fixed-point amounts with eight fractional digits.
//!
//! Amounts are stored as integer units of 10^-8, so the canonical
//! `0.########` rendering used in signed payloads is exact. Anything
//! more precise is rejected at parse time instead of being rounded.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits.
pub const DECIMALS: u32 = 8;

/// Units per whole coin.
pub const SCALE: u64 = 100_000_000;

/// Errors produced when parsing an amount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    #[error("amount cannot be negative: {0:?}")]
    Negative(String),

    #[error("amount {0:?} has more than 8 fractional digits")]
    TooPrecise(String),

    #[error("amount {0:?} is too large")]
    Overflow(String),
}

/// A non-negative fixed-point amount.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Create an amount from raw 10^-8 units.
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Create an amount from a whole number of coins.
    pub const fn from_whole(coins: u64) -> Self {
        Self(coins.saturating_mul(SCALE))
    }

    /// Raw 10^-8 units.
    pub const fn units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by a fixed-point rate (e.g. `0.2` for 20%), truncating.
    pub fn mul_rate(self, rate: Amount) -> Self {
        let product = self.0 as u128 * rate.0 as u128 / SCALE as u128;
        Self(u64::try_from(product).unwrap_or(u64::MAX))
    }

    /// Multiply by an integer, saturating.
    pub fn mul_int(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Divide by `2^exponent`, truncating.
    pub fn halve(self, exponent: u32) -> Self {
        Self(self.0.checked_shr(exponent).unwrap_or(0))
    }

    /// `self * numerator / denominator`, truncating. Zero denominator yields zero.
    pub fn mul_div(self, numerator: Amount, denominator: Amount) -> Self {
        if denominator.0 == 0 {
            return Self::ZERO;
        }
        let product = self.0 as u128 * numerator.0 as u128 / denominator.0 as u128;
        Self(u64::try_from(product).unwrap_or(u64::MAX))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(AmountError::Negative(s.to_string()));
        }
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole_units: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .ok()
                .and_then(|w| w.checked_mul(SCALE))
                .ok_or_else(|| AmountError::Overflow(s.to_string()))?
        };
        let frac_units: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded
                .parse::<u64>()
                .map_err(|_| AmountError::Invalid(s.to_string()))?
        };

        whole_units
            .checked_add(frac_units)
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

/// Canonical `0.########` rendering: no trailing zeros, no trailing dot.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, false, self.0 as u128)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A signed running balance derived from transaction history.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Balance(i128);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub const fn from_units(units: i128) -> Self {
        Self(units)
    }

    pub const fn units(self) -> i128 {
        self.0
    }

    pub fn credit(&mut self, amount: Amount) {
        self.0 += amount.units() as i128;
    }

    pub fn debit(&mut self, amount: Amount) {
        self.0 -= amount.units() as i128;
    }

    /// Whether this balance can pay `amount`.
    pub fn covers(self, amount: Amount) -> bool {
        self.0 >= amount.units() as i128
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.units() as i128)
    }
}

impl Add for Balance {
    type Output = Balance;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Balance::ZERO, Add::add)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0 < 0, self.0.unsigned_abs())
    }
}

impl fmt::Debug for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Balance({})", self)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn write_fixed(f: &mut fmt::Formatter<'_>, negative: bool, units: u128) -> fmt::Result {
    let scale = SCALE as u128;
    let whole = units / scale;
    let frac = units % scale;
    let sign = if negative && units != 0 { "-" } else { "" };
    if frac == 0 {
        return write!(f, "{}{}", sign, whole);
    }
    let digits = format!("{:08}", frac);
    write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_format() {
        assert_eq!(amt("1").units(), SCALE);
        assert_eq!(amt("1.1").to_string(), "1.1");
        assert_eq!(amt("0.10000000").to_string(), "0.1");
        assert_eq!(amt("0").to_string(), "0");
        assert_eq!(amt(".5").to_string(), "0.5");
        assert_eq!(amt("12.34500000").to_string(), "12.345");
    }

    #[test]
    fn test_precision_boundary() {
        assert_eq!(amt("0.00000001").units(), 1);
        assert_eq!(amt("0.00000001").to_string(), "0.00000001");
        assert!(matches!(
            "0.000000001".parse::<Amount>(),
            Err(AmountError::TooPrecise(_))
        ));
        assert!(matches!(
            "1.123456789".parse::<Amount>(),
            Err(AmountError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::Negative(_))));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!(".".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!("1e5".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!(
            "999999999999999999999".parse::<Amount>(),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_rate_math() {
        assert_eq!(amt("10").mul_rate(amt("0.2")), amt("2"));
        assert_eq!(amt("10").mul_rate(amt("0.001")).mul_int(19), amt("0.19"));
        assert_eq!(amt("1").halve(1), amt("0.5"));
        assert_eq!(amt("1").halve(2), amt("0.25"));
        assert_eq!(amt("1").halve(200), Amount::ZERO);
        assert_eq!(amt("10").mul_div(amt("5"), amt("10")), amt("5"));
        assert_eq!(amt("10").mul_div(amt("5"), Amount::ZERO), Amount::ZERO);
    }

    #[test]
    fn test_sum_amounts() {
        let total: Amount = vec![amt("0.1"), amt("0.2"), amt("0.3")].into_iter().sum();
        assert_eq!(total, amt("0.6"));
    }

    #[test]
    fn test_balance_signs() {
        let mut b = Balance::ZERO;
        b.credit(amt("1"));
        b.debit(amt("1.5"));
        assert!(b.is_negative());
        assert_eq!(b.to_string(), "-0.5");
        assert!(!b.covers(amt("0.1")));

        b.credit(amt("2"));
        assert_eq!(b.to_string(), "1.5");
        assert!(b.covers(amt("1.5")));
        assert!(!b.covers(amt("1.50000001")));
    }
}
