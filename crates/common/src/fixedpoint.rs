//! Fixed-point numeric types
//!
//! Ownership interests and money never touch floating point inside the
//! engine. Both types wrap integers at a fixed scale:
//!
//! - [`DecimalInterest`]: `u64` units of 1e-8, so `1.0 == 100_000_000`.
//! - [`Money`]: `i64` count of the currency's minor unit (cents for USD).
//!
//! There is intentionally no `From<u64>`/`From<i64>` conversion; use the
//! explicit constructors so a raw integer is never mistaken for a scaled
//! amount.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of decimal places carried by [`DecimalInterest`].
pub const INTEREST_DECIMALS: u32 = 8;

/// Units per whole interest (1.0).
pub const INTEREST_SCALE: u64 = 100_000_000;

/// Default number of minor-unit decimals for [`Money`] (cents).
pub const DEFAULT_MINOR_DECIMALS: u32 = 2;

// ---------------------------------------------------------------------------
// DecimalInterest
// ---------------------------------------------------------------------------

/// A fractional ownership interest with 8-decimal precision.
///
/// Values are non-negative by construction. Sums of interests may exceed
/// 1.0 arithmetically; callers enforce the allocation ceiling with
/// [`DecimalInterest::is_at_most_whole`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecimalInterest(u64);

impl DecimalInterest {
    /// Zero interest.
    pub const ZERO: DecimalInterest = DecimalInterest(0);

    /// A whole (100%) interest.
    pub const ONE: DecimalInterest = DecimalInterest(INTEREST_SCALE);

    /// Construct from raw 1e-8 units.
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        DecimalInterest(units)
    }

    /// Raw 1e-8 units.
    #[inline]
    pub const fn units(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True when the value is ≤ 1.0.
    #[inline]
    pub fn is_at_most_whole(self) -> bool {
        self.0 <= INTEREST_SCALE
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(DecimalInterest)
    }

    /// Subtraction that refuses to go below zero.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(DecimalInterest)
    }

    /// Remainder up to a whole interest (`1.0 - self`), zero if over-allocated.
    pub fn remainder_to_whole(self) -> Self {
        DecimalInterest(INTEREST_SCALE.saturating_sub(self.0))
    }

    /// Checked sum over an iterator of interests.
    pub fn checked_sum<I>(iter: I) -> Option<Self>
    where
        I: IntoIterator<Item = DecimalInterest>,
    {
        iter.into_iter()
            .try_fold(DecimalInterest::ZERO, |acc, x| acc.checked_add(x))
    }
}

impl fmt::Display for DecimalInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:08}",
            self.0 / INTEREST_SCALE,
            self.0 % INTEREST_SCALE
        )
    }
}

impl FromStr for DecimalInterest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let units = parse_scaled(s.trim(), INTEREST_DECIMALS)?;
        let units = u64::try_from(units)
            .map_err(|_| Error::invalid_input(format!("interest must not be negative: {}", s)))?;
        Ok(DecimalInterest(units))
    }
}

impl Serialize for DecimalInterest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecimalInterest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct InterestVisitor;

        impl<'de> Visitor<'de> for InterestVisitor {
            type Value = DecimalInterest;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a decimal interest such as \"0.25\" or 0.25")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                v.checked_mul(INTEREST_SCALE)
                    .map(DecimalInterest)
                    .ok_or_else(|| E::custom("interest out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                let v = u64::try_from(v).map_err(|_| E::custom("interest must not be negative"))?;
                self.visit_u64(v)
            }

            // Numbers in YAML/JSON documents are routed through their shortest
            // decimal rendering so 0.1 parses as exactly 0.10000000.
            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
                if !v.is_finite() {
                    return Err(E::custom("interest must be finite"));
                }
                format!("{}", v).parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(InterestVisitor)
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A monetary amount in the currency's minor unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Construct from a count of minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Count of minor units.
    #[inline]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Checked sum over an iterator of amounts.
    pub fn checked_sum<I>(iter: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        iter.into_iter().try_fold(Money::ZERO, |acc, x| acc.checked_add(x))
    }

    /// Parse a decimal amount (e.g. `"100.01"`) into minor units.
    pub fn parse(s: &str, minor_decimals: u32) -> Result<Self> {
        let minor = parse_scaled(s.trim(), minor_decimals)?;
        i64::try_from(minor)
            .map(Money)
            .map_err(|_| Error::invalid_input(format!("amount out of range: {}", s)))
    }

    /// Render with the given number of minor-unit decimals.
    pub fn format(self, minor_decimals: u32) -> String {
        if minor_decimals == 0 {
            return self.0.to_string();
        }
        let scale = 10i128.pow(minor_decimals);
        let value = self.0 as i128;
        let sign = if value < 0 { "-" } else { "" };
        let abs = value.abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = minor_decimals as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DEFAULT_MINOR_DECIMALS))
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a plain decimal string into an integer scaled by `10^decimals`.
///
/// Rejects exponents, more fractional digits than `decimals`, and anything
/// that is not `[-]digits[.digits]`.
fn parse_scaled(s: &str, decimals: u32) -> Result<i128> {
    let invalid = || Error::invalid_input(format!("invalid decimal: {:?}", s));

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if frac_part.len() > decimals as usize {
        return Err(Error::invalid_input(format!(
            "{:?} has more than {} decimal places",
            s, decimals
        )));
    }

    let scale = 10i128.pow(decimals);
    let int_value: i128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let frac_value: i128 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    let magnitude = int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(invalid)?;

    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_parse_and_display() {
        let i: DecimalInterest = "0.6".parse().unwrap();
        assert_eq!(i.units(), 60_000_000);
        assert_eq!(i.to_string(), "0.60000000");

        let i: DecimalInterest = "0.33333334".parse().unwrap();
        assert_eq!(i.units(), 33_333_334);

        let one: DecimalInterest = "1".parse().unwrap();
        assert_eq!(one, DecimalInterest::ONE);
    }

    #[test]
    fn test_interest_parse_rejects_bad_input() {
        assert!("0.123456789".parse::<DecimalInterest>().is_err());
        assert!("-0.1".parse::<DecimalInterest>().is_err());
        assert!("1e-3".parse::<DecimalInterest>().is_err());
        assert!("".parse::<DecimalInterest>().is_err());
        assert!(".".parse::<DecimalInterest>().is_err());
    }

    #[test]
    fn test_interest_deserialize_from_number_and_string() {
        let from_num: DecimalInterest = serde_json::from_str("0.1").unwrap();
        let from_str: DecimalInterest = serde_json::from_str("\"0.1\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(from_num.units(), 10_000_000);

        let json = serde_json::to_string(&from_num).unwrap();
        assert_eq!(json, "\"0.10000000\"");
    }

    #[test]
    fn test_interest_checked_arithmetic() {
        let a = DecimalInterest::from_units(60_000_000);
        let b = DecimalInterest::from_units(40_000_000);
        assert_eq!(a.checked_add(b), Some(DecimalInterest::ONE));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(
            DecimalInterest::checked_sum([a, b]).map(|s| s.is_at_most_whole()),
            Some(true)
        );
        assert_eq!(a.remainder_to_whole(), b);
    }

    #[test]
    fn test_money_parse_and_format() {
        let m = Money::parse("100.01", 2).unwrap();
        assert_eq!(m.minor(), 10_001);
        assert_eq!(m.to_string(), "100.01");

        let m = Money::parse("5", 2).unwrap();
        assert_eq!(m.minor(), 500);

        let neg = Money::from_minor(-1_05);
        assert_eq!(neg.format(2), "-1.05");
        assert_eq!(Money::from_minor(7).format(0), "7");

        assert!(Money::parse("1.001", 2).is_err());
    }
}
