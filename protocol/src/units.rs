//! # Decimal Units
//!
//! Converts between human decimal strings (`"1000"`, `"0.5"`) and integer
//! base units scaled by `10^decimals`. Token and native amounts both use 18
//! decimals, so `parse_units("1.5", 18)` is `1_500_000_000_000_000_000`.
//!
//! Parsing is strict: no signs, no exponents, no more fractional digits
//! than the unit supports, and overflow is an error instead of a wrap.

use thiserror::Error;

use crate::config::{NATIVE_DECIMALS, TOKEN_DECIMALS};

/// Errors produced by [`parse_units`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    /// The input was empty or only whitespace.
    #[error("empty amount")]
    Empty,

    /// The input contains something other than digits and one decimal point.
    #[error("invalid amount '{0}': expected an unsigned decimal number")]
    InvalidFormat(String),

    /// More fractional digits than the unit can represent.
    #[error("too many decimal places in '{input}': at most {decimals} allowed")]
    TooPrecise {
        /// The offending input.
        input: String,
        /// Maximum fractional digits.
        decimals: u8,
    },

    /// The scaled value does not fit in a `u128`.
    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Parses a decimal string into base units with `decimals` fractional digits.
///
/// ```
/// use luigi_protocol::units::parse_units;
///
/// assert_eq!(parse_units("1000", 18).unwrap(), 1_000 * 10u128.pow(18));
/// assert_eq!(parse_units("0.5", 18).unwrap(), 5 * 10u128.pow(17));
/// assert!(parse_units("-1", 18).is_err());
/// ```
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction)
    {
        return Err(UnitsError::InvalidFormat(s.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: s.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(s.to_string());
    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };

    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128
            .checked_pow((decimals as usize - fraction.len()) as u32)
            .ok_or_else(overflow)?;
        fraction
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(padding)
            .ok_or_else(overflow)?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)
}

/// Formats base units as a decimal string, trimming trailing fractional
/// zeros. Whole amounts print without a decimal point.
///
/// ```
/// use luigi_protocol::units::format_units;
///
/// assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
/// assert_eq!(format_units(2_000_000_000_000_000_000, 18), "2");
/// ```
pub fn format_units(value: u128, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = match 10u128.checked_pow(decimals as u32) {
        Some(scale) => scale,
        None => return value.to_string(),
    };

    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return whole.to_string();
    }

    let padded = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// `parse_units(input, 18)` for token amounts.
pub fn parse_token(input: &str) -> Result<u128, UnitsError> {
    parse_units(input, TOKEN_DECIMALS)
}

/// `parse_units(input, 18)` for native value ("parseEther").
pub fn parse_ether(input: &str) -> Result<u128, UnitsError> {
    parse_units(input, NATIVE_DECIMALS)
}

/// Formats a token amount.
pub fn format_token(value: u128) -> String {
    format_units(value, TOKEN_DECIMALS)
}

/// Formats a native amount ("formatEther").
pub fn format_ether(value: u128) -> String {
    format_units(value, NATIVE_DECIMALS)
}

/// Serde adapter rendering `u128` amounts as decimal strings, so JSON
/// clients that parse numbers as doubles never see a rounded balance.
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(de::Error::custom)
    }
}
