//! # pgvr-quantity
//!
//! Resource quantity parsing for volume sizes.
//!
//! Quantities are the human-readable size strings found in cluster manifests
//! and volume records, e.g. `10Gi`, `500M`, `1.5Ti` or `12e9`.
//!
//! ## Normalisation
//!
//! - A quantity is resolved to a whole number of bytes, rounding fractional
//!   bytes up (`0.5` is one byte).
//! - Size comparisons happen in whole gigabytes of 2^30 bytes. Fractional
//!   gigabytes are truncated, so `1536Mi` and `1Gi` both compare as `1`.
//! - The original text is kept so the quantity can be written back verbatim.

mod error;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

pub use error::QuantityError;

/// Number of bytes in one gigabyte as used for size comparisons.
pub const GIGABYTE: u128 = 1 << 30;

/// A parsed, non-negative resource quantity.
///
/// Equality and ordering compare the resolved byte value, not the text:
/// `1Gi == 1024Mi`.
#[derive(Debug, Clone)]
pub struct Quantity {
    bytes: u128,
    text: String,
}

/// How a suffix scales the numeric part.
#[derive(Debug, Clone, Copy)]
enum Multiplier {
    /// Multiply by `2^shift`.
    Binary(u32),
    /// Multiply by `10^exponent`.
    Decimal(i32),
}

impl Quantity {
    /// Parses a quantity string.
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let bytes = parse_bytes(s)?;
        Ok(Self {
            bytes,
            text: s.to_string(),
        })
    }

    /// Creates a quantity of `gigabytes` GiB, rendered as `<n>Gi`.
    #[must_use]
    pub fn from_gigabytes(gigabytes: u64) -> Self {
        Self {
            bytes: u128::from(gigabytes) * GIGABYTE,
            text: format!("{gigabytes}Gi"),
        }
    }

    /// Returns the value in bytes, rounded up to a whole byte.
    #[must_use]
    pub fn bytes(&self) -> u128 {
        self.bytes
    }

    /// Returns the value in whole gigabytes, truncating any fraction.
    #[must_use]
    pub fn to_gigabytes(&self) -> u64 {
        u64::try_from(self.bytes / GIGABYTE).unwrap_or(u64::MAX)
    }

    /// Returns the text this quantity was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn parse_bytes(input: &str) -> Result<u128, QuantityError> {
    if input.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (negative, rest) = if let Some(rest) = input.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = input.strip_prefix('+') {
        (false, rest)
    } else {
        (false, input)
    };

    let number_len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(number_len);

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(QuantityError::InvalidNumber(input.to_string()));
    }
    let fraction = fraction.trim_end_matches('0');

    let overflow = || QuantityError::Overflow(input.to_string());

    let mut mantissa: u128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(u128::from(digit - b'0')))
            .ok_or_else(overflow)?;
    }
    let scale = u32::try_from(fraction.len()).map_err(|_| overflow())?;

    let bytes = match parse_suffix(input, suffix)? {
        Multiplier::Binary(shift) => {
            let numerator = mantissa.checked_mul(1u128 << shift).ok_or_else(overflow)?;
            ceil_div_pow10(numerator, scale)
        }
        Multiplier::Decimal(exponent) => {
            let effective = i64::from(exponent) - i64::from(scale);
            if effective >= 0 {
                let power = u32::try_from(effective).map_err(|_| overflow())?;
                10u128
                    .checked_pow(power)
                    .and_then(|p| mantissa.checked_mul(p))
                    .ok_or_else(overflow)?
            } else {
                let power = u32::try_from(-effective).map_err(|_| overflow())?;
                ceil_div_pow10(mantissa, power)
            }
        }
    };

    if negative && bytes != 0 {
        return Err(QuantityError::Negative(input.to_string()));
    }

    Ok(bytes)
}

fn parse_suffix(input: &str, suffix: &str) -> Result<Multiplier, QuantityError> {
    let multiplier = match suffix {
        "" => Multiplier::Decimal(0),
        "Ki" => Multiplier::Binary(10),
        "Mi" => Multiplier::Binary(20),
        "Gi" => Multiplier::Binary(30),
        "Ti" => Multiplier::Binary(40),
        "Pi" => Multiplier::Binary(50),
        "Ei" => Multiplier::Binary(60),
        "n" => Multiplier::Decimal(-9),
        "u" => Multiplier::Decimal(-6),
        "m" => Multiplier::Decimal(-3),
        "k" => Multiplier::Decimal(3),
        "M" => Multiplier::Decimal(6),
        "G" => Multiplier::Decimal(9),
        "T" => Multiplier::Decimal(12),
        "P" => Multiplier::Decimal(15),
        "E" => Multiplier::Decimal(18),
        other => {
            let exponent = other
                .strip_prefix(['e', 'E'])
                .and_then(|exp| exp.parse::<i32>().ok())
                .ok_or_else(|| QuantityError::UnknownSuffix {
                    input: input.to_string(),
                    suffix: other.to_string(),
                })?;
            Multiplier::Decimal(exponent)
        }
    };
    Ok(multiplier)
}

/// Divides by `10^power`, rounding up.
fn ceil_div_pow10(value: u128, power: u32) -> u128 {
    match 10u128.checked_pow(power) {
        Some(divisor) => value / divisor + u128::from(value % divisor != 0),
        // Any non-zero value divided by more than u128::MAX rounds up to one.
        None => u128::from(value != 0),
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> serde::Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
