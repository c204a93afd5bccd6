//! Canonical hexadecimal addresses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The string held no digits.
    #[error("address '{input}' has no hexadecimal digits")]
    Empty {
        /// Rejected input.
        input: String,
    },

    /// The string contains a character that is not a hexadecimal digit.
    #[error("address '{input}' contains invalid digit '{digit}'")]
    InvalidDigit {
        /// Rejected input.
        input: String,
        /// First offending character.
        digit: char,
    },

    /// The value does not fit in 64 bits.
    #[error("address '{input}' does not fit in 64 bits")]
    Overflow {
        /// Rejected input.
        input: String,
    },
}

/// A numeric address rendered as `0x` plus lowercase hex with no leading
/// zeros.
///
/// Ordering follows the numeric value, which is also the iteration order of
/// the flag index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CanonicalAddress(u64);

impl CanonicalAddress {
    /// Wraps a numeric offset.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Numeric value of the address.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for CanonicalAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:#x}", self.0)
    }
}

impl FromStr for CanonicalAddress {
    type Err = AddressParseError;

    /// Parses hexadecimal text with an optional `0x`/`0X` prefix.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(AddressParseError::Empty {
                input: input.to_owned(),
            });
        }
        if let Some(digit) = digits.chars().find(|ch| !ch.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidDigit {
                input: input.to_owned(),
                digit,
            });
        }

        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| AddressParseError::Overflow {
                input: input.to_owned(),
            })
    }
}

/// Canonicalises a hexadecimal address string.
///
/// `0x00FF` becomes `0xff`; canonical input is returned unchanged.
///
/// # Errors
///
/// Returns [`AddressParseError`] when `input` is not a hexadecimal number
/// that fits in 64 bits.
pub fn canonicalize(input: &str) -> Result<String, AddressParseError> {
    input
        .parse::<CanonicalAddress>()
        .map(|address| address.to_string())
}
