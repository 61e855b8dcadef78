//! Mobile phone number type.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Mainland China mobile numbers: 11 digits, `1` then a 3/4/5/7/8 carrier
/// prefix digit.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[34578][0-9]{9}$").expect("phone pattern is a valid regex"));

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input is not an 11 digit mobile number.
    #[error("phone number must be an 11 digit mobile number")]
    InvalidFormat,
}

/// A mobile phone number used for delivery addresses.
///
/// ```
/// use freshmall_core::Phone;
///
/// assert!(Phone::parse("13812345678").is_ok());
/// assert!(Phone::parse("12812345678").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or not a mobile number.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }
        if !PHONE_PATTERN.is_match(s) {
            return Err(PhoneError::InvalidFormat);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for input in ["13012345678", "14712345678", "15912345678", "17712345678", "18612345678"] {
            assert!(Phone::parse(input).is_ok(), "{input} should be accepted");
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        for input in ["1381234567", "138123456789", "12812345678", "19912345678", "1381234567a", "+8613812345678"] {
            assert_eq!(Phone::parse(input), Err(PhoneError::InvalidFormat), "{input}");
        }
    }
}
