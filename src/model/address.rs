use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A principal identifier, as supplied by the external identity source.
///
/// The registry never authenticates principals; it only compares addresses.
/// An address is non-empty and contains no whitespace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

/// The given text is not a usable principal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address: {0:?}")]
pub struct InvalidAddress(pub String);

impl Address {
    /// Validate and wrap an address. Surrounding whitespace is trimmed.
    pub fn new(address: impl Into<String>) -> Result<Self, InvalidAddress> {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(InvalidAddress(address));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(address: String) -> Result<Self, Self::Error> {
        Self::new(address)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl Deref for Address {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
