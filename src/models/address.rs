//! Ledger address value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account identifier, always stored trimmed and lowercased so that
/// checksummed and plain forms of the same address compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(raw: &str) -> Self {
        Address(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x` followed by exactly 40 hex digits
    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix("0x") {
            Some(digits) => digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Address::new(&raw)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Address::new(raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
