//! Shared types and OpenAPI schemas.
//!
//! Most domain types live in their own modules (medium, strategy, presence,
//! credentials). This module holds small value types used across them.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

static MAC_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("MAC address regex is valid")
});

/// Returns `true` if `address` is a colon-separated 48-bit MAC address.
#[must_use]
pub fn is_valid_mac_address(address: &str) -> bool {
    MAC_ADDRESS_RE.is_match(address)
}

/// Error returned for malformed MAC addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid MAC address: '{0}'. Expected format XX:XX:XX:XX:XX:XX.")]
pub struct InvalidMacAddress(pub String);

/// A Bluetooth MAC address, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "AA:BB:CC:DD:EE:FF")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parses and normalizes a MAC address.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMacAddress`] if `address` is not `XX:XX:XX:XX:XX:XX`.
    pub fn parse(address: &str) -> Result<Self, InvalidMacAddress> {
        let trimmed = address.trim();
        if is_valid_mac_address(trimmed) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidMacAddress(address.to_string()))
        }
    }

    /// The address as `XX:XX:XX:XX:XX:XX`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = InvalidMacAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = InvalidMacAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(address: MacAddress) -> Self {
        address.0
    }
}
