//! Compliance configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// The list of addresses that must never be paid nor credited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Restricted addresses, bitcoin or EVM.
    #[serde(default, deserialize_with = "deserialize_addresses")]
    restricted_addresses: BTreeSet<String>,
}

impl ComplianceConfig {
    /// Creates a config from a list of restricted addresses.
    pub fn new<S: AsRef<str>>(restricted: impl IntoIterator<Item = S>) -> Self {
        Self {
            restricted_addresses: restricted
                .into_iter()
                .map(|addr| normalize(addr.as_ref()))
                .collect(),
        }
    }

    /// Returns whether `address` is restricted.
    pub fn is_restricted(&self, address: &str) -> bool {
        !address.is_empty() && self.restricted_addresses.contains(&normalize(address))
    }

    /// Returns whether any of `addresses` is restricted.
    pub fn contains_restricted<'a>(&self, addresses: impl IntoIterator<Item = &'a str>) -> bool {
        addresses.into_iter().any(|addr| self.is_restricted(addr))
    }

    /// Number of restricted addresses.
    pub fn len(&self) -> usize {
        self.restricted_addresses.len()
    }

    /// Returns whether no address is restricted.
    pub fn is_empty(&self) -> bool {
        self.restricted_addresses.is_empty()
    }
}

// EVM addresses are case-insensitive hex; base58 addresses are not.
fn normalize(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("0x") || address.starts_with("0X") {
        address.to_lowercase()
    } else {
        address.to_string()
    }
}

fn deserialize_addresses<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let addresses = Vec::<String>::deserialize(deserializer)?;

    Ok(addresses.iter().map(|addr| normalize(addr)).collect())
}
