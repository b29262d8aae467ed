//! Identification of the bitcoin chain being observed.

use bitcoin::Network;
use serde::{Deserialize, Serialize};

use crate::{constants::REGTEST_BOOTSTRAP_HEIGHT, errors::ParamsError};

/// Chain id of bitcoin mainnet on the consensus chain.
pub const BTC_MAINNET_CHAIN_ID: i64 = 8332;

/// Chain id of bitcoin testnet3 on the consensus chain.
pub const BTC_TESTNET_CHAIN_ID: i64 = 18332;

/// Chain id of bitcoin signet on the consensus chain.
pub const BTC_SIGNET_CHAIN_ID: i64 = 18333;

/// Chain id of bitcoin regtest on the consensus chain.
pub const BTC_REGTEST_CHAIN_ID: i64 = 18444;

/// A bitcoin chain as registered on the consensus chain: the chain id used in votes paired with
/// the [`Network`] used to encode addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcChain {
    chain_id: i64,
    network: Network,
}

impl BtcChain {
    /// Creates a chain from a known chain id.
    pub fn from_chain_id(chain_id: i64) -> Result<Self, ParamsError> {
        let network = match chain_id {
            BTC_MAINNET_CHAIN_ID => Network::Bitcoin,
            BTC_TESTNET_CHAIN_ID => Network::Testnet,
            BTC_SIGNET_CHAIN_ID => Network::Signet,
            BTC_REGTEST_CHAIN_ID => Network::Regtest,
            other => return Err(ParamsError::UnknownChainId(other)),
        };

        Ok(Self { chain_id, network })
    }

    /// Creates a chain from an explicit `(chain_id, network)` pair.
    ///
    /// Fails if `chain_id` is known but registered for another network.
    pub fn new(chain_id: i64, network: Network) -> Result<Self, ParamsError> {
        match Self::from_chain_id(chain_id) {
            Ok(known) if known.network != network => {
                Err(ParamsError::NetworkMismatch { chain_id, network })
            }
            _ => Ok(Self { chain_id, network }),
        }
    }

    /// Bitcoin mainnet.
    pub const fn mainnet() -> Self {
        Self {
            chain_id: BTC_MAINNET_CHAIN_ID,
            network: Network::Bitcoin,
        }
    }

    /// Bitcoin testnet3.
    pub const fn testnet() -> Self {
        Self {
            chain_id: BTC_TESTNET_CHAIN_ID,
            network: Network::Testnet,
        }
    }

    /// Bitcoin regtest.
    pub const fn regtest() -> Self {
        Self {
            chain_id: BTC_REGTEST_CHAIN_ID,
            network: Network::Regtest,
        }
    }

    /// Returns the chain id.
    pub const fn chain_id(&self) -> i64 {
        self.chain_id
    }

    /// Returns the network.
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Returns whether this is bitcoin mainnet.
    pub fn is_mainnet(&self) -> bool {
        self.network == Network::Bitcoin
    }

    /// Returns whether this is a regtest-like network where fees are meaningless.
    pub fn is_regtest(&self) -> bool {
        self.network == Network::Regtest
    }

    /// Returns whether this is a public test network.
    pub fn is_testnet(&self) -> bool {
        !self.is_mainnet() && !self.is_regtest()
    }

    /// Number of blocks between two subsidy halvings.
    pub fn subsidy_halving_interval(&self) -> u64 {
        if self.is_regtest() {
            150
        } else {
            210_000
        }
    }

    /// The height at which scanning is forced to start on known test networks.
    pub fn bootstrap_scan_height(&self) -> Option<u64> {
        self.is_regtest().then_some(REGTEST_BOOTSTRAP_HEIGHT)
    }

    /// Human readable name used in logs.
    pub fn name(&self) -> &'static str {
        match self.chain_id {
            BTC_MAINNET_CHAIN_ID => "btc_mainnet",
            BTC_TESTNET_CHAIN_ID => "btc_testnet",
            BTC_SIGNET_CHAIN_ID => "btc_signet",
            BTC_REGTEST_CHAIN_ID => "btc_regtest",
            _ => "btc_custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chain_id() {
        assert_eq!(
            BtcChain::from_chain_id(BTC_REGTEST_CHAIN_ID),
            Ok(BtcChain::regtest())
        );
        assert_eq!(
            BtcChain::from_chain_id(1),
            Err(ParamsError::UnknownChainId(1)),
            "must reject unknown chain ids"
        );
    }

    #[test]
    fn test_network_mismatch() {
        assert!(
            BtcChain::new(BTC_MAINNET_CHAIN_ID, Network::Regtest).is_err(),
            "must reject known chain id paired with another network"
        );
        assert!(
            BtcChain::new(99999, Network::Regtest).is_ok(),
            "must accept custom chain ids"
        );
    }

    #[test]
    fn test_bootstrap_height() {
        assert_eq!(BtcChain::regtest().bootstrap_scan_height(), Some(100));
        assert_eq!(BtcChain::mainnet().bootstrap_scan_height(), None);
        assert_eq!(BtcChain::regtest().subsidy_halving_interval(), 150);
        assert_eq!(BtcChain::testnet().subsidy_halving_interval(), 210_000);
    }

    #[test]
    fn test_serde_toml() {
        let chain = r#"
            chain_id = 18444
            network = "regtest"
        "#;

        let chain = toml::from_str::<BtcChain>(chain).expect("must deserialize chain");
        assert_eq!(chain, BtcChain::regtest());
    }
}
