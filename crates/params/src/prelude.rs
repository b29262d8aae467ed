//! Re-exports of the most commonly used types in this crate.

pub use crate::{
    chain::BtcChain,
    chain_params::{ChainParams, CrosschainFlags},
    compliance::ComplianceConfig,
    errors::ParamsError,
    fee::FeeConfig,
};
