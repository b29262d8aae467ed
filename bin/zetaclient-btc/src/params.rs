use serde::{Deserialize, Serialize};
use zeta_btc_params::prelude::{BtcChain, FeeConfig};

/// The consensus-relevant parameters of the observed chain.
///
/// Every observer of the chain must run with the same values, otherwise their votes and the
/// withdrawals they sign will disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Params {
    /// The observed chain.
    pub chain: BtcChain,

    /// The fee model.
    #[serde(default)]
    pub fee: FeeConfig,
}
