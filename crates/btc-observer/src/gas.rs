//! Reporting of the network fee rate to the consensus chain.

use tracing::info;
use zeta_btc_primitives::fee::calc_block_avg_fee_rate;
use zetacore_client::types::MsgVoteGasPrice;

use crate::{errors::ObserverError, observer::BtcObserver};

/// Fee rate reported on regtest, where the node cannot estimate fees.
const REGTEST_FEE_RATE: u64 = 1;

/// Gas supply reported alongside the fee rate.
const GAS_SUPPLY: &str = "100";

impl BtcObserver {
    /// Returns the highest average fee rate of the most recent blocks, in sat/vB.
    ///
    /// Falls back to the default testnet rate when recent blocks paid nothing.
    pub async fn get_recent_fee_rate(&self) -> Result<u64, ObserverError> {
        let tip = self.rpc().get_block_count().await?;
        if tip < 0 {
            return Err(ObserverError::NegativeBlockCount(tip));
        }
        let tip = tip as u64;

        let mut highest = 0;
        for back in 0..self.fee_config().fee_rate_count_back_blocks.min(tip + 1) {
            let hash = self.rpc().get_block_hash(tip - back).await?;
            let block = self.rpc().get_block_verbose_tx(hash).await?;
            highest = highest.max(calc_block_avg_fee_rate(&block, self.chain())?);
        }

        if highest == 0 {
            return Ok(self.fee_config().default_testnet_fee_rate);
        }

        Ok(highest)
    }

    /// Estimates the fee rate to confirm within one block, in sat/vB.
    pub async fn estimate_fee_rate(&self) -> Result<u64, ObserverError> {
        if self.chain().is_regtest() {
            return Ok(REGTEST_FEE_RATE);
        }
        if !self.chain().is_mainnet() {
            return self.get_recent_fee_rate().await;
        }

        match self.rpc().estimate_smart_fee(1).await? {
            0 => Err(ObserverError::InvalidData("no fee estimate".to_string())),
            rate => Ok(rate),
        }
    }

    /// Posts the current fee rate along with the tip height.
    pub async fn post_gas_price(&self) -> Result<(), ObserverError> {
        let price = self.estimate_fee_rate().await?;

        let tip = self.rpc().get_block_count().await?;
        if tip < 0 {
            return Err(ObserverError::NegativeBlockCount(tip));
        }

        let msg = MsgVoteGasPrice {
            chain_id: self.chain_id(),
            price,
            supply: GAS_SUPPLY.to_string(),
            block_number: tip as u64,
        };
        let zeta_tx_hash = self.zetacore().post_gas_price(msg).await?;
        info!(%price, block_number = %tip, %zeta_tx_hash, "posted gas price");

        Ok(())
    }
}
