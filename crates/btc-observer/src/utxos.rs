//! Refresh of the TSS's spendable outputs.

use tracing::{debug, warn};
use zeta_btc_primitives::types::Utxo;

use crate::{errors::ObserverError, observer::BtcObserver};

impl BtcObserver {
    /// Replaces the UTXO set with what the node lists for the TSS address.
    ///
    /// Outputs worth less than the default depositor fee are dropped, as are unconfirmed outputs
    /// not created by a transaction of the TSS. The set is sorted by amount, then txid, then vout.
    pub async fn fetch_utxos(&self) -> Result<(), ObserverError> {
        if let Err(err) = self.refresh_pending_nonce().await {
            warn!(%err, "could not refresh pending nonce");
        }

        let tip = self.rpc().get_block_count().await?;
        if tip < 0 {
            return Err(ObserverError::NegativeBlockCount(tip));
        }

        let listed = self
            .rpc()
            .list_unspent(0, tip as u64, vec![self.tss_address().to_string()])
            .await?;

        let mut utxos = listed
            .into_iter()
            .map(Utxo::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        utxos.sort_by(|a, b| {
            a.amount
                .cmp(&b.amount)
                .then_with(|| a.txid.cmp(&b.txid))
                .then_with(|| a.vout.cmp(&b.vout))
        });

        let min_amount = self.fee_config().default_depositor_fee();
        let mut spendable = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            if utxo.amount < min_amount {
                continue;
            }
            if utxo.confirmations == 0 && !self.state().is_tss_transaction(utxo.txid).await? {
                continue;
            }
            spendable.push(utxo);
        }

        debug!(count = spendable.len(), "refreshed tss utxos");
        self.state().set_utxos(spendable).await?;

        Ok(())
    }
}
