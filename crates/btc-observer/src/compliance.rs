//! Restricted-address checks on cctxs and deposits.

use tracing::warn;
use zeta_btc_params::prelude::ComplianceConfig;
use zeta_btc_primitives::types::InboundEvent;
use zetacore_client::types::CrossChainTx;

/// Returns whether the sender, origin or receiver of `cctx` is restricted.
pub fn is_cctx_restricted(config: &ComplianceConfig, cctx: &CrossChainTx) -> bool {
    let receiver = cctx
        .current_outbound_params()
        .map(|params| params.receiver.as_str());

    config.contains_restricted(
        [
            cctx.inbound_params.sender.as_str(),
            cctx.inbound_params.tx_origin.as_str(),
        ]
        .into_iter()
        .chain(receiver),
    )
}

/// Returns whether the depositor or the credited address of `event` is restricted, logging it if
/// so.
pub fn is_event_restricted(
    config: &ComplianceConfig,
    event: &InboundEvent,
    receiver: &str,
    chain_id: i64,
) -> bool {
    let restricted = config.contains_restricted([event.from_address.as_str(), receiver]);
    if restricted {
        warn!(
            target: "compliance",
            %chain_id,
            txid = %event.tx_hash,
            sender = %event.from_address,
            %receiver,
            "restricted address detected in inbound"
        );
    }

    restricted
}

#[cfg(test)]
mod tests {
    use zetacore_client::types::OutboundParams;

    use super::*;

    #[test]
    fn test_cctx_restricted_by_any_party() {
        let config = ComplianceConfig::new(["bcrt1qrestricted"]);
        let mut cctx = CrossChainTx::default();
        cctx.outbound_params.push(OutboundParams {
            receiver: "bcrt1qclean".to_string(),
            ..Default::default()
        });

        assert!(!is_cctx_restricted(&config, &cctx));

        cctx.inbound_params.tx_origin = "bcrt1qrestricted".to_string();
        assert!(
            is_cctx_restricted(&config, &cctx),
            "restricted origin must restrict the cctx"
        );

        cctx.inbound_params.tx_origin.clear();
        cctx.outbound_params[0].receiver = "bcrt1qrestricted".to_string();
        assert!(
            is_cctx_restricted(&config, &cctx),
            "restricted receiver must restrict the cctx"
        );
    }
}
