//! Builders for verbose transactions as the node returns them.

use bitcoin::{Address, Amount, Txid};
use zeta_btc_primitives::rpc_types::{ScriptPubKeyResult, TxRawResult, Vin, Vout};

/// An output paying `sats` to the P2WPKH `address`.
pub fn p2wpkh_vout(n: u32, address: &Address, sats: u64) -> Vout {
    let script = address.script_pubkey();

    Vout {
        value: Amount::from_sat(sats).to_btc(),
        n,
        script_pub_key: ScriptPubKeyResult {
            asm: script.to_asm_string(),
            hex: hex::encode(script.as_bytes()),
            kind: "witness_v0_keyhash".to_string(),
            address: Some(address.to_string()),
        },
    }
}

/// An OP_RETURN output carrying `memo` with a single direct push.
pub fn memo_vout(n: u32, memo: &[u8]) -> Vout {
    let mut script = vec![0x6a, memo.len() as u8];
    script.extend_from_slice(memo);

    Vout {
        value: 0.0,
        n,
        script_pub_key: ScriptPubKeyResult {
            hex: hex::encode(script),
            kind: "nulldata".to_string(),
            ..Default::default()
        },
    }
}

/// An input spending `txid:vout` with the given hex-encoded witness.
pub fn p2wpkh_vin(txid: Txid, vout: u32, witness: Vec<String>) -> Vin {
    Vin {
        txid: Some(txid),
        vout: Some(vout),
        txinwitness: Some(witness),
        sequence: u32::MAX,
        ..Default::default()
    }
}

/// A verbose transaction.
pub fn raw_tx(txid: Txid, vin: Vec<Vin>, vout: Vec<Vout>) -> TxRawResult {
    TxRawResult {
        txid,
        vin,
        vout,
        ..Default::default()
    }
}

/// A coinbase transaction with a single empty output.
pub fn coinbase_tx(txid: Txid) -> TxRawResult {
    let vin = Vin {
        coinbase: Some("03a0bb0d".to_string()),
        sequence: u32::MAX,
        ..Default::default()
    };

    raw_tx(txid, vec![vin], vec![])
}
