//! Re-exports of everything tests usually need.

pub use crate::{
    bitcoin::{
        generate_block_hash, generate_header, generate_p2wpkh_address, generate_secret_key,
        generate_tss_address_string, generate_tx_result, generate_txid, generate_utxo,
    },
    bitcoin_rpc::MockBitcoinRpc,
    tx::{coinbase_tx, memo_vout, p2wpkh_vin, p2wpkh_vout, raw_tx},
    zetacore::MockZetacore,
};
