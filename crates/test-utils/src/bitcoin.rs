//! Module to generate arbitrary values for testing.

use bitcoin::{
    block::{Header, Version},
    hashes::Hash,
    key::rand::{rngs::OsRng, Rng},
    secp256k1::{Secp256k1, SecretKey},
    Address, Amount, BlockHash, CompactTarget, CompressedPublicKey, Network, TxMerkleNode, Txid,
};
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::Utxo};

/// Generates a random transaction ID.
pub fn generate_txid() -> Txid {
    let mut txid = [0u8; 32];
    OsRng.fill(&mut txid);

    Txid::from_byte_array(txid)
}

/// Generates a random block hash.
pub fn generate_block_hash() -> BlockHash {
    let mut hash = [0u8; 32];
    OsRng.fill(&mut hash);

    BlockHash::from_byte_array(hash)
}

/// Generates a random secret key.
pub fn generate_secret_key() -> SecretKey {
    SecretKey::new(&mut OsRng)
}

/// Generates a random P2WPKH address on `network`.
pub fn generate_p2wpkh_address(network: Network) -> Address {
    let pubkey = generate_secret_key().public_key(&Secp256k1::signing_only());

    Address::p2wpkh(&CompressedPublicKey(pubkey), network)
}

/// Generates a random regtest P2WPKH address, formatted.
pub fn generate_tss_address_string() -> String {
    generate_p2wpkh_address(Network::Regtest).to_string()
}

/// Generates a `gettransaction` result for `txid` with the given number of confirmations.
///
/// Mined results (`confirmations > 0`) carry a random block hash at block index 1.
pub fn generate_tx_result(txid: Txid, confirmations: i64) -> GetTransactionResult {
    let mined = confirmations > 0;

    GetTransactionResult {
        confirmations,
        txid,
        blockhash: mined.then(generate_block_hash),
        blockindex: mined.then_some(1),
        ..Default::default()
    }
}

/// Generates a confirmed output of `sats` held by `address`.
pub fn generate_utxo(address: &Address, sats: u64) -> Utxo {
    Utxo {
        txid: generate_txid(),
        vout: 0,
        address: address.to_string(),
        amount: Amount::from_sat(sats),
        confirmations: 1,
        script_pub_key: address.script_pubkey(),
    }
}

/// Generates a header building on `prev` with the given timestamp.
pub fn generate_header(prev: BlockHash, time: u32) -> Header {
    let mut merkle_root = [0u8; 32];
    OsRng.fill(&mut merkle_root);

    Header {
        version: Version::TWO,
        prev_blockhash: prev,
        merkle_root: TxMerkleNode::from_byte_array(merkle_root),
        time,
        bits: CompactTarget::from_consensus(0x207f_ffff),
        nonce: OsRng.gen(),
    }
}
