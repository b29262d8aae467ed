//! The signing interface.

use std::fmt;

use async_trait::async_trait;
use bitcoin::{Address, CompressedPublicKey, Network};
use secp256k1::{ecdsa::Signature, PublicKey};

use crate::errors::TssError;

/// Signs batches of 32-byte digests with the TSS key.
///
/// Each signature is 65 bytes: `r || s || recovery id`. Signatures come back in the order the
/// digests were given.
#[async_trait]
pub trait TssSigner: fmt::Debug + Send + Sync + 'static {
    /// The TSS public key.
    fn pubkey(&self) -> PublicKey;

    /// Signs all `digests` in one ceremony, tagged with the consensus `height`, the outbound
    /// `nonce` and the destination `chain_id`.
    async fn sign_batch(
        &self,
        digests: Vec<[u8; 32]>,
        height: u64,
        nonce: u64,
        chain_id: i64,
    ) -> Result<Vec<[u8; 65]>, TssError>;
}

/// The P2WPKH address of `pubkey` on `network`.
pub fn p2wpkh_address(pubkey: &PublicKey, network: Network) -> Address {
    Address::p2wpkh(&CompressedPublicKey(*pubkey), network)
}

/// Hex encoding of the compressed serialization of `pubkey`.
pub fn pubkey_hex(pubkey: &PublicKey) -> String {
    hex::encode(pubkey.serialize())
}

/// Converts a 65-byte TSS signature into a low-S ECDSA signature.
pub fn to_ecdsa_signature(sig: &[u8; 65]) -> Result<Signature, TssError> {
    let mut signature = Signature::from_compact(&sig[..64])
        .map_err(|e| TssError::MalformedSignature(e.to_string()))?;
    signature.normalize_s();

    Ok(signature)
}
