//! A single-key stand-in for the threshold signer.

use async_trait::async_trait;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use tracing::debug;

use crate::{errors::TssError, signer::TssSigner};

/// Signs with one local secret key.
///
/// Only meant for development networks and tests.
#[derive(Debug, Clone)]
pub struct LocalTssSigner {
    sk: SecretKey,
    pubkey: PublicKey,
}

impl LocalTssSigner {
    /// Creates a signer for `sk`.
    pub fn new(sk: SecretKey) -> Self {
        let pubkey = sk.public_key(SECP256K1);
        Self { sk, pubkey }
    }

    fn sign(&self, digest: &[u8; 32]) -> [u8; 65] {
        let msg = Message::from_digest(*digest);
        let (recid, compact) = SECP256K1
            .sign_ecdsa_recoverable(&msg, &self.sk)
            .serialize_compact();

        let mut sig = [0u8; 65];
        sig[..64].copy_from_slice(&compact);
        sig[64] = recid.to_i32() as u8;

        sig
    }
}

#[async_trait]
impl TssSigner for LocalTssSigner {
    fn pubkey(&self) -> PublicKey {
        self.pubkey
    }

    async fn sign_batch(
        &self,
        digests: Vec<[u8; 32]>,
        height: u64,
        nonce: u64,
        chain_id: i64,
    ) -> Result<Vec<[u8; 65]>, TssError> {
        debug!(count = digests.len(), %height, %nonce, %chain_id, "signing batch locally");

        Ok(digests.iter().map(|digest| self.sign(digest)).collect())
    }
}
