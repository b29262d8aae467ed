//! The withdrawal signer of one bitcoin chain and one TSS key.

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use zeta_btc_observer::BtcObserver;
use zeta_btc_primitives::types::OutboundKey;
use zeta_tss::{pubkey_hex, TssSigner};

use crate::{config::SignerConfig, errors::SignerError};

/// Builds, signs and broadcasts the withdrawals of the TSS.
///
/// The signer reads chain state through the [`BtcObserver`] it shares with the periodic observer
/// tasks, and asks the threshold signer for one batch of signatures per withdrawal.
#[derive(Debug)]
pub struct BtcSigner {
    observer: Arc<BtcObserver>,
    tss: Arc<dyn TssSigner>,
    config: SignerConfig,
    in_flight: Mutex<HashSet<OutboundKey>>,
}

impl BtcSigner {
    /// Creates a signer for the TSS key watched by `observer`.
    pub fn new(
        observer: Arc<BtcObserver>,
        tss: Arc<dyn TssSigner>,
        config: SignerConfig,
    ) -> Result<Self, SignerError> {
        if tss.pubkey() != observer.tss_pubkey() {
            return Err(SignerError::TssKeyMismatch {
                expected: observer.tss_pubkey_hex().to_string(),
                actual: pubkey_hex(&tss.pubkey()),
            });
        }

        Ok(Self {
            observer,
            tss,
            config,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// The observer of the chain this signer pays out on.
    pub fn observer(&self) -> &BtcObserver {
        &self.observer
    }

    pub(crate) fn tss(&self) -> &dyn TssSigner {
        self.tss.as_ref()
    }

    /// The signer configuration.
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Marks `key` as being processed. Returns `false` if it already was.
    pub(crate) fn start_processing(&self, key: OutboundKey) -> bool {
        self.in_flight.lock().insert(key)
    }

    pub(crate) fn end_processing(&self, key: &OutboundKey) {
        self.in_flight.lock().remove(key);
    }

    /// Returns whether a keysign for `key` is running.
    pub fn is_processing(&self, key: &OutboundKey) -> bool {
        self.in_flight.lock().contains(key)
    }
}
