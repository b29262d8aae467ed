//! Domain types shared by the observer, the signer and the persistence layer.

use std::{fmt, str::FromStr};

use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};

use crate::{errors::AmountError, rpc_types::ListUnspentResult};

/// Maximum amount of BTC that can ever exist.
const MAX_BTC: f64 = 21_000_000.0;

/// Converts a BTC value as returned by the node into satoshis, rounding to the nearest satoshi.
pub fn get_satoshis(btc: f64) -> Result<Amount, AmountError> {
    if !btc.is_finite() {
        return Err(AmountError::NotFinite);
    }
    if btc > MAX_BTC {
        return Err(AmountError::TooLarge);
    }
    if btc < 0.0 {
        return Err(AmountError::Negative);
    }

    Ok(Amount::from_sat((btc * Amount::ONE_BTC.to_sat() as f64).round() as u64))
}

/// A deposit to the TSS address found while scanning a block.
///
/// Produced once per qualifying transaction and consumed once by the voting step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// The depositor, recovered from the previous output of the first input.
    pub from_address: String,

    /// The TSS address.
    pub to_address: String,

    /// The credited value: the deposit minus the depositor fee.
    pub value: Amount,

    /// The raw memo carried by the OP_RETURN output.
    pub memo_bytes: Vec<u8>,

    /// The height of the block containing the deposit.
    pub block_number: u64,

    /// The deposit transaction.
    pub tx_hash: Txid,
}

/// A spendable output held by the TSS address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// The transaction that created the output.
    pub txid: Txid,

    /// The index of the output.
    pub vout: u32,

    /// The address holding the output.
    pub address: String,

    /// The value of the output.
    pub amount: Amount,

    /// Number of confirmations when last listed.
    pub confirmations: i64,

    /// The locking script.
    pub script_pub_key: ScriptBuf,
}

impl Utxo {
    /// The outpoint identifying this output.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }
}

impl TryFrom<ListUnspentResult> for Utxo {
    type Error = crate::errors::ScriptError;

    fn try_from(value: ListUnspentResult) -> Result<Self, Self::Error> {
        let script = hex::decode(&value.script_pub_key)
            .map_err(|_| crate::errors::ScriptError::InvalidHex(value.script_pub_key.clone()))?;

        Ok(Self {
            txid: value.txid,
            vout: value.vout,
            address: value.address,
            amount: get_satoshis(value.amount)?,
            confirmations: value.confirmations,
            script_pub_key: ScriptBuf::from_bytes(script),
        })
    }
}

/// Identifies an outbound: the chain, the TSS address that signs it and its nonce.
///
/// The string form `{chain_id}-{tss_address}-{nonce}` is used as the persistence key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutboundKey {
    /// The chain id.
    pub chain_id: i64,

    /// The TSS address.
    pub tss_address: String,

    /// The outbound nonce.
    pub nonce: u64,
}

impl OutboundKey {
    /// Creates a new key.
    pub fn new(chain_id: i64, tss_address: impl Into<String>, nonce: u64) -> Self {
        Self {
            chain_id,
            tss_address: tss_address.into(),
            nonce,
        }
    }
}

impl fmt::Display for OutboundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.chain_id, self.tss_address, self.nonce)
    }
}

/// Error returned when an outbound id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed outbound id: {0}")]
pub struct ParseOutboundKeyError(String);

impl FromStr for OutboundKey {
    type Err = ParseOutboundKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseOutboundKeyError(s.to_string());

        let (chain_id, rest) = s.split_once('-').ok_or_else(err)?;
        let (tss_address, nonce) = rest.rsplit_once('-').ok_or_else(err)?;
        if tss_address.is_empty() {
            return Err(err());
        }

        Ok(Self {
            chain_id: chain_id.parse().map_err(|_| err())?,
            tss_address: tss_address.to_string(),
            nonce: nonce.parse().map_err(|_| err())?,
        })
    }
}
