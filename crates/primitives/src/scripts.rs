//! Encoding and decoding of the output scripts the observer and the signer deal with.
//!
//! Each decoder checks the exact length and opcode bytes of the script before deriving an address
//! from it, so that a malformed script is reported as such instead of being read as some other
//! address.

use std::str::FromStr;

use bitcoin::{
    opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160, OP_PUSHBYTES_0},
    opcodes::all::{OP_PUSHBYTES_20, OP_PUSHBYTES_32, OP_PUSHNUM_1},
    Address, AddressType, Amount, Network, Script, ScriptBuf,
};

use crate::{errors::ScriptError, rpc_types::Vout, types::get_satoshis};

const P2TR_LEN: usize = 34;
const P2WSH_LEN: usize = 34;
const P2WPKH_LEN: usize = 22;
const P2SH_LEN: usize = 23;
const P2PKH_LEN: usize = 25;

/// Returns whether `script` is `OP_1 <32 bytes>`.
pub fn is_p2tr(script: &[u8]) -> bool {
    script.len() == P2TR_LEN
        && script[0] == OP_PUSHNUM_1.to_u8()
        && script[1] == OP_PUSHBYTES_32.to_u8()
}

/// Returns whether `script` is `OP_0 <32 bytes>`.
pub fn is_p2wsh(script: &[u8]) -> bool {
    script.len() == P2WSH_LEN
        && script[0] == OP_PUSHBYTES_0.to_u8()
        && script[1] == OP_PUSHBYTES_32.to_u8()
}

/// Returns whether `script` is `OP_0 <20 bytes>`.
pub fn is_p2wpkh(script: &[u8]) -> bool {
    script.len() == P2WPKH_LEN
        && script[0] == OP_PUSHBYTES_0.to_u8()
        && script[1] == OP_PUSHBYTES_20.to_u8()
}

/// Returns whether `script` is `OP_HASH160 <20 bytes> OP_EQUAL`.
pub fn is_p2sh(script: &[u8]) -> bool {
    script.len() == P2SH_LEN
        && script[0] == OP_HASH160.to_u8()
        && script[1] == OP_PUSHBYTES_20.to_u8()
        && script[22] == OP_EQUAL.to_u8()
}

/// Returns whether `script` is `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == P2PKH_LEN
        && script[0] == OP_DUP.to_u8()
        && script[1] == OP_HASH160.to_u8()
        && script[2] == OP_PUSHBYTES_20.to_u8()
        && script[23] == OP_EQUALVERIFY.to_u8()
        && script[24] == OP_CHECKSIG.to_u8()
}

/// Decodes a P2TR script into its address.
pub fn decode_script_p2tr(script_hex: &str, network: Network) -> Result<Address, ScriptError> {
    decode_typed(script_hex, network, "P2TR", P2TR_LEN, is_p2tr)
}

/// Decodes a P2WSH script into its address.
pub fn decode_script_p2wsh(script_hex: &str, network: Network) -> Result<Address, ScriptError> {
    decode_typed(script_hex, network, "P2WSH", P2WSH_LEN, is_p2wsh)
}

/// Decodes a P2WPKH script into its address.
pub fn decode_script_p2wpkh(script_hex: &str, network: Network) -> Result<Address, ScriptError> {
    decode_typed(script_hex, network, "P2WPKH", P2WPKH_LEN, is_p2wpkh)
}

/// Decodes a P2SH script into its address.
pub fn decode_script_p2sh(script_hex: &str, network: Network) -> Result<Address, ScriptError> {
    decode_typed(script_hex, network, "P2SH", P2SH_LEN, is_p2sh)
}

/// Decodes a P2PKH script into its address.
pub fn decode_script_p2pkh(script_hex: &str, network: Network) -> Result<Address, ScriptError> {
    decode_typed(script_hex, network, "P2PKH", P2PKH_LEN, is_p2pkh)
}

fn decode_typed(
    script_hex: &str,
    network: Network,
    kind: &'static str,
    len: usize,
    matches: fn(&[u8]) -> bool,
) -> Result<Address, ScriptError> {
    let script =
        hex::decode(script_hex).map_err(|_| ScriptError::InvalidHex(script_hex.to_string()))?;

    if script.len() != len {
        return Err(ScriptError::InvalidLength {
            kind,
            len: script.len(),
        });
    }
    if !matches(&script) {
        return Err(ScriptError::InvalidTemplate {
            kind,
            script: script_hex.to_string(),
        });
    }

    Address::from_script(Script::from_bytes(&script), network).map_err(|e| ScriptError::Address {
        kind,
        reason: e.to_string(),
    })
}

/// Returns the locking script paying to `address`.
pub fn pay_to_address_script(address: &Address) -> ScriptBuf {
    address.script_pubkey()
}

/// Recovers the address that owns `script`, trying each supported output type.
///
/// Returns `Ok(None)` for any other script type; such senders are skipped rather than failed.
pub fn decode_sender_from_script(
    script: &Script,
    network: Network,
) -> Result<Option<Address>, ScriptError> {
    let bytes = script.as_bytes();
    let script_hex = hex::encode(bytes);

    let address = if is_p2tr(bytes) {
        decode_script_p2tr(&script_hex, network)?
    } else if is_p2wsh(bytes) {
        decode_script_p2wsh(&script_hex, network)?
    } else if is_p2wpkh(bytes) {
        decode_script_p2wpkh(&script_hex, network)?
    } else if is_p2sh(bytes) {
        decode_script_p2sh(&script_hex, network)?
    } else if is_p2pkh(bytes) {
        decode_script_p2pkh(&script_hex, network)?
    } else {
        return Ok(None);
    };

    Ok(Some(address))
}

/// Parses `address` and checks that it belongs to `network` and is of a supported type.
pub fn decode_btc_address(address: &str, network: Network) -> Result<Address, ScriptError> {
    let address = Address::from_str(address)
        .map_err(|e| ScriptError::UnsupportedAddress(format!("{address}: {e}")))?
        .require_network(network)
        .map_err(|e| ScriptError::UnsupportedAddress(format!("{address}: {e}")))?;

    if !is_supported_address(&address) {
        return Err(ScriptError::UnsupportedAddress(address.to_string()));
    }

    Ok(address)
}

/// Returns whether withdrawals can be paid to `address`.
pub fn is_supported_address(address: &Address) -> bool {
    matches!(
        address.address_type(),
        Some(
            AddressType::P2tr
                | AddressType::P2wsh
                | AddressType::P2wpkh
                | AddressType::P2sh
                | AddressType::P2pkh
        )
    )
}

/// Decodes an output of an outbound transaction using the script type of `expected_receiver`.
///
/// Returns the address found in the output and its value.
pub fn decode_tss_vout(
    vout: &Vout,
    expected_receiver: &Address,
    network: Network,
) -> Result<(Address, Amount), ScriptError> {
    let amount = get_satoshis(vout.value)?;
    let script_hex = &vout.script_pub_key.hex;

    let receiver = match expected_receiver.address_type() {
        Some(AddressType::P2tr) => decode_script_p2tr(script_hex, network)?,
        Some(AddressType::P2wsh) => decode_script_p2wsh(script_hex, network)?,
        Some(AddressType::P2wpkh) => decode_script_p2wpkh(script_hex, network)?,
        Some(AddressType::P2sh) => decode_script_p2sh(script_hex, network)?,
        Some(AddressType::P2pkh) => decode_script_p2pkh(script_hex, network)?,
        _ => {
            return Err(ScriptError::UnsupportedAddress(
                expected_receiver.to_string(),
            ))
        }
    };

    Ok((receiver, amount))
}
