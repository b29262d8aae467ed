//! Decoding of the OP_RETURN memo carried by deposits.

use bitcoin::opcodes::all::OP_RETURN;
use zeta_btc_params::constants::DONATION_MESSAGE;

use crate::errors::MemoError;

/// Decodes the memo pushed by an OP_RETURN output.
///
/// Returns `Ok(None)` if `script_hex` is not an OP_RETURN script. The script must consist of
/// `OP_RETURN`, a single-byte push length and exactly that many bytes. The donation message is
/// rejected with [`MemoError::Donation`].
pub fn decode_op_return_memo(script_hex: &str) -> Result<Option<Vec<u8>>, MemoError> {
    let op_return = format!("{:02x}", OP_RETURN.to_u8());
    if script_hex.len() < 4 || !script_hex.is_char_boundary(4) || !script_hex.starts_with(&op_return)
    {
        return Ok(None);
    }

    let declared = usize::from_str_radix(&script_hex[2..4], 16)
        .map_err(|_| MemoError::InvalidSize(script_hex.to_string()))?;
    let actual = (script_hex.len() - 4) / 2;
    if declared != actual {
        return Err(MemoError::SizeMismatch { declared, actual });
    }

    let memo =
        hex::decode(&script_hex[4..]).map_err(|_| MemoError::InvalidHex(script_hex.to_string()))?;
    if memo == DONATION_MESSAGE.as_bytes() {
        return Err(MemoError::Donation);
    }

    Ok(Some(memo))
}
