//! The nonce-mark output that chains withdrawals together.
//!
//! Withdrawal `n` creates, as its first output, a payment to the TSS address worth
//! [`nonce_mark_amount`]`(n)`. Withdrawal `n + 1` must spend that output as its first input, which
//! totally orders withdrawals on the UTXO ledger.

use bitcoin::Amount;
use zeta_btc_params::constants::BTC_DUST_OFFSET;

/// The value of the nonce-mark output created by withdrawal `nonce`.
pub fn nonce_mark_amount(nonce: u64) -> Amount {
    Amount::from_sat(nonce + BTC_DUST_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_mark_amount() {
        assert_eq!(nonce_mark_amount(0), Amount::from_sat(2000));
        assert_eq!(nonce_mark_amount(42), Amount::from_sat(2042));
    }
}
