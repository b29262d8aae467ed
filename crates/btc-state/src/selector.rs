//! Chooses the inputs of a withdrawal.

use bitcoin::{Amount, Txid};
use tracing::{debug, info};
use zeta_btc_primitives::{nonce::nonce_mark_amount, types::Utxo};

use crate::errors::SelectionError;

/// What to select inputs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    /// The amount the inputs must cover.
    pub amount: Amount,

    /// Input budget shared by the payment window and consolidation.
    ///
    /// The nonce-mark input does not count against it.
    pub max_inputs: usize,

    /// The nonce of the withdrawal being built.
    pub nonce: u64,

    /// Outputs ranked below this (by value, among the unselected ones) are consolidated.
    pub consolidation_rank: usize,

    /// The transaction of withdrawal `nonce - 1`. Required when `nonce > 0`.
    pub prev_txid: Option<Txid>,

    /// The TSS address holding the nonce-mark.
    pub tss_address: String,
}

/// The chosen inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The inputs, nonce-mark first when there is one.
    pub utxos: Vec<Utxo>,

    /// Sum of all inputs.
    pub total: Amount,

    /// Number of inputs added only to consolidate small outputs.
    pub consolidated_count: usize,

    /// Value of the consolidated inputs.
    pub consolidated_value: Amount,
}

fn find_nonce_mark(utxos: &[Utxo], nonce: u64, txid: Txid, tss_address: &str) -> Option<usize> {
    let amount = nonce_mark_amount(nonce);

    utxos.iter().position(|utxo| {
        utxo.address == tss_address && utxo.amount == amount && utxo.txid == txid && utxo.vout == 0
    })
}

/// Selects inputs from `utxos` to pay `request.amount`.
///
/// `utxos` must be sorted by ascending amount. The smallest outputs are taken first through a
/// window of at most `max_inputs` entries that slides towards bigger outputs until the amount is
/// covered. For `nonce > 0` the nonce-mark of the previous withdrawal always becomes the first
/// input. Whatever input budget the window left unused is then spent on consolidating the
/// unselected outputs, biggest first, skipping the top `consolidation_rank - 1` of them.
pub fn select_utxos(utxos: &[Utxo], request: &SelectionRequest) -> Result<Selection, SelectionError> {
    let nonce_mark_idx = if request.nonce == 0 {
        None
    } else {
        let prev_nonce = request.nonce - 1;
        let idx = request
            .prev_txid
            .and_then(|txid| find_nonce_mark(utxos, prev_nonce, txid, &request.tss_address))
            .ok_or(SelectionError::NonceMarkNotFound { nonce: prev_nonce })?;

        debug!(nonce = %prev_nonce, txid = %utxos[idx].txid, "found nonce-mark utxo");
        Some(idx)
    };

    let mut budget = request.max_inputs;
    let mut total = Amount::ZERO;
    let (mut left, mut right) = (0, 0);
    while total < request.amount && right < utxos.len() {
        if budget > 0 {
            total += utxos[right].amount;
            right += 1;
            budget -= 1;
        } else {
            total = total - utxos[left].amount + utxos[right].amount;
            left += 1;
            right += 1;
        }
    }

    let mut selected = utxos[left..right].to_vec();
    if let Some(idx) = nonce_mark_idx {
        if idx < left || idx >= right {
            total += utxos[idx].amount;
            selected.insert(0, utxos[idx].clone());
        } else {
            let nonce_mark = selected.remove(idx - left);
            selected.insert(0, nonce_mark);
        }
    }

    if total < request.amount {
        return Err(SelectionError::InsufficientFunds {
            available: total,
            requested: request.amount,
        });
    }

    let mut rank = 0;
    let mut consolidated_count = 0;
    let mut consolidated_value = Amount::ZERO;
    for idx in (0..utxos.len()).rev() {
        if budget == 0 {
            break;
        }
        if Some(idx) == nonce_mark_idx || (left..right).contains(&idx) {
            continue;
        }

        rank += 1;
        if rank >= request.consolidation_rank {
            budget -= 1;
            consolidated_count += 1;
            consolidated_value += utxos[idx].amount;
            total += utxos[idx].amount;
            selected.push(utxos[idx].clone());
        }
    }

    if consolidated_count > 0 {
        info!(
            nonce = %request.nonce,
            count = %consolidated_count,
            value = %consolidated_value,
            "consolidating utxos"
        );
    }

    Ok(Selection {
        utxos: selected,
        total,
        consolidated_count,
        consolidated_value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use bitcoin::{hashes::Hash, ScriptBuf};
    use proptest::prelude::*;
    use zeta_btc_test_utils::prelude::*;

    use super::*;

    const AMOUNTS: [u64; 10] = [
        1_000_000,
        12_000_000,
        18_000_000,
        24_000_000,
        50_000_000,
        126_000_000,
        297_000_000,
        328_000_000,
        516_000_000,
        872_000_000,
    ];

    fn utxo(address: &str, txid: Txid, vout: u32, sats: u64) -> Utxo {
        Utxo {
            txid,
            vout,
            address: address.to_string(),
            amount: Amount::from_sat(sats),
            confirmations: 1,
            script_pub_key: ScriptBuf::new(),
        }
    }

    /// The reference reserve, plus the nonce-mark of `mark_nonce` created by `prev_txid`.
    fn reserve(tss: &str, mark: Option<(u64, Txid)>) -> Vec<Utxo> {
        let mut utxos: Vec<Utxo> = AMOUNTS
            .iter()
            .map(|sats| utxo(tss, generate_txid(), 1, *sats))
            .collect();
        if let Some((nonce, txid)) = mark {
            utxos.push(utxo(tss, txid, 0, nonce_mark_amount(nonce).to_sat()));
        }
        utxos.sort_by_key(|utxo| utxo.amount);

        utxos
    }

    fn request(sats: u64, max_inputs: usize, nonce: u64, rank: usize, prev: Option<Txid>, tss: &str) -> SelectionRequest {
        SelectionRequest {
            amount: Amount::from_sat(sats),
            max_inputs,
            nonce,
            consolidation_rank: rank,
            prev_txid: prev,
            tss_address: tss.to_string(),
        }
    }

    #[test]
    fn test_bootstrap_takes_smallest() {
        let tss = generate_tss_address_string();
        let utxos = reserve(&tss, None);

        let selection = select_utxos(&utxos, &request(1_000_000, 5, 0, usize::MAX, None, &tss))
            .expect("must select for nonce 0");

        assert_eq!(selection.utxos, utxos[0..1]);
        assert_eq!(selection.total, Amount::from_sat(1_000_000));
        assert_eq!(selection.consolidated_count, 0);
    }

    #[test]
    fn test_missing_nonce_mark() {
        let tss = generate_tss_address_string();
        let utxos = reserve(&tss, None);

        assert_eq!(
            select_utxos(&utxos, &request(50_000_000, 5, 1, usize::MAX, Some(generate_txid()), &tss)),
            Err(SelectionError::NonceMarkNotFound { nonce: 0 })
        );
        assert_eq!(
            select_utxos(&utxos, &request(50_000_000, 5, 1, usize::MAX, None, &tss)),
            Err(SelectionError::NonceMarkNotFound { nonce: 0 }),
            "a missing previous txid must fail the same way"
        );
    }

    #[test]
    fn test_nonce_mark_not_counted_in_budget() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((1, prev)));

        let selection = select_utxos(&utxos, &request(100_000_000, 5, 2, usize::MAX, Some(prev), &tss))
            .expect("must select");

        assert_eq!(selection.utxos, utxos[0..6], "window of 5 must follow the nonce-mark");
        assert_eq!(selection.total, Amount::from_sat(105_002_001));
    }

    #[test]
    fn test_nonce_mark_left_of_window() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((2, prev)));

        let selection = select_utxos(&utxos, &request(805_000_000, 5, 3, usize::MAX, Some(prev), &tss))
            .expect("must select");

        let mut expected = vec![utxos[0].clone()];
        expected.extend_from_slice(&utxos[4..9]);
        assert_eq!(selection.utxos, expected);
        assert_eq!(selection.total, Amount::from_sat(825_002_002));
    }

    #[test]
    fn test_nonce_mark_right_of_window() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((24_105_431, prev)));

        let selection = select_utxos(&utxos, &request(50_300_000, 5, 24_105_432, usize::MAX, Some(prev), &tss))
            .expect("must select");

        let mut expected = vec![utxos[4].clone()];
        expected.extend_from_slice(&utxos[0..4]);
        assert_eq!(selection.utxos, expected);
        assert_eq!(selection.total, Amount::from_sat(79_107_431));
    }

    #[test]
    fn test_nonce_mark_inside_window() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((24_105_432, prev)));

        let selection = select_utxos(&utxos, &request(100_000_000, 5, 24_105_433, usize::MAX, Some(prev), &tss))
            .expect("must select");

        let mut expected = vec![utxos[4].clone()];
        expected.extend_from_slice(&utxos[1..4]);
        expected.push(utxos[5].clone());
        assert_eq!(selection.utxos, expected, "nonce-mark must move to the front");
        assert_eq!(selection.total, Amount::from_sat(128_107_432));
    }

    #[test]
    fn test_insufficient_funds() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((24_105_432, prev)));

        let selection = select_utxos(&utxos, &request(1_603_000_000, 5, 24_105_433, usize::MAX, Some(prev), &tss))
            .expect("must select the biggest outputs");
        let mut expected = vec![utxos[4].clone()];
        expected.extend_from_slice(&utxos[6..11]);
        assert_eq!(selection.utxos, expected);
        assert_eq!(selection.total, Amount::from_sat(2_163_107_432));

        let err = select_utxos(&utxos, &request(2_164_000_000, 5, 24_105_433, usize::MAX, Some(prev), &tss))
            .expect_err("must not cover more than the reserve");
        assert_eq!(
            err.to_string(),
            "not enough btc in reserve - available : 21.63107432 , tx amount : 21.64"
        );
    }

    #[test]
    fn test_no_consolidation_below_rank() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((0, prev)));

        let selection = select_utxos(&utxos, &request(1_000_000, 10, 1, 10, Some(prev), &tss))
            .expect("must select");

        assert_eq!(selection.utxos, utxos[0..2]);
        assert_eq!(selection.consolidated_count, 0);
        assert_eq!(selection.consolidated_value, Amount::ZERO);
    }

    #[test]
    fn test_consolidates_from_rank() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((0, prev)));

        let selection = select_utxos(&utxos, &request(1_000_000, 9, 1, 9, Some(prev), &tss))
            .expect("must select");
        assert_eq!(selection.utxos, utxos[0..3]);
        assert_eq!(selection.consolidated_count, 1);
        assert_eq!(selection.consolidated_value, Amount::from_sat(12_000_000));

        let selection = select_utxos(&utxos, &request(1_000_000, 5, 1, 5, Some(prev), &tss))
            .expect("must select");
        let mut expected = utxos[0..2].to_vec();
        expected.extend([6, 5, 4].iter().map(|i| utxos[*i].clone()));
        assert_eq!(selection.utxos, expected, "consolidated outputs must come biggest first");
        assert_eq!(selection.consolidated_count, 3);
        assert_eq!(selection.consolidated_value, Amount::from_sat(200_000_000));
        assert_eq!(selection.total, Amount::from_sat(201_002_000));
    }

    #[test]
    fn test_consolidates_around_nonce_mark() {
        let tss = generate_tss_address_string();
        let prev = generate_txid();
        let utxos = reserve(&tss, Some((24_105_431, prev)));

        let selection = select_utxos(&utxos, &request(13_000_000, 5, 24_105_432, 5, Some(prev), &tss))
            .expect("must select");

        let mut expected = vec![utxos[4].clone()];
        expected.extend_from_slice(&utxos[0..2]);
        expected.extend([6, 5, 3].iter().map(|i| utxos[*i].clone()));
        assert_eq!(selection.utxos, expected, "nonce-mark must never be consolidated");
        assert_eq!(selection.consolidated_count, 3);
        assert_eq!(selection.consolidated_value, Amount::from_sat(200_000_000));

        let selection = select_utxos(&utxos, &request(13_000_000, 12, 24_105_432, 1, Some(prev), &tss))
            .expect("must select");
        assert_eq!(selection.consolidated_count, 8);
        assert_eq!(selection.total, Amount::from_sat(2_268_107_431));
    }

    proptest! {
        #[test]
        fn selection_is_consistent(
            mut sats in prop::collection::vec(1_000u64..100_000_000, 0..40),
            amount in 1u64..500_000_000,
            max_inputs in 1usize..25,
            rank in 1usize..15,
        ) {
            sats.sort_unstable();
            let tss = "bcrt1qy9pqmk2pd9sv63g27jt8r657wy0d9uee4x2dt2";
            let utxos: Vec<Utxo> = sats
                .iter()
                .enumerate()
                .map(|(i, sats)| utxo(tss, Txid::from_byte_array([i as u8; 32]), 1, *sats))
                .collect();

            let req = request(amount, max_inputs, 0, rank, None, tss);
            match select_utxos(&utxos, &req) {
                Ok(selection) => {
                    let sum: Amount = selection.utxos.iter().map(|u| u.amount).sum();
                    prop_assert_eq!(sum, selection.total);
                    prop_assert!(selection.total >= req.amount);
                    prop_assert!(selection.utxos.len() <= max_inputs);

                    let unique: HashSet<_> = selection.utxos.iter().map(Utxo::outpoint).collect();
                    prop_assert_eq!(unique.len(), selection.utxos.len());
                }
                Err(SelectionError::InsufficientFunds { available, requested }) => {
                    prop_assert!(available < requested);
                    let best: Amount = utxos.iter().rev().take(max_inputs).map(|u| u.amount).sum();
                    prop_assert!(best < requested, "a covering window must not be missed");
                }
                Err(err) => prop_assert!(false, "unexpected error {err}"),
            }
        }
    }
}
