//! Balance computations over the decoded transfer vector: fee thresholds,
//! conservation and default routing.

use coinspark::codec::script_hex_to_metadata;
use coinspark::types::{AssetRef, Genesis, TransferList};

const GENESIS_SCRIPT: &str =
    "6A2853504B6750A4AE00F454956DF4C7D6DE7BF8192486006A4ADF65B048BF847FE26D70588E9FA828D5";
const TRANSFERS_SCRIPT: &str =
    "6A2053504B743F282321E438188C4B381807227C10812B47920642B32E12417D8279";

const COUNT_INPUTS: usize = 15856;

fn vector_genesis() -> Genesis {
    let metadata = script_hex_to_metadata(GENESIS_SCRIPT).unwrap();
    Genesis::decode(&metadata).unwrap()
}

fn vector_transfers() -> TransferList {
    let metadata = script_hex_to_metadata(TRANSFERS_SCRIPT).unwrap();
    TransferList::decode(&metadata, COUNT_INPUTS, 1).unwrap()
}

fn explicit_asset_ref(transfers: &TransferList) -> AssetRef {
    transfers
        .transfers
        .iter()
        .map(|transfer| transfer.asset_ref)
        .find(|asset_ref| !asset_ref.is_default_route())
        .expect("vector has an explicit transfer")
}

#[test]
fn apply_conserves_quantity_modulo_charges() {
    let genesis = vector_genesis();
    let transfers = vector_transfers();
    let asset_ref = explicit_asset_ref(&transfers);

    let mut input_balances = vec![1u64; COUNT_INPUTS];
    input_balances[18] = 5_000; // the input the explicit transfer draws from
    let outputs_regular = [true];

    let output_balances = transfers.apply(&asset_ref, &genesis, &input_balances, &outputs_regular);
    assert_eq!(output_balances.len(), 1);

    // the explicit transfer moves input 18's balance to output 0, where the
    // genesis charge applies; everything else rides the default routes
    let explicit_moved = input_balances[18].min(
        transfers
            .transfers
            .iter()
            .find(|transfer| !transfer.asset_ref.is_default_route())
            .unwrap()
            .qty_per_output,
    );
    let total_in: u64 = input_balances.iter().sum();
    let total_out: u64 = output_balances.iter().sum();
    assert_eq!(total_out, total_in - genesis.calc_charge(explicit_moved));
}

#[test]
fn min_fee_covers_only_explicit_transfers() {
    let transfers = vector_transfers();
    let outputs_satoshis = [700u64];
    let outputs_regular = [true];

    // one explicit transfer covering the single regular output
    let fee = transfers.calc_min_fee(COUNT_INPUTS, &outputs_satoshis, &outputs_regular);
    assert_eq!(fee, 700);
}

#[test]
fn insufficient_fee_collapses_to_apply_none() {
    let transfers = vector_transfers();

    let input_balances = [10u64, 20, 30];
    let output_balances = transfers.apply_none(&input_balances, &[false, true]);
    assert_eq!(output_balances, vec![0, 60]);
}

#[test]
fn default_outputs_flags_match_route_map() {
    let transfers = vector_transfers();
    let outputs_regular = [true];

    let defaults = transfers.default_outputs(COUNT_INPUTS, &outputs_regular);
    assert_eq!(defaults, vec![true]);
}

#[test]
fn genesis_charges_round_trip_over_input_balances() {
    let genesis = vector_genesis();
    for net in [0u64, 1, 17, 5_000, 1_000_000, 287_000_000_000] {
        let gross = genesis.calc_gross(net);
        assert_eq!(genesis.calc_net(gross), net);
    }
}

#[test]
fn loose_and_strict_match_hold_reflexively() {
    let transfers = vector_transfers();
    assert!(transfers.matches(&transfers, true));
    assert!(transfers.matches(&transfers, false));

    let genesis = vector_genesis();
    assert!(genesis.matches(&genesis, true));
    assert!(genesis.matches(&genesis, false));
}
