//! Decoding and re-encoding of known on-chain payloads.

use coinspark::codec::{metadata_to_script_hex, script_hex_to_metadata};
use coinspark::crypto::calc_asset_hash;
use coinspark::types::{Address, AssetRef, Genesis, PaymentRef, TransferList};

const GENESIS_SCRIPT: &str =
    "6A2853504B6750A4AE00F454956DF4C7D6DE7BF8192486006A4ADF65B048BF847FE26D70588E9FA828D5";
const TRANSFERS_SCRIPT: &str =
    "6A2053504B743F282321E438188C4B381807227C10812B47920642B32E12417D8279";

#[test]
fn transfers_script_extracts_and_decodes() {
    let metadata = script_hex_to_metadata(TRANSFERS_SCRIPT).expect("OP_RETURN payload");
    assert_eq!(&metadata[..4], &[0x53, 0x50, 0x4B, 0x74]); // "SPKt"

    let transfers = TransferList::decode(&metadata, 15856, 1).expect("decodable transfers");
    assert!(!transfers.transfers.is_empty());

    // three default routes followed by one explicit transfer
    assert_eq!(transfers.transfers.len(), 4);
    assert_eq!(
        transfers
            .transfers
            .iter()
            .filter(|transfer| transfer.asset_ref.is_default_route())
            .count(),
        3
    );
}

#[test]
fn transfers_script_reencodes_identically() {
    let metadata = script_hex_to_metadata(TRANSFERS_SCRIPT).unwrap();
    let transfers = TransferList::decode(&metadata, 15856, 1).unwrap();

    let reencoded = transfers.encode(15856, 1, metadata.len()).unwrap();
    assert_eq!(reencoded, metadata);
    assert_eq!(
        metadata_to_script_hex(&reencoded).unwrap(),
        TRANSFERS_SCRIPT
    );
}

#[test]
fn genesis_script_decodes_with_nonzero_qty() {
    let metadata = script_hex_to_metadata(GENESIS_SCRIPT).expect("OP_RETURN payload");
    let genesis = Genesis::decode(&metadata).expect("decodable genesis");

    assert!(genesis.get_qty() > 0);
    assert!(genesis.is_valid());

    let rendered = genesis.to_string();
    assert!(rendered.starts_with("COINSPARK GENESIS\n"));
    assert!(rendered.ends_with("END COINSPARK GENESIS\n\n"));
}

#[test]
fn genesis_script_reencodes_identically() {
    let metadata = script_hex_to_metadata(GENESIS_SCRIPT).unwrap();
    let genesis = Genesis::decode(&metadata).unwrap();

    let reencoded = genesis.encode(metadata.len()).unwrap();
    assert_eq!(reencoded, metadata);
    assert_eq!(metadata_to_script_hex(&reencoded).unwrap(), GENESIS_SCRIPT);
}

#[test]
fn genesis_hash_len_is_consistent_with_its_encoding() {
    let metadata = script_hex_to_metadata(GENESIS_SCRIPT).unwrap();
    let genesis = Genesis::decode(&metadata).unwrap();
    assert_eq!(genesis.calc_hash_len(metadata.len()), genesis.get_hash_len());
}

#[test]
fn known_address_decodes() {
    let address = Address::decode("s6GUHy69HWkwFqzFhJCY49seL8EFv").expect("decodable address");
    assert_eq!(address.bitcoin_address, "1vQD3uDyWiuW1T4xJpudQ6tz1g");
    assert_eq!(address.address_flags, 1);
    assert_eq!(address.payment_ref, PaymentRef(0));

    assert_eq!(address.encode().unwrap(), "s6GUHy69HWkwFqzFhJCY49seL8EFv");
}

#[test]
fn known_address_encodes() {
    let address = Address::new("149wHUMa41Xm2jnZtqgRx94uGbZD9kPXnS", 3, PaymentRef(0));
    let encoded = address.encode().unwrap();
    assert_eq!(encoded, "st75zSd3aVPWcDGzxAzA7xhERLBYsqVR2fo4i");
    assert_eq!(Address::decode(&encoded).unwrap(), address);
}

#[test]
fn known_asset_ref_decodes() {
    let asset_ref = AssetRef::decode("456789-65432-23456").expect("decodable reference");
    assert_eq!(asset_ref, AssetRef::new(456789, 65432, [0xA0, 0x5B]));
    assert_eq!(asset_ref.encode().unwrap(), "456789-65432-23456");
}

#[test]
fn empty_asset_hash_vector() {
    use sha2::{Digest, Sha256};

    let hash = calc_asset_hash("", "", "", "", "", "", 0.0, 0.0, b"");

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&[0u8; 6]);
    preimage.extend_from_slice(b"0\0");
    preimage.extend_from_slice(b"1000000\0");
    preimage.push(0);
    let expected: [u8; 32] = Sha256::digest(&preimage).into();

    assert_eq!(hash, expected);
}
