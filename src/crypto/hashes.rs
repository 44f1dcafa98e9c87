//! SHA-256 hashes over canonicalised, NUL-separated fields.
//!
//! These bind on-chain metadata to off-chain content: the asset hash covers
//! the key fields of an asset's web page specification, the message hash
//! covers a salted sequence of message parts.

use sha2::{Digest, Sha256};

use crate::types::MessagePart;

/// Hash the key information from an asset web page specification. String
/// fields are whitespace-trimmed; the two rates are scaled by one million
/// and rounded half away from zero; a `multiple` of zero means 1.
#[allow(clippy::too_many_arguments)]
pub fn calc_asset_hash(
    name: &str,
    issuer: &str,
    description: &str,
    units: &str,
    issue_date: &str,
    expiry_date: &str,
    interest_rate: f64,
    multiple: f64,
    contract_content: &[u8],
) -> [u8; 32] {
    let mut buffer: Vec<u8> = Vec::new();

    for field in [name, issuer, description, units, issue_date, expiry_date] {
        buffer.extend_from_slice(field.trim().as_bytes());
        buffer.push(0x00);
    }

    let interest_rate_to_hash = (interest_rate * 1_000_000.0).round() as i64;
    let multiple = if multiple == 0.0 { 1.0 } else { multiple };
    let multiple_to_hash = (multiple * 1_000_000.0).round() as i64;

    buffer.extend_from_slice(interest_rate_to_hash.to_string().as_bytes());
    buffer.push(0x00);
    buffer.extend_from_slice(multiple_to_hash.to_string().as_bytes());
    buffer.push(0x00);

    buffer.extend_from_slice(contract_content);
    buffer.push(0x00);

    Sha256::digest(&buffer).into()
}

/// Hash a salted sequence of message parts. The salt should accompany the
/// content to the delivery server so the hash can be recomputed.
pub fn calc_message_hash(salt: &[u8], message_parts: &[MessagePart]) -> [u8; 32] {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.extend_from_slice(salt);
    buffer.push(0x00);

    for part in message_parts {
        buffer.extend_from_slice(part.mime_type.as_bytes());
        buffer.push(0x00);
        buffer.extend_from_slice(part.file_name.as_bytes());
        buffer.push(0x00);
        buffer.extend_from_slice(&part.content);
        buffer.push(0x00);
    }

    Sha256::digest(&buffer).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_asset_hash_preimage() {
        // six empty fields, rate 0, multiple normalised to 1, empty contract
        let hash = calc_asset_hash("", "", "", "", "", "", 0.0, 0.0, b"");
        let expected: [u8; 32] = Sha256::digest(b"\0\0\0\0\0\00\01000000\0\0").into();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_asset_hash_trims_fields() {
        let trimmed = calc_asset_hash("Coin", "Issuer", "", "", "", "", 0.0, 1.0, b"c");
        let padded = calc_asset_hash("  Coin \t", "\nIssuer ", "", "", "", "", 0.0, 1.0, b"c");
        assert_eq!(trimmed, padded);
    }

    #[test]
    fn test_asset_hash_rate_rounding() {
        // 2.5e-6 * 1e6 = 2.5 rounds half away from zero to 3
        let up = calc_asset_hash("", "", "", "", "", "", 2.5e-6, 1.0, b"");
        let exact = calc_asset_hash("", "", "", "", "", "", 3.0e-6, 1.0, b"");
        assert_eq!(up, exact);

        let down = calc_asset_hash("", "", "", "", "", "", 2.4e-6, 1.0, b"");
        assert_ne!(up, down);
    }

    #[test]
    fn test_asset_hash_contract_matters() {
        let a = calc_asset_hash("", "", "", "", "", "", 0.0, 0.0, b"contract a");
        let b = calc_asset_hash("", "", "", "", "", "", 0.0, 0.0, b"contract b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_message_hash_preimage() {
        let parts = vec![MessagePart {
            mime_type: "text/plain".to_string(),
            file_name: "note.txt".to_string(),
            content: b"hello".to_vec(),
        }];
        let hash = calc_message_hash(b"salt", &parts);
        let expected: [u8; 32] =
            Sha256::digest(b"salt\0text/plain\0note.txt\0hello\0").into();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_message_hash_part_order_matters() {
        let part_a = MessagePart {
            mime_type: "text/plain".to_string(),
            file_name: "a".to_string(),
            content: b"1".to_vec(),
        };
        let part_b = MessagePart {
            mime_type: "text/plain".to_string(),
            file_name: "b".to_string(),
            content: b"2".to_vec(),
        };
        let forward = calc_message_hash(b"s", &[part_a.clone(), part_b.clone()]);
        let reverse = calc_message_hash(b"s", &[part_b, part_a]);
        assert_ne!(forward, reverse);
    }
}
