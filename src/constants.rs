//! Protocol constants: field limits, section prefixes, bit masks and the
//! fixed lookup tables that are normative for wire compatibility.

/// Largest number of satoshis a transaction output can carry.
pub const SATOSHI_QTY_MAX: u64 = 2_100_000_000_000_000;

/// Largest representable asset quantity.
pub const ASSET_QTY_MAX: u64 = 100_000_000_000_000;

/// Payment references are 52-bit integers.
pub const PAYMENT_REF_MAX: u64 = 0xF_FFFF_FFFF_FFFF; // 2^52 - 1

pub const GENESIS_QTY_MANTISSA_MIN: u16 = 1;
pub const GENESIS_QTY_MANTISSA_MAX: u16 = 1000;
pub const GENESIS_QTY_EXPONENT_MAX: u16 = 11;
pub const GENESIS_CHARGE_FLAT_MANTISSA_MAX: u16 = 100;
pub const GENESIS_CHARGE_FLAT_MANTISSA_MAX_IF_EXP_MAX: u16 = 50;
pub const GENESIS_CHARGE_FLAT_EXPONENT_MAX: u16 = 2;
pub const GENESIS_CHARGE_BASIS_POINTS_MAX: u16 = 250;
pub const GENESIS_DOMAIN_NAME_MAX_LEN: usize = 32;
pub const GENESIS_PAGE_PATH_MAX_LEN: usize = 24;
pub const GENESIS_HASH_MIN_LEN: usize = 12;
pub const GENESIS_HASH_MAX_LEN: usize = 32;

pub const ASSETREF_TXID_PREFIX_LEN: usize = 2;

pub const UNSIGNED_BYTE_MAX: u64 = 0xFF;
pub const UNSIGNED_2_BYTES_MAX: u64 = 0xFFFF;
pub const UNSIGNED_3_BYTES_MAX: u64 = 0xFF_FFFF;
pub const UNSIGNED_4_BYTES_MAX: u64 = 0xFFFF_FFFF;

/// Three ASCII bytes identifying a CoinSpark payload.
pub const METADATA_IDENTIFIER: &[u8] = b"SPK";
pub const METADATA_IDENTIFIER_LEN: usize = 3;

/// Section length bytes must stay at or below this so that section prefix
/// bytes (lowercase ASCII letters, all > 96) remain unambiguous.
pub const LENGTH_PREFIX_MAX: u8 = 96;

pub const GENESIS_PREFIX: u8 = b'g';
pub const TRANSFERS_PREFIX: u8 = b't';
pub const PAYMENTREF_PREFIX: u8 = b'r';
pub const MESSAGE_PREFIX: u8 = b'm';
/// Sentinel prefix meaning "whichever section comes last".
pub const DUMMY_PREFIX: u8 = b'?';

pub const FEE_BASIS_MAX_SATOSHIS: u64 = 1000;

pub const GENESIS_QTY_FLAGS_LENGTH: usize = 2;
pub const GENESIS_QTY_MASK: u16 = 0x3FFF;
pub const GENESIS_QTY_EXPONENT_MULTIPLE: u16 = 1001;
pub const GENESIS_FLAG_CHARGE_FLAT: u16 = 0x4000;
pub const GENESIS_FLAG_CHARGE_BPS: u16 = 0x8000;
pub const GENESIS_CHARGE_FLAT_EXPONENT_MULTIPLE: u16 = 101;
pub const GENESIS_CHARGE_FLAT_LENGTH: usize = 1;
pub const GENESIS_CHARGE_BPS_LENGTH: usize = 1;

pub const DOMAIN_PACKING_PREFIX_MASK: u8 = 0xC0;
pub const DOMAIN_PACKING_PREFIX_SHIFT: u8 = 6;
pub const DOMAIN_PACKING_SUFFIX_MASK: u8 = 0x3F;
/// Messages only: IPv4 host with no server path encoded.
pub const DOMAIN_PACKING_SUFFIX_IPV4_NO_PATH: u8 = 62;
pub const DOMAIN_PACKING_SUFFIX_IPV4: u8 = 63;
pub const DOMAIN_PACKING_IPV4_HTTPS: u8 = 0x40;
pub const DOMAIN_PACKING_IPV4_NO_PATH_PREFIX: u8 = 0x80;

pub const DOMAIN_PATH_ENCODE_BASE: u16 = 40;
pub const DOMAIN_PATH_FALSE_END_CHAR: char = '<';
pub const DOMAIN_PATH_TRUE_END_CHAR: char = '>';

pub const PACKING_GENESIS_MASK: u8 = 0xC0;
/// Reuse the previous transfer's asset reference (default route when first).
pub const PACKING_GENESIS_PREV: u8 = 0x00;
pub const PACKING_GENESIS_3_3_BYTES: u8 = 0x40;
pub const PACKING_GENESIS_3_4_BYTES: u8 = 0x80;
pub const PACKING_GENESIS_4_4_BYTES: u8 = 0xC0;

pub const PACKING_INDICES_MASK: u8 = 0x38;
pub const PACKING_INDICES_0P_0P: u8 = 0x00;
pub const PACKING_INDICES_0P_1S: u8 = 0x08;
pub const PACKING_INDICES_0P_ALL: u8 = 0x10;
pub const PACKING_INDICES_1S_0P: u8 = 0x18;
pub const PACKING_INDICES_ALL_0P: u8 = 0x20;
pub const PACKING_INDICES_ALL_1S: u8 = 0x28;
pub const PACKING_INDICES_ALL_ALL: u8 = 0x30;
/// Use the second packing byte for more extensive index information.
pub const PACKING_INDICES_EXTEND: u8 = 0x38;

pub const PACKING_EXTEND_INPUTS_SHIFT: u8 = 3;
pub const PACKING_EXTEND_OUTPUTS_SHIFT: u8 = 0;
pub const PACKING_EXTEND_MASK: u8 = 0x07;

pub const PACKING_EXTEND_0P: u8 = 0x00;
/// Messages only: an extend value of zero marks the message as public.
pub const PACKING_EXTEND_PUBLIC: u8 = 0x00;
pub const PACKING_EXTEND_1S: u8 = 0x01;
/// Messages only: first fixed at 0, one byte of count.
pub const PACKING_EXTEND_0_1_BYTE: u8 = 0x01;
pub const PACKING_EXTEND_1_0_BYTE: u8 = 0x02;
pub const PACKING_EXTEND_2_0_BYTES: u8 = 0x03;
pub const PACKING_EXTEND_1_1_BYTES: u8 = 0x04;
pub const PACKING_EXTEND_2_1_BYTES: u8 = 0x05;
pub const PACKING_EXTEND_2_2_BYTES: u8 = 0x06;
pub const PACKING_EXTEND_ALL: u8 = 0x07;

pub const PACKING_QUANTITY_MASK: u8 = 0x07;
pub const PACKING_QUANTITY_1P: u8 = 0x00;
pub const PACKING_QUANTITY_1_BYTE: u8 = 0x01;
pub const PACKING_QUANTITY_2_BYTES: u8 = 0x02;
pub const PACKING_QUANTITY_3_BYTES: u8 = 0x03;
pub const PACKING_QUANTITY_4_BYTES: u8 = 0x04;
pub const PACKING_QUANTITY_6_BYTES: u8 = 0x05;
pub const PACKING_QUANTITY_FLOAT: u8 = 0x06;
/// Transfer the maximum representable quantity across.
pub const PACKING_QUANTITY_MAX: u8 = 0x07;

pub const TRANSFER_QTY_FLOAT_LENGTH: usize = 2;
pub const TRANSFER_QTY_FLOAT_MANTISSA_MAX: u16 = 1000;
pub const TRANSFER_QTY_FLOAT_EXPONENT_MAX: u16 = 11;
pub const TRANSFER_QTY_FLOAT_MASK: u16 = 0x3FFF;
pub const TRANSFER_QTY_FLOAT_EXPONENT_MULTIPLE: u16 = 1001;

pub const ADDRESS_PREFIX: u8 = b's';
pub const ADDRESS_FLAG_CHARS_MULTIPLE: u32 = 10;
pub const ADDRESS_CHAR_INCREMENT: u32 = 13;

pub const ADDRESS_FLAG_ASSETS: u32 = 1;
pub const ADDRESS_FLAG_PAYMENT_REFS: u32 = 2;
pub const ADDRESS_FLAG_TEXT_MESSAGES: u32 = 4;
pub const ADDRESS_FLAG_FILE_MESSAGES: u32 = 8;
/// 23 bits of the flags field are currently usable.
pub const ADDRESS_FLAG_MASK: u32 = 0x7F_FFFF;

pub const OUTPUTS_MORE_FLAG: u8 = 0x80;
pub const OUTPUTS_RESERVED_MASK: u8 = 0x60;
pub const OUTPUTS_TYPE_MASK: u8 = 0x18;
pub const OUTPUTS_TYPE_SINGLE: u8 = 0x00;
pub const OUTPUTS_TYPE_FIRST: u8 = 0x08;
pub const OUTPUTS_TYPE_UNUSED: u8 = 0x10;
pub const OUTPUTS_TYPE_EXTEND: u8 = 0x18;
pub const OUTPUTS_VALUE_MASK: u8 = 0x07;
pub const OUTPUTS_VALUE_MAX: u16 = 7;

pub const MESSAGE_SERVER_HOST_MAX_LEN: usize = 32;
pub const MESSAGE_SERVER_PATH_MAX_LEN: usize = 24;
pub const MESSAGE_HASH_MIN_LEN: usize = 12;
pub const MESSAGE_HASH_MAX_LEN: usize = 32;
pub const MESSAGE_MAX_IO_RANGES: usize = 16;

/// Base-40 alphabet for domain and path packing. The last two characters are
/// end markers: `<` means false, `>` means true.
pub const DOMAIN_PATH_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz-.<>";

/// Domain-name prefixes stripped before triplet packing (2 entries).
pub const DOMAIN_NAME_PREFIXES: [&str; 2] = ["", "www."];

/// Domain-name suffixes stripped before triplet packing. The order is
/// normative; entries may never be reordered or removed.
pub const DOMAIN_NAME_SUFFIXES: [&str; 60] = [
    "", ".at", ".au", ".be", ".biz", ".br", ".ca", ".ch", ".cn", ".co.jp",
    ".co.kr", ".co.uk", ".co.za", ".co", ".com.ar", ".com.au", ".com.br",
    ".com.cn", ".com.mx", ".com.tr", ".com.tw", ".com.ua", ".com", ".cz",
    ".de", ".dk", ".edu", ".es", ".eu", ".fr", ".gov", ".gr", ".hk", ".hu",
    ".il", ".in", ".info", ".ir", ".it", ".jp", ".kr", ".me", ".mx", ".net",
    ".nl", ".no", ".org", ".pl", ".ps", ".ro", ".ru", ".se", ".sg", ".tr",
    ".tv", ".tw", ".ua", ".uk", ".us", ".vn",
];

/// The Bitcoin base-58 alphabet, shared by CoinSpark addresses.
pub const INTEGER_TO_BASE58: &[u8] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const BASE58_MINUS_49_TO_INTEGER: [i8; 74] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, -1, -1, -1, -1, -1, -1, -1, //
    9, 10, 11, 12, 13, 14, 15, 16, -1, 17, 18, 19, 20, 21, -1, 22, //
    23, 24, 25, 26, 27, 28, 29, 30, 31, 32, -1, -1, -1, -1, -1, -1, //
    33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, -1, 44, 45, 46, 47, //
    48, 49, 50, 51, 52, 53, 54, 55, 56, 57,
];

/// Map a base-58 character to its 0..57 value, or `None` if invalid.
pub fn base58_to_integer(base58_character: u8) -> Option<u8> {
    if !(49..=122).contains(&base58_character) {
        return None;
    }
    match BASE58_MINUS_49_TO_INTEGER[(base58_character - 49) as usize] {
        -1 => None,
        value => Some(value as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58_alphabet_round_trip() {
        for (value, &ch) in INTEGER_TO_BASE58.iter().enumerate() {
            assert_eq!(base58_to_integer(ch), Some(value as u8));
        }
    }

    #[test]
    fn test_base58_rejects_ambiguous_characters() {
        for ch in [b'0', b'O', b'I', b'l', b'+', b'/', b' '] {
            assert_eq!(base58_to_integer(ch), None);
        }
    }

    #[test]
    fn test_suffix_table_shape() {
        assert_eq!(DOMAIN_NAME_SUFFIXES.len(), 60);
        assert_eq!(DOMAIN_NAME_SUFFIXES[0], "");
        assert_eq!(DOMAIN_NAME_SUFFIXES[22], ".com");
        assert_eq!(DOMAIN_NAME_SUFFIXES[59], ".vn");
    }

    #[test]
    fn test_domain_path_alphabet() {
        assert_eq!(DOMAIN_PATH_CHARS.len(), 40);
        assert_eq!(DOMAIN_PATH_CHARS[38], b'<');
        assert_eq!(DOMAIN_PATH_CHARS[39], b'>');
    }
}
