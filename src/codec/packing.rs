//! Range-packing schemes shared by transfers and message output ranges.
//!
//! A packing scheme names how an `(first, count)` pair is represented: either
//! implicitly (relative to a previous range, or covering everything) or with
//! explicit little-endian bytes of the given widths. Scheme selection walks a
//! fixed priority list so encoders always pick the shortest form.

use crate::constants::*;
use crate::errors::{CodecError, CodecResult};
use crate::types::IORange;

/// The packing schemes, named for the bytes they spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingType {
    /// First 0 and count 1, or repeat the previous range.
    ZeroOrPrev,
    /// The single index just past the previous range (or index 1).
    SubsequentSingle,
    /// All inputs or outputs.
    All,
    /// One byte of first, count fixed at 1.
    First1,
    /// First fixed at 0, one byte of count (messages only).
    Count1,
    /// Two bytes of first, count fixed at 1.
    First2,
    /// One byte of first, one byte of count.
    First1Count1,
    /// Two bytes of first, one byte of count.
    First2Count1,
    /// Two bytes of first, two bytes of count.
    First2Count2,
}

/// Scheme priority during encoding. The order is normative.
pub const PACKING_PRIORITY: [PackingType; 9] = [
    PackingType::ZeroOrPrev,
    PackingType::SubsequentSingle,
    PackingType::All,
    PackingType::First1,
    PackingType::Count1,
    PackingType::First2,
    PackingType::First1Count1,
    PackingType::First2Count1,
    PackingType::First2Count2,
];

impl PackingType {
    /// The three-bit value used in extend bytes and message range packing.
    pub fn extend_value(self) -> u8 {
        match self {
            PackingType::ZeroOrPrev => PACKING_EXTEND_0P,
            PackingType::SubsequentSingle => PACKING_EXTEND_1S,
            PackingType::All => PACKING_EXTEND_ALL,
            PackingType::First1 => PACKING_EXTEND_1_0_BYTE,
            PackingType::Count1 => PACKING_EXTEND_0_1_BYTE,
            PackingType::First2 => PACKING_EXTEND_2_0_BYTES,
            PackingType::First1Count1 => PACKING_EXTEND_1_1_BYTES,
            PackingType::First2Count1 => PACKING_EXTEND_2_1_BYTES,
            PackingType::First2Count2 => PACKING_EXTEND_2_2_BYTES,
        }
    }

    /// Explicit bytes this scheme spends on (first, count).
    pub fn byte_counts(self) -> (usize, usize) {
        match self {
            PackingType::ZeroOrPrev | PackingType::SubsequentSingle | PackingType::All => (0, 0),
            PackingType::First1 => (1, 0),
            PackingType::Count1 => (0, 1),
            PackingType::First2 => (2, 0),
            PackingType::First1Count1 => (1, 1),
            PackingType::First2Count1 => (2, 1),
            PackingType::First2Count2 => (2, 2),
        }
    }
}

/// Which schemes can represent `range`, indexed parallel to
/// [`PACKING_PRIORITY`]. Transfers may reference a previous range; messages
/// may not, and get the `Count1` scheme instead of `SubsequentSingle`.
pub fn packing_options(
    previous: Option<&IORange>,
    range: &IORange,
    count_inputs_outputs: usize,
    for_messages: bool,
) -> [bool; 9] {
    let first_zero = range.first == 0;
    let first_byte = range.first as u64 <= UNSIGNED_BYTE_MAX;
    let count_one = range.count == 1;
    let count_byte = range.count as u64 <= UNSIGNED_BYTE_MAX;

    let (zero_or_prev, subsequent, count1) = if for_messages {
        (false, false, first_zero && count_byte)
    } else {
        let (zero_or_prev, subsequent) = match previous {
            Some(prev) => (
                range.first == prev.first && range.count == prev.count,
                count_one && range.first as u32 == prev.first as u32 + prev.count as u32,
            ),
            None => (first_zero && count_one, range.first == 1 && count_one),
        };
        (zero_or_prev, subsequent, false)
    };

    [
        zero_or_prev,
        subsequent,
        first_zero && range.count as usize >= count_inputs_outputs,
        first_byte && count_one,
        count1,
        count_one, // first always fits two bytes
        first_byte && count_byte,
        count_byte, // first always fits two bytes
        true,      // first and count always fit two bytes each
    ]
}

/// Pick the highest-priority viable scheme and return its extend value.
pub fn encode_packing_extend(options: &[bool; 9]) -> CodecResult<PackingType> {
    for (index, packing_type) in PACKING_PRIORITY.iter().enumerate() {
        if options[index] {
            return Ok(*packing_type);
        }
    }
    Err(CodecError::InvariantViolation(
        "no viable range packing".to_string(),
    ))
}

/// Resolve a three-bit extend value back to a scheme. The value 1 means
/// `SubsequentSingle` for transfers but `Count1` for messages.
pub fn decode_packing_extend(packing_extend: u8, for_messages: bool) -> CodecResult<PackingType> {
    for packing_type in PACKING_PRIORITY {
        if packing_extend == packing_type.extend_value() {
            let excluded = if for_messages {
                PackingType::SubsequentSingle
            } else {
                PackingType::Count1
            };
            if packing_type != excluded {
                return Ok(packing_type);
            }
        }
    }
    Err(CodecError::MalformedBuffer(format!(
        "unknown range packing value {}",
        packing_extend
    )))
}

/// Materialise the implicit parts of a scheme. Explicit first/count bytes
/// are filled in afterwards by the caller.
pub fn packing_type_to_values(
    packing_type: PackingType,
    previous: Option<&IORange>,
    count_inputs_outputs: usize,
) -> CodecResult<IORange> {
    let mut range = IORange::default();

    match packing_type {
        PackingType::ZeroOrPrev => match previous {
            Some(prev) => range = *prev,
            None => {
                range.first = 0;
                range.count = 1;
            }
        },
        PackingType::SubsequentSingle => {
            range.first = match previous {
                Some(prev) => prev.first.checked_add(prev.count).ok_or_else(|| {
                    CodecError::OutOfRange("subsequent index exceeds 65535".to_string())
                })?,
                None => 1,
            };
            range.count = 1;
        }
        PackingType::Count1 => range.first = 0,
        PackingType::First1 | PackingType::First2 => range.count = 1,
        PackingType::All => {
            range.first = 0;
            range.count = u16::try_from(count_inputs_outputs).map_err(|_| {
                CodecError::OutOfRange("input/output count exceeds 65535".to_string())
            })?;
        }
        _ => {}
    }

    Ok(range)
}

/// Explicit byte counts for a transfer, derived from its packing byte (and
/// the extend schemes when the indices field says to use them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackingByteCounts {
    pub block_num: usize,
    pub tx_offset: usize,
    pub txid_prefix: usize,
    pub first_input: usize,
    pub count_inputs: usize,
    pub first_output: usize,
    pub count_outputs: usize,
    pub quantity: usize,
}

pub fn transfer_byte_counts(
    packing: u8,
    extend: Option<(PackingType, PackingType)>,
) -> PackingByteCounts {
    let mut counts = PackingByteCounts::default();

    match packing & PACKING_GENESIS_MASK {
        PACKING_GENESIS_3_3_BYTES => {
            counts.block_num = 3;
            counts.tx_offset = 3;
            counts.txid_prefix = ASSETREF_TXID_PREFIX_LEN;
        }
        PACKING_GENESIS_3_4_BYTES => {
            counts.block_num = 3;
            counts.tx_offset = 4;
            counts.txid_prefix = ASSETREF_TXID_PREFIX_LEN;
        }
        PACKING_GENESIS_4_4_BYTES => {
            counts.block_num = 4;
            counts.tx_offset = 4;
            counts.txid_prefix = ASSETREF_TXID_PREFIX_LEN;
        }
        _ => {}
    }

    if let Some((input_type, output_type)) = extend {
        (counts.first_input, counts.count_inputs) = input_type.byte_counts();
        (counts.first_output, counts.count_outputs) = output_type.byte_counts();
    }

    counts.quantity = match packing & PACKING_QUANTITY_MASK {
        PACKING_QUANTITY_1_BYTE => 1,
        PACKING_QUANTITY_2_BYTES => 2,
        PACKING_QUANTITY_3_BYTES => 3,
        PACKING_QUANTITY_4_BYTES => 4,
        PACKING_QUANTITY_6_BYTES => 6,
        PACKING_QUANTITY_FLOAT => TRANSFER_QTY_FLOAT_LENGTH,
        _ => 0,
    };

    counts
}

/// How a message output range is packed: the packing byte plus the explicit
/// first/count byte widths that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRangePacking {
    pub packing: u8,
    pub first_bytes: usize,
    pub count_bytes: usize,
}

/// Choose the packing for one message output range: an inline single index,
/// an inline leading-outputs count, or an extend form with explicit bytes.
pub fn output_range_packing(
    output_range: &IORange,
    count_outputs: usize,
) -> CodecResult<OutputRangePacking> {
    let options = packing_options(None, output_range, count_outputs, true);

    let first1 = PACKING_PRIORITY
        .iter()
        .position(|&t| t == PackingType::First1)
        .unwrap();
    let count1 = PACKING_PRIORITY
        .iter()
        .position(|&t| t == PackingType::Count1)
        .unwrap();

    if options[first1] && output_range.first <= OUTPUTS_VALUE_MAX {
        return Ok(OutputRangePacking {
            packing: OUTPUTS_TYPE_SINGLE | (output_range.first as u8 & OUTPUTS_VALUE_MASK),
            first_bytes: 0,
            count_bytes: 0,
        });
    }
    if options[count1] && output_range.count <= OUTPUTS_VALUE_MAX {
        return Ok(OutputRangePacking {
            packing: OUTPUTS_TYPE_FIRST | (output_range.count as u8 & OUTPUTS_VALUE_MASK),
            first_bytes: 0,
            count_bytes: 0,
        });
    }

    let packing_type = encode_packing_extend(&options)?;
    let (first_bytes, count_bytes) = packing_type.byte_counts();
    Ok(OutputRangePacking {
        packing: OUTPUTS_TYPE_EXTEND | (packing_type.extend_value() & OUTPUTS_VALUE_MASK),
        first_bytes,
        count_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(first: u16, count: u16) -> IORange {
        IORange { first, count }
    }

    #[test]
    fn test_extend_value_round_trip_for_transfers() {
        for packing_type in PACKING_PRIORITY {
            if packing_type == PackingType::Count1 {
                continue;
            }
            let decoded =
                decode_packing_extend(packing_type.extend_value(), false).unwrap();
            assert_eq!(decoded, packing_type);
        }
    }

    #[test]
    fn test_extend_value_one_is_context_dependent() {
        assert_eq!(
            decode_packing_extend(1, false).unwrap(),
            PackingType::SubsequentSingle
        );
        assert_eq!(decode_packing_extend(1, true).unwrap(), PackingType::Count1);
    }

    #[test]
    fn test_priority_prefers_free_schemes() {
        // no previous range: {0,1} packs for free
        let options = packing_options(None, &range(0, 1), 5, false);
        assert_eq!(
            encode_packing_extend(&options).unwrap(),
            PackingType::ZeroOrPrev
        );

        // next single after the previous range
        let prev = range(2, 3);
        let options = packing_options(Some(&prev), &range(5, 1), 10, false);
        assert_eq!(
            encode_packing_extend(&options).unwrap(),
            PackingType::SubsequentSingle
        );

        // whole side
        let options = packing_options(None, &range(0, 10), 10, false);
        assert_eq!(encode_packing_extend(&options).unwrap(), PackingType::All);
    }

    #[test]
    fn test_priority_falls_back_to_explicit_bytes() {
        let options = packing_options(None, &range(9, 1), 20, false);
        assert_eq!(encode_packing_extend(&options).unwrap(), PackingType::First1);

        let options = packing_options(None, &range(300, 1), 400, false);
        assert_eq!(encode_packing_extend(&options).unwrap(), PackingType::First2);

        let options = packing_options(None, &range(9, 4), 20, false);
        assert_eq!(
            encode_packing_extend(&options).unwrap(),
            PackingType::First1Count1
        );

        let options = packing_options(None, &range(300, 400), 1000, false);
        assert_eq!(
            encode_packing_extend(&options).unwrap(),
            PackingType::First2Count2
        );
    }

    #[test]
    fn test_message_options_exclude_relative_schemes() {
        let options = packing_options(None, &range(0, 1), 5, true);
        assert!(!options[0]);
        assert!(!options[1]);
        // falls through to First1
        assert_eq!(encode_packing_extend(&options).unwrap(), PackingType::First1);
    }

    #[test]
    fn test_packing_type_to_values() {
        let prev = range(4, 2);
        assert_eq!(
            packing_type_to_values(PackingType::ZeroOrPrev, Some(&prev), 9).unwrap(),
            prev
        );
        assert_eq!(
            packing_type_to_values(PackingType::ZeroOrPrev, None, 9).unwrap(),
            range(0, 1)
        );
        assert_eq!(
            packing_type_to_values(PackingType::SubsequentSingle, Some(&prev), 9).unwrap(),
            range(6, 1)
        );
        assert_eq!(
            packing_type_to_values(PackingType::All, None, 9).unwrap(),
            range(0, 9)
        );
    }

    #[test]
    fn test_subsequent_single_overflow() {
        let prev = range(65535, 1);
        assert!(packing_type_to_values(PackingType::SubsequentSingle, Some(&prev), 9).is_err());
    }

    #[test]
    fn test_transfer_byte_counts() {
        let counts = transfer_byte_counts(
            PACKING_GENESIS_3_4_BYTES | PACKING_INDICES_EXTEND | PACKING_QUANTITY_FLOAT,
            Some((PackingType::First2Count1, PackingType::ZeroOrPrev)),
        );
        assert_eq!(counts.block_num, 3);
        assert_eq!(counts.tx_offset, 4);
        assert_eq!(counts.txid_prefix, 2);
        assert_eq!((counts.first_input, counts.count_inputs), (2, 1));
        assert_eq!((counts.first_output, counts.count_outputs), (0, 0));
        assert_eq!(counts.quantity, 2);
    }

    #[test]
    fn test_output_range_packing_inline_forms() {
        let packed = output_range_packing(&range(3, 1), 20).unwrap();
        assert_eq!(packed.packing, OUTPUTS_TYPE_SINGLE | 3);
        assert_eq!((packed.first_bytes, packed.count_bytes), (0, 0));

        let packed = output_range_packing(&range(0, 5), 20).unwrap();
        assert_eq!(packed.packing, OUTPUTS_TYPE_FIRST | 5);
        assert_eq!((packed.first_bytes, packed.count_bytes), (0, 0));
    }

    #[test]
    fn test_output_range_packing_extend_form() {
        let packed = output_range_packing(&range(9, 4), 20).unwrap();
        assert_eq!(packed.packing & OUTPUTS_TYPE_MASK, OUTPUTS_TYPE_EXTEND);
        assert_eq!(
            packed.packing & OUTPUTS_VALUE_MASK,
            PACKING_EXTEND_1_1_BYTES
        );
        assert_eq!((packed.first_bytes, packed.count_bytes), (1, 1));
    }
}
