//! The CoinSpark metadata types and their shared value types.
//!
//! - `address`: the human-facing CoinSpark address codec
//! - `asset_ref`: asset references and the default-route marker
//! - `genesis`: asset issuance sections (`g`)
//! - `transfer`: asset transfer sections (`t`) and their semantics
//! - `payment_ref`: payment reference sections (`r`)
//! - `message`: message sections (`m`)

use serde::{Deserialize, Serialize};

use crate::constants::{FEE_BASIS_MAX_SATOSHIS, SATOSHI_QTY_MAX};

pub mod address;
pub mod asset_ref;
pub mod genesis;
pub mod message;
pub mod payment_ref;
pub mod transfer;

pub use address::Address;
pub use asset_ref::AssetRef;
pub use genesis::Genesis;
pub use message::{Message, MessagePart};
pub use payment_ref::PaymentRef;
pub use transfer::{Transfer, TransferList};

/// A quantity of an issued asset.
pub type AssetQty = u64;

/// A quantity of satoshis.
pub type SatoshiQty = u64;

/// A contiguous run of transaction inputs or outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IORange {
    pub first: u16,
    pub count: u16,
}

impl IORange {
    pub fn new(first: u16, count: u16) -> Self {
        IORange { first, count }
    }

    pub fn matches(&self, other: &IORange) -> bool {
        self == other
    }
}

/// Index of the last regular output, the default destination for unrouted
/// asset balances.
pub fn last_regular_output(outputs_regular: &[bool]) -> Option<usize> {
    outputs_regular.iter().rposition(|&regular| regular)
}

/// Number of regular outputs excluding the last one; these are the outputs
/// a genesis divides its quantity between.
pub fn count_non_last_regular_outputs(outputs_regular: &[bool]) -> usize {
    let count = outputs_regular.iter().filter(|&&regular| regular).count();
    count.saturating_sub(1)
}

/// The per-transfer fee basis: the smallest regular output's satoshis,
/// capped at [`FEE_BASIS_MAX_SATOSHIS`].
pub fn min_fee_basis(outputs_satoshis: &[SatoshiQty], outputs_regular: &[bool]) -> SatoshiQty {
    let mut smallest = SATOSHI_QTY_MAX;
    for (satoshis, &regular) in outputs_satoshis.iter().zip(outputs_regular) {
        if regular {
            smallest = smallest.min(*satoshis);
        }
    }
    FEE_BASIS_MAX_SATOSHIS.min(smallest)
}

/// Sort ranges by first index and merge adjacent or overlapping runs. The
/// result covers exactly the same index set and is idempotent.
pub fn normalize_io_ranges(in_ranges: &[IORange]) -> Vec<IORange> {
    let count_ranges = in_ranges.len();
    if count_ranges == 0 {
        return Vec::new();
    }

    let mut range_used = vec![false; count_ranges];
    let mut out_ranges: Vec<IORange> = Vec::new();
    let mut last_range_end: u32 = 0;

    for order_index in 0..count_ranges {
        let mut lowest_range_index = None;
        let mut lowest_range_first = 0u16;

        for (range_index, range) in in_ranges.iter().enumerate() {
            if !range_used[range_index]
                && (lowest_range_index.is_none() || range.first < lowest_range_first)
            {
                lowest_range_first = range.first;
                lowest_range_index = Some(range_index);
            }
        }

        let lowest_range_index = lowest_range_index.expect("unused range remains");
        let lowest = in_ranges[lowest_range_index];

        if order_index > 0 && (lowest.first as u32) <= last_range_end {
            // combine with the previous output range
            let merged = out_ranges.last_mut().expect("merge target exists");
            let this_range_end = lowest.first as u32 + lowest.count as u32;
            merged.count = (last_range_end.max(this_range_end) - merged.first as u32)
                .min(u16::MAX as u32) as u16;
        } else {
            out_ranges.push(lowest);
        }

        let tail = out_ranges.last().expect("at least one range");
        last_range_end = tail.first as u32 + tail.count as u32;
        range_used[lowest_range_index] = true;
    }

    out_ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_regular_output() {
        assert_eq!(last_regular_output(&[true, false, true, false]), Some(2));
        assert_eq!(last_regular_output(&[false, false]), None);
        assert_eq!(last_regular_output(&[]), None);
    }

    #[test]
    fn test_count_non_last_regular_outputs() {
        assert_eq!(count_non_last_regular_outputs(&[true, true, true]), 2);
        assert_eq!(count_non_last_regular_outputs(&[true]), 0);
        assert_eq!(count_non_last_regular_outputs(&[false, false]), 0);
    }

    #[test]
    fn test_min_fee_basis() {
        assert_eq!(min_fee_basis(&[5000, 600, 9000], &[true, true, true]), 600);
        assert_eq!(min_fee_basis(&[5000, 600, 9000], &[true, false, true]), 1000);
        assert_eq!(min_fee_basis(&[], &[]), FEE_BASIS_MAX_SATOSHIS);
    }

    #[test]
    fn test_normalize_merges_overlaps() {
        let ranges = [IORange::new(5, 3), IORange::new(0, 2), IORange::new(6, 4)];
        let normalized = normalize_io_ranges(&ranges);
        assert_eq!(normalized, vec![IORange::new(0, 2), IORange::new(5, 5)]);
    }

    #[test]
    fn test_normalize_merges_adjacent() {
        let ranges = [IORange::new(0, 2), IORange::new(2, 3)];
        assert_eq!(normalize_io_ranges(&ranges), vec![IORange::new(0, 5)]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let ranges = [IORange::new(9, 1), IORange::new(0, 3), IORange::new(4, 2)];
        let once = normalize_io_ranges(&ranges);
        let twice = normalize_io_ranges(&once);
        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec![IORange::new(0, 3), IORange::new(4, 2), IORange::new(9, 1)]
        );
    }
}
