//! Asset references: which genesis transaction an asset points back to.
//!
//! An asset is identified by the block that confirmed its genesis
//! transaction, the byte offset of that transaction within the block, and
//! the first two bytes of its txid. A transfer may instead carry the
//! default-route marker, which directs unrouted balance to a chosen output.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::unsigned_to_small_endian_hex;
use crate::errors::{CodecError, CodecResult};

/// Identifies an issued asset, or marks a transfer as a default route.
///
/// Variant order matters: the derived `Ord` sorts default routes before any
/// indexed reference and orders indexed references by block number, then
/// transaction offset, then txid prefix, which is the grouping order used
/// when encoding transfer lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetRef {
    /// Directs all otherwise-unspent input balance to a specified output.
    DefaultRoute,
    /// A concrete genesis transaction.
    Indexed {
        /// Block in which the genesis transaction was confirmed.
        block_num: u32,
        /// Byte offset of the transaction within that block.
        tx_offset: u32,
        /// First bytes of the genesis transaction id.
        txid_prefix: [u8; 2],
    },
}

impl AssetRef {
    pub fn new(block_num: u32, tx_offset: u32, txid_prefix: [u8; 2]) -> Self {
        AssetRef::Indexed {
            block_num,
            tx_offset,
            txid_prefix,
        }
    }

    pub fn is_default_route(&self) -> bool {
        matches!(self, AssetRef::DefaultRoute)
    }

    pub fn matches(&self, other: &AssetRef) -> bool {
        self == other
    }

    /// Render as the `block-offset-prefix` string, where the prefix is the
    /// little-endian integer of the two txid bytes.
    pub fn encode(&self) -> CodecResult<String> {
        match self {
            AssetRef::DefaultRoute => Err(CodecError::InvariantViolation(
                "default routes have no asset reference string".to_string(),
            )),
            AssetRef::Indexed {
                block_num,
                tx_offset,
                txid_prefix,
            } => {
                let prefix_integer =
                    256 * txid_prefix[1] as u32 + txid_prefix[0] as u32;
                Ok(format!("{}-{}-{}", block_num, tx_offset, prefix_integer))
            }
        }
    }

    /// Parse the `block-offset-prefix` string form. A block number of -1
    /// yields the default-route marker.
    pub fn decode(asset_ref: &str) -> CodecResult<AssetRef> {
        let malformed =
            || CodecError::MalformedBuffer(format!("bad asset reference {:?}", asset_ref));

        // the block number may carry a sign, so split around it explicitly
        let unsigned_part = asset_ref.strip_prefix('-').unwrap_or(asset_ref);
        let sign_len = asset_ref.len() - unsigned_part.len();
        let separator = unsigned_part.find('-').ok_or_else(malformed)?;

        let block_num: i64 = asset_ref[..sign_len + separator]
            .parse()
            .map_err(|_| malformed())?;

        let mut parts = unsigned_part[separator + 1..].splitn(2, '-');
        let tx_offset: u32 = parts
            .next()
            .ok_or_else(malformed)?
            .parse()
            .map_err(|_| malformed())?;
        let prefix_integer: u32 = parts
            .next()
            .ok_or_else(malformed)?
            .parse()
            .map_err(|_| malformed())?;

        if prefix_integer > 0xFFFF {
            return Err(CodecError::OutOfRange(format!(
                "txid prefix integer {}",
                prefix_integer
            )));
        }

        if block_num == -1 {
            return Ok(AssetRef::DefaultRoute);
        }
        let block_num = u32::try_from(block_num)
            .map_err(|_| CodecError::OutOfRange(format!("block number {}", block_num)))?;

        Ok(AssetRef::Indexed {
            block_num,
            tx_offset,
            txid_prefix: [(prefix_integer % 256) as u8, (prefix_integer / 256) as u8],
        })
    }

    pub(crate) fn render_inner(&self, headers: bool) -> String {
        let (block_display, block_hex, tx_offset, prefix) = match self {
            AssetRef::DefaultRoute => {
                (-1i64, "FFFFFFFF".to_string(), 0u32, [0u8; 2])
            }
            AssetRef::Indexed {
                block_num,
                tx_offset,
                txid_prefix,
            } => (
                *block_num as i64,
                unsigned_to_small_endian_hex(*block_num as u64, 4),
                *tx_offset,
                *txid_prefix,
            ),
        };

        let mut buffer = String::new();
        if headers {
            buffer.push_str("COINSPARK ASSET REFERENCE\n");
        }
        buffer.push_str(&format!(
            "Genesis block index: {} (small endian hex {})\n",
            block_display, block_hex
        ));
        buffer.push_str(&format!(
            " Genesis txn offset: {} (small endian hex {})\n",
            tx_offset,
            unsigned_to_small_endian_hex(tx_offset as u64, 4)
        ));
        buffer.push_str(&format!(
            "Genesis txid prefix: {}\n",
            hex::encode_upper(prefix)
        ));
        if headers {
            buffer.push_str("END COINSPARK ASSET REFERENCE\n\n");
        }
        buffer
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_inner(true))
    }
}
