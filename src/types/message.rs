//! Message sections (`m`): a pointer to content held by a delivery server,
//! addressed to some of the transaction's outputs or to the public.
//!
//! The section carries the server location in packed form, one packed entry
//! per addressed output range, and a prefix of the message hash filling the
//! remaining space.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::packing::{
    decode_packing_extend, output_range_packing, packing_type_to_values,
};
use crate::codec::{
    decode_domain_and_or_path, encode_domain_and_or_path, locate_metadata_range, shift_le_uint,
    shrink_lower_domain_name, unsigned_to_small_endian_hex, write_le_uint,
};
use crate::constants::*;
use crate::errors::{CodecError, CodecResult};
use crate::types::{normalize_io_ranges, IORange};

/// One part of a multipart message, hashed but not carried on-chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub mime_type: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub use_https: bool,
    pub server_host: String,
    /// Whether the server path carries the `coinspark/` prefix.
    pub use_prefix: bool,
    pub server_path: String,
    /// Whether the message is publicly viewable.
    pub is_public: bool,
    pub output_ranges: Vec<IORange>,
    pub hash: Vec<u8>,
    /// Number of bytes of `hash` that are valid for comparison/encoding.
    pub hash_len: usize,
}

impl Message {
    pub fn is_valid(&self) -> bool {
        if self.server_host.len() > MESSAGE_SERVER_HOST_MAX_LEN {
            return false;
        }
        if self.server_path.len() > MESSAGE_SERVER_PATH_MAX_LEN {
            return false;
        }
        if self.hash.len() < self.hash_len {
            return false;
        }
        if self.hash_len < MESSAGE_HASH_MIN_LEN || self.hash_len > MESSAGE_HASH_MAX_LEN {
            return false;
        }
        if !self.is_public && self.output_ranges.is_empty() {
            // public, or aimed at some outputs at least
            return false;
        }
        if self.output_ranges.len() > MESSAGE_MAX_IO_RANGES {
            return false;
        }
        true
    }

    pub fn get_hash_len(&self) -> usize {
        self.hash_len
    }

    pub fn matches(&self, other: &Message, strict: bool) -> bool {
        let hash_compare_len = self
            .hash_len
            .min(other.hash_len)
            .min(MESSAGE_HASH_MAX_LEN);

        let (this_ranges, other_ranges) = if strict {
            (self.output_ranges.clone(), other.output_ranges.clone())
        } else {
            (
                normalize_io_ranges(&self.output_ranges),
                normalize_io_ranges(&other.output_ranges),
            )
        };

        if this_ranges != other_ranges {
            return false;
        }

        self.use_https == other.use_https
            && self.server_host.eq_ignore_ascii_case(&other.server_host)
            && self.use_prefix == other.use_prefix
            && self.server_path.eq_ignore_ascii_case(&other.server_path)
            && self.is_public == other.is_public
            && self.hash[..hash_compare_len] == other.hash[..hash_compare_len]
    }

    /// Encode as a complete `SPK m` payload.
    pub fn encode(&self, count_outputs: usize, metadata_max_len: usize) -> CodecResult<Vec<u8>> {
        if !self.is_valid() {
            return Err(CodecError::OutOfRange("invalid message fields".to_string()));
        }

        let mut metadata = METADATA_IDENTIFIER.to_vec();
        metadata.push(MESSAGE_PREFIX);

        metadata.extend_from_slice(&encode_domain_and_or_path(
            &self.server_host,
            self.use_https,
            &self.server_path,
            self.use_prefix,
            true,
        )?);

        if self.is_public {
            // the public indicator goes first
            let mut packing = OUTPUTS_TYPE_EXTEND | PACKING_EXTEND_PUBLIC;
            if !self.output_ranges.is_empty() {
                packing |= OUTPUTS_MORE_FLAG;
            }
            metadata.push(packing);
        }

        for (index, output_range) in self.output_ranges.iter().enumerate() {
            let packed = output_range_packing(output_range, count_outputs)?;

            let mut packing = packed.packing;
            if index + 1 < self.output_ranges.len() {
                packing |= OUTPUTS_MORE_FLAG;
            }
            metadata.push(packing);

            metadata.extend_from_slice(&write_le_uint(
                output_range.first as u64,
                packed.first_bytes,
            )?);
            metadata.extend_from_slice(&write_le_uint(
                output_range.count as u64,
                packed.count_bytes,
            )?);
        }

        metadata.extend_from_slice(&self.hash[..self.hash_len]);

        if metadata.len() > metadata_max_len {
            return Err(CodecError::Overflow(format!(
                "message needs {} bytes, limit is {}",
                metadata.len(),
                metadata_max_len
            )));
        }
        Ok(metadata)
    }

    /// Decode from a framed payload containing an `m` section.
    pub fn decode(buffer: &[u8], count_outputs: usize) -> CodecResult<Message> {
        let mut metadata = locate_metadata_range(buffer, MESSAGE_PREFIX)
            .ok_or_else(|| CodecError::NotCoinSpark("no message section".to_string()))?;

        let decoded = decode_domain_and_or_path(metadata, true, true, true)?;
        metadata = &metadata[decoded.decoded_bytes..];

        let mut message = Message {
            use_https: decoded.use_https,
            server_host: decoded.domain_name,
            use_prefix: decoded.use_prefix,
            server_path: decoded.page_path,
            ..Message::default()
        };

        let mut read_another_range = true;
        while read_another_range {
            let packing = shift_le_uint(&mut metadata, 1)? as u8;
            if packing & OUTPUTS_RESERVED_MASK != 0 {
                return Err(CodecError::MalformedBuffer(
                    "reserved output-range bits set".to_string(),
                ));
            }

            read_another_range = packing & OUTPUTS_MORE_FLAG != 0;
            let packing_type = packing & OUTPUTS_TYPE_MASK;
            let packing_value = packing & OUTPUTS_VALUE_MASK;

            if packing_type == OUTPUTS_TYPE_EXTEND && packing_value == PACKING_EXTEND_PUBLIC {
                message.is_public = true;
                continue;
            }

            if message.output_ranges.len() >= MESSAGE_MAX_IO_RANGES {
                return Err(CodecError::OutOfRange(
                    "too many message output ranges".to_string(),
                ));
            }

            let mut first_bytes = 0;
            let mut count_bytes = 0;

            let mut output_range = match packing_type {
                OUTPUTS_TYPE_SINGLE => IORange::new(packing_value as u16, 1),
                OUTPUTS_TYPE_FIRST => IORange::new(0, packing_value as u16),
                OUTPUTS_TYPE_EXTEND => {
                    let extend_type = decode_packing_extend(packing_value, true)?;
                    (first_bytes, count_bytes) = extend_type.byte_counts();
                    packing_type_to_values(extend_type, None, count_outputs)?
                }
                _ => {
                    return Err(CodecError::MalformedBuffer(
                        "unused output-range type".to_string(),
                    ))
                }
            };

            if first_bytes > 0 {
                output_range.first = shift_le_uint(&mut metadata, first_bytes)? as u16;
            }
            if count_bytes > 0 {
                output_range.count = shift_le_uint(&mut metadata, count_bytes)? as u16;
            }

            message.output_ranges.push(output_range);
        }

        message.hash_len = metadata.len().min(MESSAGE_HASH_MAX_LEN);
        message.hash = metadata[..message.hash_len].to_vec();

        if !message.is_valid() {
            return Err(CodecError::OutOfRange("invalid message fields".to_string()));
        }
        Ok(message)
    }

    /// Largest hash length that still fits the message in
    /// `metadata_max_len` bytes.
    pub fn calc_hash_len(&self, count_outputs: usize, metadata_max_len: usize) -> usize {
        let mut hash_len = metadata_max_len as isize - METADATA_IDENTIFIER_LEN as isize - 1;

        let mut host_path_len = self.server_path.len() + 1;
        if self.server_host.parse::<std::net::Ipv4Addr>().is_ok() {
            hash_len -= 5; // packing byte and IP octets
            if host_path_len == 1 {
                host_path_len = 0; // the server path is skipped entirely
            }
        } else {
            hash_len -= 1; // packing byte
            let (short_host, _) = shrink_lower_domain_name(&self.server_host);
            host_path_len += short_host.len() + 1;
        }

        hash_len -= 2 * ((host_path_len as isize + 2) / 3);

        if self.is_public {
            hash_len -= 1;
        }

        for output_range in &self.output_ranges {
            if let Ok(packed) = output_range_packing(output_range, count_outputs) {
                hash_len -= 1 + packed.first_bytes as isize + packed.count_bytes as isize;
            }
        }

        hash_len.clamp(0, MESSAGE_HASH_MAX_LEN as isize) as usize
    }

    /// The base URL of the delivery server, lowercased.
    pub fn calc_server_url(&self) -> String {
        let mut url = String::new();
        url.push_str(if self.use_https { "https://" } else { "http://" });
        url.push_str(&self.server_host);
        url.push('/');
        if self.use_prefix {
            url.push_str("coinspark/");
        }
        if !self.server_path.is_empty() {
            url.push_str(&self.server_path);
            url.push('/');
        }
        url.to_lowercase()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host_path_metadata = encode_domain_and_or_path(
            &self.server_host,
            self.use_https,
            &self.server_path,
            self.use_prefix,
            true,
        )
        .unwrap_or_default();

        writeln!(f, "COINSPARK MESSAGE")?;
        writeln!(
            f,
            "    Server URL: {} (length {}+{} encoded {} length {})",
            self.calc_server_url(),
            self.server_host.len(),
            self.server_path.len(),
            hex::encode_upper(&host_path_metadata),
            host_path_metadata.len()
        )?;
        writeln!(
            f,
            "Public message: {}",
            if self.is_public { "yes" } else { "no" }
        )?;

        for output_range in &self.output_ranges {
            if output_range.count > 0 {
                if output_range.count > 1 {
                    write!(
                        f,
                        "       Outputs: {} - {} (count {})",
                        output_range.first,
                        output_range.first as u32 + output_range.count as u32 - 1,
                        output_range.count
                    )?;
                } else {
                    write!(f, "        Output: {}", output_range.first)?;
                }
            } else {
                write!(f, "       Outputs: none")?;
            }
            writeln!(
                f,
                " (small endian hex: first {} count {})",
                unsigned_to_small_endian_hex(output_range.first as u64, 2),
                unsigned_to_small_endian_hex(output_range.count as u64, 2)
            )?;
        }

        writeln!(
            f,
            "  Message hash: {} (length {})",
            hex::encode_upper(&self.hash[..self.hash_len.min(self.hash.len())]),
            self.hash_len
        )?;
        writeln!(f, "END COINSPARK MESSAGE")?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            use_https: true,
            server_host: "msg.example.net".to_string(),
            use_prefix: false,
            server_path: "relay".to_string(),
            is_public: false,
            output_ranges: vec![IORange::new(0, 2)],
            hash: (0u8..32).collect(),
            hash_len: 16,
        }
    }

    #[test]
    fn test_round_trip() {
        let message = sample_message();
        let metadata = message.encode(3, 64).unwrap();
        let decoded = Message::decode(&metadata, 3).unwrap();
        assert!(decoded.matches(&message, true));
        assert_eq!(decoded.encode(3, 64).unwrap(), metadata);
    }

    #[test]
    fn test_public_marker_round_trip() {
        let mut message = sample_message();
        message.is_public = true;
        message.output_ranges.clear();

        let metadata = message.encode(3, 64).unwrap();
        let decoded = Message::decode(&metadata, 3).unwrap();
        assert!(decoded.is_public);
        assert!(decoded.output_ranges.is_empty());

        message.output_ranges = vec![IORange::new(1, 1), IORange::new(4, 3)];
        let metadata = message.encode(8, 64).unwrap();
        let decoded = Message::decode(&metadata, 8).unwrap();
        assert!(decoded.is_public);
        assert_eq!(decoded.output_ranges, message.output_ranges);
    }

    #[test]
    fn test_needs_public_or_outputs() {
        let mut message = sample_message();
        message.output_ranges.clear();
        assert!(!message.is_valid());
        message.is_public = true;
        assert!(message.is_valid());
    }

    #[test]
    fn test_range_count_limit() {
        let mut message = sample_message();
        message.output_ranges = (0..17).map(|i| IORange::new(i, 1)).collect();
        assert!(!message.is_valid());
        message.output_ranges.truncate(16);
        assert!(message.is_valid());
    }

    #[test]
    fn test_reserved_bits_rejected() {
        let message = sample_message();
        let mut metadata = message.encode(3, 64).unwrap();
        // set a reserved bit on the first range packing byte
        let host_path_len = encode_domain_and_or_path(
            &message.server_host,
            message.use_https,
            &message.server_path,
            message.use_prefix,
            true,
        )
        .unwrap()
        .len();
        metadata[METADATA_IDENTIFIER_LEN + 1 + host_path_len] |= 0x20;
        assert!(Message::decode(&metadata, 3).is_err());
    }

    #[test]
    fn test_strict_match_respects_range_order() {
        let mut message = sample_message();
        message.output_ranges = vec![IORange::new(4, 1), IORange::new(0, 2)];

        let mut reordered = message.clone();
        reordered.output_ranges = vec![IORange::new(0, 2), IORange::new(4, 1)];

        assert!(!message.matches(&reordered, true));
        assert!(message.matches(&reordered, false));
    }

    #[test]
    fn test_calc_hash_len_matches_encoding() {
        let mut message = sample_message();
        for max_len in [40usize, 48, 64] {
            message.hash_len = message.calc_hash_len(3, max_len);
            if message.hash_len >= MESSAGE_HASH_MIN_LEN {
                let metadata = message.encode(3, max_len).unwrap();
                assert!(metadata.len() <= max_len);
                assert_eq!(message.calc_hash_len(3, metadata.len()), message.hash_len);
            }
        }
    }

    #[test]
    fn test_ipv4_no_path_server() {
        let mut message = sample_message();
        message.server_host = "10.1.2.3".to_string();
        message.server_path = String::new();
        message.use_prefix = true;

        let metadata = message.encode(3, 64).unwrap();
        let decoded = Message::decode(&metadata, 3).unwrap();
        assert_eq!(decoded.server_host, "10.1.2.3");
        assert_eq!(decoded.server_path, "");
        assert!(decoded.use_prefix);
        assert_eq!(decoded.calc_server_url(), "https://10.1.2.3/coinspark/");
    }

    #[test]
    fn test_server_url_is_lowercase() {
        let mut message = sample_message();
        message.server_host = "MSG.Example.NET".to_string();
        message.server_path = "Relay".to_string();
        assert_eq!(message.calc_server_url(), "https://msg.example.net/relay/");
    }
}
