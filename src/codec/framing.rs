//! The outer metadata envelope: the `SPK` identifier, per-section prefixes
//! and length bytes, and the OP_RETURN script wrapping.
//!
//! A payload carries one or more sections. Every section but the last is
//! preceded by a single length byte covering its prefix and body; length
//! bytes never exceed 96, so prefix bytes (lowercase letters) stay
//! unambiguous.

use crate::constants::*;
use crate::errors::{CodecError, CodecResult};

const OP_RETURN: u8 = 0x6A;
const OP_RETURN_PUSH_MAX: usize = 75;

/// Find the body of the section tagged `desired_prefix` inside a framed
/// payload. Pass [`DUMMY_PREFIX`] to get whichever section comes last.
pub fn locate_metadata_range(metadata: &[u8], desired_prefix: u8) -> Option<&[u8]> {
    let metadata_len = metadata.len();

    if metadata_len < METADATA_IDENTIFIER_LEN + 1 {
        return None;
    }
    if &metadata[..METADATA_IDENTIFIER_LEN] != METADATA_IDENTIFIER {
        return None;
    }

    let mut position = METADATA_IDENTIFIER_LEN;

    while position < metadata_len {
        let found_prefix = metadata[position];
        position += 1;

        if found_prefix == desired_prefix
            || (desired_prefix == DUMMY_PREFIX && found_prefix > LENGTH_PREFIX_MAX)
        {
            // our data runs from here to the end
            return Some(&metadata[position..]);
        }

        if found_prefix > LENGTH_PREFIX_MAX {
            // some other type of data from here to the end
            return None;
        }

        // found_prefix is a length byte covering the next prefix and body
        let section_len = found_prefix as usize;
        if section_len == 0 || position + section_len > metadata_len || position >= metadata_len {
            return None;
        }

        if metadata[position] == desired_prefix {
            return Some(&metadata[position + 1..position + section_len]);
        }
        position += section_len;
    }

    None
}

/// Room left for appending another section while staying within
/// `metadata_max_len` (the append costs one extra length byte but saves the
/// repeated identifier).
pub fn metadata_max_append_len(metadata: &[u8], metadata_max_len: usize) -> usize {
    metadata_max_len.saturating_sub((metadata.len() + 1).saturating_sub(METADATA_IDENTIFIER_LEN))
}

/// Append `append_metadata` (itself a full `SPK` payload) after the sections
/// in `metadata`, rewriting the current tail section to carry a length byte.
pub fn metadata_append(
    metadata: &[u8],
    metadata_max_len: usize,
    append_metadata: &[u8],
) -> CodecResult<Vec<u8>> {
    let last_metadata = locate_metadata_range(metadata, DUMMY_PREFIX).ok_or_else(|| {
        CodecError::MalformedBuffer("no final section in existing metadata".to_string())
    })?;

    if append_metadata.len() < METADATA_IDENTIFIER_LEN + 1 {
        return Err(CodecError::MalformedBuffer(
            "appended metadata too short".to_string(),
        ));
    }
    if &append_metadata[..METADATA_IDENTIFIER_LEN] != METADATA_IDENTIFIER {
        return Err(CodecError::NotCoinSpark(
            "appended metadata lacks identifier".to_string(),
        ));
    }

    // we don't check the byte after the identifier because the appended
    // payload could itself be composite

    let need_length = metadata.len() + append_metadata.len() - METADATA_IDENTIFIER_LEN + 1;
    if metadata_max_len < need_length {
        return Err(CodecError::Overflow(format!(
            "appended metadata needs {} bytes, limit is {}",
            need_length, metadata_max_len
        )));
    }

    let last_metadata_len = last_metadata.len() + 1; // include prefix
    let last_metadata_pos = metadata.len() - last_metadata_len;

    let mut combined = Vec::with_capacity(need_length);
    combined.extend_from_slice(&metadata[..last_metadata_pos]);
    combined.push(last_metadata_len as u8);
    combined.extend_from_slice(&metadata[last_metadata_pos..]);
    combined.extend_from_slice(&append_metadata[METADATA_IDENTIFIER_LEN..]);
    Ok(combined)
}

/// Extract the metadata payload from an OP_RETURN script, if it is one.
pub fn script_to_metadata(script_pub_key: &[u8]) -> Option<&[u8]> {
    let metadata_len = script_pub_key.len().checked_sub(2)?;
    if script_pub_key.len() > 2
        && script_pub_key[0] == OP_RETURN
        && script_pub_key[1] > 0
        && script_pub_key[1] as usize <= OP_RETURN_PUSH_MAX
        && script_pub_key[1] as usize == metadata_len
    {
        Some(&script_pub_key[2..])
    } else {
        None
    }
}

/// Hex-string variant of [`script_to_metadata`].
pub fn script_hex_to_metadata(script_pub_key: &str) -> Option<Vec<u8>> {
    let raw = hex::decode(script_pub_key).ok()?;
    script_to_metadata(&raw).map(|metadata| metadata.to_vec())
}

/// True when a script is an ordinary (non-OP_RETURN) output script.
pub fn script_is_regular(script_pub_key: &[u8]) -> bool {
    script_pub_key.is_empty() || script_pub_key[0] != OP_RETURN
}

/// Return the metadata of the first non-regular script, if any. The script
/// is not guaranteed to contain CoinSpark data; decoding may still fail.
pub fn scripts_to_metadata<'a, S: AsRef<[u8]>>(script_pub_keys: &'a [S]) -> Option<&'a [u8]> {
    script_pub_keys
        .iter()
        .map(|script| script.as_ref())
        .find(|script| !script_is_regular(script))
        .and_then(script_to_metadata)
}

/// Hex-string variant of [`scripts_to_metadata`].
pub fn scripts_hex_to_metadata<S: AsRef<str>>(script_pub_keys: &[S]) -> Option<Vec<u8>> {
    for script in script_pub_keys {
        let raw = hex::decode(script.as_ref()).ok()?;
        if !script_is_regular(&raw) {
            return script_to_metadata(&raw).map(|metadata| metadata.to_vec());
        }
    }
    None
}

/// Wrap metadata in an OP_RETURN script. Payloads above 75 bytes cannot be
/// wrapped.
pub fn metadata_to_script(metadata: &[u8]) -> Option<Vec<u8>> {
    if metadata.is_empty() || metadata.len() > OP_RETURN_PUSH_MAX {
        return None;
    }
    let mut script = Vec::with_capacity(metadata.len() + 2);
    script.push(OP_RETURN);
    script.push(metadata.len() as u8);
    script.extend_from_slice(metadata);
    Some(script)
}

/// Uppercase-hex variant of [`metadata_to_script`].
pub fn metadata_to_script_hex(metadata: &[u8]) -> Option<String> {
    metadata_to_script(metadata).map(|script| hex::encode_upper(script))
}
