//! Compressed encoding of a `(domain, useHttps, path, usePrefix)` tuple.
//!
//! Domain names are lowercased, stripped of a table prefix and suffix, then
//! packed three characters to two bytes over a 40-character alphabet. IPv4
//! hosts use a raw four-octet short form instead. The `<` and `>` characters
//! double as terminators carrying the https and prefix booleans.

use std::net::Ipv4Addr;

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::*;
use crate::errors::{CodecError, CodecResult};

/// Result of decoding a packed domain and/or path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedDomainPath {
    /// Bytes consumed from the metadata.
    pub decoded_bytes: usize,
    pub use_https: bool,
    pub domain_name: String,
    pub page_path: String,
    pub use_prefix: bool,
}

/// Lowercase `full_domain_name`, strip the longest matching prefix and
/// suffix, and return the shortened name with its packing byte.
pub fn shrink_lower_domain_name(full_domain_name: &str) -> (String, u8) {
    if full_domain_name.is_empty() {
        return (String::new(), 0);
    }

    let mut source = full_domain_name.to_lowercase();

    let mut best_prefix_len: isize = -1;
    let mut best_prefix_index = 0usize;
    for (index, prefix) in DOMAIN_NAME_PREFIXES.iter().enumerate() {
        if prefix.len() as isize > best_prefix_len && source.starts_with(prefix) {
            best_prefix_len = prefix.len() as isize;
            best_prefix_index = index;
        }
    }
    if best_prefix_len > 0 {
        source = source[best_prefix_len as usize..].to_string();
    }

    let mut best_suffix_len: isize = -1;
    let mut best_suffix_index = 0usize;
    for (index, suffix) in DOMAIN_NAME_SUFFIXES.iter().enumerate() {
        if suffix.len() as isize > best_suffix_len && source.ends_with(suffix) {
            best_suffix_len = suffix.len() as isize;
            best_suffix_index = index;
        }
    }
    if best_suffix_len > 0 {
        source.truncate(source.len() - best_suffix_len as usize);
    }

    let packing = (((best_prefix_index as u8) << DOMAIN_PACKING_PREFIX_SHIFT)
        & DOMAIN_PACKING_PREFIX_MASK)
        | ((best_suffix_index as u8) & DOMAIN_PACKING_SUFFIX_MASK);

    (source, packing)
}

/// Reattach the prefix and suffix selected by `packing` to a shortened name.
pub fn expand_domain_name(short_domain_name: &str, packing: u8) -> CodecResult<String> {
    let prefix_index =
        ((packing & DOMAIN_PACKING_PREFIX_MASK) >> DOMAIN_PACKING_PREFIX_SHIFT) as usize;
    let prefix = DOMAIN_NAME_PREFIXES
        .get(prefix_index)
        .ok_or_else(|| CodecError::OutOfRange(format!("domain prefix index {}", prefix_index)))?;

    let suffix_index = (packing & DOMAIN_PACKING_SUFFIX_MASK) as usize;
    let suffix = DOMAIN_NAME_SUFFIXES
        .get(suffix_index)
        .ok_or_else(|| CodecError::OutOfRange(format!("domain suffix index {}", suffix_index)))?;

    Ok(format!("{}{}{}", prefix, short_domain_name, suffix))
}

/// Pack a lowercased string into little-endian 16-bit triplets over the
/// 40-character alphabet.
pub fn encode_domain_path_triplets(path: &str) -> CodecResult<Vec<u8>> {
    let lower_path = path.to_lowercase();
    let chars: Vec<char> = lower_path.chars().collect();
    let mut metadata = Vec::with_capacity(2 * ((chars.len() + 2) / 3));
    let mut triplet: u16 = 0;

    for (position, &ch) in chars.iter().enumerate() {
        let encode_value = DOMAIN_PATH_CHARS
            .iter()
            .position(|&c| c as char == ch)
            .ok_or_else(|| {
                CodecError::OutOfRange(format!("character {:?} not encodable", ch))
            })? as u16;

        match position % 3 {
            0 => triplet = encode_value,
            1 => triplet += encode_value * DOMAIN_PATH_ENCODE_BASE,
            _ => triplet += encode_value * DOMAIN_PATH_ENCODE_BASE * DOMAIN_PATH_ENCODE_BASE,
        }

        if position % 3 == 2 || position == chars.len() - 1 {
            let mut buffer = [0u8; 2];
            LittleEndian::write_u16(&mut buffer, triplet);
            metadata.extend_from_slice(&buffer);
        }
    }

    Ok(metadata)
}

/// Unpack triplets until `parts` terminator characters have been consumed.
/// Returns the decoded string (terminators included) and the bytes used.
pub fn decode_domain_path_triplets(metadata: &[u8], parts: usize) -> CodecResult<(String, usize)> {
    let mut data = metadata;
    let mut result = String::new();
    let mut parts_left = parts;
    let mut string_pos = 0usize;
    let mut triplet: u16 = 0;

    while parts_left > 0 {
        if string_pos % 3 == 0 {
            if data.len() < 2 {
                return Err(CodecError::MalformedBuffer(
                    "truncated domain/path triplet".to_string(),
                ));
            }
            triplet = LittleEndian::read_u16(&data[..2]);
            data = &data[2..];

            let base = DOMAIN_PATH_ENCODE_BASE;
            if triplet >= base * base * base {
                return Err(CodecError::OutOfRange(format!(
                    "domain/path triplet value {}",
                    triplet
                )));
            }
        }

        let decode_value = match string_pos % 3 {
            0 => triplet % DOMAIN_PATH_ENCODE_BASE,
            1 => (triplet / DOMAIN_PATH_ENCODE_BASE) % DOMAIN_PATH_ENCODE_BASE,
            _ => triplet / (DOMAIN_PATH_ENCODE_BASE * DOMAIN_PATH_ENCODE_BASE),
        };

        let decode_char = DOMAIN_PATH_CHARS[decode_value as usize] as char;
        result.push(decode_char);
        string_pos += 1;

        if decode_char == DOMAIN_PATH_TRUE_END_CHAR || decode_char == DOMAIN_PATH_FALSE_END_CHAR {
            parts_left -= 1;
        }
    }

    Ok((result, metadata.len() - data.len()))
}

/// Encode a domain name and/or page path, with the IPv4 short form where the
/// host is a dotted-quad address. `for_messages` enables the no-path IPv4
/// variant used by message sections.
pub fn encode_domain_and_or_path(
    domain_name: &str,
    use_https: bool,
    page_path: &str,
    use_prefix: bool,
    for_messages: bool,
) -> CodecResult<Vec<u8>> {
    let mut metadata = Vec::new();
    let mut encode_string = String::new();
    let mut skip_empty_page_path = false;

    if !domain_name.is_empty() {
        if let Ok(address) = domain_name.parse::<Ipv4Addr>() {
            let mut packing = if for_messages && page_path.is_empty() {
                skip_empty_page_path = true;
                let mut c = DOMAIN_PACKING_SUFFIX_IPV4_NO_PATH;
                if use_prefix {
                    c |= DOMAIN_PACKING_IPV4_NO_PATH_PREFIX;
                }
                c
            } else {
                DOMAIN_PACKING_SUFFIX_IPV4
            };
            if use_https {
                packing |= DOMAIN_PACKING_IPV4_HTTPS;
            }

            metadata.push(packing);
            metadata.extend_from_slice(&address.octets());
        } else {
            let (short_domain_name, packing) = shrink_lower_domain_name(domain_name);
            if short_domain_name.is_empty() {
                return Err(CodecError::OutOfRange(format!(
                    "domain name {:?} shrinks to nothing",
                    domain_name
                )));
            }
            encode_string.push_str(&short_domain_name);
            encode_string.push(terminator_char(use_https));
            metadata.push(packing);
        }
    }

    if !page_path.is_empty() || !skip_empty_page_path {
        encode_string.push_str(page_path);
        encode_string.push(terminator_char(use_prefix));
    }

    if !encode_string.is_empty() {
        metadata.extend_from_slice(&encode_domain_path_triplets(&encode_string)?);
    }

    Ok(metadata)
}

/// Decode a packed domain and/or page path from the front of `metadata`.
pub fn decode_domain_and_or_path(
    metadata: &[u8],
    do_domain_name: bool,
    do_page_path: bool,
    for_messages: bool,
) -> CodecResult<DecodedDomainPath> {
    let mut data = metadata;
    let mut result = DecodedDomainPath::default();
    let mut metadata_parts = 0usize;
    let mut is_ip_address = false;
    let mut packing = 0u8;
    let mut want_page_path = do_page_path;

    if do_domain_name {
        if data.is_empty() {
            return Err(CodecError::MalformedBuffer(
                "missing domain packing byte".to_string(),
            ));
        }
        packing = data[0];
        data = &data[1..];

        let packing_suffix = packing & DOMAIN_PACKING_SUFFIX_MASK;
        is_ip_address = packing_suffix == DOMAIN_PACKING_SUFFIX_IPV4
            || (for_messages && packing_suffix == DOMAIN_PACKING_SUFFIX_IPV4_NO_PATH);

        if is_ip_address {
            result.use_https = (packing & DOMAIN_PACKING_IPV4_HTTPS) != 0;
            if data.len() <= 4 {
                return Err(CodecError::MalformedBuffer(
                    "truncated IPv4 host".to_string(),
                ));
            }
            result.domain_name =
                format!("{}.{}.{}.{}", data[0], data[1], data[2], data[3]);
            data = &data[4..];

            if want_page_path
                && for_messages
                && packing_suffix == DOMAIN_PACKING_SUFFIX_IPV4_NO_PATH
            {
                result.page_path = String::new();
                result.use_prefix = (packing & DOMAIN_PACKING_IPV4_NO_PATH_PREFIX) != 0;
                want_page_path = false;
            }
        } else {
            metadata_parts += 1;
        }
    }

    if want_page_path {
        metadata_parts += 1;
    }

    if metadata_parts > 0 {
        let (decoded, used) = decode_domain_path_triplets(data, metadata_parts)?;
        data = &data[used..];
        let mut decode_string = decoded.as_str();

        if do_domain_name && !is_ip_address {
            let end_pos = decode_string
                .find(|c| c == DOMAIN_PATH_TRUE_END_CHAR || c == DOMAIN_PATH_FALSE_END_CHAR)
                .ok_or_else(|| {
                    CodecError::MalformedBuffer("unterminated domain name".to_string())
                })?;
            result.domain_name =
                expand_domain_name(&decode_string[..end_pos], packing)?;
            result.use_https =
                decode_string.as_bytes()[end_pos] == DOMAIN_PATH_TRUE_END_CHAR as u8;
            decode_string = &decode_string[end_pos + 1..];
        }

        if want_page_path {
            let end_pos = decode_string
                .find(|c| c == DOMAIN_PATH_TRUE_END_CHAR || c == DOMAIN_PATH_FALSE_END_CHAR)
                .ok_or_else(|| {
                    CodecError::MalformedBuffer("unterminated page path".to_string())
                })?;
            result.use_prefix =
                decode_string.as_bytes()[end_pos] == DOMAIN_PATH_TRUE_END_CHAR as u8;
            result.page_path = decode_string[..end_pos].to_string();
        }
    }

    result.decoded_bytes = metadata.len() - data.len();
    Ok(result)
}

fn terminator_char(flag: bool) -> char {
    if flag {
        DOMAIN_PATH_TRUE_END_CHAR
    } else {
        DOMAIN_PATH_FALSE_END_CHAR
    }
}
