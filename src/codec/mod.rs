//! Wire-level machinery shared by every metadata section: little-endian
//! integer I/O, domain/path compression, range packing and the outer
//! `SPK`/OP_RETURN framing.

pub mod binary;
pub mod domain_path;
pub mod framing;
pub mod packing;

pub use binary::{
    mantissa_exponent_to_qty, qty_to_mantissa_exponent, shift_le_uint,
    unsigned_to_small_endian_hex, write_le_uint, Rounding,
};
pub use domain_path::{
    decode_domain_and_or_path, encode_domain_and_or_path, expand_domain_name,
    shrink_lower_domain_name, DecodedDomainPath,
};
pub use framing::{
    locate_metadata_range, metadata_append, metadata_max_append_len, metadata_to_script,
    metadata_to_script_hex, script_hex_to_metadata, script_is_regular, script_to_metadata,
    scripts_hex_to_metadata, scripts_to_metadata,
};
pub use packing::{OutputRangePacking, PackingByteCounts, PackingType};
