//! CoinSpark metadata codec
//!
//! A compact, bit-packed binary representation for asset issuance, asset
//! transfers, payment references and messages that rides inside a Bitcoin
//! transaction's OP_RETURN output, plus the companion CoinSpark address
//! string format.
//!
//! - `codec`: wire-level machinery (framing, integer and domain/path packing)
//! - `types`: the metadata sections and the address, each with
//!   validate/encode/decode/match/render
//! - `crypto`: asset and message content hashes
//! - `constants`: normative limits, prefixes and lookup tables

pub mod cli;
pub mod codec;
pub mod constants;
pub mod crypto;
pub mod errors;
pub mod types;

pub use codec::{
    metadata_append, metadata_max_append_len, metadata_to_script, metadata_to_script_hex,
    script_hex_to_metadata, script_is_regular, script_to_metadata, scripts_hex_to_metadata,
    scripts_to_metadata, Rounding,
};
pub use crypto::{calc_asset_hash, calc_message_hash};
pub use errors::{CodecError, CodecResult};
pub use types::{
    Address, AssetQty, AssetRef, Genesis, IORange, Message, MessagePart, PaymentRef, SatoshiQty,
    Transfer, TransferList,
};
