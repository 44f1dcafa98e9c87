//! Content-hash derivations for assets and messages.

pub mod hashes;

pub use hashes::{calc_asset_hash, calc_message_hash};
