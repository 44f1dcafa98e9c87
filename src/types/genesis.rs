//! Genesis sections (`g`): the issuance record of a new asset.
//!
//! A genesis carries the issued quantity and any transfer charges as
//! mantissa/exponent floats, the asset web page location in packed form, and
//! a prefix of the asset hash filling whatever space remains.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{
    decode_domain_and_or_path, encode_domain_and_or_path, locate_metadata_range,
    mantissa_exponent_to_qty, qty_to_mantissa_exponent, shift_le_uint, shrink_lower_domain_name,
    unsigned_to_small_endian_hex, write_le_uint, Rounding,
};
use crate::constants::*;
use crate::errors::{CodecError, CodecResult};
use crate::types::{
    count_non_last_regular_outputs, last_regular_output, min_fee_basis, AssetQty, SatoshiQty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub qty_mantissa: u16,
    pub qty_exponent: u16,
    pub charge_flat_mantissa: u16,
    pub charge_flat_exponent: u16,
    /// Hundredths of a percent charged on each transfer.
    pub charge_basis_points: u16,
    pub use_https: bool,
    pub domain_name: String,
    /// Whether the asset web page path carries the `coinspark/` prefix.
    pub use_prefix: bool,
    pub page_path: String,
    pub asset_hash: Vec<u8>,
    /// Number of bytes of `asset_hash` that are valid for comparison.
    pub asset_hash_len: usize,
}

impl Default for Genesis {
    fn default() -> Self {
        Genesis {
            qty_mantissa: 0,
            qty_exponent: 0,
            charge_flat_mantissa: 0,
            charge_flat_exponent: 0,
            charge_basis_points: 0,
            use_https: false,
            domain_name: String::new(),
            use_prefix: true,
            page_path: String::new(),
            asset_hash: Vec::new(),
            asset_hash_len: 0,
        }
    }
}

impl Genesis {
    pub fn is_valid(&self) -> bool {
        if self.qty_mantissa < GENESIS_QTY_MANTISSA_MIN
            || self.qty_mantissa > GENESIS_QTY_MANTISSA_MAX
        {
            return false;
        }
        if self.qty_exponent > GENESIS_QTY_EXPONENT_MAX {
            return false;
        }
        if self.charge_flat_exponent > GENESIS_CHARGE_FLAT_EXPONENT_MAX {
            return false;
        }

        let flat_mantissa_max = if self.charge_flat_exponent == GENESIS_CHARGE_FLAT_EXPONENT_MAX {
            GENESIS_CHARGE_FLAT_MANTISSA_MAX_IF_EXP_MAX
        } else {
            GENESIS_CHARGE_FLAT_MANTISSA_MAX
        };
        if self.charge_flat_mantissa > flat_mantissa_max {
            return false;
        }

        if self.charge_basis_points > GENESIS_CHARGE_BASIS_POINTS_MAX {
            return false;
        }
        if self.domain_name.len() > GENESIS_DOMAIN_NAME_MAX_LEN {
            return false;
        }
        if self.page_path.len() > GENESIS_PAGE_PATH_MAX_LEN {
            return false;
        }
        if self.asset_hash.len() < self.asset_hash_len {
            return false;
        }
        if self.asset_hash_len < GENESIS_HASH_MIN_LEN || self.asset_hash_len > GENESIS_HASH_MAX_LEN
        {
            return false;
        }
        true
    }

    pub fn get_qty(&self) -> AssetQty {
        mantissa_exponent_to_qty(self.qty_mantissa, self.qty_exponent)
    }

    /// Set the issued quantity to the representable value closest to
    /// `desired_qty` in the given rounding direction; returns what was set.
    pub fn set_qty(&mut self, desired_qty: AssetQty, rounding: Rounding) -> AssetQty {
        let (_, mantissa, exponent) = qty_to_mantissa_exponent(
            desired_qty,
            rounding,
            GENESIS_QTY_MANTISSA_MAX,
            GENESIS_QTY_EXPONENT_MAX,
        );
        self.qty_mantissa = mantissa;
        self.qty_exponent = exponent;
        self.get_qty()
    }

    pub fn get_charge_flat(&self) -> AssetQty {
        mantissa_exponent_to_qty(self.charge_flat_mantissa, self.charge_flat_exponent)
    }

    pub fn set_charge_flat(&mut self, desired_charge_flat: AssetQty, rounding: Rounding) -> AssetQty {
        let (_, mut mantissa, exponent) = qty_to_mantissa_exponent(
            desired_charge_flat,
            rounding,
            GENESIS_CHARGE_FLAT_MANTISSA_MAX,
            GENESIS_CHARGE_FLAT_EXPONENT_MAX,
        );
        if exponent == GENESIS_CHARGE_FLAT_EXPONENT_MAX {
            mantissa = mantissa.min(GENESIS_CHARGE_FLAT_MANTISSA_MAX_IF_EXP_MAX);
        }
        self.charge_flat_mantissa = mantissa;
        self.charge_flat_exponent = exponent;
        self.get_charge_flat()
    }

    pub fn get_hash_len(&self) -> usize {
        self.asset_hash_len
    }

    pub fn matches(&self, other: &Genesis, strict: bool) -> bool {
        let hash_compare_len = self
            .asset_hash_len
            .min(other.asset_hash_len)
            .min(GENESIS_HASH_MAX_LEN);

        let float_quantities_match = if strict {
            self.qty_mantissa == other.qty_mantissa
                && self.qty_exponent == other.qty_exponent
                && self.charge_flat_mantissa == other.charge_flat_mantissa
                && self.charge_flat_exponent == other.charge_flat_exponent
        } else {
            self.get_qty() == other.get_qty()
                && self.get_charge_flat() == other.get_charge_flat()
        };

        float_quantities_match
            && self.charge_basis_points == other.charge_basis_points
            && self.use_https == other.use_https
            && self.domain_name.eq_ignore_ascii_case(&other.domain_name)
            && self.use_prefix == other.use_prefix
            && self.page_path.eq_ignore_ascii_case(&other.page_path)
            && self.asset_hash[..hash_compare_len] == other.asset_hash[..hash_compare_len]
    }

    /// Divide the issued quantity between the regular outputs, excluding the
    /// last regular one (the default sink); any remainder from the integer
    /// division lands on the first receiving output.
    pub fn apply(&self, outputs_regular: &[bool]) -> Vec<AssetQty> {
        let count_outputs = outputs_regular.len();
        let mut output_balances = vec![0; count_outputs];

        let last_regular = last_regular_output(outputs_regular);
        let divide_outputs = count_non_last_regular_outputs(outputs_regular);
        let genesis_qty = self.get_qty();

        let qty_per_output = if divide_outputs == 0 {
            0
        } else {
            genesis_qty / divide_outputs as u64
        };

        let mut extra_first_output = genesis_qty - qty_per_output * divide_outputs as u64;
        for (output_index, balance) in output_balances.iter_mut().enumerate() {
            if outputs_regular[output_index] && Some(output_index) != last_regular {
                *balance = qty_per_output + extra_first_output;
                extra_first_output = 0;
            }
        }

        output_balances
    }

    /// The URL of the asset web page. When no page path was issued, the path
    /// falls back to 16 characters of the doubled first-spent txid starting
    /// at `first_spent_vout mod 64`.
    pub fn calc_asset_url(
        &self,
        first_spent_txid: &str,
        first_spent_vout: usize,
    ) -> CodecResult<String> {
        let protocol = if self.use_https { "https" } else { "http" };
        let prefix = if self.use_prefix { "coinspark/" } else { "" };

        let suffix = if self.page_path.is_empty() {
            if first_spent_txid.len() != 64 || !first_spent_txid.is_ascii() {
                return Err(CodecError::OutOfRange(format!(
                    "first spent txid {:?}",
                    first_spent_txid
                )));
            }
            let doubled = format!("{}{}", first_spent_txid, first_spent_txid);
            let start_pos = first_spent_vout % 64;
            doubled[start_pos..start_pos + 16].to_string()
        } else {
            self.page_path.clone()
        };

        Ok(format!(
            "{}://{}/{}{}/",
            protocol, self.domain_name, prefix, suffix
        ))
    }

    /// Charge levied when `qty_gross` arrives at a transfer output: the flat
    /// charge plus basis points rounded to nearest, capped at the quantity.
    pub fn calc_charge(&self, qty_gross: AssetQty) -> AssetQty {
        let charge = self.get_charge_flat()
            + (qty_gross * self.charge_basis_points as u64 + 5000) / 10000;
        qty_gross.min(charge)
    }

    pub fn calc_net(&self, qty_gross: AssetQty) -> AssetQty {
        qty_gross - self.calc_charge(qty_gross)
    }

    /// Smallest gross quantity whose net is at least `qty_net`.
    pub fn calc_gross(&self, qty_net: AssetQty) -> AssetQty {
        if qty_net == 0 {
            return 0;
        }

        let lower_gross =
            ((qty_net + self.get_charge_flat()) * 10000) / (10000 - self.charge_basis_points as u64);

        if self.calc_net(lower_gross) >= qty_net {
            lower_gross
        } else {
            lower_gross + 1
        }
    }

    /// Largest asset hash length that still fits a genesis in
    /// `metadata_max_len` bytes.
    pub fn calc_hash_len(&self, metadata_max_len: usize) -> usize {
        let mut asset_hash_len = metadata_max_len as isize
            - METADATA_IDENTIFIER_LEN as isize
            - 1
            - GENESIS_QTY_FLAGS_LENGTH as isize;

        if self.charge_flat_mantissa > 0 {
            asset_hash_len -= GENESIS_CHARGE_FLAT_LENGTH as isize;
        }
        if self.charge_basis_points > 0 {
            asset_hash_len -= GENESIS_CHARGE_BPS_LENGTH as isize;
        }

        let mut domain_path_len = self.page_path.len() + 1;
        if self.domain_name.parse::<std::net::Ipv4Addr>().is_ok() {
            asset_hash_len -= 5; // packing byte and IP octets
        } else {
            asset_hash_len -= 1; // packing byte
            let (short_domain_name, _) = shrink_lower_domain_name(&self.domain_name);
            domain_path_len += short_domain_name.len() + 1;
        }

        asset_hash_len -= 2 * ((domain_path_len as isize + 2) / 3);

        asset_hash_len.clamp(0, GENESIS_HASH_MAX_LEN as isize) as usize
    }

    /// The fee a genesis transaction must pay to be valid: one fee basis per
    /// regular output that receives part of the issuance.
    pub fn calc_min_fee(
        &self,
        outputs_satoshis: &[SatoshiQty],
        outputs_regular: &[bool],
    ) -> SatoshiQty {
        count_non_last_regular_outputs(outputs_regular) as u64
            * min_fee_basis(outputs_satoshis, outputs_regular)
    }

    /// Encode as a complete `SPK g` payload.
    pub fn encode(&self, metadata_max_len: usize) -> CodecResult<Vec<u8>> {
        if !self.is_valid() {
            return Err(CodecError::OutOfRange("invalid genesis fields".to_string()));
        }

        let mut metadata = METADATA_IDENTIFIER.to_vec();
        metadata.push(GENESIS_PREFIX);

        let mut quantity_encoded =
            (self.qty_exponent * GENESIS_QTY_EXPONENT_MULTIPLE + self.qty_mantissa)
                & GENESIS_QTY_MASK;
        if self.charge_flat_mantissa > 0 {
            quantity_encoded |= GENESIS_FLAG_CHARGE_FLAT;
        }
        if self.charge_basis_points > 0 {
            quantity_encoded |= GENESIS_FLAG_CHARGE_BPS;
        }
        metadata.extend_from_slice(&write_le_uint(
            quantity_encoded as u64,
            GENESIS_QTY_FLAGS_LENGTH,
        )?);

        if quantity_encoded & GENESIS_FLAG_CHARGE_FLAT != 0 {
            let charge_encoded = self.charge_flat_exponent * GENESIS_CHARGE_FLAT_EXPONENT_MULTIPLE
                + self.charge_flat_mantissa;
            metadata.push(charge_encoded as u8);
        }
        if quantity_encoded & GENESIS_FLAG_CHARGE_BPS != 0 {
            metadata.push(self.charge_basis_points as u8);
        }

        metadata.extend_from_slice(&encode_domain_and_or_path(
            &self.domain_name,
            self.use_https,
            &self.page_path,
            self.use_prefix,
            false,
        )?);

        metadata.extend_from_slice(&self.asset_hash[..self.asset_hash_len]);

        if metadata.len() > metadata_max_len {
            return Err(CodecError::Overflow(format!(
                "genesis needs {} bytes, limit is {}",
                metadata.len(),
                metadata_max_len
            )));
        }
        Ok(metadata)
    }

    /// Decode from a framed payload containing a `g` section.
    pub fn decode(buffer: &[u8]) -> CodecResult<Genesis> {
        let mut metadata = locate_metadata_range(buffer, GENESIS_PREFIX)
            .ok_or_else(|| CodecError::NotCoinSpark("no genesis section".to_string()))?;

        let quantity_encoded = shift_le_uint(&mut metadata, GENESIS_QTY_FLAGS_LENGTH)? as u16;
        if quantity_encoded == 0 {
            return Err(CodecError::OutOfRange("zero genesis quantity".to_string()));
        }

        let mut genesis = Genesis {
            qty_mantissa: (quantity_encoded & GENESIS_QTY_MASK) % GENESIS_QTY_EXPONENT_MULTIPLE,
            qty_exponent: (quantity_encoded & GENESIS_QTY_MASK) / GENESIS_QTY_EXPONENT_MULTIPLE,
            ..Genesis::default()
        };

        if quantity_encoded & GENESIS_FLAG_CHARGE_FLAT != 0 {
            let charge_encoded = shift_le_uint(&mut metadata, GENESIS_CHARGE_FLAT_LENGTH)? as u16;
            genesis.charge_flat_mantissa = charge_encoded % GENESIS_CHARGE_FLAT_EXPONENT_MULTIPLE;
            genesis.charge_flat_exponent = charge_encoded / GENESIS_CHARGE_FLAT_EXPONENT_MULTIPLE;
        }
        if quantity_encoded & GENESIS_FLAG_CHARGE_BPS != 0 {
            genesis.charge_basis_points = shift_le_uint(&mut metadata, GENESIS_CHARGE_BPS_LENGTH)? as u16;
        }

        let decoded = decode_domain_and_or_path(metadata, true, true, false)?;
        metadata = &metadata[decoded.decoded_bytes..];
        genesis.use_https = decoded.use_https;
        genesis.domain_name = decoded.domain_name;
        genesis.use_prefix = decoded.use_prefix;
        genesis.page_path = decoded.page_path;

        genesis.asset_hash_len = metadata.len().min(GENESIS_HASH_MAX_LEN);
        genesis.asset_hash = metadata[..genesis.asset_hash_len].to_vec();

        if !genesis.is_valid() {
            debug!(
                "genesis decoded but failed validation: mantissa {} exponent {}",
                genesis.qty_mantissa, genesis.qty_exponent
            );
            return Err(CodecError::OutOfRange("invalid genesis fields".to_string()));
        }
        Ok(genesis)
    }
}

impl fmt::Display for Genesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quantity = self.get_qty();
        let quantity_encoded =
            (self.qty_exponent * GENESIS_QTY_EXPONENT_MULTIPLE + self.qty_mantissa)
                & GENESIS_QTY_MASK;
        let charge_flat = self.get_charge_flat();
        let charge_flat_encoded = self.charge_flat_exponent * GENESIS_CHARGE_FLAT_EXPONENT_MULTIPLE
            + self.charge_flat_mantissa;
        let domain_path_metadata = encode_domain_and_or_path(
            &self.domain_name,
            self.use_https,
            &self.page_path,
            self.use_prefix,
            false,
        )
        .unwrap_or_default();

        writeln!(f, "COINSPARK GENESIS")?;
        writeln!(f, "   Quantity mantissa: {}", self.qty_mantissa)?;
        writeln!(f, "   Quantity exponent: {}", self.qty_exponent)?;
        writeln!(
            f,
            "    Quantity encoded: {} (small endian hex {})",
            quantity_encoded,
            unsigned_to_small_endian_hex(quantity_encoded as u64, GENESIS_QTY_FLAGS_LENGTH)
        )?;
        writeln!(f, "      Quantity value: {}", quantity)?;
        writeln!(f, "Flat charge mantissa: {}", self.charge_flat_mantissa)?;
        writeln!(f, "Flat charge exponent: {}", self.charge_flat_exponent)?;
        writeln!(
            f,
            " Flat charge encoded: {} (small endian hex {})",
            charge_flat_encoded,
            unsigned_to_small_endian_hex(charge_flat_encoded as u64, GENESIS_CHARGE_FLAT_LENGTH)
        )?;
        writeln!(f, "   Flat charge value: {}", charge_flat)?;
        writeln!(
            f,
            " Basis points charge: {} (hex {})",
            self.charge_basis_points,
            unsigned_to_small_endian_hex(self.charge_basis_points as u64, GENESIS_CHARGE_BPS_LENGTH)
        )?;

        let http_mode = if self.use_https { "https" } else { "http" };
        let prefix = if self.use_prefix { "coinspark/" } else { "" };
        let page_path = if self.page_path.is_empty() {
            "[spent-txid]"
        } else {
            &self.page_path
        };
        writeln!(
            f,
            "           Asset URL: {}://{}/{}{}/ (length {}+{} encoded {} length {})",
            http_mode,
            self.domain_name,
            prefix,
            page_path,
            self.domain_name.len(),
            self.page_path.len(),
            hex::encode_upper(&domain_path_metadata),
            domain_path_metadata.len()
        )?;

        writeln!(
            f,
            "          Asset hash: {} (length {})",
            hex::encode_upper(&self.asset_hash[..self.asset_hash_len.min(self.asset_hash.len())]),
            self.asset_hash_len
        )?;
        writeln!(f, "END COINSPARK GENESIS")?;
        writeln!(f)
    }
}
