//! Transfer sections (`t`): how asset balances move from inputs to outputs.
//!
//! Each transfer names an asset, an input range to draw from, an output
//! range to fill and a per-output quantity, all packed against the previous
//! transfer in the list so runs of related transfers stay compact. The
//! section is always last in a payload, so the list simply decodes until the
//! buffer ends.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::packing::{
    decode_packing_extend, encode_packing_extend, packing_options, packing_type_to_values,
    transfer_byte_counts, PackingType,
};
use crate::codec::{
    locate_metadata_range, mantissa_exponent_to_qty, qty_to_mantissa_exponent, shift_le_uint,
    unsigned_to_small_endian_hex, write_le_uint, Rounding,
};
use crate::constants::*;
use crate::errors::{CodecError, CodecResult};
use crate::types::{
    last_regular_output, min_fee_basis, AssetQty, AssetRef, Genesis, IORange, SatoshiQty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset_ref: AssetRef,
    pub inputs: IORange,
    pub outputs: IORange,
    pub qty_per_output: AssetQty,
}

impl Default for Transfer {
    fn default() -> Self {
        Transfer {
            asset_ref: AssetRef::DefaultRoute,
            inputs: IORange::default(),
            outputs: IORange::default(),
            qty_per_output: 0,
        }
    }
}

impl Transfer {
    pub fn is_valid(&self) -> bool {
        self.qty_per_output <= ASSET_QTY_MAX
    }

    /// Default-route transfers compare by inputs and first output only;
    /// everything else compares in full.
    pub fn matches(&self, other: &Transfer) -> bool {
        if self.asset_ref.is_default_route() {
            return other.asset_ref.is_default_route()
                && self.inputs.matches(&other.inputs)
                && self.outputs.first == other.outputs.first;
        }
        self.asset_ref.matches(&other.asset_ref)
            && self.inputs.matches(&other.inputs)
            && self.outputs.matches(&other.outputs)
            && self.qty_per_output == other.qty_per_output
    }

    /// Decode one transfer from the front of `metadata`, returning it with
    /// the number of bytes consumed.
    pub fn decode(
        metadata: &[u8],
        previous_transfer: Option<&Transfer>,
        count_inputs: usize,
        count_outputs: usize,
    ) -> CodecResult<(Transfer, usize)> {
        let mut data = metadata;

        let packing = shift_le_uint(&mut data, 1)? as u8;

        // packing for the genesis reference
        let mut asset_ref = if packing & PACKING_GENESIS_MASK == PACKING_GENESIS_PREV {
            match previous_transfer {
                Some(previous) => previous.asset_ref,
                None => AssetRef::DefaultRoute,
            }
        } else {
            AssetRef::new(0, 0, [0; ASSETREF_TXID_PREFIX_LEN])
        };

        // packing for input and output indices
        let index_types = if packing & PACKING_INDICES_MASK == PACKING_INDICES_EXTEND {
            let packing_extend = shift_le_uint(&mut data, 1)? as u8;
            if packing_extend == 0 {
                return Err(CodecError::MalformedBuffer(
                    "zero extend packing byte".to_string(),
                ));
            }
            let input_type = decode_packing_extend(
                (packing_extend >> PACKING_EXTEND_INPUTS_SHIFT) & PACKING_EXTEND_MASK,
                false,
            )?;
            let output_type = decode_packing_extend(
                (packing_extend >> PACKING_EXTEND_OUTPUTS_SHIFT) & PACKING_EXTEND_MASK,
                false,
            )?;
            Some((input_type, output_type))
        } else {
            None
        };

        let (input_type, output_type) = match index_types {
            Some(types) => types,
            None => match packing & PACKING_INDICES_MASK {
                PACKING_INDICES_0P_0P => (PackingType::ZeroOrPrev, PackingType::ZeroOrPrev),
                PACKING_INDICES_0P_1S => (PackingType::ZeroOrPrev, PackingType::SubsequentSingle),
                PACKING_INDICES_0P_ALL => (PackingType::ZeroOrPrev, PackingType::All),
                PACKING_INDICES_1S_0P => (PackingType::SubsequentSingle, PackingType::ZeroOrPrev),
                PACKING_INDICES_ALL_0P => (PackingType::All, PackingType::ZeroOrPrev),
                PACKING_INDICES_ALL_1S => (PackingType::All, PackingType::SubsequentSingle),
                PACKING_INDICES_ALL_ALL => (PackingType::All, PackingType::All),
                other => {
                    return Err(CodecError::MalformedBuffer(format!(
                        "index packing {:#04x}",
                        other
                    )))
                }
            },
        };

        let mut inputs = packing_type_to_values(
            input_type,
            previous_transfer.map(|previous| &previous.inputs),
            count_inputs,
        )?;
        let mut outputs = packing_type_to_values(
            output_type,
            previous_transfer.map(|previous| &previous.outputs),
            count_outputs,
        )?;

        // read the explicit fields this packing calls for
        let counts = transfer_byte_counts(packing, index_types);

        let block_num = shift_le_uint(&mut data, counts.block_num)?;
        let tx_offset = shift_le_uint(&mut data, counts.tx_offset)?;
        if counts.txid_prefix > 0 {
            if data.len() < counts.txid_prefix {
                return Err(CodecError::MalformedBuffer(
                    "truncated txid prefix".to_string(),
                ));
            }
            let mut txid_prefix = [0u8; ASSETREF_TXID_PREFIX_LEN];
            txid_prefix.copy_from_slice(&data[..counts.txid_prefix]);
            data = &data[counts.txid_prefix..];
            asset_ref = AssetRef::new(block_num as u32, tx_offset as u32, txid_prefix);
        }

        if counts.first_input > 0 {
            inputs.first = shift_le_uint(&mut data, counts.first_input)? as u16;
        }
        if counts.count_inputs > 0 {
            inputs.count = shift_le_uint(&mut data, counts.count_inputs)? as u16;
        }
        if counts.first_output > 0 {
            outputs.first = shift_le_uint(&mut data, counts.first_output)? as u16;
        }
        if counts.count_outputs > 0 {
            outputs.count = shift_le_uint(&mut data, counts.count_outputs)? as u16;
        }

        let mut qty_per_output = shift_le_uint(&mut data, counts.quantity)?;

        // quantities with no explicit bytes, plus the float form
        match packing & PACKING_QUANTITY_MASK {
            PACKING_QUANTITY_1P => {
                qty_per_output = match previous_transfer {
                    Some(previous) => previous.qty_per_output,
                    None => 1,
                };
            }
            PACKING_QUANTITY_MAX => qty_per_output = ASSET_QTY_MAX,
            PACKING_QUANTITY_FLOAT => {
                let encoded = (qty_per_output as u16) & TRANSFER_QTY_FLOAT_MASK;
                qty_per_output = mantissa_exponent_to_qty(
                    encoded % TRANSFER_QTY_FLOAT_EXPONENT_MULTIPLE,
                    encoded / TRANSFER_QTY_FLOAT_EXPONENT_MULTIPLE,
                );
            }
            _ => {}
        }

        let transfer = Transfer {
            asset_ref,
            inputs,
            outputs,
            qty_per_output,
        };
        if !transfer.is_valid() {
            return Err(CodecError::OutOfRange("invalid transfer fields".to_string()));
        }
        Ok((transfer, metadata.len() - data.len()))
    }

    /// Encode one transfer (no identifier or section prefix), packed against
    /// the previous transfer where possible.
    pub fn encode(
        &self,
        previous_transfer: Option<&Transfer>,
        metadata_max_len: usize,
        count_inputs: usize,
        count_outputs: usize,
    ) -> CodecResult<Vec<u8>> {
        if !self.is_valid() {
            return Err(CodecError::OutOfRange("invalid transfer fields".to_string()));
        }

        let mut packing: u8 = 0;
        let mut packing_extend: u8 = 0;

        // packing for the genesis reference
        match self.asset_ref {
            AssetRef::DefaultRoute => {
                if let Some(previous) = previous_transfer {
                    if !previous.asset_ref.is_default_route() {
                        return Err(CodecError::InvariantViolation(
                            "default route transfers must come first".to_string(),
                        ));
                    }
                }
                packing |= PACKING_GENESIS_PREV;
            }
            AssetRef::Indexed {
                block_num,
                tx_offset,
                ..
            } => {
                if previous_transfer
                    .map(|previous| self.asset_ref.matches(&previous.asset_ref))
                    .unwrap_or(false)
                {
                    packing |= PACKING_GENESIS_PREV;
                } else if block_num as u64 <= UNSIGNED_3_BYTES_MAX {
                    if tx_offset as u64 <= UNSIGNED_3_BYTES_MAX {
                        packing |= PACKING_GENESIS_3_3_BYTES;
                    } else {
                        packing |= PACKING_GENESIS_3_4_BYTES;
                    }
                } else {
                    packing |= PACKING_GENESIS_4_4_BYTES;
                }
            }
        }

        // packing for input and output indices
        let input_options = packing_options(
            previous_transfer.map(|previous| &previous.inputs),
            &self.inputs,
            count_inputs,
            false,
        );
        let output_options = packing_options(
            previous_transfer.map(|previous| &previous.outputs),
            &self.outputs,
            count_outputs,
            false,
        );

        const ZERO_OR_PREV: usize = 0;
        const SUBSEQUENT: usize = 1;
        const ALL: usize = 2;

        let compact = [
            (ZERO_OR_PREV, ZERO_OR_PREV, PACKING_INDICES_0P_0P),
            (ZERO_OR_PREV, SUBSEQUENT, PACKING_INDICES_0P_1S),
            (ZERO_OR_PREV, ALL, PACKING_INDICES_0P_ALL),
            (SUBSEQUENT, ZERO_OR_PREV, PACKING_INDICES_1S_0P),
            (ALL, ZERO_OR_PREV, PACKING_INDICES_ALL_0P),
            (ALL, SUBSEQUENT, PACKING_INDICES_ALL_1S),
            (ALL, ALL, PACKING_INDICES_ALL_ALL),
        ]
        .iter()
        .find(|(input, output, _)| input_options[*input] && output_options[*output]);

        let index_types = match compact {
            Some((_, _, indices)) => {
                packing |= indices;
                None
            }
            None => {
                // we need the second (extended) packing byte
                packing |= PACKING_INDICES_EXTEND;
                let input_type = encode_packing_extend(&input_options)?;
                let output_type = encode_packing_extend(&output_options)?;
                packing_extend = (input_type.extend_value() << PACKING_EXTEND_INPUTS_SHIFT)
                    | (output_type.extend_value() << PACKING_EXTEND_OUTPUTS_SHIFT);
                Some((input_type, output_type))
            }
        };

        // packing for the quantity
        let mut encode_quantity = self.qty_per_output;
        let previous_quantity = previous_transfer
            .map(|previous| previous.qty_per_output)
            .unwrap_or(1);

        if self.qty_per_output == previous_quantity {
            packing |= PACKING_QUANTITY_1P;
        } else if self.qty_per_output >= ASSET_QTY_MAX {
            packing |= PACKING_QUANTITY_MAX;
        } else if self.qty_per_output <= UNSIGNED_BYTE_MAX {
            packing |= PACKING_QUANTITY_1_BYTE;
        } else if self.qty_per_output <= UNSIGNED_2_BYTES_MAX {
            packing |= PACKING_QUANTITY_2_BYTES;
        } else {
            let (quantity, mantissa, exponent) = qty_to_mantissa_exponent(
                self.qty_per_output,
                Rounding::Nearest,
                TRANSFER_QTY_FLOAT_MANTISSA_MAX,
                TRANSFER_QTY_FLOAT_EXPONENT_MAX,
            );
            if quantity == self.qty_per_output {
                packing |= PACKING_QUANTITY_FLOAT;
                encode_quantity = ((exponent * TRANSFER_QTY_FLOAT_EXPONENT_MULTIPLE + mantissa)
                    & TRANSFER_QTY_FLOAT_MASK) as u64;
            } else if self.qty_per_output <= UNSIGNED_3_BYTES_MAX {
                packing |= PACKING_QUANTITY_3_BYTES;
            } else if self.qty_per_output <= UNSIGNED_4_BYTES_MAX {
                packing |= PACKING_QUANTITY_4_BYTES;
            } else {
                packing |= PACKING_QUANTITY_6_BYTES;
            }
        }

        // write out the actual data
        let counts = transfer_byte_counts(packing, index_types);

        let mut metadata = vec![packing];
        if packing & PACKING_INDICES_MASK == PACKING_INDICES_EXTEND {
            metadata.push(packing_extend);
        }

        if let AssetRef::Indexed {
            block_num,
            tx_offset,
            txid_prefix,
        } = self.asset_ref
        {
            metadata.extend_from_slice(&write_le_uint(block_num as u64, counts.block_num)?);
            metadata.extend_from_slice(&write_le_uint(tx_offset as u64, counts.tx_offset)?);
            metadata.extend_from_slice(&txid_prefix[..counts.txid_prefix]);
        }

        metadata.extend_from_slice(&write_le_uint(self.inputs.first as u64, counts.first_input)?);
        metadata.extend_from_slice(&write_le_uint(self.inputs.count as u64, counts.count_inputs)?);
        metadata.extend_from_slice(&write_le_uint(self.outputs.first as u64, counts.first_output)?);
        metadata.extend_from_slice(&write_le_uint(
            self.outputs.count as u64,
            counts.count_outputs,
        )?);
        metadata.extend_from_slice(&write_le_uint(encode_quantity, counts.quantity)?);

        if metadata.len() > metadata_max_len {
            return Err(CodecError::Overflow(format!(
                "transfer needs {} bytes, limit is {}",
                metadata.len(),
                metadata_max_len
            )));
        }
        Ok(metadata)
    }

    pub(crate) fn render_inner(&self, headers: bool) -> String {
        let mut buffer = String::new();
        if headers {
            buffer.push_str("COINSPARK TRANSFER\n");
        }

        let is_default_route = self.asset_ref.is_default_route();
        if is_default_route {
            buffer.push_str("      Default route:\n");
        } else {
            buffer.push_str(&self.asset_ref.render_inner(false));
            buffer.push_str(&format!(
                "    Asset reference: {}\n",
                self.asset_ref.encode().unwrap_or_default()
            ));
        }

        if self.inputs.count > 0 {
            if self.inputs.count > 1 {
                buffer.push_str(&format!(
                    "             Inputs: {} - {} (count {})",
                    self.inputs.first,
                    self.inputs.first as u32 + self.inputs.count as u32 - 1,
                    self.inputs.count
                ));
            } else {
                buffer.push_str(&format!("              Input: {}", self.inputs.first));
            }
        } else {
            buffer.push_str("             Inputs: none");
        }
        buffer.push_str(&format!(
            " (small endian hex: first {} count {})\n",
            unsigned_to_small_endian_hex(self.inputs.first as u64, 2),
            unsigned_to_small_endian_hex(self.inputs.count as u64, 2)
        ));

        if self.outputs.count > 0 {
            if self.outputs.count > 1 && !is_default_route {
                buffer.push_str(&format!(
                    "            Outputs: {} - {} (count {})",
                    self.outputs.first,
                    self.outputs.first as u32 + self.outputs.count as u32 - 1,
                    self.outputs.count
                ));
            } else {
                buffer.push_str(&format!("             Output: {}", self.outputs.first));
            }
        } else {
            buffer.push_str("            Outputs: none");
        }
        buffer.push_str(&format!(
            " (small endian hex: first {} count {})\n",
            unsigned_to_small_endian_hex(self.outputs.first as u64, 2),
            unsigned_to_small_endian_hex(self.outputs.count as u64, 2)
        ));

        if !is_default_route {
            buffer.push_str(&format!(
                "     Qty per output: {} (small endian hex {}",
                self.qty_per_output,
                unsigned_to_small_endian_hex(self.qty_per_output, 8)
            ));

            let (quantity, mantissa, exponent) = qty_to_mantissa_exponent(
                self.qty_per_output,
                Rounding::Nearest,
                TRANSFER_QTY_FLOAT_MANTISSA_MAX,
                TRANSFER_QTY_FLOAT_EXPONENT_MAX,
            );
            if quantity == self.qty_per_output {
                let encoded = (exponent * TRANSFER_QTY_FLOAT_EXPONENT_MULTIPLE + mantissa)
                    & TRANSFER_QTY_FLOAT_MASK;
                buffer.push_str(&format!(
                    ", as float {}",
                    unsigned_to_small_endian_hex(encoded as u64, TRANSFER_QTY_FLOAT_LENGTH)
                ));
            }
            buffer.push_str(")\n");
        }

        if headers {
            buffer.push_str("END COINSPARK TRANSFER\n\n");
        }
        buffer
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_inner(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferList {
    pub transfers: Vec<Transfer>,
}

impl TransferList {
    pub fn new(transfers: Vec<Transfer>) -> Self {
        TransferList { transfers }
    }

    pub fn is_valid(&self) -> bool {
        self.transfers.iter().all(Transfer::is_valid)
    }

    /// The order transfers are encoded in: default routes first, then runs
    /// sharing an asset reference, ties broken by ascending reference.
    pub fn group_ordering(&self) -> Vec<usize> {
        let count_transfers = self.transfers.len();
        let mut ordering: Vec<usize> = Vec::with_capacity(count_transfers);
        let mut transfer_used = vec![false; count_transfers];

        for order_index in 0..count_transfers {
            let mut best_score = 0;
            let mut best_index: Option<usize> = None;

            for (transfer_index, transfer) in self.transfers.iter().enumerate() {
                if transfer_used[transfer_index] {
                    continue;
                }

                let score = if transfer.asset_ref.is_default_route() {
                    3 // default routes must come first in the encoded list
                } else if order_index > 0
                    && transfer
                        .asset_ref
                        .matches(&self.transfers[ordering[order_index - 1]].asset_ref)
                {
                    2 // next best shares the previous asset reference
                } else {
                    1
                };

                match best_index {
                    Some(current_best) if score == best_score => {
                        if transfer.asset_ref < self.transfers[current_best].asset_ref {
                            best_index = Some(transfer_index);
                        }
                    }
                    _ if score > best_score => {
                        best_score = score;
                        best_index = Some(transfer_index);
                    }
                    _ => {}
                }
            }

            let best_index = best_index.expect("unused transfer remains");
            ordering.push(best_index);
            transfer_used[best_index] = true;
        }

        ordering
    }

    /// Strict mode compares position by position; loose mode compares the
    /// two lists under their group orderings. Both are symmetric.
    pub fn matches(&self, other: &TransferList, strict: bool) -> bool {
        if self.transfers.len() != other.transfers.len() {
            return false;
        }

        if strict {
            self.transfers
                .iter()
                .zip(&other.transfers)
                .all(|(this, that)| this.matches(that))
        } else {
            let this_ordering = self.group_ordering();
            let other_ordering = other.group_ordering();
            (0..self.transfers.len()).all(|index| {
                self.transfers[this_ordering[index]]
                    .matches(&other.transfers[other_ordering[index]])
            })
        }
    }

    /// The fee the transaction must pay for these transfers to be honoured:
    /// one fee basis for every (transfer, regular output) pair covered.
    pub fn calc_min_fee(
        &self,
        count_inputs: usize,
        outputs_satoshis: &[SatoshiQty],
        outputs_regular: &[bool],
    ) -> SatoshiQty {
        let count_outputs = outputs_satoshis.len();
        if count_outputs != outputs_regular.len() {
            return SATOSHI_QTY_MAX; // these two arrays must be the same size
        }

        let mut transfers_to_cover: u64 = 0;
        for transfer in &self.transfers {
            if transfer.asset_ref.is_default_route() {
                continue; // don't count default routes
            }
            if transfer.inputs.count == 0 || transfer.inputs.first as usize >= count_inputs {
                continue; // only count if at least one valid input index
            }

            let first_output = transfer.outputs.first as usize;
            let until_output =
                (first_output + transfer.outputs.count as usize).min(count_outputs);
            for output_index in first_output..until_output {
                if outputs_regular[output_index] {
                    transfers_to_cover += 1;
                }
            }
        }

        transfers_to_cover * min_fee_basis(outputs_satoshis, outputs_regular)
    }

    /// Where each input's leftover balance defaults to: the last regular
    /// output unless a default-route transfer overrides it. Earlier default
    /// routes take precedence, hence the reverse walk.
    pub fn default_route_map(
        &self,
        count_inputs: usize,
        outputs_regular: &[bool],
    ) -> Vec<Option<usize>> {
        let count_outputs = outputs_regular.len();
        let mut input_default_output = vec![last_regular_output(outputs_regular); count_inputs];

        for transfer in self.transfers.iter().rev() {
            if !transfer.asset_ref.is_default_route() {
                continue;
            }
            let output_index = transfer.outputs.first as usize;
            if output_index >= count_outputs {
                continue;
            }
            let first_input = transfer.inputs.first as usize;
            let until_input = (first_input + transfer.inputs.count as usize).min(count_inputs);
            for destination in &mut input_default_output[first_input.min(count_inputs)..until_input]
            {
                *destination = Some(output_index);
            }
        }

        input_default_output
    }

    /// Flags for which outputs receive any defaulted balance.
    pub fn default_outputs(&self, count_inputs: usize, outputs_regular: &[bool]) -> Vec<bool> {
        let mut outputs_default = vec![false; outputs_regular.len()];
        for destination in self.default_route_map(count_inputs, outputs_regular) {
            if let Some(output_index) = destination {
                outputs_default[output_index] = true;
            }
        }
        outputs_default
    }

    /// Compute the per-output balances of `asset_ref` that result from these
    /// transfers, given the per-input balances. Explicit transfers drain
    /// inputs first-fit in input order; the genesis charge is then applied
    /// per regular output; whatever remains follows the default routes.
    pub fn apply(
        &self,
        asset_ref: &AssetRef,
        genesis: &Genesis,
        input_balances: &[AssetQty],
        outputs_regular: &[bool],
    ) -> Vec<AssetQty> {
        let mut input_balances = input_balances.to_vec();
        let count_inputs = input_balances.len();
        let count_outputs = outputs_regular.len();
        let mut output_balances = vec![0; count_outputs];

        // explicit transfers (i.e. not default routes)
        for transfer in &self.transfers {
            if !asset_ref.matches(&transfer.asset_ref) {
                continue;
            }

            let mut input_index = transfer.inputs.first as usize;
            let until_input = (input_index + transfer.inputs.count as usize).min(count_inputs);
            let first_output = transfer.outputs.first as usize;
            let until_output =
                (first_output + transfer.outputs.count as usize).min(count_outputs);

            for output_index in first_output..until_output {
                if !outputs_regular[output_index] {
                    continue;
                }
                let mut transfer_remaining = transfer.qty_per_output;
                while input_index < until_input {
                    let transfer_quantity =
                        transfer_remaining.min(input_balances[input_index]);
                    if transfer_quantity > 0 {
                        input_balances[input_index] -= transfer_quantity;
                        transfer_remaining -= transfer_quantity;
                        output_balances[output_index] += transfer_quantity;
                    }

                    if transfer_remaining > 0 {
                        input_index += 1; // this input is drained, move on
                    } else {
                        break;
                    }
                }
            }
        }

        // apply payment charges to all quantities not routed by default
        for (output_index, balance) in output_balances.iter_mut().enumerate() {
            if outputs_regular[output_index] {
                *balance = genesis.calc_net(*balance);
            }
        }

        // send remaining quantities to default outputs
        let input_default_output = self.default_route_map(count_inputs, outputs_regular);
        for (input_index, destination) in input_default_output.iter().enumerate() {
            if let Some(output_index) = destination {
                output_balances[*output_index] += input_balances[input_index];
            }
        }

        output_balances
    }

    /// Balances when the transfer list is treated as absent (fee too low):
    /// every input collapses into the last regular output.
    pub fn apply_none(
        &self,
        input_balances: &[AssetQty],
        outputs_regular: &[bool],
    ) -> Vec<AssetQty> {
        let mut output_balances = vec![0; outputs_regular.len()];
        if let Some(output_index) = last_regular_output(outputs_regular) {
            output_balances[output_index] = input_balances.iter().sum();
        }
        output_balances
    }

    /// Encode as a complete `SPK t` payload, in group ordering.
    pub fn encode(
        &self,
        count_inputs: usize,
        count_outputs: usize,
        metadata_max_len: usize,
    ) -> CodecResult<Vec<u8>> {
        let mut metadata = METADATA_IDENTIFIER.to_vec();
        metadata.push(TRANSFERS_PREFIX);

        let ordering = self.group_ordering();
        let mut previous_transfer: Option<&Transfer> = None;

        for transfer_index in ordering {
            let transfer = &self.transfers[transfer_index];
            let written = transfer.encode(
                previous_transfer,
                metadata_max_len.saturating_sub(metadata.len()),
                count_inputs,
                count_outputs,
            )?;
            metadata.extend_from_slice(&written);
            previous_transfer = Some(transfer);
        }

        if metadata.len() > metadata_max_len {
            return Err(CodecError::Overflow(format!(
                "transfers need {} bytes, limit is {}",
                metadata.len(),
                metadata_max_len
            )));
        }
        Ok(metadata)
    }

    /// Decode from a framed payload containing a `t` section; transfers run
    /// to the end of the buffer.
    pub fn decode(
        buffer: &[u8],
        count_inputs: usize,
        count_outputs: usize,
    ) -> CodecResult<TransferList> {
        let mut metadata = locate_metadata_range(buffer, TRANSFERS_PREFIX)
            .ok_or_else(|| CodecError::NotCoinSpark("no transfers section".to_string()))?;

        let mut transfers: Vec<Transfer> = Vec::new();
        while !metadata.is_empty() {
            let (transfer, bytes_used) = Transfer::decode(
                metadata,
                transfers.last(),
                count_inputs,
                count_outputs,
            )?;
            debug!(
                "decoded transfer {} using {} bytes",
                transfers.len(),
                bytes_used
            );
            transfers.push(transfer);
            metadata = &metadata[bytes_used..];
        }

        Ok(TransferList { transfers })
    }
}

impl fmt::Display for TransferList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COINSPARK TRANSFERS")?;
        for (index, transfer) in self.transfers.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            f.write_str(&transfer.render_inner(false))?;
        }
        writeln!(f, "END COINSPARK TRANSFERS")?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetRef {
        AssetRef::new(456789, 65432, [0xA0, 0x5B])
    }

    fn plain_genesis() -> Genesis {
        Genesis {
            qty_mantissa: 100,
            qty_exponent: 2,
            domain_name: "example.com".to_string(),
            asset_hash: vec![0; 16],
            asset_hash_len: 16,
            ..Genesis::default()
        }
    }

    fn transfer(first_in: u16, count_in: u16, first_out: u16, count_out: u16, qty: u64) -> Transfer {
        Transfer {
            asset_ref: asset(),
            inputs: IORange::new(first_in, count_in),
            outputs: IORange::new(first_out, count_out),
            qty_per_output: qty,
        }
    }

    #[test]
    fn test_single_transfer_round_trip() {
        let original = transfer(0, 1, 1, 1, 500);
        let list = TransferList::new(vec![original.clone()]);
        let metadata = list.encode(2, 3, 40).unwrap();
        let decoded = TransferList::decode(&metadata, 2, 3).unwrap();
        assert_eq!(decoded.transfers.len(), 1);
        assert!(decoded.matches(&list, true));
        assert_eq!(decoded.encode(2, 3, 40).unwrap(), metadata);
    }

    #[test]
    fn test_previous_reuse_shrinks_encoding() {
        let list = TransferList::new(vec![
            transfer(0, 1, 1, 1, 500),
            transfer(1, 1, 2, 1, 500),
        ]);
        let metadata = list.encode(3, 4, 40).unwrap();
        let decoded = TransferList::decode(&metadata, 3, 4).unwrap();
        assert!(decoded.matches(&list, true));

        // the second transfer reuses the asset reference and quantity, so it
        // must be far smaller than the first
        let first_len = list.transfers[0].encode(None, 40, 3, 4).unwrap().len();
        let both_len = metadata.len() - 4;
        assert!(both_len < first_len * 2 - 6);
    }

    #[test]
    fn test_quantity_packings_round_trip() {
        for qty in [
            1u64,
            200,
            40_000,
            70_000,            // float: 7 * 10^4
            123_456,           // 3 bytes
            20_000_001,        // 4 bytes
            5_000_000_001,     // 6 bytes
            ASSET_QTY_MAX,     // MAX marker
        ] {
            let list = TransferList::new(vec![transfer(0, 2, 0, 2, qty)]);
            let metadata = list.encode(4, 4, 40).unwrap();
            let decoded = TransferList::decode(&metadata, 4, 4).unwrap();
            assert_eq!(decoded.transfers[0].qty_per_output, qty, "qty {}", qty);
        }
    }

    #[test]
    fn test_default_route_must_come_first() {
        let default_route = Transfer {
            asset_ref: AssetRef::DefaultRoute,
            inputs: IORange::new(0, 2),
            outputs: IORange::new(1, 1),
            qty_per_output: 0,
        };

        assert!(default_route
            .encode(Some(&transfer(0, 1, 0, 1, 5)), 40, 3, 3)
            .is_err());
        assert!(default_route.encode(None, 40, 3, 3).is_ok());
    }

    #[test]
    fn test_group_ordering_properties() {
        let default_route = Transfer {
            asset_ref: AssetRef::DefaultRoute,
            inputs: IORange::new(0, 1),
            outputs: IORange::new(0, 1),
            qty_per_output: 0,
        };
        let asset_b = Transfer {
            asset_ref: AssetRef::new(900, 1, [0, 0]),
            ..transfer(0, 1, 0, 1, 9)
        };

        let list = TransferList::new(vec![
            transfer(0, 1, 0, 1, 5),
            asset_b.clone(),
            default_route.clone(),
            transfer(1, 1, 1, 1, 6),
        ]);

        let ordering = list.group_ordering();

        // a permutation of 0..n
        let mut sorted = ordering.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);

        // default route first
        assert_eq!(ordering[0], 2);

        // the two transfers of the same asset stay adjacent
        let position_a = ordering.iter().position(|&i| i == 0).unwrap();
        let position_b = ordering.iter().position(|&i| i == 3).unwrap();
        assert_eq!(position_a.abs_diff(position_b), 1);
    }

    #[test]
    fn test_loose_match_ignores_listing_order() {
        let list_a = TransferList::new(vec![
            transfer(0, 1, 0, 1, 5),
            Transfer {
                asset_ref: AssetRef::new(900, 1, [0, 0]),
                ..transfer(1, 1, 1, 1, 9)
            },
        ]);
        let list_b = TransferList::new(vec![
            list_a.transfers[1].clone(),
            list_a.transfers[0].clone(),
        ]);

        assert!(!list_a.matches(&list_b, true));
        assert!(list_a.matches(&list_b, false));
        assert!(list_b.matches(&list_a, false));
    }

    #[test]
    fn test_apply_moves_quantities() {
        let genesis = plain_genesis(); // no charges
        let list = TransferList::new(vec![transfer(0, 2, 0, 1, 60)]);

        // input 0 has 50, input 1 has 30: the transfer drains input 0 then
        // takes 10 from input 1; the rest defaults to the last regular output
        let balances = list.apply(&asset(), &genesis, &[50, 30], &[true, true, false]);
        assert_eq!(balances, vec![60, 20, 0]);
    }

    #[test]
    fn test_apply_conserves_total_without_charges() {
        let genesis = plain_genesis();
        let list = TransferList::new(vec![
            transfer(0, 1, 0, 1, 25),
            transfer(1, 2, 1, 2, 10),
        ]);
        let input_balances = [40u64, 15, 5];
        let outputs_regular = [true, true, true, true];

        let balances = list.apply(&asset(), &genesis, &input_balances, &outputs_regular);
        let total_in: u64 = input_balances.iter().sum();
        let total_out: u64 = balances.iter().sum();
        assert_eq!(total_in, total_out);
    }

    #[test]
    fn test_apply_respects_default_routes() {
        let genesis = plain_genesis();
        let default_route = Transfer {
            asset_ref: AssetRef::DefaultRoute,
            inputs: IORange::new(0, 1),
            outputs: IORange::new(0, 1),
            qty_per_output: 0,
        };
        let list = TransferList::new(vec![default_route]);

        // input 0 defaults to output 0 by the route; input 1 to the last
        // regular output
        let balances = list.apply(&asset(), &genesis, &[7, 9], &[true, true]);
        assert_eq!(balances, vec![7, 9]);

        let defaults = list.default_outputs(2, &[true, true]);
        assert_eq!(defaults, vec![true, true]);
    }

    #[test]
    fn test_apply_none_collapses_to_last_regular() {
        let list = TransferList::new(vec![transfer(0, 1, 0, 1, 5)]);
        let balances = list.apply_none(&[10, 20, 30], &[true, true, false]);
        assert_eq!(balances, vec![0, 60, 0]);
    }

    #[test]
    fn test_calc_min_fee_counts_covered_outputs() {
        let list = TransferList::new(vec![transfer(0, 1, 0, 3, 5)]);
        let outputs_satoshis = [600u64, 700, 800];
        let outputs_regular = [true, false, true];

        // outputs 0 and 2 are regular and covered: two fee bases of 600
        assert_eq!(
            list.calc_min_fee(2, &outputs_satoshis, &outputs_regular),
            1200
        );

        // a transfer with no valid input costs nothing
        let dangling = TransferList::new(vec![transfer(5, 1, 0, 3, 5)]);
        assert_eq!(
            dangling.calc_min_fee(2, &outputs_satoshis, &outputs_regular),
            0
        );

        // default routes cost nothing
        let routes_only = TransferList::new(vec![Transfer::default()]);
        assert_eq!(
            routes_only.calc_min_fee(2, &outputs_satoshis, &outputs_regular),
            0
        );

        // mismatched arrays are never valid
        assert_eq!(
            list.calc_min_fee(2, &outputs_satoshis[..2], &outputs_regular),
            SATOSHI_QTY_MAX
        );
    }

    #[test]
    fn test_decode_rejects_zero_extend_byte() {
        let mut metadata = b"SPKt".to_vec();
        metadata.push(PACKING_INDICES_EXTEND | PACKING_QUANTITY_1P);
        metadata.push(0x00);
        assert!(TransferList::decode(&metadata, 1, 1).is_err());
    }

    #[test]
    fn test_decode_truncated_transfer() {
        let list = TransferList::new(vec![transfer(0, 1, 1, 1, 500)]);
        let metadata = list.encode(2, 3, 40).unwrap();
        assert!(TransferList::decode(&metadata[..metadata.len() - 1], 2, 3).is_err());
    }
}
