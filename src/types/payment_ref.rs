//! Payment reference sections (`r`): a 52-bit integer a payer attaches so
//! the payee can reconcile the transaction against an invoice.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec::{locate_metadata_range, shift_le_uint, unsigned_to_small_endian_hex};
use crate::constants::*;
use crate::errors::{CodecError, CodecResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRef(pub u64);

impl PaymentRef {
    pub fn new(reference: u64) -> Self {
        PaymentRef(reference)
    }

    /// Draw an unpredictable reference from the supplied generator.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        PaymentRef(rng.gen_range(0..PAYMENT_REF_MAX))
    }

    pub fn is_valid(&self) -> bool {
        self.0 <= PAYMENT_REF_MAX
    }

    pub fn matches(&self, other: &PaymentRef) -> bool {
        self == other
    }

    /// Encode as an `SPK r` section; the value is written little-endian with
    /// leading zero bytes stripped (zero encodes to no bytes at all).
    pub fn encode(&self, metadata_max_len: usize) -> CodecResult<Vec<u8>> {
        if !self.is_valid() {
            return Err(CodecError::OutOfRange(format!(
                "payment reference {}",
                self.0
            )));
        }

        let mut metadata = METADATA_IDENTIFIER.to_vec();
        metadata.push(PAYMENTREF_PREFIX);

        let mut remaining = self.0;
        while remaining > 0 {
            metadata.push((remaining & 0xFF) as u8);
            remaining >>= 8;
        }

        if metadata.len() > metadata_max_len {
            return Err(CodecError::Overflow(format!(
                "payment reference needs {} bytes, limit is {}",
                metadata.len(),
                metadata_max_len
            )));
        }
        Ok(metadata)
    }

    /// Decode from a framed payload containing an `r` section of 0..8 bytes.
    pub fn decode(buffer: &[u8]) -> CodecResult<PaymentRef> {
        let mut metadata = locate_metadata_range(buffer, PAYMENTREF_PREFIX)
            .ok_or_else(|| CodecError::NotCoinSpark("no payment reference section".to_string()))?;

        if metadata.len() > 8 {
            return Err(CodecError::MalformedBuffer(format!(
                "payment reference body of {} bytes",
                metadata.len()
            )));
        }

        let length = metadata.len();
        let reference = PaymentRef(shift_le_uint(&mut metadata, length)?);
        if !reference.is_valid() {
            return Err(CodecError::OutOfRange(format!(
                "payment reference {}",
                reference.0
            )));
        }
        Ok(reference)
    }
}

impl fmt::Display for PaymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "COINSPARK PAYMENT REFERENCE")?;
        writeln!(
            f,
            "{} (small endian hex {})",
            self.0,
            unsigned_to_small_endian_hex(self.0, 8)
        )?;
        writeln!(f, "END COINSPARK PAYMENT REFERENCE")?;
        writeln!(f)
    }
}
