//! Little-endian integer I/O and the shared mantissa/exponent quantity codec.
//!
//! All multi-byte integers on the wire are little-endian with widths of
//! 1, 2, 3, 4 or 6 bytes depending on the packing in force.

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::{CodecError, CodecResult};

/// Rounding direction used when collapsing a quantity to mantissa/exponent
/// form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Nearest,
    Up,
}

impl Rounding {
    /// Offset added before each divide-by-ten step.
    fn offset(self) -> u64 {
        match self {
            Rounding::Down => 0,
            Rounding::Nearest => 4,
            Rounding::Up => 9,
        }
    }
}

/// Read `num_bytes` little-endian bytes from the front of `data`, advancing
/// the slice. A zero width reads nothing and yields 0.
pub fn shift_le_uint(data: &mut &[u8], num_bytes: usize) -> CodecResult<u64> {
    if num_bytes == 0 {
        return Ok(0);
    }
    if data.len() < num_bytes {
        return Err(CodecError::MalformedBuffer(format!(
            "need {} bytes, {} remain",
            num_bytes,
            data.len()
        )));
    }
    let value = LittleEndian::read_uint(&data[..num_bytes], num_bytes);
    *data = &data[num_bytes..];
    Ok(value)
}

/// Write `value` as `num_bytes` little-endian bytes. Fails if the value does
/// not fit the width; a zero width writes nothing.
pub fn write_le_uint(value: u64, num_bytes: usize) -> CodecResult<Vec<u8>> {
    if num_bytes == 0 {
        return Ok(Vec::new());
    }
    if num_bytes < 8 && (value >> (num_bytes * 8)) != 0 {
        return Err(CodecError::Overflow(format!(
            "{} does not fit in {} bytes",
            value, num_bytes
        )));
    }
    let mut buffer = vec![0u8; num_bytes];
    LittleEndian::write_uint(&mut buffer, value, num_bytes);
    Ok(buffer)
}

/// Uppercase hex of the low `num_bytes` bytes of `value`, little-endian.
/// Used by the renderers, which deliberately truncate rather than fail.
pub fn unsigned_to_small_endian_hex(mut value: u64, num_bytes: usize) -> String {
    let mut output = String::with_capacity(num_bytes * 2);
    for _ in 0..num_bytes {
        output.push_str(&format!("{:02X}", value & 0xFF));
        value >>= 8;
    }
    output
}

/// Expand a mantissa and base-ten exponent back to an integer quantity.
pub fn mantissa_exponent_to_qty(mantissa: u16, exponent: u16) -> u64 {
    let mut quantity = mantissa as u64;
    for _ in 0..exponent {
        quantity *= 10;
    }
    quantity
}

/// Collapse `quantity` to the smallest exponent whose mantissa fits
/// `mantissa_max`, rounding each dropped digit in the given direction.
/// Returns the re-expanded quantity along with the mantissa and exponent.
pub fn qty_to_mantissa_exponent(
    quantity: u64,
    rounding: Rounding,
    mantissa_max: u16,
    exponent_max: u16,
) -> (u64, u16, u16) {
    let round_offset = rounding.offset();
    let mut remaining = quantity;
    let mut exponent: u16 = 0;

    while remaining > mantissa_max as u64 {
        remaining = (remaining + round_offset) / 10;
        exponent += 1;
    }

    let mantissa = remaining as u16;
    let exponent = exponent.min(exponent_max);
    let qty = mantissa_exponent_to_qty(mantissa, exponent);
    (qty, mantissa, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_le_uint_widths() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut data: &[u8] = &bytes;
        assert_eq!(shift_le_uint(&mut data, 1).unwrap(), 0x01);
        assert_eq!(shift_le_uint(&mut data, 2).unwrap(), 0x0302);
        assert_eq!(shift_le_uint(&mut data, 3).unwrap(), 0x060504);
        assert!(data.is_empty());
    }

    #[test]
    fn test_shift_le_uint_truncated() {
        let mut data: &[u8] = &[0x01];
        assert!(shift_le_uint(&mut data, 2).is_err());
    }

    #[test]
    fn test_write_le_uint_round_trip() {
        for (value, width) in [(0u64, 1), (0xFF, 1), (0x1234, 2), (0xABCDEF, 3), (1u64 << 47, 6)] {
            let bytes = write_le_uint(value, width).unwrap();
            assert_eq!(bytes.len(), width);
            let mut data: &[u8] = &bytes;
            assert_eq!(shift_le_uint(&mut data, width).unwrap(), value);
        }
    }

    #[test]
    fn test_write_le_uint_overflow() {
        assert!(write_le_uint(256, 1).is_err());
        assert!(write_le_uint(0x1_0000_0000, 4).is_err());
    }

    #[test]
    fn test_write_le_uint_zero_width() {
        assert!(write_le_uint(12345, 0).unwrap().is_empty());
    }

    #[test]
    fn test_small_endian_hex() {
        assert_eq!(unsigned_to_small_endian_hex(0xA450, 2), "50A4");
        assert_eq!(unsigned_to_small_endian_hex(1, 4), "01000000");
        assert_eq!(unsigned_to_small_endian_hex(0, 0), "");
    }

    #[test]
    fn test_mantissa_exponent_round_trip() {
        assert_eq!(mantissa_exponent_to_qty(287, 9), 287_000_000_000);
        assert_eq!(mantissa_exponent_to_qty(1, 0), 1);
        assert_eq!(mantissa_exponent_to_qty(1000, 11), 100_000_000_000_000);
    }

    #[test]
    fn test_qty_to_mantissa_exponent_exact() {
        let (qty, mantissa, exponent) =
            qty_to_mantissa_exponent(287_000_000_000, Rounding::Nearest, 1000, 11);
        assert_eq!((qty, mantissa, exponent), (287_000_000_000, 287, 9));
    }

    #[test]
    fn test_qty_to_mantissa_exponent_rounding() {
        // 1005 rounds differently in each direction over the mantissa cap
        let (down, ..) = qty_to_mantissa_exponent(1005, Rounding::Down, 1000, 11);
        let (nearest, ..) = qty_to_mantissa_exponent(1005, Rounding::Nearest, 1000, 11);
        let (up, ..) = qty_to_mantissa_exponent(1005, Rounding::Up, 1000, 11);
        assert_eq!(down, 1000);
        assert_eq!(nearest, 1000);
        assert_eq!(up, 1010);

        let (nearest_high, ..) = qty_to_mantissa_exponent(1006, Rounding::Nearest, 1000, 11);
        assert_eq!(nearest_high, 1010);
    }

    #[test]
    fn test_qty_exponent_capped() {
        let (_, mantissa, exponent) =
            qty_to_mantissa_exponent(u64::MAX, Rounding::Down, 1000, 11);
        assert_eq!(exponent, 11);
        assert!(mantissa <= 1000);
    }
}
