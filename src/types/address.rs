//! The CoinSpark address codec.
//!
//! A CoinSpark address wraps a regular Bitcoin address together with a
//! capability flag mask and an optional payment reference. The encoding is
//! base 58 with a leading `s`, a character-increment shift so repeated
//! Bitcoin prefixes do not yield repeated CoinSpark prefixes, and a half/half
//! obfuscation pass over the digits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{CodecError, CodecResult};
use crate::types::PaymentRef;

/// Working buffer bound; also caps the decodable address length.
const ADDRESS_MAX_LEN: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub bitcoin_address: String,
    pub address_flags: u32,
    pub payment_ref: PaymentRef,
}

impl Address {
    pub fn new(bitcoin_address: &str, address_flags: u32, payment_ref: PaymentRef) -> Self {
        Address {
            bitcoin_address: bitcoin_address.to_string(),
            address_flags,
            payment_ref,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.bitcoin_address.is_empty()
            && (self.address_flags & ADDRESS_FLAG_MASK) == self.address_flags
            && self.payment_ref.is_valid()
    }

    pub fn matches(&self, other: &Address) -> bool {
        self == other
    }

    /// Encode to the printable CoinSpark address string.
    pub fn encode(&self) -> CodecResult<String> {
        if !self.is_valid() {
            return Err(CodecError::OutOfRange("invalid address fields".to_string()));
        }

        let mut digits = [0u8; ADDRESS_MAX_LEN];

        // extra data: address flags then payment reference, base 58 LE
        let mut address_flag_chars = 0usize;
        let mut test_flags = self.address_flags;
        while test_flags > 0 {
            digits[2 + address_flag_chars] = (test_flags % 58) as u8;
            test_flags /= 58;
            address_flag_chars += 1;
        }

        let mut payment_ref_chars = 0usize;
        let mut test_ref = self.payment_ref.0;
        while test_ref > 0 {
            digits[2 + address_flag_chars + payment_ref_chars] = (test_ref % 58) as u8;
            test_ref /= 58;
            payment_ref_chars += 1;
        }

        let extra_data_chars = address_flag_chars + payment_ref_chars;
        let bitcoin_address = self.bitcoin_address.as_bytes();
        let string_len = bitcoin_address.len() + 2 + extra_data_chars;
        if string_len > ADDRESS_MAX_LEN {
            return Err(CodecError::Overflow(format!(
                "address of {} characters",
                string_len
            )));
        }

        digits[1] =
            (address_flag_chars as u32 * ADDRESS_FLAG_CHARS_MULTIPLE + payment_ref_chars as u32)
                as u8;

        // shift each bitcoin-address character, mixing in the extra data
        for (char_index, &ch) in bitcoin_address.iter().enumerate() {
            let mut char_value = base58_to_integer(ch).ok_or_else(|| {
                CodecError::OutOfRange(format!("non-base58 character {:?}", ch as char))
            })? as u32;

            char_value += ADDRESS_CHAR_INCREMENT;
            if extra_data_chars > 0 {
                char_value += digits[2 + char_index % extra_data_chars] as u32;
            }
            digits[2 + extra_data_chars + char_index] = (char_value % 58) as u8;
        }

        // obfuscate the first half with the second to break common prefixes
        let half_length = (string_len + 1) / 2;
        for char_index in 1..half_length {
            digits[char_index] = (digits[char_index] + digits[string_len - char_index]) % 58;
        }

        let mut output = String::with_capacity(string_len);
        output.push(ADDRESS_PREFIX as char);
        for &digit in &digits[1..string_len] {
            output.push(INTEGER_TO_BASE58[digit as usize] as char);
        }
        Ok(output)
    }

    /// Decode a CoinSpark address string.
    pub fn decode(spark_address: &str) -> CodecResult<Address> {
        let input = spark_address.as_bytes();
        let input_len = input.len();

        if input_len < 2 || input_len > ADDRESS_MAX_LEN {
            return Err(CodecError::MalformedBuffer(format!(
                "address of {} characters",
                input_len
            )));
        }
        if input[0] != ADDRESS_PREFIX {
            return Err(CodecError::NotCoinSpark(
                "address does not start with 's'".to_string(),
            ));
        }

        let mut digits = [0u8; ADDRESS_MAX_LEN];
        for char_index in 1..input_len {
            digits[char_index] = base58_to_integer(input[char_index]).ok_or_else(|| {
                CodecError::OutOfRange(format!(
                    "non-base58 character {:?}",
                    input[char_index] as char
                ))
            })?;
        }

        // de-obfuscate the first half using the second half
        let half_length = (input_len + 1) / 2;
        for char_index in 1..half_length {
            digits[char_index] =
                (digits[char_index] + 58 - digits[input_len - char_index]) % 58;
        }

        let char_value = digits[1] as u32;
        let address_flag_chars = (char_value / ADDRESS_FLAG_CHARS_MULTIPLE) as usize;
        let payment_ref_chars = (char_value % ADDRESS_FLAG_CHARS_MULTIPLE) as usize;
        let extra_data_chars = address_flag_chars + payment_ref_chars;

        if input_len < 2 + extra_data_chars {
            return Err(CodecError::MalformedBuffer(
                "address too short for its extra data".to_string(),
            ));
        }
        let bitcoin_address_len = input_len - 2 - extra_data_chars;

        let mut address_flags: u64 = 0;
        let mut multiplier: u64 = 1;
        for char_index in 0..address_flag_chars {
            address_flags += digits[2 + char_index] as u64 * multiplier;
            multiplier *= 58;
        }
        if address_flags & ADDRESS_FLAG_MASK as u64 != address_flags {
            return Err(CodecError::OutOfRange(format!(
                "address flags {}",
                address_flags
            )));
        }

        let mut payment_ref: u64 = 0;
        multiplier = 1;
        for char_index in 0..payment_ref_chars {
            payment_ref += digits[2 + address_flag_chars + char_index] as u64 * multiplier;
            multiplier *= 58;
        }

        let mut bitcoin_address = String::with_capacity(bitcoin_address_len);
        for char_index in 0..bitcoin_address_len {
            let mut char_value = digits[2 + extra_data_chars + char_index] as u32;
            char_value += 58 * 2 - ADDRESS_CHAR_INCREMENT;
            if extra_data_chars > 0 {
                char_value -= digits[2 + char_index % extra_data_chars] as u32;
            }
            bitcoin_address.push(INTEGER_TO_BASE58[(char_value % 58) as usize] as char);
        }

        let address = Address {
            bitcoin_address,
            address_flags: address_flags as u32,
            payment_ref: PaymentRef(payment_ref),
        };
        if !address.is_valid() {
            return Err(CodecError::OutOfRange("invalid address fields".to_string()));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FLAG_LABELS: [(u32, &str); 4] = [
            (ADDRESS_FLAG_ASSETS, "assets"),
            (ADDRESS_FLAG_PAYMENT_REFS, "payment references"),
            (ADDRESS_FLAG_TEXT_MESSAGES, "text messages"),
            (ADDRESS_FLAG_FILE_MESSAGES, "file messages"),
        ];

        writeln!(f, "COINSPARK ADDRESS")?;
        writeln!(f, "  Bitcoin address: {}", self.bitcoin_address)?;
        write!(f, "    Address flags: {}", self.address_flags)?;

        let mut flag_output = false;
        for (flag, label) in FLAG_LABELS {
            if self.address_flags & flag > 0 {
                write!(f, "{}{}", if flag_output { ", " } else { " [" }, label)?;
                flag_output = true;
            }
        }
        if flag_output {
            write!(f, "]")?;
        }
        writeln!(f)?;

        writeln!(f, "Payment reference: {}", self.payment_ref.0)?;
        writeln!(f, "END COINSPARK ADDRESS")?;
        writeln!(f)
    }
}
