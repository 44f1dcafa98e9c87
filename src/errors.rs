use thiserror::Error;

/// Codec-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum CodecError {
    /// Truncated input, bad section framing, or a length byte inconsistent
    /// with the remaining bytes
    #[error("Malformed buffer: {0}")]
    MalformedBuffer(String),

    /// A field lies outside its declared domain
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Encoded form exceeds the metadata budget, or a value does not fit the
    /// selected packing width
    #[error("Overflow: {0}")]
    Overflow(String),

    /// Logically inconsistent combination of otherwise-valid fields
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Script is not OP_RETURN shaped, or the payload lacks the SPK header
    #[error("Not CoinSpark data: {0}")]
    NotCoinSpark(String),

    /// Hex string input could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Codec-wide result type - single point of truth
pub type CodecResult<T> = Result<T, CodecError>;
