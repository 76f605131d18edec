//! Error types for H.264/AVC parsing.

use thiserror::Error;

/// AVC parsing error types.
#[derive(Debug, Error)]
pub enum AvcError {
    /// Not enough data to parse.
    #[error("not enough data: expected {expected} bits, got {got}")]
    NotEnoughData { expected: usize, got: usize },

    /// No Annex-B start codes in the stream.
    #[error("no NAL start codes found")]
    NoStartCode,

    /// A start code with no NAL unit behind it.
    #[error("truncated NAL unit at offset {0}")]
    TruncatedNal(usize),

    /// Invalid NAL unit.
    #[error("invalid NAL unit: {0}")]
    InvalidNalUnit(String),

    /// Bitstream error.
    #[error("bitstream error: {0}")]
    BitstreamError(String),
}

/// Result type alias for AVC operations.
pub type Result<T> = std::result::Result<T, AvcError>;
