//! Record codec errors
//!
//! Decoding never fails; truncation is reported through `Decoded`. The only
//! error is an encode-side field that cannot be described by a 32-bit length.

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Record codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("field '{field}' {part} is {len} bytes, exceeds the {max} byte limit")]
    FieldTooLarge {
        field: String,
        part: &'static str,
        len: usize,
        max: usize,
    },
}

impl CodecError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::FieldTooLarge { .. } => "CFB_CODEC_FIELD_TOO_LARGE",
        }
    }
}
