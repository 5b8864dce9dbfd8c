//! Record codec
//!
//! Pure transform between a field map and the flat length-prefixed buffer
//! stored as an engine value. Decoding tolerates truncated input and reports
//! where it stopped instead of failing.

mod errors;
mod record;

pub use errors::{CodecError, CodecResult};
pub use record::{
    decode, encode, encode_fields, Decoded, Record, Truncation, TruncationStage, MAX_FIELD_LEN,
};
