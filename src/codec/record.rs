//! Record buffer encoding
//!
//! A record is stored as a flat concatenation of field tuples:
//!
//! ```text
//! +------------------+
//! | Key Length       | (u32 BE)
//! +------------------+
//! | Key              | (UTF-8 bytes)
//! +------------------+
//! | Value Length     | (u32 BE)
//! +------------------+
//! | Value            | (raw bytes)
//! +------------------+
//! | ... next field   |
//! ```
//!
//! There is no header, count or trailer. Tuples appear in the iteration
//! order of the source mapping.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::errors::{CodecError, CodecResult};

/// Field name to raw value
pub type Record = HashMap<String, Vec<u8>>;

const LEN_SIZE: usize = 4;

/// Largest key or value a tuple can describe
pub const MAX_FIELD_LEN: usize = u32::MAX as usize;

/// Which part of a tuple the buffer ran out in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationStage {
    KeyLength,
    Key,
    ValueLength,
    Value,
}

impl TruncationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruncationStage::KeyLength => "key_length",
            TruncationStage::Key => "key",
            TruncationStage::ValueLength => "value_length",
            TruncationStage::Value => "value",
        }
    }
}

impl fmt::Display for TruncationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and why decoding stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Part of the tuple that could not be read
    pub stage: TruncationStage,
    /// Byte offset at which that part starts
    pub offset: usize,
    /// Bytes the part needed (4 for a length field)
    pub needed: usize,
    /// Total buffer length
    pub buffer_len: usize,
}

/// Result of decoding a record buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// Fields decoded before the end of the buffer (or the truncation point)
    pub fields: Record,
    /// Set when the buffer ended mid-tuple
    pub truncation: Option<Truncation>,
}

impl Decoded {
    /// True when every tuple in the buffer was read
    pub fn is_complete(&self) -> bool {
        self.truncation.is_none()
    }
}

/// Encodes a record into a buffer.
///
/// # Errors
///
/// `CodecError::FieldTooLarge` if a key or value is longer than `MAX_FIELD_LEN`.
pub fn encode(record: &Record) -> CodecResult<Vec<u8>> {
    encode_fields(record.iter().map(|(k, v)| (k.as_str(), v.as_slice())))
}

/// Encodes `(key, value)` pairs in the order given.
pub fn encode_fields<'a, I>(fields: I) -> CodecResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut buf = Vec::new();
    for (key, value) in fields {
        let key_len = field_len(key, "key", key.len())?;
        let value_len = field_len(key, "value", value.len())?;

        buf.reserve(LEN_SIZE * 2 + key.len() + value.len());
        buf.extend_from_slice(&key_len.to_be_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&value_len.to_be_bytes());
        buf.extend_from_slice(value);
    }
    Ok(buf)
}

fn field_len(field: &str, part: &'static str, len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::FieldTooLarge {
        field: field.to_string(),
        part,
        len,
        max: MAX_FIELD_LEN,
    })
}

/// Decodes a record buffer.
///
/// With `fields == None` every tuple is returned, otherwise only tuples whose
/// key is in the set. Never fails: a buffer that ends mid-tuple yields the
/// tuples read so far plus a `Truncation`. Keys that are not valid UTF-8 are
/// decoded lossily.
pub fn decode(buffer: &[u8], fields: Option<&HashSet<String>>) -> Decoded {
    let mut cursor = Cursor::new(buffer);
    let mut decoded = Decoded::default();

    while !cursor.is_empty() {
        let key = match cursor.take_prefixed(TruncationStage::KeyLength, TruncationStage::Key) {
            Ok(key) => String::from_utf8_lossy(key).into_owned(),
            Err(truncation) => {
                decoded.truncation = Some(truncation);
                break;
            }
        };
        let value =
            match cursor.take_prefixed(TruncationStage::ValueLength, TruncationStage::Value) {
                Ok(value) => value,
                Err(truncation) => {
                    decoded.truncation = Some(truncation);
                    break;
                }
            };

        if fields.map_or(true, |f| f.contains(&key)) {
            decoded.fields.insert(key, value.to_vec());
        }
    }

    decoded
}

struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn truncation(&self, stage: TruncationStage, needed: usize) -> Truncation {
        Truncation {
            stage,
            offset: self.offset,
            needed,
            buffer_len: self.buf.len(),
        }
    }

    /// Reads a u32 length then that many bytes.
    fn take_prefixed(
        &mut self,
        len_stage: TruncationStage,
        body_stage: TruncationStage,
    ) -> Result<&'a [u8], Truncation> {
        if self.remaining() < LEN_SIZE {
            return Err(self.truncation(len_stage, LEN_SIZE));
        }
        let mut len_buf = [0u8; LEN_SIZE];
        len_buf.copy_from_slice(&self.buf[self.offset..self.offset + LEN_SIZE]);
        let len = u32::from_be_bytes(len_buf) as usize;
        self.offset += LEN_SIZE;

        if self.remaining() < len {
            return Err(self.truncation(body_stage, len));
        }
        let body = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(body)
    }
}
