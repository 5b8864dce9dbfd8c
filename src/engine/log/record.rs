//! Log entry format
//!
//! ```text
//! +------------------+
//! | Entry Length     | (u32 LE, includes this field and the checksum)
//! +------------------+
//! | Kind             | (u8: 1 = create column family, 2 = put, 3 = delete)
//! +------------------+
//! | Column Family    | (length-prefixed string)
//! +------------------+
//! | Field A          | (length-prefixed bytes: options JSON or key)
//! +------------------+
//! | Field B          | (length-prefixed bytes: value, put only)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself. Deletes are
//! tombstones; the latest entry for a key wins on replay.

use std::io::{self, Read};

use super::checksum::compute_checksum;
use crate::engine::errors::{EngineError, EngineResult};
use crate::engine::options::ColumnFamilyOptions;

/// Smallest possible entry: length + kind + empty name + empty field + checksum
pub(crate) const MIN_ENTRY_SIZE: usize = 4 + 1 + 4 + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    CreateColumnFamily = 1,
    Put = 2,
    Delete = 3,
}

impl EntryKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EntryKind::CreateColumnFamily),
            2 => Some(EntryKind::Put),
            3 => Some(EntryKind::Delete),
            _ => None,
        }
    }
}

/// One durable engine mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogEntry {
    CreateColumnFamily {
        name: String,
        options: ColumnFamilyOptions,
    },
    Put {
        column_family: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        column_family: String,
        key: Vec<u8>,
    },
}

// Lengths are stored as u32; anything larger would wrap and corrupt the log.
fn length_field(len: usize, what: &str) -> EngineResult<u32> {
    u32::try_from(len).map_err(|_| {
        EngineError::InvalidArgument(format!(
            "{} of {} bytes exceeds the log entry limit",
            what, len
        ))
    })
}

fn push_prefixed(buf: &mut Vec<u8>, data: &[u8], what: &str) -> EngineResult<()> {
    buf.extend_from_slice(&length_field(data.len(), what)?.to_le_bytes());
    buf.extend_from_slice(data);
    Ok(())
}

impl LogEntry {
    fn kind(&self) -> EntryKind {
        match self {
            LogEntry::CreateColumnFamily { .. } => EntryKind::CreateColumnFamily,
            LogEntry::Put { .. } => EntryKind::Put,
            LogEntry::Delete { .. } => EntryKind::Delete,
        }
    }

    /// Column family the entry belongs to
    pub(crate) fn column_family(&self) -> &str {
        match self {
            LogEntry::CreateColumnFamily { name, .. } => name,
            LogEntry::Put { column_family, .. } => column_family,
            LogEntry::Delete { column_family, .. } => column_family,
        }
    }

    fn serialize_body(&self) -> EngineResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.push(self.kind() as u8);
        push_prefixed(&mut buf, self.column_family().as_bytes(), "column family name")?;

        match self {
            LogEntry::CreateColumnFamily { options, .. } => {
                let json = serde_json::to_vec(options).map_err(|e| {
                    EngineError::Internal(format!("failed to serialize options: {}", e))
                })?;
                push_prefixed(&mut buf, &json, "options")?;
            }
            LogEntry::Put { key, value, .. } => {
                push_prefixed(&mut buf, key, "key")?;
                push_prefixed(&mut buf, value, "value")?;
            }
            LogEntry::Delete { key, .. } => {
                push_prefixed(&mut buf, key, "key")?;
            }
        }

        Ok(buf)
    }

    /// Serialize the complete entry: length, body, checksum.
    pub(crate) fn serialize(&self) -> EngineResult<Vec<u8>> {
        let body = self.serialize_body()?;
        let entry_length = body
            .len()
            .checked_add(8)
            .ok_or_else(|| EngineError::InvalidArgument("log entry too large".to_string()))
            .and_then(|len| length_field(len, "entry"))?;

        let mut entry = Vec::with_capacity(body.len() + 8);
        entry.extend_from_slice(&entry_length.to_le_bytes());
        entry.extend_from_slice(&body);
        let checksum = compute_checksum(&entry);
        entry.extend_from_slice(&checksum.to_le_bytes());

        Ok(entry)
    }

    /// Deserialize one entry from the front of `data`, verifying its checksum.
    ///
    /// Returns the entry and the number of bytes consumed.
    pub(crate) fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Entry too short",
            ));
        }

        let entry_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if entry_length < MIN_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid entry length: {}", entry_length),
            ));
        }

        if data.len() < entry_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Entry truncated: expected {} bytes, got {}",
                    entry_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = entry_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[0..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;
            Ok(buf)
        }

        fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
            String::from_utf8(read_bytes(reader)?).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
            })
        }

        let mut kind_buf = [0u8; 1];
        cursor.read_exact(&mut kind_buf)?;
        let kind = EntryKind::from_u8(kind_buf[0]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown entry kind: {}", kind_buf[0]),
            )
        })?;

        let column_family = read_string(&mut cursor)?;

        let entry = match kind {
            EntryKind::CreateColumnFamily => {
                let json = read_bytes(&mut cursor)?;
                let options = serde_json::from_slice(&json).map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Invalid column family options: {}", e),
                    )
                })?;
                LogEntry::CreateColumnFamily {
                    name: column_family,
                    options,
                }
            }
            EntryKind::Put => {
                let key = read_bytes(&mut cursor)?;
                let value = read_bytes(&mut cursor)?;
                LogEntry::Put {
                    column_family,
                    key,
                    value,
                }
            }
            EntryKind::Delete => LogEntry::Delete {
                column_family,
                key: read_bytes(&mut cursor)?,
            },
        };

        Ok((entry, entry_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_field_rejects_oversized() {
        assert_eq!(length_field(0, "key").unwrap(), 0);
        assert_eq!(length_field(u32::MAX as usize, "value").unwrap(), u32::MAX);

        #[cfg(target_pointer_width = "64")]
        {
            let err = length_field(u32::MAX as usize + 1, "value").unwrap_err();
            assert!(matches!(err, EngineError::InvalidArgument(_)));
            assert!(err.to_string().contains("value"), "{}", err);
        }
    }

    fn put(key: &str, value: &str) -> LogEntry {
        LogEntry::Put {
            column_family: "usertable".to_string(),
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_each_kind_survives_serialization() {
        let entries = vec![
            LogEntry::CreateColumnFamily {
                name: "usertable".to_string(),
                options: ColumnFamilyOptions::baseline(),
            },
            put("user1", "payload"),
            LogEntry::Delete {
                column_family: "usertable".to_string(),
                key: b"user1".to_vec(),
            },
        ];
        for entry in entries {
            let bytes = entry.serialize().unwrap();
            let (decoded, consumed) = LogEntry::deserialize(&bytes).unwrap();
            assert_eq!(decoded, entry);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let mut bytes = put("k", "v").serialize().unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        let err = LogEntry::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_entry_rejected() {
        let bytes = put("key", "value").serialize().unwrap();
        let err = LogEntry::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_consumes_only_first_entry() {
        let mut bytes = put("a", "1").serialize().unwrap();
        let first_len = bytes.len();
        bytes.extend(put("b", "2").serialize().unwrap());

        let (entry, consumed) = LogEntry::deserialize(&bytes).unwrap();
        assert_eq!(entry, put("a", "1"));
        assert_eq!(consumed, first_len);
    }
}
