//! Sequential log reader used for replay
//!
//! Every entry's checksum is verified. A bad checksum, an impossible length
//! or a torn tail is reported as corruption with the entry's byte offset.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::record::{LogEntry, MIN_ENTRY_SIZE};
use crate::engine::errors::{EngineError, EngineResult};

pub(crate) struct LogReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl LogReader {
    pub(crate) fn open(path: &Path) -> EngineResult<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::io(format!("failed to open {}", path.display()), e))?;
        let file_size = file
            .metadata()
            .map_err(|e| EngineError::io("failed to read log metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Offset of the next entry
    pub(crate) fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next entry.
    ///
    /// - `Ok(Some(entry))` if an entry was read
    /// - `Ok(None)` at end of file
    /// - `Err(Corruption)` for anything that is not a whole, valid entry
    pub(crate) fn read_next(&mut self) -> EngineResult<Option<LogEntry>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_ENTRY_SIZE as u64 {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated log: {} bytes remaining, minimum entry size is {}",
                    remaining, MIN_ENTRY_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            EngineError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read entry length: {}", e),
            )
        })?;
        let entry_length = u32::from_le_bytes(len_buf) as u64;

        if entry_length < MIN_ENTRY_SIZE as u64 {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!("Invalid entry length: {}", entry_length),
            ));
        }
        if entry_length > remaining {
            return Err(EngineError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Entry length {} exceeds remaining file size {}",
                    entry_length, remaining
                ),
            ));
        }

        let mut entry_buf = vec![0u8; entry_length as usize];
        entry_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut entry_buf[4..]).map_err(|e| {
            EngineError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read entry body: {}", e),
            )
        })?;

        let (entry, consumed) = LogEntry::deserialize(&entry_buf)
            .map_err(|e| EngineError::corruption_at_offset(self.current_offset, e.to_string()))?;
        self.current_offset += consumed as u64;

        Ok(Some(entry))
    }
}
