//! Append-only log writer
//!
//! Entries are appended whole with one `write_all`. With `sync_writes` every
//! append is followed by fsync; otherwise data reaches disk on `sync` (called
//! at close) or whenever the OS flushes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::record::LogEntry;
use crate::engine::errors::{EngineError, EngineResult};

#[derive(Debug)]
pub(crate) struct LogWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
    sync_writes: bool,
}

impl LogWriter {
    /// Opens or creates the log file for appending.
    pub(crate) fn open(path: &Path, sync_writes: bool) -> EngineResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::io(format!("failed to open {}", path.display()), e))?;

        let current_offset = file
            .metadata()
            .map_err(|e| EngineError::io("failed to read log metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
            sync_writes,
        })
    }

    /// Appends an entry and returns the byte offset it was written at.
    pub(crate) fn append(&mut self, entry: &LogEntry) -> EngineResult<u64> {
        let serialized = entry.serialize()?;
        let offset = self.current_offset;

        self.file.write_all(&serialized).map_err(|e| {
            EngineError::io(
                format!(
                    "failed to append to {} for column family '{}'",
                    self.path.display(),
                    entry.column_family()
                ),
                e,
            )
        })?;

        if self.sync_writes {
            self.sync()?;
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    pub(crate) fn sync(&mut self) -> EngineResult<()> {
        self.file
            .sync_all()
            .map_err(|e| EngineError::io(format!("fsync failed on {}", self.path.display()), e))
    }
}
