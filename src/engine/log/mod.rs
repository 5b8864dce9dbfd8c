//! # Log Engine
//!
//! Durable ordered engine backed by one append-only file, `engine.log`, in
//! the data directory. Every mutation (column family creation, put, delete)
//! is appended before it is applied in memory; opening replays the whole log
//! into ordered tables.
//!
//! Open rules:
//! - Every column family present in the log must be declared, otherwise the
//!   open fails with `InvalidArgument`.
//! - A declared column family the log does not have is created only when
//!   `create_missing_column_families` is set. `default` is always created.
//! - A missing log file is created only when `create_if_missing` is set.
//! - Any checksum mismatch or torn entry fails the open with the entry's
//!   byte offset. Nothing is truncated or repaired.

mod checksum;
mod reader;
mod record;
mod writer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::backend::{ColumnFamilyHandle, Engine, EngineDriver, EngineIterator, OpenedEngine};
use super::errors::{EngineError, EngineResult};
use super::options::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, EngineOptions, DEFAULT_COLUMN_FAMILY,
};
use super::tables::{read_table, write_table, OrderedTable, TableIterator, TableSet};

use reader::LogReader;
use record::LogEntry;
use writer::LogWriter;

/// File the log engine keeps its data in
pub const LOG_FILE_NAME: &str = "engine.log";

/// Opens `LogEngine`s
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDriver;

impl EngineDriver for LogDriver {
    fn name(&self) -> &'static str {
        "log"
    }

    fn open(
        &self,
        directory: &Path,
        options: &EngineOptions,
        column_families: &[ColumnFamilyDescriptor],
    ) -> EngineResult<OpenedEngine> {
        let db = options.db();
        let declared = match options {
            EngineOptions::Simple(simple) => vec![ColumnFamilyDescriptor::new(
                DEFAULT_COLUMN_FAMILY,
                simple.column_family.clone(),
            )],
            EngineOptions::Multi(_) => {
                if !column_families
                    .iter()
                    .any(|d| d.name == DEFAULT_COLUMN_FAMILY)
                {
                    return Err(EngineError::InvalidArgument(format!(
                        "column family '{}' must be declared",
                        DEFAULT_COLUMN_FAMILY
                    )));
                }
                column_families.to_vec()
            }
        };

        let path = directory.join(LOG_FILE_NAME);
        let tables = TableSet::new();
        if path.exists() {
            replay(&path, &tables)?;
        } else {
            if !db.create_if_missing {
                return Err(EngineError::InvalidArgument(format!(
                    "{} does not exist and create_if_missing is false",
                    path.display()
                )));
            }
            fs::create_dir_all(directory).map_err(|e| {
                EngineError::io(format!("failed to create {}", directory.display()), e)
            })?;
        }

        for existing in tables.names()? {
            if !declared.iter().any(|d| d.name == existing) {
                return Err(EngineError::InvalidArgument(format!(
                    "column family '{}' exists in {} but was not declared at open",
                    existing,
                    path.display()
                )));
            }
        }

        let mut writer = LogWriter::open(&path, db.sync_writes)?;
        for descriptor in &declared {
            if tables.contains(&descriptor.name)? {
                tables.set_options(&descriptor.name, descriptor.options.clone())?;
            } else if descriptor.name == DEFAULT_COLUMN_FAMILY || db.create_missing_column_families
            {
                writer.append(&LogEntry::CreateColumnFamily {
                    name: descriptor.name.clone(),
                    options: descriptor.options.clone(),
                })?;
                tables.add(&descriptor.name, descriptor.options.clone())?;
            } else {
                return Err(EngineError::InvalidArgument(format!(
                    "column family '{}' does not exist and create_missing_column_families is false",
                    descriptor.name
                )));
            }
        }

        let handles = declared
            .iter()
            .map(|d| tables.open_handle(&d.name))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(OpenedEngine {
            engine: Box::new(LogEngine {
                directory: directory.to_path_buf(),
                tables,
                writer: Mutex::new(writer),
            }),
            handles,
        })
    }
}

/// Applies every entry of the log at `path` to `tables`.
fn replay(path: &Path, tables: &TableSet<OrderedTable>) -> EngineResult<()> {
    let mut reader = LogReader::open(path)?;
    loop {
        let offset = reader.current_offset();
        let entry = match reader.read_next()? {
            Some(entry) => entry,
            None => return Ok(()),
        };
        apply(tables, entry).map_err(|e| match e {
            EngineError::ColumnFamilyExists(name) => EngineError::corruption_at_offset(
                offset,
                format!("column family '{}' created twice", name),
            ),
            EngineError::UnknownColumnFamily(name) => EngineError::corruption_at_offset(
                offset,
                format!("write to column family '{}' before its creation", name),
            ),
            other => other,
        })?;
    }
}

fn apply(tables: &TableSet<OrderedTable>, entry: LogEntry) -> EngineResult<()> {
    match entry {
        LogEntry::CreateColumnFamily { name, options } => {
            tables.add(&name, options)?;
        }
        LogEntry::Put {
            column_family,
            key,
            value,
        } => {
            let table = tables.table_by_name(&column_family)?;
            write_table(&table)?.insert(key, value);
        }
        LogEntry::Delete { column_family, key } => {
            let table = tables.table_by_name(&column_family)?;
            write_table(&table)?.remove(&key);
        }
    }
    Ok(())
}

/// Durable ordered engine
#[derive(Debug)]
pub struct LogEngine {
    directory: PathBuf,
    tables: TableSet<OrderedTable>,
    writer: Mutex<LogWriter>,
}

impl LogEngine {
    /// Data directory the engine was opened in
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    // Held across append and apply so replay order matches apply order.
    fn writer(&self) -> EngineResult<MutexGuard<'_, LogWriter>> {
        self.writer.lock().map_err(|_| EngineError::poisoned())
    }
}

impl Engine for LogEngine {
    fn create_column_family(
        &self,
        descriptor: &ColumnFamilyDescriptor,
    ) -> EngineResult<ColumnFamilyHandle> {
        let mut writer = self.writer()?;
        if self.tables.is_closed() {
            return Err(EngineError::Closed);
        }
        if self.tables.contains(&descriptor.name)? {
            return Err(EngineError::ColumnFamilyExists(descriptor.name.clone()));
        }
        writer.append(&LogEntry::CreateColumnFamily {
            name: descriptor.name.clone(),
            options: descriptor.options.clone(),
        })?;
        self.tables
            .add(&descriptor.name, descriptor.options.clone())?;
        self.tables.open_handle(&descriptor.name)
    }

    fn get(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let table = self.tables.table(cf)?;
        let table = read_table(&table)?;
        Ok(table.get(key).cloned())
    }

    fn put(&self, cf: &ColumnFamilyHandle, key: &[u8], value: &[u8]) -> EngineResult<()> {
        let table = self.tables.table(cf)?;
        let mut writer = self.writer()?;
        writer.append(&LogEntry::Put {
            column_family: cf.name().to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        write_table(&table)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<()> {
        let table = self.tables.table(cf)?;
        let mut writer = self.writer()?;
        writer.append(&LogEntry::Delete {
            column_family: cf.name().to_string(),
            key: key.to_vec(),
        })?;
        write_table(&table)?.remove(key);
        Ok(())
    }

    fn new_iterator<'a>(
        &'a self,
        cf: &ColumnFamilyHandle,
    ) -> EngineResult<Box<dyn EngineIterator + 'a>> {
        Ok(Box::new(TableIterator::new(self.tables.table(cf)?)))
    }

    fn column_family_options(&self, name: &str) -> EngineResult<Option<ColumnFamilyOptions>> {
        self.tables.options(name)
    }

    fn release_column_family(&self, cf: ColumnFamilyHandle) -> EngineResult<()> {
        self.tables.release(cf)
    }

    fn close(&self) -> EngineResult<()> {
        self.tables.close()?;
        self.writer()?.sync()
    }
}
