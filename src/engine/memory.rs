//! # In-Memory Engine
//!
//! Ordered, non-durable engine. Every open starts empty: the directory is
//! not read or written, and declared column families are created regardless
//! of the create flags.

use std::path::Path;

use super::backend::{ColumnFamilyHandle, Engine, EngineDriver, EngineIterator, OpenedEngine};
use super::errors::EngineResult;
use super::options::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, EngineOptions, DEFAULT_COLUMN_FAMILY,
};
use super::tables::{read_table, write_table, OrderedTable, TableIterator, TableSet};

/// Opens `MemoryEngine`s
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryDriver;

impl EngineDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open(
        &self,
        _directory: &Path,
        options: &EngineOptions,
        column_families: &[ColumnFamilyDescriptor],
    ) -> EngineResult<OpenedEngine> {
        let engine = MemoryEngine::new();
        let handles = match options {
            EngineOptions::Simple(simple) => {
                engine
                    .tables
                    .add(DEFAULT_COLUMN_FAMILY, simple.column_family.clone())?;
                vec![engine.tables.open_handle(DEFAULT_COLUMN_FAMILY)?]
            }
            EngineOptions::Multi(_) => {
                let mut handles = Vec::with_capacity(column_families.len());
                for descriptor in column_families {
                    engine
                        .tables
                        .add(&descriptor.name, descriptor.options.clone())?;
                    handles.push(engine.tables.open_handle(&descriptor.name)?);
                }
                if !engine.tables.contains(DEFAULT_COLUMN_FAMILY)? {
                    engine
                        .tables
                        .add(DEFAULT_COLUMN_FAMILY, Default::default())?;
                }
                handles
            }
        };

        Ok(OpenedEngine {
            engine: Box::new(engine),
            handles,
        })
    }
}

/// Ordered in-memory engine
#[derive(Debug)]
pub struct MemoryEngine {
    tables: TableSet<OrderedTable>,
}

impl MemoryEngine {
    fn new() -> Self {
        Self {
            tables: TableSet::new(),
        }
    }
}

impl Engine for MemoryEngine {
    fn create_column_family(
        &self,
        descriptor: &ColumnFamilyDescriptor,
    ) -> EngineResult<ColumnFamilyHandle> {
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
        write_table(&table)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<()> {
        let table = self.tables.table(cf)?;
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
        self.tables.close()
    }
}
