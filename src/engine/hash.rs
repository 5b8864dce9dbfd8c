//! # Hash Engine
//!
//! Unordered in-memory engine modeled on cache-backed stores: point reads
//! and writes only. It cannot iterate in key order, so `new_iterator`
//! reports `NotSupported` and scans degrade to NOT_IMPLEMENTED.

use std::collections::HashMap;
use std::path::Path;

use super::backend::{ColumnFamilyHandle, Engine, EngineDriver, EngineIterator, OpenedEngine};
use super::errors::{EngineError, EngineResult};
use super::options::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, EngineOptions, DEFAULT_COLUMN_FAMILY,
};
use super::tables::{read_table, write_table, TableSet};

type HashTable = HashMap<Vec<u8>, Vec<u8>>;

/// Opens `HashEngine`s
#[derive(Debug, Default, Clone, Copy)]
pub struct HashDriver;

impl EngineDriver for HashDriver {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn open(
        &self,
        _directory: &Path,
        options: &EngineOptions,
        column_families: &[ColumnFamilyDescriptor],
    ) -> EngineResult<OpenedEngine> {
        let engine = HashEngine {
            tables: TableSet::new(),
        };
        let handles = match options {
            EngineOptions::Simple(simple) => {
                engine
                    .tables
                    .add(DEFAULT_COLUMN_FAMILY, simple.column_family.clone())?;
                vec![engine.tables.open_handle(DEFAULT_COLUMN_FAMILY)?]
            }
            EngineOptions::Multi(_) => column_families
                .iter()
                .map(|d| {
                    engine.tables.add(&d.name, d.options.clone())?;
                    engine.tables.open_handle(&d.name)
                })
                .collect::<EngineResult<Vec<_>>>()?,
        };

        Ok(OpenedEngine {
            engine: Box::new(engine),
            handles,
        })
    }
}

/// Unordered in-memory engine
#[derive(Debug)]
pub struct HashEngine {
    tables: TableSet<HashTable>,
}

impl Engine for HashEngine {
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
        self.tables.table(cf)?;
        Err(EngineError::NotSupported("ordered iteration"))
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
