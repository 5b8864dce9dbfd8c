//! Shared helpers for the integration tests
//!
//! - Temp data directories and options files
//! - `CountingDriver`: wraps a real driver and counts engine opens and
//!   namespace creations so tests can assert they happen exactly once

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cfbench::codec::Record;
use cfbench::engine::{
    ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions, Engine, EngineDriver,
    EngineIterator, EngineOptions, EngineResult, OpenedEngine,
};
use tempfile::TempDir;

// =============================================================================
// Directories and Files
// =============================================================================

pub fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Writes an options file next to (not inside) the data directory
pub fn write_options_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("options.json");
    fs::write(&path, content).expect("Failed to write options file");
    path
}

/// Data directory inside `dir`
pub fn data_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data")
}

pub fn read_manifest(data_dir: &Path) -> Vec<String> {
    fs::read_to_string(data_dir.join("CF_NAMES"))
        .expect("Failed to read manifest")
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn record(fields: &[(&str, &str)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

// =============================================================================
// Counting Driver
// =============================================================================

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub creates: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Delegates to `inner`, counting calls and optionally slowing namespace
/// creation down to widen race windows
#[derive(Debug)]
pub struct CountingDriver {
    inner: Arc<dyn EngineDriver>,
    counters: Arc<Counters>,
    create_delay: Duration,
}

impl CountingDriver {
    pub fn new(inner: Arc<dyn EngineDriver>) -> Self {
        Self {
            inner,
            counters: Arc::new(Counters::default()),
            create_delay: Duration::ZERO,
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

impl EngineDriver for CountingDriver {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn open(
        &self,
        directory: &Path,
        options: &EngineOptions,
        column_families: &[ColumnFamilyDescriptor],
    ) -> EngineResult<OpenedEngine> {
        let opened = self.inner.open(directory, options, column_families)?;
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(OpenedEngine {
            engine: Box::new(CountingEngine {
                inner: opened.engine,
                counters: Arc::clone(&self.counters),
                create_delay: self.create_delay,
            }),
            handles: opened.handles,
        })
    }
}

#[derive(Debug)]
struct CountingEngine {
    inner: Box<dyn Engine>,
    counters: Arc<Counters>,
    create_delay: Duration,
}

impl Engine for CountingEngine {
    fn create_column_family(
        &self,
        descriptor: &ColumnFamilyDescriptor,
    ) -> EngineResult<ColumnFamilyHandle> {
        if !self.create_delay.is_zero() {
            thread::sleep(self.create_delay);
        }
        let handle = self.inner.create_column_family(descriptor)?;
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn get(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.inner.get(cf, key)
    }

    fn put(&self, cf: &ColumnFamilyHandle, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.inner.put(cf, key, value)
    }

    fn delete(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<()> {
        self.inner.delete(cf, key)
    }

    fn new_iterator<'a>(
        &'a self,
        cf: &ColumnFamilyHandle,
    ) -> EngineResult<Box<dyn EngineIterator + 'a>> {
        self.inner.new_iterator(cf)
    }

    fn column_family_options(&self, name: &str) -> EngineResult<Option<ColumnFamilyOptions>> {
        self.inner.column_family_options(name)
    }

    fn release_column_family(&self, cf: ColumnFamilyHandle) -> EngineResult<()> {
        self.inner.release_column_family(cf)
    }

    fn close(&self) -> EngineResult<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}
