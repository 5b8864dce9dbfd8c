//! # Storage Engine Contract
//!
//! The capability set the session and facade rely on. Implementations must be
//! safe for concurrent use of already-open handles from many threads.

use std::fmt;
use std::path::Path;

use super::errors::EngineResult;
use super::options::{ColumnFamilyDescriptor, ColumnFamilyOptions, EngineOptions};

/// Reference to an open column family.
///
/// Not `Clone`: a handle is released exactly once, by moving it into
/// `Engine::release_column_family`.
#[derive(Debug, PartialEq, Eq)]
pub struct ColumnFamilyHandle {
    id: u32,
    name: String,
}

impl ColumnFamilyHandle {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Engine-assigned identifier, stable for the life of the engine
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An opened engine and one handle per opened column family
pub struct OpenedEngine {
    pub engine: Box<dyn Engine>,
    /// With `EngineOptions::Simple`, the default column family's handle.
    /// With `EngineOptions::Multi`, one handle per descriptor, in order.
    pub handles: Vec<ColumnFamilyHandle>,
}

impl fmt::Debug for OpenedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedEngine")
            .field("engine", &self.engine)
            .field("handles", &self.handles)
            .finish()
    }
}

/// Opens engines
pub trait EngineDriver: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Opens the engine stored in `directory`.
    ///
    /// `column_families` is ignored for `EngineOptions::Simple`.
    fn open(
        &self,
        directory: &Path,
        options: &EngineOptions,
        column_families: &[ColumnFamilyDescriptor],
    ) -> EngineResult<OpenedEngine>;
}

/// An open engine instance
pub trait Engine: Send + Sync + fmt::Debug {
    /// Creates a new column family
    fn create_column_family(
        &self,
        descriptor: &ColumnFamilyDescriptor,
    ) -> EngineResult<ColumnFamilyHandle>;

    /// Value stored under `key`, `None` if absent
    fn get(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value
    fn put(&self, cf: &ColumnFamilyHandle, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Removes `key`; removing a missing key succeeds
    fn delete(&self, cf: &ColumnFamilyHandle, key: &[u8]) -> EngineResult<()>;

    /// Forward iterator over the column family in key order.
    ///
    /// Engines without ordered iteration return `EngineError::NotSupported`.
    fn new_iterator<'a>(
        &'a self,
        cf: &ColumnFamilyHandle,
    ) -> EngineResult<Box<dyn EngineIterator + 'a>>;

    /// Options of the named column family, `None` if it does not exist
    fn column_family_options(&self, name: &str) -> EngineResult<Option<ColumnFamilyOptions>>;

    /// Releases a handle. The column family and its data remain.
    fn release_column_family(&self, cf: ColumnFamilyHandle) -> EngineResult<()>;

    /// Closes the engine. Every later call fails with `EngineError::Closed`.
    fn close(&self) -> EngineResult<()>;
}

/// Forward cursor over one column family.
///
/// `key` and `value` return empty slices when the cursor is not valid.
pub trait EngineIterator {
    /// Positions at the first key `>= target`
    fn seek(&mut self, target: &[u8]);

    fn valid(&self) -> bool;

    /// Advances to the next key
    fn next(&mut self);

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];

    /// Error that invalidated the cursor, if any
    fn status(&self) -> EngineResult<()>;
}
