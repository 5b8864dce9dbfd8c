//! Engine and column family options
//!
//! Options are plain owned values. `Clone` is a deep copy, so two namespaces
//! never share one options object and releasing one cannot affect another.
//!
//! Options files are JSON:
//!
//! ```json
//! {
//!   "db": { "create_if_missing": true, "increase_parallelism": 8 },
//!   "column_families": [
//!     { "name": "default", "options": { "write_buffer_size": 67108864 } },
//!     { "name": "usertable", "options": { "compaction_style": "universal" } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use crate::observability::Severity;

/// Name of the column family every engine has
pub const DEFAULT_COLUMN_FAMILY: &str = "default";

/// Memtable budget used by `ColumnFamilyOptions::baseline`
pub const DEFAULT_MEMTABLE_BUDGET: u64 = 512 * 1024 * 1024;

const MIB: u64 = 1024 * 1024;

/// Engine-wide options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    /// Create the engine's files when the directory has none
    pub create_if_missing: bool,
    /// Create declared column families the engine does not have yet
    pub create_missing_column_families: bool,
    /// Total background threads
    pub increase_parallelism: u32,
    /// Concurrent flush and compaction jobs
    pub max_background_jobs: u32,
    /// fsync after every write
    pub sync_writes: bool,
    /// Verbosity of the engine's own info log
    pub info_log_level: Severity,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            create_missing_column_families: false,
            increase_parallelism: 1,
            max_background_jobs: 2,
            sync_writes: false,
            info_log_level: Severity::Info,
        }
    }
}

impl DbOptions {
    /// Options used when no options file is given.
    ///
    /// Creates what is missing and sizes background work to twice the
    /// available cores.
    pub fn baseline() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1)
            * 2;
        Self {
            create_if_missing: true,
            create_missing_column_families: true,
            increase_parallelism: threads,
            max_background_jobs: threads,
            sync_writes: false,
            info_log_level: Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactionStyle {
    Level,
    Universal,
    Fifo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Snappy,
    Lz4,
    Zstd,
}

/// Per column family options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFamilyOptions {
    pub write_buffer_size: u64,
    pub max_write_buffer_number: u32,
    pub level0_file_num_compaction_trigger: u32,
    pub target_file_size_base: u64,
    pub max_bytes_for_level_base: u64,
    pub compaction_style: CompactionStyle,
    pub compression: Compression,
}

impl Default for ColumnFamilyOptions {
    fn default() -> Self {
        Self {
            write_buffer_size: 64 * MIB,
            max_write_buffer_number: 2,
            level0_file_num_compaction_trigger: 4,
            target_file_size_base: 64 * MIB,
            max_bytes_for_level_base: 256 * MIB,
            compaction_style: CompactionStyle::Level,
            compression: Compression::Snappy,
        }
    }
}

impl ColumnFamilyOptions {
    /// Engine defaults tuned for level-style compaction with a 512 MiB
    /// memtable budget.
    pub fn baseline() -> Self {
        Self::default().optimize_level_style_compaction(DEFAULT_MEMTABLE_BUDGET)
    }

    /// Sizes memtables and the first levels from a memtable budget.
    pub fn optimize_level_style_compaction(mut self, memtable_budget: u64) -> Self {
        self.write_buffer_size = memtable_budget / 4;
        self.max_write_buffer_number = 6;
        self.level0_file_num_compaction_trigger = 2;
        self.target_file_size_base = memtable_budget / 8;
        self.max_bytes_for_level_base = memtable_budget;
        self.compaction_style = CompactionStyle::Level;
        self
    }
}

/// Options for the simple single-namespace shape
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Options {
    pub db: DbOptions,
    pub column_family: ColumnFamilyOptions,
}

impl Options {
    /// Baseline db and column family options together
    pub fn baseline() -> Self {
        Self {
            db: DbOptions::baseline(),
            column_family: ColumnFamilyOptions::baseline(),
        }
    }
}

/// Top-level options an engine is opened with.
///
/// `Simple` opens the default namespace only, with its options inline.
/// `Multi` opens an explicit list of column family descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOptions {
    Simple(Options),
    Multi(DbOptions),
}

impl EngineOptions {
    /// Engine-wide part of either shape
    pub fn db(&self) -> &DbOptions {
        match self {
            EngineOptions::Simple(options) => &options.db,
            EngineOptions::Multi(db) => db,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            EngineOptions::Simple(_) => "simple",
            EngineOptions::Multi(_) => "multi",
        }
    }
}

/// A column family name together with the options to open or create it with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamilyDescriptor {
    pub name: String,
    #[serde(default)]
    pub options: ColumnFamilyOptions,
}

impl ColumnFamilyDescriptor {
    pub fn new(name: impl Into<String>, options: ColumnFamilyOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Declarative options source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionsFile {
    #[serde(default)]
    pub db: DbOptions,
    #[serde(default)]
    pub column_families: Vec<ColumnFamilyDescriptor>,
}

impl OptionsFile {
    /// Reads and validates an options file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::io(format!("failed to read options file {}", path.display()), e)
        })?;
        Self::parse(&content).map_err(|e| match e {
            EngineError::InvalidArgument(msg) => {
                EngineError::InvalidArgument(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parses and validates options file contents
    pub fn parse(content: &str) -> EngineResult<Self> {
        let file: OptionsFile = serde_json::from_str(content)
            .map_err(|e| EngineError::InvalidArgument(format!("invalid options JSON: {}", e)))?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for descriptor in &self.column_families {
            if descriptor.name.is_empty() {
                return Err(EngineError::InvalidArgument(
                    "column family name must not be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(EngineError::InvalidArgument(format!(
                    "column family '{}' declared more than once",
                    descriptor.name
                )));
            }
        }
        Ok(())
    }

    /// The declaration for `name`, if any
    pub fn column_family(&self, name: &str) -> Option<&ColumnFamilyDescriptor> {
        self.column_families.iter().find(|d| d.name == name)
    }

    /// Descriptors to open the engine with.
    ///
    /// Every engine has a default column family, so it is opened with
    /// engine-default options when the file does not declare it.
    pub fn open_descriptors(&self) -> Vec<ColumnFamilyDescriptor> {
        let mut descriptors = self.column_families.clone();
        if self.column_family(DEFAULT_COLUMN_FAMILY).is_none() {
            descriptors.insert(
                0,
                ColumnFamilyDescriptor::new(DEFAULT_COLUMN_FAMILY, ColumnFamilyOptions::default()),
            );
        }
        descriptors
    }
}
