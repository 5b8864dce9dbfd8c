//! # Storage Engines
//!
//! The engine contract (`EngineDriver`, `Engine`, `EngineIterator`), its
//! options and errors, and three in-process implementations:
//!
//! | Kind     | Ordered | Durable | Notes                                  |
//! |----------|---------|---------|----------------------------------------|
//! | `memory` | yes     | no      | starts empty on every open             |
//! | `log`    | yes     | yes     | append-only `engine.log`, CRC32 checked |
//! | `hash`   | no      | no      | scans report not-implemented           |

mod backend;
mod errors;
pub mod hash;
pub mod log;
pub mod memory;
mod options;
mod tables;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use backend::{ColumnFamilyHandle, Engine, EngineDriver, EngineIterator, OpenedEngine};
pub use errors::{EngineError, EngineResult};
pub use hash::HashDriver;
pub use log::{LogDriver, LOG_FILE_NAME};
pub use memory::MemoryDriver;
pub use options::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, CompactionStyle, Compression, DbOptions,
    EngineOptions, Options, OptionsFile, DEFAULT_COLUMN_FAMILY, DEFAULT_MEMTABLE_BUDGET,
};

/// Built-in engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Memory,
    #[default]
    Log,
    Hash,
}

impl EngineKind {
    pub fn driver(self) -> Arc<dyn EngineDriver> {
        match self {
            EngineKind::Memory => Arc::new(MemoryDriver),
            EngineKind::Log => Arc::new(LogDriver),
            EngineKind::Hash => Arc::new(HashDriver),
        }
    }
}
