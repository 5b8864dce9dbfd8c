//! # Engine Errors

use std::io;

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Storage engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("corruption at byte offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("column family already exists: {0}")]
    ColumnFamilyExists(String),

    #[error("unknown or released column family handle: {0}")]
    UnknownColumnFamily(String),

    #[error("operation not supported by this engine: {0}")]
    NotSupported(&'static str),

    #[error("engine is closed")]
    Closed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        EngineError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a corruption error at a byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        EngineError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn poisoned() -> Self {
        EngineError::Internal("Lock poisoned".to_string())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Io { .. } => "CFB_ENGINE_IO_ERROR",
            EngineError::Corruption { .. } => "CFB_ENGINE_CORRUPTION",
            EngineError::InvalidArgument(_) => "CFB_ENGINE_INVALID_ARGUMENT",
            EngineError::ColumnFamilyExists(_) => "CFB_ENGINE_COLUMN_FAMILY_EXISTS",
            EngineError::UnknownColumnFamily(_) => "CFB_ENGINE_UNKNOWN_COLUMN_FAMILY",
            EngineError::NotSupported(_) => "CFB_ENGINE_NOT_SUPPORTED",
            EngineError::Closed => "CFB_ENGINE_CLOSED",
            EngineError::Internal(_) => "CFB_ENGINE_INTERNAL",
        }
    }

    /// Whether the engine lacks the capability rather than failing at it
    pub fn is_not_supported(&self) -> bool {
        matches!(self, EngineError::NotSupported(_))
    }
}
