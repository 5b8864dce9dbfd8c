//! # Session Errors

use std::io;

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Engine session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration could not be resolved or the engine failed to open.
    /// `ref_count` is unchanged.
    #[error("Engine init failed for {directory}: {reason}")]
    EngineInit { directory: String, reason: String },

    /// Releasing handles, closing the engine or saving the manifest failed.
    /// The reference was still released.
    #[error("Engine shutdown failed: {0}")]
    EngineShutdown(String),

    #[error("Session is not open")]
    NotOpen,

    /// The engine refused to create a namespace on first reference
    #[error("Failed to create namespace '{name}': {source}")]
    NamespaceCreate {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("Manifest I/O error: {context}: {source}")]
    Manifest {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn engine_init(directory: impl Into<String>, reason: impl ToString) -> Self {
        SessionError::EngineInit {
            directory: directory.into(),
            reason: reason.to_string(),
        }
    }

    pub fn manifest_io(context: impl Into<String>, source: io::Error) -> Self {
        SessionError::Manifest {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn poisoned() -> Self {
        SessionError::Internal("Lock poisoned".to_string())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::EngineInit { .. } => "CFB_SESSION_ENGINE_INIT",
            SessionError::EngineShutdown(_) => "CFB_SESSION_ENGINE_SHUTDOWN",
            SessionError::NotOpen => "CFB_SESSION_NOT_OPEN",
            SessionError::NamespaceCreate { .. } => "CFB_SESSION_NAMESPACE_CREATE",
            SessionError::Manifest { .. } => "CFB_SESSION_MANIFEST",
            SessionError::Internal(_) => "CFB_SESSION_INTERNAL",
        }
    }
}
