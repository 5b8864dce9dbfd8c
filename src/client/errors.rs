//! # Client Errors
//!
//! Internal to the facade: every `ClientError` is logged and mapped to a
//! `Status` before it reaches the caller.

use thiserror::Error;

use super::status::Status;
use crate::codec::CodecError;
use crate::engine::EngineError;
use crate::session::SessionError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Session closed or its state unusable
    #[error("Session unavailable: {0}")]
    Session(SessionError),

    #[error("Failed to create namespace '{name}': {source}")]
    NamespaceCreate {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("Engine {operation} on '{table}' failed: {source}")]
    EngineOp {
        operation: &'static str,
        table: String,
        #[source]
        source: EngineError,
    },

    #[error("Record encoding failed: {0}")]
    Codec(#[from] CodecError),
}

impl ClientError {
    pub(crate) fn engine_op(operation: &'static str, table: &str, source: EngineError) -> Self {
        ClientError::EngineOp {
            operation,
            table: table.to_string(),
            source,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Session(e) => e.code(),
            ClientError::NamespaceCreate { .. } => "CFB_CLIENT_NAMESPACE_CREATE",
            ClientError::EngineOp { .. } => "CFB_CLIENT_ENGINE_OP",
            ClientError::Codec(e) => e.code(),
        }
    }

    /// Status reported to the caller
    pub fn status(&self) -> Status {
        match self {
            ClientError::EngineOp { source, .. } if source.is_not_supported() => {
                Status::NotImplemented
            }
            _ => Status::Error,
        }
    }
}

impl From<SessionError> for ClientError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NamespaceCreate { name, source } => {
                ClientError::NamespaceCreate { name, source }
            }
            other => ClientError::Session(other),
        }
    }
}
