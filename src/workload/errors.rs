//! # Workload Errors

use thiserror::Error;

use crate::session::SessionError;

pub type WorkloadResult<T> = Result<T, WorkloadError>;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Invalid workload configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(usize),
}

impl WorkloadError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        WorkloadError::InvalidConfig(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            WorkloadError::InvalidConfig(_) => "CFB_WORKLOAD_INVALID_CONFIG",
            WorkloadError::Session(e) => e.code(),
            WorkloadError::WorkerPanicked(_) => "CFB_WORKLOAD_WORKER_PANICKED",
        }
    }
}
