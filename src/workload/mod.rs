//! # Workload Driver
//!
//! Benchmark phases over the client facade:
//!
//! - `load`: insert `record_count` records (`user0`, `user1`, ...) split
//!   across threads
//! - `run`: each thread performs `operation_count` operations picked by the
//!   configured read/update/insert/scan/delete proportions
//!
//! Every thread keeps its own `ThroughputStats`; the phase report aggregates
//! them with elapsed time, throughput and the session's operation counters.

mod config;
mod errors;
mod runner;
mod stats;

pub use config::WorkloadConfig;
pub use errors::{WorkloadError, WorkloadResult};
pub use runner::{field_name, key_name, WorkloadRunner};
pub use stats::{
    aggregate, throughput, Operation, OperationStats, Phase, ThroughputStats, WorkloadReport,
};
