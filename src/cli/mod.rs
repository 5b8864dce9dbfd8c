//! CLI module for cfbench
//!
//! Provides command-line interface for:
//! - load: insert the workload's records
//! - run: execute the workload's operation mix
//! - inspect: list namespaces and session counters

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{inspect, load, run, run_command, run_workload, BenchConfig, InspectReport};
pub use errors::{CliError, CliErrorCode, CliResult};
