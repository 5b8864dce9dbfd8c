//! Per-thread throughput statistics and the aggregated report

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::Status;
use crate::observability::MetricsSnapshot;

/// Facade operation kinds a workload issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Update,
    Insert,
    Scan,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Read,
        Operation::Update,
        Operation::Insert,
        Operation::Scan,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Insert => "insert",
            Operation::Scan => "scan",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counts and latency for one operation kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    pub ok: u64,
    pub not_found: u64,
    pub error: u64,
    pub not_implemented: u64,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

impl OperationStats {
    pub fn count(&self) -> u64 {
        self.ok + self.not_found + self.error + self.not_implemented
    }

    pub fn avg_latency_us(&self) -> u64 {
        match self.count() {
            0 => 0,
            n => self.total_latency_us / n,
        }
    }

    fn record(&mut self, status: Status, latency: Duration) {
        match status {
            Status::Ok => self.ok += 1,
            Status::NotFound => self.not_found += 1,
            Status::Error => self.error += 1,
            Status::NotImplemented => self.not_implemented += 1,
        }
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us = self.total_latency_us.saturating_add(micros);
        self.max_latency_us = self.max_latency_us.max(micros);
    }

    fn merge(&mut self, other: &OperationStats) {
        self.ok += other.ok;
        self.not_found += other.not_found;
        self.error += other.error;
        self.not_implemented += other.not_implemented;
        self.total_latency_us = self.total_latency_us.saturating_add(other.total_latency_us);
        self.max_latency_us = self.max_latency_us.max(other.max_latency_us);
    }
}

/// Statistics collected by one worker thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputStats {
    pub operations: BTreeMap<Operation, OperationStats>,
}

impl ThroughputStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: Operation, status: Status, latency: Duration) {
        self.operations
            .entry(operation)
            .or_default()
            .record(status, latency);
    }

    pub fn merge(&mut self, other: &ThroughputStats) {
        for (operation, stats) in &other.operations {
            self.operations.entry(*operation).or_default().merge(stats);
        }
    }

    pub fn get(&self, operation: Operation) -> Option<&OperationStats> {
        self.operations.get(&operation)
    }

    pub fn total_ops(&self) -> u64 {
        self.operations.values().map(OperationStats::count).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.operations.values().map(|s| s.error).sum()
    }
}

/// Workload phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Run,
}

/// Result of one workload phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub run_id: Uuid,
    pub phase: Phase,
    pub engine: String,
    pub table: String,
    pub threads: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total_ops: u64,
    pub ops_per_sec: f64,
    /// All threads combined
    pub operations: ThroughputStats,
    pub per_thread: Vec<ThroughputStats>,
    /// Session counters when the phase finished
    pub metrics: MetricsSnapshot,
}

impl WorkloadReport {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Combined statistics of every thread
pub fn aggregate(per_thread: &[ThroughputStats]) -> ThroughputStats {
    let mut total = ThroughputStats::new();
    for stats in per_thread {
        total.merge(stats);
    }
    total
}

/// Operations per second over `elapsed`
pub fn throughput(total_ops: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        total_ops as f64 / secs
    } else {
        0.0
    }
}
