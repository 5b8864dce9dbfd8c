//! Workload configuration
//!
//! The `workload` section of the benchmark config. Every field is optional;
//! defaults describe a read-mostly workload (95% reads, 5% updates) over
//! 1000 records of ten 100-byte fields.

use serde::{Deserialize, Serialize};

use super::errors::{WorkloadError, WorkloadResult};
use super::stats::Operation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Table every operation targets
    pub table: String,
    /// Records inserted by `load`, keys `user0..user{record_count - 1}`
    pub record_count: u64,
    /// Operations each thread performs during `run`
    pub operation_count: u64,
    pub threads: usize,
    pub field_count: usize,
    /// Bytes per field value
    pub field_length: usize,
    pub read_proportion: f64,
    pub update_proportion: f64,
    pub insert_proportion: f64,
    pub scan_proportion: f64,
    pub delete_proportion: f64,
    /// Scans read between 1 and this many records
    pub max_scan_length: usize,
    /// Per-thread target rate, 0 for unthrottled
    pub ops_per_sec: u64,
    /// Seed for reproducible runs; thread `t` uses `seed + t`
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            table: "usertable".to_string(),
            record_count: 1000,
            operation_count: 1000,
            threads: 1,
            field_count: 10,
            field_length: 100,
            read_proportion: 0.95,
            update_proportion: 0.05,
            insert_proportion: 0.0,
            scan_proportion: 0.0,
            delete_proportion: 0.0,
            max_scan_length: 100,
            ops_per_sec: 0,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> WorkloadResult<()> {
        if self.table.is_empty() {
            return Err(WorkloadError::invalid("table must not be empty"));
        }
        if self.threads == 0 {
            return Err(WorkloadError::invalid("threads must be > 0"));
        }
        if self.field_count == 0 {
            return Err(WorkloadError::invalid("field_count must be > 0"));
        }

        let mut total = 0.0;
        for (operation, proportion) in self.proportions() {
            if !proportion.is_finite() || proportion < 0.0 {
                return Err(WorkloadError::invalid(format!(
                    "{}_proportion must be a non-negative number, got {}",
                    operation.as_str(),
                    proportion
                )));
            }
            total += proportion;
        }
        if total <= 0.0 {
            return Err(WorkloadError::invalid(
                "at least one operation proportion must be > 0",
            ));
        }

        if self.scan_proportion > 0.0 && self.max_scan_length == 0 {
            return Err(WorkloadError::invalid(
                "max_scan_length must be > 0 when scans are enabled",
            ));
        }

        Ok(())
    }

    /// Operation weights in `Operation::ALL` order
    pub fn proportions(&self) -> [(Operation, f64); 5] {
        [
            (Operation::Read, self.read_proportion),
            (Operation::Update, self.update_proportion),
            (Operation::Insert, self.insert_proportion),
            (Operation::Scan, self.scan_proportion),
            (Operation::Delete, self.delete_proportion),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        WorkloadConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WorkloadConfig =
            serde_json::from_str(r#"{"threads": 4, "scan_proportion": 0.5}"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.table, "usertable");
        assert_eq!(config.scan_proportion, 0.5);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_weights() {
        let config = WorkloadConfig {
            read_proportion: 0.0,
            update_proportion: 0.0,
            ..WorkloadConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_proportion() {
        let config = WorkloadConfig {
            delete_proportion: -0.1,
            ..WorkloadConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("delete_proportion"));
    }

    #[test]
    fn test_rejects_zero_threads() {
        let config = WorkloadConfig {
            threads: 0,
            ..WorkloadConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code(), "CFB_WORKLOAD_INVALID_CONFIG");
    }
}
