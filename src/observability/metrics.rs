//! Operation counters for a session
//!
//! - Counters only, monotonic
//! - Shared by every client of one session
//! - Thread-safe, Relaxed ordering (exactness per counter, not across them)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Facade operation counters
#[derive(Debug, Default)]
pub struct OperationMetrics {
    reads: AtomicU64,
    read_misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    update_misses: AtomicU64,
    deletes: AtomicU64,
    scans: AtomicU64,
    scanned_records: AtomicU64,
    errors: AtomicU64,
    not_implemented: AtomicU64,
    namespaces_created: AtomicU64,
    truncated_decodes: AtomicU64,
}

impl OperationMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a read, `hit == false` for NOT_FOUND
    pub fn record_read(&self, hit: bool) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.read_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count an insert
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an update, `hit == false` for NOT_FOUND
    pub fn record_update(&self, hit: bool) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.update_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a delete
    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a scan and the records it returned
    pub fn record_scan(&self, records: u64) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.scanned_records.fetch_add(records, Ordering::Relaxed);
    }

    /// Count an operation that ended with ERROR
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an operation that ended with NOT_IMPLEMENTED
    pub fn record_not_implemented(&self) {
        self.not_implemented.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a namespace created on first reference
    pub fn record_namespace_created(&self) {
        self.namespaces_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a decode that stopped on a truncated buffer
    pub fn record_truncated_decode(&self) {
        self.truncated_decodes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            read_misses: self.read_misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            update_misses: self.update_misses.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            scanned_records: self.scanned_records.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            not_implemented: self.not_implemented.load(Ordering::Relaxed),
            namespaces_created: self.namespaces_created.load(Ordering::Relaxed),
            truncated_decodes: self.truncated_decodes.load(Ordering::Relaxed),
        }
    }

    /// Current counters rendered as a JSON object
    pub fn to_json(&self) -> String {
        // A struct of plain integers always serializes
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub read_misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub update_misses: u64,
    pub deletes: u64,
    pub scans: u64,
    pub scanned_records: u64,
    pub errors: u64,
    pub not_implemented: u64,
    pub namespaces_created: u64,
    pub truncated_decodes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let metrics = OperationMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_hits_and_misses() {
        let metrics = OperationMetrics::new();
        metrics.record_read(true);
        metrics.record_read(false);
        metrics.record_update(false);
        metrics.record_scan(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reads, 2);
        assert_eq!(snapshot.read_misses, 1);
        assert_eq!(snapshot.updates, 1);
        assert_eq!(snapshot.update_misses, 1);
        assert_eq!(snapshot.scans, 1);
        assert_eq!(snapshot.scanned_records, 7);
    }

    #[test]
    fn test_to_json() {
        let metrics = OperationMetrics::new();
        metrics.record_insert();
        metrics.record_namespace_created();

        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["inserts"], 1);
        assert_eq!(parsed["namespaces_created"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(OperationMetrics::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    m.record_insert();
                    m.record_read(false);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inserts, 2000);
        assert_eq!(snapshot.read_misses, 2000);
    }
}
