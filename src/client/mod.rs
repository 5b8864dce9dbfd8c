//! # Client Facade
//!
//! Key/value CRUD over named tables. Each table is a namespace of the shared
//! session's engine, created on first reference. Values are field maps
//! stored through the record codec.
//!
//! Every engine and codec failure stops here: it is logged and counted, and
//! the caller gets a `Status`. Only `connect` and `close` return errors.
//!
//! `update` reads the stored record, merges the new fields over it and
//! writes it back. The read and the write are separate engine calls, so two
//! concurrent updates of one key can lose one writer's fields.

mod errors;
mod status;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub use errors::{ClientError, ClientResult};
pub use status::Status;

use crate::codec::{self, Record};
use crate::observability::{log_event_with_fields, Event, OperationMetrics, Severity};
use crate::session::{ConfigSource, Session, SessionResult};

/// One benchmark client.
///
/// Holds one reference on its session from `connect` until `close` (or
/// drop).
#[derive(Debug)]
pub struct Client {
    session: Arc<Session>,
    metrics: Arc<OperationMetrics>,
    closed: bool,
}

impl Client {
    /// Opens the session, or joins it if another client already did.
    pub fn connect(
        session: Arc<Session>,
        directory: impl AsRef<Path>,
        config_source: ConfigSource,
    ) -> SessionResult<Self> {
        session.open(directory, config_source)?;
        let metrics = session.metrics();
        Ok(Self {
            session,
            metrics,
            closed: false,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Releases this client's session reference.
    pub fn close(mut self) -> SessionResult<()> {
        self.closed = true;
        self.session.close()
    }

    /// Stores `values` under `key`, replacing any existing record.
    pub fn insert(&self, table: &str, key: &str, values: &Record) -> Status {
        match self.try_insert(table, key, values) {
            Ok(()) => {
                self.metrics.record_insert();
                Status::Ok
            }
            Err(e) => self.fail("insert", table, key, e),
        }
    }

    /// Reads the record under `key`, restricted to `fields` when given.
    pub fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
    ) -> Result<Record, Status> {
        match self.try_read(table, key, fields) {
            Ok(Some(record)) => {
                self.metrics.record_read(true);
                Ok(record)
            }
            Ok(None) => {
                self.metrics.record_read(false);
                Err(Status::NotFound)
            }
            Err(e) => Err(self.fail("read", table, key, e)),
        }
    }

    /// Merges `values` into the existing record under `key`.
    ///
    /// Returns `NotFound` without writing anything when the key has no
    /// record.
    pub fn update(&self, table: &str, key: &str, values: &Record) -> Status {
        match self.try_update(table, key, values) {
            Ok(true) => {
                self.metrics.record_update(true);
                Status::Ok
            }
            Ok(false) => {
                self.metrics.record_update(false);
                log_event_with_fields(
                    Severity::Trace,
                    Event::UpdateMissingKey,
                    &[("table", table), ("key", key)],
                );
                Status::NotFound
            }
            Err(e) => self.fail("update", table, key, e),
        }
    }

    /// Removes `key`. Succeeds whether or not the key existed.
    pub fn delete(&self, table: &str, key: &str) -> Status {
        match self.try_delete(table, key) {
            Ok(()) => {
                self.metrics.record_delete();
                Status::Ok
            }
            Err(e) => self.fail("delete", table, key, e),
        }
    }

    /// Up to `count` records in key order, starting at the first key
    /// `>= start_key`.
    pub fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&HashSet<String>>,
    ) -> Result<Vec<Record>, Status> {
        match self.try_scan(table, start_key, count, fields) {
            Ok(records) => {
                self.metrics.record_scan(records.len() as u64);
                Ok(records)
            }
            Err(e) => Err(self.fail("scan", table, start_key, e)),
        }
    }

    fn try_insert(&self, table: &str, key: &str, values: &Record) -> ClientResult<()> {
        let active = self.session.active()?;
        let namespace = active.namespace(table)?;
        let buffer = codec::encode(values)?;
        active
            .engine()
            .put(namespace.handle(), key.as_bytes(), &buffer)
            .map_err(|e| ClientError::engine_op("put", table, e))
    }

    fn try_read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
    ) -> ClientResult<Option<Record>> {
        let active = self.session.active()?;
        let namespace = active.namespace(table)?;
        let stored = active
            .engine()
            .get(namespace.handle(), key.as_bytes())
            .map_err(|e| ClientError::engine_op("get", table, e))?;
        Ok(stored.map(|buffer| self.decode(table, key.as_bytes(), &buffer, fields)))
    }

    fn try_update(&self, table: &str, key: &str, values: &Record) -> ClientResult<bool> {
        let active = self.session.active()?;
        let namespace = active.namespace(table)?;
        let engine = active.engine();

        let stored = engine
            .get(namespace.handle(), key.as_bytes())
            .map_err(|e| ClientError::engine_op("get", table, e))?;
        let mut record = match stored {
            Some(buffer) => self.decode(table, key.as_bytes(), &buffer, None),
            None => return Ok(false),
        };

        record.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        let buffer = codec::encode(&record)?;
        engine
            .put(namespace.handle(), key.as_bytes(), &buffer)
            .map_err(|e| ClientError::engine_op("put", table, e))?;
        Ok(true)
    }

    fn try_delete(&self, table: &str, key: &str) -> ClientResult<()> {
        let active = self.session.active()?;
        let namespace = active.namespace(table)?;
        active
            .engine()
            .delete(namespace.handle(), key.as_bytes())
            .map_err(|e| ClientError::engine_op("delete", table, e))
    }

    fn try_scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&HashSet<String>>,
    ) -> ClientResult<Vec<Record>> {
        let active = self.session.active()?;
        let namespace = active.namespace(table)?;
        let mut iter = active
            .engine()
            .new_iterator(namespace.handle())
            .map_err(|e| ClientError::engine_op("scan", table, e))?;

        let mut records = Vec::with_capacity(count.min(1024));
        iter.seek(start_key.as_bytes());
        while iter.valid() && records.len() < count {
            records.push(self.decode(table, iter.key(), iter.value(), fields));
            iter.next();
        }
        iter.status()
            .map_err(|e| ClientError::engine_op("scan", table, e))?;

        Ok(records)
    }

    // Truncated buffers still yield the fields read before the cut.
    fn decode(
        &self,
        table: &str,
        key: &[u8],
        buffer: &[u8],
        fields: Option<&HashSet<String>>,
    ) -> Record {
        let decoded = codec::decode(buffer, fields);
        if let Some(truncation) = decoded.truncation {
            self.metrics.record_truncated_decode();
            let key = String::from_utf8_lossy(key);
            let offset = truncation.offset.to_string();
            let buffer_len = truncation.buffer_len.to_string();
            log_event_with_fields(
                Severity::Warn,
                Event::RecordTruncated,
                &[
                    ("table", table),
                    ("key", &key),
                    ("stage", truncation.stage.as_str()),
                    ("offset", &offset),
                    ("buffer_len", &buffer_len),
                ],
            );
        }
        decoded.fields
    }

    fn fail(&self, operation: &str, table: &str, key: &str, err: ClientError) -> Status {
        let status = err.status();
        if status == Status::NotImplemented {
            self.metrics.record_not_implemented();
            log_event_with_fields(
                Severity::Trace,
                Event::OperationFailed,
                &[("operation", operation), ("table", table), ("status", status.as_str())],
            );
            return status;
        }

        self.metrics.record_error();
        log_event_with_fields(
            Severity::Error,
            Event::OperationFailed,
            &[
                ("operation", operation),
                ("table", table),
                ("key", key),
                ("code", err.code()),
                ("error", &err.to_string()),
            ],
        );
        status
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.session.close() {
            log_event_with_fields(
                Severity::Error,
                Event::SessionShutdownFailed,
                &[("code", e.code()), ("error", &e.to_string())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HashDriver, MemoryDriver};
    use tempfile::TempDir;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    fn connect(dir: &TempDir, session: Arc<Session>) -> Client {
        Client::connect(session, dir.path(), ConfigSource::Defaults).unwrap()
    }

    #[test]
    fn test_insert_then_filtered_read() {
        let dir = TempDir::new().unwrap();
        let client = connect(&dir, Arc::new(Session::new(Arc::new(MemoryDriver))));

        let status = client.insert("usertable", "u1", &record(&[("f1", "a"), ("f2", "b")]));
        assert_eq!(status, Status::Ok);

        let fields: HashSet<String> = ["f2".to_string()].into_iter().collect();
        let read = client.read("usertable", "u1", Some(&fields)).unwrap();
        assert_eq!(read, record(&[("f2", "b")]));
    }

    #[test]
    fn test_update_missing_key_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let client = connect(&dir, Arc::new(Session::new(Arc::new(MemoryDriver))));

        assert_eq!(
            client.update("usertable", "ghost", &record(&[("f1", "x")])),
            Status::NotFound
        );
        assert_eq!(client.read("usertable", "ghost", None), Err(Status::NotFound));
        assert_eq!(client.session().metrics().snapshot().update_misses, 1);
    }

    #[test]
    fn test_truncated_value_returns_partial_record() {
        let dir = TempDir::new().unwrap();
        let client = connect(&dir, Arc::new(Session::new(Arc::new(MemoryDriver))));
        client.insert("usertable", "seed", &record(&[("f1", "v")]));

        let mut buffer = codec::encode(&record(&[("f1", "hello")])).unwrap();
        buffer.extend_from_slice(&[0, 0, 0, 9, b'f']);
        let active = client.session().active().unwrap();
        let namespace = active.namespace("usertable").unwrap();
        active
            .engine()
            .put(namespace.handle(), b"cut", &buffer)
            .unwrap();
        drop(namespace);
        drop(active);

        let read = client.read("usertable", "cut", None).unwrap();
        assert_eq!(read, record(&[("f1", "hello")]));
        assert_eq!(client.session().metrics().snapshot().truncated_decodes, 1);
    }

    #[test]
    fn test_scan_not_implemented_on_hash_engine() {
        let dir = TempDir::new().unwrap();
        let client = connect(&dir, Arc::new(Session::new(Arc::new(HashDriver))));
        client.insert("usertable", "u1", &record(&[("f1", "a")]));

        assert_eq!(
            client.scan("usertable", "u0", 10, None),
            Err(Status::NotImplemented)
        );
        let snapshot = client.session().metrics().snapshot();
        assert_eq!(snapshot.not_implemented, 1);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn test_operations_after_session_closed_report_error() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(Session::new(Arc::new(MemoryDriver)));
        let client = connect(&dir, Arc::clone(&session));
        session.close().unwrap();

        assert_eq!(client.delete("usertable", "u1"), Status::Error);
        assert_eq!(session.metrics().snapshot().errors, 1);

        // The reference was already released above; this close is unmatched.
        client.close().unwrap();
        assert_eq!(session.ref_count(), 0);
    }

    #[test]
    fn test_drop_releases_reference() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(Session::new(Arc::new(MemoryDriver)));
        {
            let _a = connect(&dir, Arc::clone(&session));
            let _b = connect(&dir, Arc::clone(&session));
            assert_eq!(session.ref_count(), 2);
        }
        assert_eq!(session.ref_count(), 0);
    }
}
