//! Client Facade Tests
//!
//! CRUD behaviour through the facade on every built-in engine:
//! - insert/read/update/delete round trips
//! - tables are created on first reference and reused afterwards
//! - update never creates a record
//! - ordered scans, and NOT_IMPLEMENTED on the hash engine

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use cfbench::client::{Client, Status};
use cfbench::engine::{EngineKind, MemoryDriver};
use cfbench::session::{ConfigSource, Session};
use support::{create_temp_data_dir, data_path, read_manifest, record, CountingDriver};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const ALL_ENGINES: [EngineKind; 3] = [EngineKind::Memory, EngineKind::Log, EngineKind::Hash];

fn connect(kind: EngineKind) -> (TempDir, Arc<Session>, Client) {
    let dir = create_temp_data_dir();
    let session = Arc::new(Session::new(kind.driver()));
    let client = Client::connect(Arc::clone(&session), data_path(&dir), ConfigSource::Defaults)
        .expect("Failed to connect client");
    (dir, session, client)
}

fn fields(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// =============================================================================
// CRUD Scenarios
// =============================================================================

#[test]
fn test_insert_then_read() {
    for kind in ALL_ENGINES {
        let (_dir, _session, client) = connect(kind);

        let values = record(&[("f1", "hello"), ("f2", "world")]);
        assert_eq!(client.insert("usertable", "u1", &values), Status::Ok, "{:?}", kind);
        assert_eq!(client.read("usertable", "u1", None), Ok(values), "{:?}", kind);

        client.close().unwrap();
    }
}

#[test]
fn test_update_merges_fields() {
    for kind in ALL_ENGINES {
        let (_dir, _session, client) = connect(kind);

        client.insert("usertable", "u1", &record(&[("f1", "hello"), ("f2", "world")]));
        assert_eq!(
            client.update("usertable", "u1", &record(&[("f2", "updated")])),
            Status::Ok
        );
        assert_eq!(
            client.read("usertable", "u1", None),
            Ok(record(&[("f1", "hello"), ("f2", "updated")])),
            "{:?}",
            kind
        );

        client.close().unwrap();
    }
}

#[test]
fn test_delete_then_read_not_found() {
    for kind in ALL_ENGINES {
        let (_dir, _session, client) = connect(kind);

        client.insert("usertable", "u1", &record(&[("f1", "hello")]));
        assert_eq!(client.delete("usertable", "u1"), Status::Ok);
        assert_eq!(client.read("usertable", "u1", None), Err(Status::NotFound), "{:?}", kind);

        // Deleting again is still OK
        assert_eq!(client.delete("usertable", "u1"), Status::Ok);

        client.close().unwrap();
    }
}

#[test]
fn test_update_missing_key_creates_nothing() {
    for kind in ALL_ENGINES {
        let (_dir, session, client) = connect(kind);

        assert_eq!(
            client.update("usertable", "ghost", &record(&[("f1", "x")])),
            Status::NotFound,
            "{:?}",
            kind
        );
        assert_eq!(client.read("usertable", "ghost", None), Err(Status::NotFound));

        let metrics = session.metrics().snapshot();
        assert_eq!(metrics.update_misses, 1);
        assert_eq!(metrics.errors, 0);

        client.close().unwrap();
    }
}

#[test]
fn test_insert_replaces_record() {
    let (_dir, _session, client) = connect(EngineKind::Memory);

    client.insert("usertable", "u1", &record(&[("f1", "a"), ("f2", "b")]));
    client.insert("usertable", "u1", &record(&[("f3", "c")]));

    assert_eq!(
        client.read("usertable", "u1", None),
        Ok(record(&[("f3", "c")]))
    );
    client.close().unwrap();
}

#[test]
fn test_read_with_field_filter() {
    let (_dir, _session, client) = connect(EngineKind::Log);

    client.insert(
        "usertable",
        "u1",
        &record(&[("f1", "a"), ("f2", "b"), ("f3", "c")]),
    );
    assert_eq!(
        client.read("usertable", "u1", Some(&fields(&["f2", "nope"]))),
        Ok(record(&[("f2", "b")]))
    );
    client.close().unwrap();
}

// =============================================================================
// Table Auto-Creation
// =============================================================================

#[test]
fn test_first_reference_creates_table_once() {
    let dir = create_temp_data_dir();
    let driver = CountingDriver::new(Arc::new(MemoryDriver));
    let counters = driver.counters();
    let session = Arc::new(Session::new(Arc::new(driver)));
    let client =
        Client::connect(Arc::clone(&session), dir.path(), ConfigSource::Defaults).unwrap();

    assert_eq!(client.read("t2", "missing", None), Err(Status::NotFound));
    assert_eq!(counters.creates(), 1);

    assert_eq!(client.insert("t2", "k", &record(&[("f", "v")])), Status::Ok);
    assert_eq!(client.update("t2", "k", &record(&[("f", "w")])), Status::Ok);
    assert!(client.scan("t2", "", 10, None).is_ok());
    assert_eq!(client.delete("t2", "k"), Status::Ok);
    assert_eq!(counters.creates(), 1, "later operations reuse the namespace");

    client.close().unwrap();
}

#[test]
fn test_delete_on_new_table_materializes_it() {
    let (dir, session, client) = connect(EngineKind::Log);

    assert_eq!(client.delete("never-written", "k"), Status::Ok);
    assert!(session
        .active()
        .unwrap()
        .namespace_names()
        .unwrap()
        .contains(&"never-written".to_string()));

    client.close().unwrap();
    assert!(read_manifest(&data_path(&dir)).contains(&"never-written".to_string()));
}

#[test]
fn test_tables_are_isolated() {
    for kind in ALL_ENGINES {
        let (_dir, _session, client) = connect(kind);

        client.insert("a", "k", &record(&[("f", "from-a")]));
        client.insert("b", "k", &record(&[("f", "from-b")]));

        assert_eq!(client.read("a", "k", None), Ok(record(&[("f", "from-a")])));
        assert_eq!(client.read("b", "k", None), Ok(record(&[("f", "from-b")])));

        client.delete("a", "k");
        assert_eq!(client.read("a", "k", None), Err(Status::NotFound));
        assert!(client.read("b", "k", None).is_ok(), "{:?}", kind);

        client.close().unwrap();
    }
}

// =============================================================================
// Scans
// =============================================================================

#[test]
fn test_scan_returns_key_order_from_start() {
    for kind in [EngineKind::Memory, EngineKind::Log] {
        let (_dir, _session, client) = connect(kind);

        for key in ["user5", "user1", "user3", "user2", "user4"] {
            client.insert("usertable", key, &record(&[("id", key)]));
        }

        let records = client.scan("usertable", "user2", 3, None).unwrap();
        let ids: Vec<&[u8]> = records.iter().map(|r| r["id"].as_slice()).collect();
        assert_eq!(ids, vec![&b"user2"[..], &b"user3"[..], &b"user4"[..]], "{:?}", kind);

        client.close().unwrap();
    }
}

#[test]
fn test_scan_start_between_keys_and_past_end() {
    let (_dir, _session, client) = connect(EngineKind::Memory);

    for key in ["b", "d", "f"] {
        client.insert("t", key, &record(&[("id", key)]));
    }

    let records = client.scan("t", "c", 10, None).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], b"d".to_vec());

    assert_eq!(client.scan("t", "z", 10, None), Ok(Vec::new()));
    assert_eq!(client.scan("t", "", 0, None), Ok(Vec::new()));

    client.close().unwrap();
}

#[test]
fn test_scan_applies_field_filter() {
    let (_dir, _session, client) = connect(EngineKind::Log);

    client.insert("t", "k1", &record(&[("a", "1"), ("b", "2")]));
    client.insert("t", "k2", &record(&[("a", "3"), ("b", "4")]));

    let records = client.scan("t", "", 10, Some(&fields(&["b"]))).unwrap();
    assert_eq!(records, vec![record(&[("b", "2")]), record(&[("b", "4")])]);

    client.close().unwrap();
}

#[test]
fn test_hash_engine_scan_not_implemented() {
    let (_dir, session, client) = connect(EngineKind::Hash);

    client.insert("usertable", "u1", &record(&[("f1", "x")]));
    assert_eq!(
        client.scan("usertable", "", 10, None),
        Err(Status::NotImplemented)
    );

    let metrics = session.metrics().snapshot();
    assert_eq!(metrics.not_implemented, 1);
    assert_eq!(metrics.errors, 0);

    // Point operations are unaffected
    assert!(client.read("usertable", "u1", None).is_ok());
    client.close().unwrap();
}

// =============================================================================
// Session Sharing
// =============================================================================

#[test]
fn test_clients_share_data() {
    let dir = create_temp_data_dir();
    let session = Arc::new(Session::new(Arc::new(MemoryDriver)));

    let writer =
        Client::connect(Arc::clone(&session), dir.path(), ConfigSource::Defaults).unwrap();
    let reader =
        Client::connect(Arc::clone(&session), dir.path(), ConfigSource::Defaults).unwrap();

    writer.insert("usertable", "u1", &record(&[("f1", "shared")]));
    writer.close().unwrap();

    // The session is still held by the reader
    assert_eq!(
        reader.read("usertable", "u1", None),
        Ok(record(&[("f1", "shared")]))
    );
    reader.close().unwrap();
    assert_eq!(session.ref_count(), 0);
}

#[test]
fn test_operations_after_session_closed_return_error() {
    let dir = create_temp_data_dir();
    let session = Arc::new(Session::new(Arc::new(MemoryDriver)));
    let client =
        Client::connect(Arc::clone(&session), dir.path(), ConfigSource::Defaults).unwrap();

    // Force the session shut underneath the client
    session.close().unwrap();

    assert_eq!(client.insert("t", "k", &record(&[("f", "v")])), Status::Error);
    assert_eq!(client.read("t", "k", None), Err(Status::Error));
    assert_eq!(client.scan("t", "", 1, None), Err(Status::Error));
    assert_eq!(session.metrics().snapshot().errors, 3);
}
