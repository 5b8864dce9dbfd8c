//! Record Codec Tests
//!
//! - Encoded records decode to the same field map
//! - Field filters select by key
//! - Truncated buffers never fail: they yield the complete tuples before
//!   the cut and say where decoding stopped

use std::collections::HashSet;

use cfbench::codec::{decode, encode, encode_fields, Record, TruncationStage};

// =============================================================================
// Test Utilities
// =============================================================================

fn record(fields: &[(&str, &[u8])]) -> Record {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_vec()))
        .collect()
}

fn filter(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_round_trip_preserves_fields() {
    let original = record(&[
        ("f1", b"hello"),
        ("f2", b"world"),
        ("empty", b""),
        ("binary", &[0x00, 0xFF, 0x10, 0x00]),
        ("unicode-\u{e9}", "caf\u{e9}".as_bytes()),
    ]);

    let buffer = encode(&original).unwrap();
    let decoded = decode(&buffer, None);

    assert!(decoded.is_complete());
    assert_eq!(decoded.fields, original);
}

#[test]
fn test_empty_record_encodes_to_empty_buffer() {
    let buffer = encode(&Record::new()).unwrap();
    assert!(buffer.is_empty());

    let decoded = decode(&buffer, None);
    assert!(decoded.is_complete());
    assert!(decoded.fields.is_empty());
}

#[test]
fn test_lengths_are_big_endian() {
    let buffer = encode_fields([("ab", b"xyz".as_slice())]).unwrap();
    assert_eq!(
        buffer,
        vec![0, 0, 0, 2, b'a', b'b', 0, 0, 0, 3, b'x', b'y', b'z']
    );
}

#[test]
fn test_decode_is_idempotent() {
    let buffer = encode(&record(&[("f1", b"a"), ("f2", b"b")])).unwrap();
    assert_eq!(decode(&buffer, None), decode(&buffer, None));
}

// =============================================================================
// Field Filters
// =============================================================================

#[test]
fn test_filter_selects_members_only() {
    let buffer = encode(&record(&[("f1", b"1"), ("f2", b"2"), ("f3", b"3")])).unwrap();

    let decoded = decode(&buffer, Some(&filter(&["f1", "f3", "missing"])));
    assert_eq!(decoded.fields, record(&[("f1", b"1"), ("f3", b"3")]));
}

#[test]
fn test_empty_filter_selects_nothing() {
    let buffer = encode(&record(&[("f1", b"1")])).unwrap();
    let decoded = decode(&buffer, Some(&HashSet::new()));
    assert!(decoded.fields.is_empty());
    assert!(decoded.is_complete());
}

// =============================================================================
// Truncation Tolerance
// =============================================================================

#[test]
fn test_truncation_at_every_offset() {
    let buffer =
        encode_fields([("f1", b"hello".as_slice()), ("f2", b"world".as_slice())]).unwrap();
    // Each tuple: 4 + 2 + 4 + 5 bytes
    let boundaries = [0usize, 15, 30];
    assert_eq!(buffer.len(), 30);

    for cut in 0..=buffer.len() {
        let decoded = decode(&buffer[..cut], None);
        let complete_tuples = boundaries.iter().filter(|b| **b != 0 && **b <= cut).count();

        assert_eq!(
            decoded.fields.len(),
            complete_tuples,
            "cut at {} decoded {:?}",
            cut,
            decoded.fields
        );
        assert_eq!(decoded.is_complete(), boundaries.contains(&cut), "cut at {}", cut);

        if let Some(truncation) = decoded.truncation {
            assert_eq!(truncation.buffer_len, cut);
            assert!(truncation.offset <= cut);
        }
        if complete_tuples >= 1 {
            assert_eq!(decoded.fields["f1"], b"hello".to_vec());
        }
    }
}

#[test]
fn test_truncation_reports_stage() {
    let buffer = encode_fields([("key", b"value".as_slice())]).unwrap();

    let cases = [
        (2, TruncationStage::KeyLength, 0),
        (5, TruncationStage::Key, 4),
        (8, TruncationStage::ValueLength, 7),
        (13, TruncationStage::Value, 11),
    ];
    for (cut, stage, offset) in cases {
        let truncation = decode(&buffer[..cut], None)
            .truncation
            .unwrap_or_else(|| panic!("cut at {} should truncate", cut));
        assert_eq!(truncation.stage, stage, "cut at {}", cut);
        assert_eq!(truncation.offset, offset, "cut at {}", cut);
    }
}

#[test]
fn test_declared_length_past_end_keeps_earlier_fields() {
    let mut buffer = encode_fields([("f1", b"ok".as_slice())]).unwrap();
    buffer.extend_from_slice(&u32::MAX.to_be_bytes());
    buffer.extend_from_slice(b"short");

    let decoded = decode(&buffer, None);
    assert_eq!(decoded.fields, record(&[("f1", b"ok")]));
    assert_eq!(decoded.truncation.unwrap().stage, TruncationStage::Key);
}

#[test]
fn test_invalid_utf8_key_decodes_lossily() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&2u32.to_be_bytes());
    buffer.extend_from_slice(&[0xFF, b'a']);
    buffer.extend_from_slice(&1u32.to_be_bytes());
    buffer.push(b'v');

    let decoded = decode(&buffer, None);
    assert!(decoded.is_complete());
    assert_eq!(decoded.fields["\u{FFFD}a"], b"v".to_vec());
}
