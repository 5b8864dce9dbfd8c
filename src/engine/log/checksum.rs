//! CRC32 checksums for log entries
//!
//! Every entry carries a CRC32 (IEEE) over its length field and body. Replay
//! verifies each one; any mismatch aborts the open.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
