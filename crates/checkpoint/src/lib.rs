//! Oplog progress tracking for oplog-sync
//!
//! Persists the last-processed oplog position of every tailed stream so an
//! interrupted pipeline resumes where it left off instead of re-syncing the
//! whole data set.
//!
//! # Architecture
//!
//! - `CheckpointStore` owns the in-memory table mapping stream names to BSON
//!   timestamps, shared by all tailer workers behind a single mutex
//! - `load` reads the progress file once at startup, before workers exist
//! - `save` snapshots the table under the lock and rewrites the file through
//!   a backup copy, so a failed write never truncates the previous state
//!
//! Positions are `bson::Timestamp` values (epoch seconds plus a per-second
//! counter). On disk each position is the packed single-integer form
//! produced by [`timestamp_to_long`].

mod progress;


pub use progress::CheckpointStore;

use bson::Timestamp;

/// Pack a BSON timestamp into the single integer stored in progress files.
///
/// The epoch seconds occupy the high 32 bits, the per-second counter the
/// low 32 bits, so packed values order the same way the timestamps do.
pub fn timestamp_to_long(ts: Timestamp) -> u64 {
    (u64::from(ts.time) << 32) | u64::from(ts.increment)
}

/// Unpack a progress-file integer back into a BSON timestamp.
pub fn long_to_timestamp(value: u64) -> Timestamp {
    Timestamp {
        time: (value >> 32) as u32,
        increment: (value & 0xFFFF_FFFF) as u32,
    }
}
