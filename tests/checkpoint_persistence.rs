//! Checkpoint tables surviving a pipeline restart.

use bson::Timestamp;
use oplog_sync::CheckpointStore;

const STREAM_ID: &str = "local.oplog.rs/rs0";
const STREAM_NAME: &str = "rs0";

#[test]
fn test_checkpoint_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oplog.progress");
    let position = Timestamp {
        time: 1_700_000_000,
        increment: 4,
    };

    let mut store = CheckpointStore::new(&path);
    store.load().unwrap();
    store.update_checkpoint(STREAM_ID, STREAM_NAME, Some(position));
    store.save().unwrap();
    drop(store);

    let mut reopened = CheckpointStore::new(&path);
    reopened.load().unwrap();
    assert_eq!(
        reopened.read_checkpoint(STREAM_ID, STREAM_NAME),
        Some(position)
    );

    // The not-yet-started sentinel must not clobber a recorded position.
    reopened.update_checkpoint(STREAM_ID, STREAM_NAME, None);
    assert_eq!(
        reopened.read_checkpoint(STREAM_ID, STREAM_NAME),
        Some(position)
    );
}

#[test]
fn test_multiple_streams_resume_where_they_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oplog.progress");

    let rs0 = Timestamp {
        time: 1_700_000_000,
        increment: 1,
    };
    let rs1 = Timestamp {
        time: 1_700_000_050,
        increment: 7,
    };

    let mut store = CheckpointStore::new(&path);
    store.load().unwrap();
    store.update_checkpoint("local.oplog.rs/rs0", "rs0", Some(rs0));
    store.update_checkpoint("local.oplog.rs/rs1", "rs1", Some(rs1));
    store.save().unwrap();
    drop(store);

    // First restart: both streams pick up their own position.
    let mut store = CheckpointStore::new(&path);
    store.load().unwrap();
    assert_eq!(store.read_checkpoint("local.oplog.rs/rs0", "rs0"), Some(rs0));
    assert_eq!(store.read_checkpoint("local.oplog.rs/rs1", "rs1"), Some(rs1));

    // One stream advances before the next restart.
    let rs0_later = Timestamp {
        time: 1_700_000_200,
        increment: 2,
    };
    store.update_checkpoint("local.oplog.rs/rs0", "rs0", Some(rs0_later));
    store.save().unwrap();
    drop(store);

    let mut store = CheckpointStore::new(&path);
    store.load().unwrap();
    assert_eq!(
        store.read_checkpoint("local.oplog.rs/rs0", "rs0"),
        Some(rs0_later)
    );
    assert_eq!(store.read_checkpoint("local.oplog.rs/rs1", "rs1"), Some(rs1));
    assert_eq!(store.checkpoints().len(), 2);
}
