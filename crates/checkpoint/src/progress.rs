//! File-backed checkpoint table shared by oplog tailer workers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use bson::Timestamp;

use crate::{long_to_timestamp, timestamp_to_long};

/// On-disk form of the progress file.
///
/// A table with exactly one entry is written as a single `[name, position]`
/// pair, the format older single-stream deployments produced; anything else
/// is an array of pairs. Both forms parse.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum ProgressFile {
    Single((String, u64)),
    Many(Vec<(String, u64)>),
}

impl ProgressFile {
    fn into_pairs(self) -> Vec<(String, u64)> {
        match self {
            ProgressFile::Single(pair) => vec![pair],
            ProgressFile::Many(pairs) => pairs,
        }
    }
}

/// Durable checkpoint table for oplog tailer workers.
///
/// Tracks the last-processed oplog position per stream and persists the
/// table to a single JSON progress file. Every method takes `&self` except
/// [`CheckpointStore::load`], which runs once before the store is shared.
///
/// # Example
///
/// ```rust
/// use checkpoint::CheckpointStore;
/// use bson::Timestamp;
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut store = CheckpointStore::new(dir.path().join("oplog.progress"));
/// store.load().unwrap();
///
/// let position = Timestamp { time: 1700000000, increment: 4 };
/// store.update_checkpoint("local.oplog.rs/rs0", "rs0", Some(position));
/// store.save().unwrap();
///
/// assert_eq!(store.read_checkpoint("local.oplog.rs/rs0", "rs0"), Some(position));
/// ```
pub struct CheckpointStore {
    path: Option<PathBuf>,
    table: Mutex<BTreeMap<String, Timestamp>>,
}

impl CheckpointStore {
    /// Create a store persisting to the given progress file.
    ///
    /// The file does not have to exist yet; the first `save` creates it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            table: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a store with no backing file.
    ///
    /// `load` and `save` become no-ops; the in-memory table still works.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: Mutex::new(BTreeMap::new()),
        }
    }

    /// Path of the progress file, when persistence is configured.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the progress file into the table.
    ///
    /// Call once at startup, before the store is shared with workers.
    /// Missing and zero-length files leave the table empty. A file that does
    /// not parse is logged and skipped rather than aborting startup, so the
    /// operator can restore the backup copy by hand or let the streams
    /// resume from the current oplog position.
    pub fn load(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let backup = backup_path(&path);

        // save() renames the primary away before rewriting it, so a crash in
        // that window leaves only the backup behind.
        let mut source = path.clone();
        if missing_or_empty(&path) {
            if missing_or_empty(&backup) {
                return Ok(());
            }
            tracing::warn!(
                "Progress file {} missing or empty, recovering from backup {}",
                path.display(),
                backup.display()
            );
            source = backup;
        }

        let raw = std::fs::read_to_string(&source)
            .with_context(|| format!("failed to read progress file {}", source.display()))?;
        let parsed: ProgressFile = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(
                    "Cannot parse progress file {}: {}; starting with an empty checkpoint \
                     table. Restore the .backup copy over it to keep the previous positions, \
                     otherwise streams resume from the current oplog position",
                    source.display(),
                    err
                );
                return Ok(());
            }
        };

        let table = self.table.get_mut().unwrap();
        table.clear();
        for (name, position) in parsed.into_pairs() {
            table.insert(name, long_to_timestamp(position));
        }
        tracing::info!(
            "Loaded {} stream checkpoints from {}",
            table.len(),
            source.display()
        );
        Ok(())
    }

    /// Write a snapshot of the table to the progress file.
    ///
    /// The snapshot is taken under the lock; file I/O happens outside it so
    /// workers keep updating checkpoints while the write is in flight. The
    /// previous contents survive as `<path>.backup` until the new write
    /// succeeds and are restored if it fails. An empty table writes nothing.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let mut snapshot: Vec<(String, u64)> = {
            let table = self.table.lock().unwrap();
            table
                .iter()
                .map(|(name, ts)| (name.clone(), timestamp_to_long(*ts)))
                .collect()
        };
        if snapshot.is_empty() {
            tracing::debug!("Checkpoint table is empty, nothing to save");
            return Ok(());
        }

        let backup = backup_path(&path);
        let had_previous = path.is_file();
        if had_previous {
            std::fs::rename(&path, &backup).with_context(|| {
                format!("failed to back up progress file to {}", backup.display())
            })?;
        }

        let file = if snapshot.len() == 1 {
            ProgressFile::Single(snapshot.remove(0))
        } else {
            ProgressFile::Many(snapshot)
        };

        match write_snapshot(&path, &file) {
            Ok(()) => {
                if had_previous {
                    std::fs::remove_file(&backup).with_context(|| {
                        format!("failed to remove backup file {}", backup.display())
                    })?;
                }
                tracing::debug!("Saved checkpoint table to {}", path.display());
                Ok(())
            }
            Err(write_err) => {
                if had_previous {
                    std::fs::copy(&backup, &path).with_context(|| {
                        format!(
                            "failed to restore progress file from {} after write failure: {}",
                            backup.display(),
                            write_err
                        )
                    })?;
                    let _ = std::fs::remove_file(&backup);
                }
                Err(write_err.context(format!(
                    "failed to write progress file {}",
                    path.display()
                )))
            }
        }
    }

    /// Record the latest processed position for a stream.
    ///
    /// `stream_id` is the key older progress files used for this stream; any
    /// entry under it migrates to `name` on the first update. A `None`
    /// checkpoint is the not-yet-started sentinel and leaves the table
    /// untouched.
    pub fn update_checkpoint(&self, stream_id: &str, name: &str, checkpoint: Option<Timestamp>) {
        let Some(checkpoint) = checkpoint else {
            tracing::debug!("No checkpoint to update for stream {}", name);
            return;
        };
        let mut table = self.table.lock().unwrap();
        if stream_id != name {
            table.remove(stream_id);
        }
        table.insert(name.to_string(), checkpoint);
    }

    /// Last recorded position for a stream, preferring the stream name and
    /// falling back to the legacy `stream_id` key.
    pub fn read_checkpoint(&self, stream_id: &str, name: &str) -> Option<Timestamp> {
        let table = self.table.lock().unwrap();
        table.get(name).or_else(|| table.get(stream_id)).copied()
    }

    /// Point-in-time copy of the whole table.
    pub fn checkpoints(&self) -> BTreeMap<String, Timestamp> {
        self.table.lock().unwrap().clone()
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

fn missing_or_empty(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    }
}

fn write_snapshot(path: &Path, file: &ProgressFile) -> Result<()> {
    let json = serde_json::to_string(file)?;
    std::fs::write(path, json)?;
    Ok(())
}
