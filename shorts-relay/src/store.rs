//! Durable set of already-processed video identifiers.
//!
//! The set lives in memory and is rewritten in full to a JSON array after
//! every insertion. It only ever grows.
//!
//! Writers are ordered by a separate lock held across the file write; the
//! set's own lock is released before any IO, so readers never wait on disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::domain::VideoId;
use crate::utils::fs;
use crate::{Error, Result};

/// Seen-set store backed by a JSON file.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    ids: Mutex<BTreeSet<VideoId>>,
    /// Serializes snapshot + write so files land in insertion order.
    writer: Mutex<()>,
}

impl SeenStore {
    /// Load the set from `path`.
    ///
    /// A missing file is a first run and yields an empty set. A file that
    /// exists but does not hold a JSON array of strings is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let ids = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| fs::io_error("reading seen set", &path, e))?;
            let entries: Vec<String> = serde_json::from_str(&raw)?;
            entries
                .iter()
                .filter_map(|id| VideoId::parse(id))
                .collect::<BTreeSet<_>>()
        } else {
            fs::ensure_dir_all_sync_with_op(
                "creating seen set directory",
                fs::parent_or_current(&path),
            )?;
            BTreeSet::new()
        };

        info!(path = %path.display(), count = ids.len(), "Loaded seen set");

        Ok(Self {
            path,
            ids: Mutex::new(ids),
            writer: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &VideoId) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }

    /// Insert `id` and persist the full set.
    ///
    /// Returns `Ok(false)` without touching the file if `id` was already
    /// present. When persisting fails the identifier stays in memory and
    /// [`Error::Persist`] is returned.
    ///
    /// Blocks on file IO; async callers should run it on a blocking thread.
    pub fn insert(&self, id: VideoId) -> Result<bool> {
        let _writer = self.writer.lock();

        let snapshot = {
            let mut ids = self.ids.lock();
            if !ids.insert(id.clone()) {
                return Ok(false);
            }
            ids.clone()
        };

        if let Err(e) = self.persist(&snapshot) {
            error!(
                video_id = %id,
                path = %self.path.display(),
                error = %e,
                "Failed to persist seen set"
            );
            return Err(e);
        }

        debug!(video_id = %id, count = snapshot.len(), "Seen set persisted");
        Ok(true)
    }

    fn persist(&self, ids: &BTreeSet<VideoId>) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(ids)?;
        json.push(b'\n');
        fs::write_atomic(&self.path, &json).map_err(|e| Error::persist(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(s: &str) -> VideoId {
        VideoId::new(s).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::load(dir.path().join("seen.json")).unwrap();
        assert!(store.is_empty());
        assert!(!store.contains(&vid("abc")));
    }

    #[test]
    fn test_insert_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let store = SeenStore::load(&path).unwrap();
        assert!(store.insert(vid("abc")).unwrap());
        assert!(store.insert(vid("XYZ")).unwrap());
        drop(store);

        let reloaded = SeenStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&vid("abc")));
        assert!(reloaded.contains(&vid("XYZ")));
        assert!(!reloaded.contains(&vid("xyz")));
    }

    #[test]
    fn test_file_is_json_array_of_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let store = SeenStore::load(&path).unwrap();
        store.insert(vid("b")).unwrap();
        store.insert(vid("a")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let store = SeenStore::load(&path).unwrap();
        assert!(store.insert(vid("abc")).unwrap());

        std::fs::remove_file(&path).unwrap();
        assert!(!store.insert(vid("abc")).unwrap());
        assert!(!path.exists(), "duplicate insert must not rewrite the file");
    }

    #[test]
    fn test_loads_existing_file_and_skips_blank_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, r#"["one", "  ", "two "]"#).unwrap();

        let store = SeenStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains(&vid("two")));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            SeenStore::load(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("seen.json");

        let store = SeenStore::load(&path).unwrap();
        store.insert(vid("abc")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_addition() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        let path = state_dir.join("seen.json");

        let store = SeenStore::load(&path).unwrap();
        std::fs::remove_dir_all(&state_dir).unwrap();

        let result = store.insert(vid("abc"));
        assert!(matches!(result, Err(Error::Persist { .. })));
        assert!(store.contains(&vid("abc")));
    }

    #[test]
    fn test_readers_do_not_wait_for_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(SeenStore::load(dir.path().join("seen.json")).unwrap());
        store.insert(vid("abc")).unwrap();

        // Hold the writer lock as an in-flight write would.
        let _writer = store.writer.lock();

        let (tx, rx) = std::sync::mpsc::channel();
        let reader = store.clone();
        std::thread::spawn(move || {
            let _ = tx.send((reader.len(), reader.contains(&vid("abc"))));
        });

        let seen = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("reader blocked behind the writer");
        assert_eq!(seen, (1, true));
    }

    #[test]
    fn test_concurrent_inserts_all_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        let store = std::sync::Arc::new(SeenStore::load(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.insert(vid(&format!("id{i}"))).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let reloaded = SeenStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 8);
    }
}
