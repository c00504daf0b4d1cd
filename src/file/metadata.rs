//! Durable identifier to display-name index.
//!
//! The map is held in memory behind a single mutex and mirrored to a JSON
//! file on disk. The storage directory stays the source of truth for which
//! files exist; this index only remembers what they were called.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;

use crate::{FiledropError, Result};

/// Metadata store mapping file identifiers to original filenames.
///
/// All reads and writes of the map, including [`save`](Self::save), are
/// serialized by one lock.
#[derive(Debug)]
pub struct MetadataStore {
    /// Path of the JSON file.
    path: PathBuf,
    /// Identifier -> display name.
    entries: Mutex<BTreeMap<String, String>>,
}

impl MetadataStore {
    /// Create an empty store backed by the given JSON file.
    ///
    /// Nothing is read until [`load`](Self::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Get the path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (every mutation is a single insert/remove), so poisoning is ignored.
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the map from disk, replacing the in-memory contents.
    ///
    /// A missing file is a first run and yields an empty map. An unparseable
    /// file fails with [`FiledropError::MetadataCorrupt`] and leaves the map
    /// empty, so the caller can log and carry on.
    ///
    /// # Returns
    ///
    /// The number of entries loaded.
    pub fn load(&self) -> Result<usize> {
        let mut entries = self.entries();

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                entries.clear();
                return Ok(0);
            }
            Err(e) => {
                entries.clear();
                return Err(e.into());
            }
        };

        match serde_json::from_slice::<BTreeMap<String, String>>(&data) {
            Ok(loaded) => {
                *entries = loaded;
                Ok(entries.len())
            }
            Err(e) => {
                entries.clear();
                Err(FiledropError::MetadataCorrupt(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        }
    }

    /// Persist the whole map to disk.
    ///
    /// The JSON is pretty-printed with two-space indentation, written to a
    /// temporary file next to the target and renamed over it, so a crash
    /// mid-write leaves the previous file intact. The lock is held for the
    /// whole marshal + write.
    pub fn save(&self) -> Result<()> {
        let entries = self.entries();

        let json = serde_json::to_string_pretty(&*entries)
            .map_err(|e| FiledropError::MetadataPersist(format!("serialize: {e}")))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.persist_error(e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| self.persist_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| self.persist_error(e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| self.persist_error(e.error))?;

        Ok(())
    }

    fn persist_error(&self, e: io::Error) -> FiledropError {
        FiledropError::MetadataPersist(format!("{}: {e}", self.path.display()))
    }

    /// Look up the display name for an identifier.
    pub fn get(&self, id: &str) -> Option<String> {
        self.entries().get(id).cloned()
    }

    /// Check whether an identifier has an entry.
    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Insert or overwrite the display name for an identifier.
    ///
    /// Does not persist; call [`save`](Self::save) afterwards.
    pub fn set(&self, id: impl Into<String>, name: impl Into<String>) {
        self.entries().insert(id.into(), name.into());
    }

    /// Remove the entry for an identifier, returning the old display name.
    ///
    /// Does not persist; call [`save`](Self::save) afterwards.
    pub fn remove(&self, id: &str) -> Option<String> {
        self.entries().remove(id)
    }

    /// Set an entry and persist, logging (not returning) a save failure.
    pub fn set_and_persist(&self, id: &str, name: &str) {
        self.set(id, name);
        if let Err(e) = self.save() {
            tracing::warn!(file_id = %id, error = %e, "Failed to save metadata");
        }
    }

    /// Remove an entry and persist, logging (not returning) a save failure.
    pub fn remove_and_persist(&self, id: &str) -> Option<String> {
        let removed = self.remove(id);
        if let Err(e) = self.save() {
            tracing::warn!(file_id = %id, error = %e, "Failed to save metadata after deletion");
        }
        removed
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copy of the current map.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, MetadataStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("metadata.json"));
        (temp_dir, store)
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let (_temp_dir, store) = setup_store();
        store.set("1", "stale.txt");

        let loaded = store.load().unwrap();

        assert_eq!(loaded, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, store) = setup_store();
        store.set("100", "a.txt");
        store.set("200", "b.pdf");
        store.save().unwrap();

        let reloaded = MetadataStore::new(store.path());
        assert_eq!(reloaded.load().unwrap(), 2);
        assert_eq!(reloaded.get("100").as_deref(), Some("a.txt"));
        assert_eq!(reloaded.get("200").as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_save_format_is_pretty_json() {
        let (_temp_dir, store) = setup_store();
        store.set("2", "second.txt");
        store.set("1", "first.txt");
        store.save().unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "{\n  \"1\": \"first.txt\",\n  \"2\": \"second.txt\"\n}"
        );
    }

    #[test]
    fn test_save_empty_map() {
        let (_temp_dir, store) = setup_store();
        store.save().unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (temp_dir, store) = setup_store();
        store.set("1", "a.txt");
        store.save().unwrap();
        store.set("2", "b.txt");
        store.save().unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["metadata.json".to_string()]);
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let (_temp_dir, store) = setup_store();
        store.set("1", "a.txt");
        store.save().unwrap();
        store.remove("1");
        store.save().unwrap();

        let reloaded = MetadataStore::new(store.path());
        reloaded.load().unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("missing").join("metadata.json"));
        store.set("1", "a.txt");

        let result = store.save();

        assert!(matches!(result, Err(FiledropError::MetadataPersist(_))));
        // In-memory state stays authoritative.
        assert_eq!(store.get("1").as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_load_corrupt_file() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.path(), "{ not json").unwrap();
        store.set("1", "stale.txt");

        let result = store.load();

        assert!(matches!(result, Err(FiledropError::MetadataCorrupt(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_wrong_shape_is_corrupt() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.path(), "[\"1\", \"2\"]").unwrap();

        assert!(matches!(
            store.load(),
            Err(FiledropError::MetadataCorrupt(_))
        ));
    }

    #[test]
    fn test_get_set_remove() {
        let (_temp_dir, store) = setup_store();

        assert_eq!(store.get("1"), None);
        assert!(!store.contains("1"));

        store.set("1", "a.txt");
        assert_eq!(store.get("1").as_deref(), Some("a.txt"));
        assert!(store.contains("1"));

        store.set("1", "b.txt");
        assert_eq!(store.get("1").as_deref(), Some("b.txt"));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("1").as_deref(), Some("b.txt"));
        assert_eq!(store.remove("1"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_and_persist_writes_file() {
        let (_temp_dir, store) = setup_store();
        store.set_and_persist("7", "seven.txt");

        let reloaded = MetadataStore::new(store.path());
        reloaded.load().unwrap();
        assert_eq!(reloaded.get("7").as_deref(), Some("seven.txt"));

        assert_eq!(store.remove_and_persist("7").as_deref(), Some("seven.txt"));
        reloaded.load().unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("missing").join("metadata.json"));

        store.set_and_persist("1", "a.txt");
        assert_eq!(store.get("1").as_deref(), Some("a.txt"));

        assert_eq!(store.remove_and_persist("1").as_deref(), Some("a.txt"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_set_and_remove() {
        let (_temp_dir, store) = setup_store();
        let store = Arc::new(store);

        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let id = format!("{t}{i:04}");
                        store.set(id.clone(), format!("file-{t}-{i}.txt"));
                        if i % 2 == 0 {
                            store.remove(&id);
                        }
                        if i % 10 == 0 {
                            store.save().unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), THREADS * PER_THREAD / 2);
        for t in 0..THREADS {
            for i in 0..PER_THREAD {
                let id = format!("{t}{i:04}");
                if i % 2 == 0 {
                    assert!(!snapshot.contains_key(&id));
                } else {
                    assert_eq!(snapshot[&id], format!("file-{t}-{i}.txt"));
                }
            }
        }

        store.save().unwrap();
        let reloaded = MetadataStore::new(store.path());
        assert_eq!(reloaded.load().unwrap(), THREADS * PER_THREAD / 2);
    }
}
