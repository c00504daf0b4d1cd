//! File registry for Filedrop.
//!
//! The registry is the single gateway from a caller-supplied identifier to a
//! stored file. It combines a stat of the storage entry with the display name
//! from the [`MetadataStore`], and keeps the metadata in lockstep with the
//! storage directory on deletion.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::MetadataStore;
use super::sanitize::validate_identifier;
use crate::{FiledropError, Result};

/// A stored file as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier (also the storage filename).
    pub id: String,
    /// Sanitized original filename.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time (modification time of the stored file).
    pub uploaded_at: DateTime<Utc>,
}

/// A per-item failure inside a best-effort operation.
#[derive(Debug)]
pub struct ItemFailure {
    /// Identifier the operation failed for.
    pub id: String,
    /// Why it failed.
    pub error: FiledropError,
}

/// Result of [`FileRegistry::list`].
#[derive(Debug, Default)]
pub struct ListOutcome {
    /// Files that resolved, in upload order.
    pub files: Vec<FileRecord>,
    /// Storage entries that could not be resolved.
    pub failures: Vec<ItemFailure>,
}

/// Result of [`FileRegistry::delete_many`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Identifiers that were deleted.
    pub deleted: Vec<String>,
    /// Identifiers that could not be deleted.
    pub failures: Vec<ItemFailure>,
}

/// Registry of stored files.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    /// Directory holding files named by identifier.
    storage_dir: PathBuf,
    /// Identifier -> display name index.
    metadata: Arc<MetadataStore>,
}

impl FileRegistry {
    /// Create a registry over the given storage directory.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn new(storage_dir: impl Into<PathBuf>, metadata: Arc<MetadataStore>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        fs::create_dir_all(&storage_dir)?;

        Ok(Self {
            storage_dir,
            metadata,
        })
    }

    /// Get the storage directory.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the metadata store.
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    // Only call with an identifier that passed `validate_identifier`.
    fn file_path(&self, id: &str) -> PathBuf {
        self.storage_dir.join(id)
    }

    fn record(&self, id: &str, stat: &fs::Metadata) -> FileRecord {
        let name = self.metadata.get(id).unwrap_or_else(|| id.to_string());
        let uploaded_at = stat
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        FileRecord {
            id: id.to_string(),
            name,
            size: stat.len(),
            uploaded_at,
        }
    }

    /// Resolve an identifier to its file record.
    ///
    /// A missing metadata entry is not an error: the identifier itself is
    /// used as the display name.
    pub fn resolve_info(&self, id: &str) -> Result<FileRecord> {
        validate_identifier(id)?;

        let stat = match fs::metadata(self.file_path(id)) {
            Ok(stat) => stat,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(not_found(id));
            }
            Err(e) => return Err(FiledropError::StorageRead(e)),
        };

        if !stat.is_file() {
            return Err(not_found(id));
        }

        Ok(self.record(id, &stat))
    }

    /// Resolve an identifier and open the stored file for reading.
    ///
    /// The record is built from the opened handle, so a concurrent delete
    /// cannot make the two disagree.
    pub fn open(&self, id: &str) -> Result<(FileRecord, File)> {
        validate_identifier(id)?;

        let file = match File::open(self.file_path(id)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(not_found(id));
            }
            Err(e) => return Err(FiledropError::StorageRead(e)),
        };

        let stat = file.metadata().map_err(FiledropError::StorageRead)?;
        if !stat.is_file() {
            return Err(not_found(id));
        }

        Ok((self.record(id, &stat), file))
    }

    /// List every stored file.
    ///
    /// Best-effort: entries that fail to resolve (e.g. removed between
    /// enumeration and stat, or not named like an identifier) are logged and
    /// reported in [`ListOutcome::failures`]. Only failing to read the
    /// directory itself is an error.
    pub fn list(&self) -> Result<ListOutcome> {
        let entries = fs::read_dir(&self.storage_dir).map_err(FiledropError::StorageRead)?;
        let metadata_name = self.metadata.path().file_name();

        let mut outcome = ListOutcome::default();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read storage directory entry");
                    continue;
                }
            };

            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            let file_name = entry.file_name();
            if Some(file_name.as_os_str()) == metadata_name {
                continue;
            }

            let id = file_name.to_string_lossy();
            // Temporary files from metadata persistence.
            if id.starts_with('.') {
                continue;
            }

            match self.resolve_info(&id) {
                Ok(record) => outcome.files.push(record),
                Err(e) => {
                    tracing::warn!(file_id = %id, error = %e, "Failed to get file info");
                    outcome.failures.push(ItemFailure {
                        id: id.into_owned(),
                        error: e,
                    });
                }
            }
        }

        outcome.files.sort_by(|a, b| compare_ids(&a.id, &b.id));

        Ok(outcome)
    }

    /// Delete a stored file and its metadata entry.
    ///
    /// The storage entry is removed first; if that fails the metadata is left
    /// untouched. A failure to persist the metadata afterwards is only
    /// logged.
    pub fn delete(&self, id: &str) -> Result<()> {
        validate_identifier(id)?;

        match fs::remove_file(self.file_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(not_found(id));
            }
            Err(e) => return Err(e.into()),
        }

        self.metadata.remove_and_persist(id);
        tracing::info!(file_id = %id, "File deleted");

        Ok(())
    }

    /// Delete several files independently.
    ///
    /// A failure on one identifier is logged and recorded, and does not stop
    /// the remaining deletions. Nothing is rolled back.
    pub fn delete_many<I, S>(&self, ids: I) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BatchOutcome::default();

        for id in ids {
            let id = id.as_ref();
            match self.delete(id) {
                Ok(()) => outcome.deleted.push(id.to_string()),
                Err(e) => {
                    tracing::warn!(file_id = %id, error = %e, "Failed to delete file");
                    outcome.failures.push(ItemFailure {
                        id: id.to_string(),
                        error: e,
                    });
                }
            }
        }

        outcome
    }
}

fn not_found(id: &str) -> FiledropError {
    FiledropError::NotFound(format!("file {id}"))
}

/// Order digit-only identifiers numerically (shorter first, then lexically).
fn compare_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
