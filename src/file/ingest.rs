//! Upload ingestion for Filedrop.
//!
//! Uploads are written straight into the storage directory under a freshly
//! generated identifier, then recorded in the metadata store.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;

use super::metadata::MetadataStore;
use super::registry::FileRecord;
use super::sanitize::sanitize_filename;
use crate::{FiledropError, Result};

/// Attempts at finding an unused identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// Generator of file identifiers.
///
/// Identifiers are nanosecond timestamps rendered as decimal strings, bumped
/// so that every identifier handed out by one generator is strictly greater
/// than the previous one, even when the clock stalls or goes backwards.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next identifier.
    pub fn next_id(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);

        now.max(prev.saturating_add(1)).to_string()
    }
}

/// Writes uploaded streams into storage and records their display names.
#[derive(Debug)]
pub struct UploadIngestor {
    /// Directory holding files named by identifier.
    storage_dir: PathBuf,
    /// Identifier -> display name index.
    metadata: Arc<MetadataStore>,
    ids: IdGenerator,
}

impl UploadIngestor {
    /// Create an ingestor writing into `storage_dir`.
    pub fn new(storage_dir: impl Into<PathBuf>, metadata: Arc<MetadataStore>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            metadata,
            ids: IdGenerator::new(),
        }
    }

    /// Get the storage directory.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Ingest a complete stream.
    ///
    /// # Arguments
    ///
    /// * `reader` - The file content
    /// * `original_filename` - The client-supplied filename (sanitized before storing)
    /// * `size_hint` - Size announced by the client, if any. Only used for
    ///   logging; the recorded size is the number of bytes actually written.
    ///
    /// # Returns
    ///
    /// The record of the stored file. Any I/O failure while copying fails
    /// with [`FiledropError::StorageWrite`]; the partially written file is
    /// removed.
    pub fn ingest<R: Read>(
        &self,
        mut reader: R,
        original_filename: &str,
        size_hint: Option<u64>,
    ) -> Result<FileRecord> {
        let mut upload = self.begin(original_filename)?;
        io::copy(&mut reader, &mut upload).map_err(FiledropError::StorageWrite)?;

        if let Some(expected) = size_hint {
            if expected != upload.bytes_written() {
                tracing::warn!(
                    file_id = %upload.id(),
                    expected,
                    written = upload.bytes_written(),
                    "Upload size differs from announced size"
                );
            }
        }

        upload.finish()
    }

    /// Start a streaming upload.
    ///
    /// Creates the storage entry immediately. Write the content through the
    /// returned [`PendingUpload`] and call [`PendingUpload::finish`] to record
    /// it. Dropping it unfinished removes the partially written file.
    pub fn begin(&self, original_filename: &str) -> Result<PendingUpload<'_>> {
        let name = sanitize_filename(original_filename);
        let (id, file) = self.create_entry()?;

        tracing::debug!(file_id = %id, name = %name, "Upload started");

        Ok(PendingUpload {
            ingestor: self,
            id,
            name,
            file,
            written: 0,
            finished: false,
        })
    }

    fn create_entry(&self) -> Result<(String, File)> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            let path = self.storage_dir.join(&id);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((id, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(file_id = %id, "Identifier already in use, retrying");
                }
                Err(e) => return Err(FiledropError::StorageWrite(e)),
            }
        }

        Err(FiledropError::StorageWrite(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate an unused file identifier",
        )))
    }
}

/// An upload whose storage entry exists but is not yet recorded.
#[derive(Debug)]
pub struct PendingUpload<'a> {
    ingestor: &'a UploadIngestor,
    id: String,
    name: String,
    file: File,
    written: u64,
    finished: bool,
}

impl PendingUpload<'_> {
    /// Identifier of the file being written.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sanitized display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Append a chunk of content.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.write_all(chunk).map_err(FiledropError::StorageWrite)
    }

    /// Flush the file and record it in the metadata store.
    ///
    /// A metadata persistence failure is logged and does not fail the upload.
    pub fn finish(mut self) -> Result<FileRecord> {
        self.file.flush().map_err(FiledropError::StorageWrite)?;

        self.ingestor.metadata.set_and_persist(&self.id, &self.name);
        self.finished = true;

        tracing::info!(
            file_id = %self.id,
            name = %self.name,
            size = self.written,
            "File uploaded"
        );

        Ok(FileRecord {
            id: std::mem::take(&mut self.id),
            name: std::mem::take(&mut self.name),
            size: self.written,
            uploaded_at: Utc::now(),
        })
    }
}

impl Drop for PendingUpload<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let path = self.ingestor.storage_dir.join(&self.id);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(file_id = %self.id, "Removed unfinished upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file_id = %self.id, error = %e, "Failed to remove unfinished upload")
            }
        }
    }
}

impl Write for PendingUpload<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
