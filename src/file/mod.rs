//! File management module for Filedrop.
//!
//! This module provides the file registry core:
//! - Identifier and filename sanitization
//! - Durable identifier -> display name metadata
//! - Registry for resolving, listing and deleting stored files
//! - Upload ingestion with unique identifier generation

mod ingest;
mod metadata;
mod registry;
mod sanitize;

use std::path::PathBuf;
use std::sync::Arc;

pub use ingest::{IdGenerator, PendingUpload, UploadIngestor};
pub use metadata::MetadataStore;
pub use registry::{BatchOutcome, FileRecord, FileRegistry, ItemFailure, ListOutcome};
pub use sanitize::{sanitize_filename, validate_identifier, MAX_IDENTIFIER_LENGTH};

use crate::config::StorageConfig;
use crate::Result;

/// Open the storage described by `config`.
///
/// Creates the upload directory, loads the metadata file and wires the
/// registry and ingestor to the same store. A metadata load failure is
/// logged and the service continues with empty metadata.
pub fn open_storage(config: &StorageConfig) -> Result<(FileRegistry, UploadIngestor)> {
    let upload_dir = PathBuf::from(&config.upload_dir);
    let metadata = Arc::new(MetadataStore::new(&config.metadata_file));

    let registry = FileRegistry::new(&upload_dir, Arc::clone(&metadata))?;

    match metadata.load() {
        Ok(count) => tracing::info!(entries = count, "Metadata loaded"),
        Err(e) => tracing::warn!(error = %e, "Failed to load metadata, continuing with empty metadata"),
    }

    let ingestor = UploadIngestor::new(upload_dir, metadata);

    Ok((registry, ingestor))
}
