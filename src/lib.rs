//! Filedrop - a small web file sharing service.
//!
//! Files are uploaded over HTTP, stored in a flat directory under
//! timestamp-derived identifiers, and listed, downloaded, viewed or deleted
//! through the same API. Display names live in a JSON metadata file next to
//! the stored files.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FiledropError, Result};
pub use file::{
    open_storage, sanitize_filename, validate_identifier, BatchOutcome, FileRecord, FileRegistry,
    IdGenerator, ItemFailure, ListOutcome, MetadataStore, PendingUpload, UploadIngestor,
};
pub use web::{AppState, WebServer};
