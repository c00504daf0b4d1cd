//! API handlers for Web UI.

pub mod file;

pub use file::*;

use crate::config::StorageConfig;
use crate::file::{open_storage, FileRegistry, UploadIngestor};
use crate::Result;

/// Application state shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    /// Registry used to resolve, list and delete files.
    pub registry: FileRegistry,
    /// Ingestor used for uploads.
    pub ingestor: UploadIngestor,
}

impl AppState {
    /// Create a new application state.
    pub fn new(registry: FileRegistry, ingestor: UploadIngestor) -> Self {
        Self { registry, ingestor }
    }

    /// Open the configured storage and build the state from it.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let (registry, ingestor) = open_storage(config)?;
        Ok(Self::new(registry, ingestor))
    }
}
