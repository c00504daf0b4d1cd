//! Error types for Filedrop.

use thiserror::Error;

/// Common error type for Filedrop.
#[derive(Error, Debug)]
pub enum FiledropError {
    /// A caller-supplied file identifier failed the traversal-safety check.
    #[error("invalid file identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Writing an uploaded file to storage failed.
    #[error("storage write error: {0}")]
    StorageWrite(#[source] std::io::Error),

    /// Reading a stored file (or the storage directory) failed.
    #[error("storage read error: {0}")]
    StorageRead(#[source] std::io::Error),

    /// The metadata file could not be written.
    ///
    /// Callers downgrade this to a warning: the stored file is the source of
    /// truth, the metadata is only an index.
    #[error("metadata persist error: {0}")]
    MetadataPersist(String),

    /// The metadata file exists but could not be parsed.
    #[error("metadata corrupt: {0}")]
    MetadataCorrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration or user input.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for Filedrop operations.
pub type Result<T> = std::result::Result<T, FiledropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_display() {
        let err = FiledropError::InvalidIdentifier("../etc".to_string());
        assert_eq!(err.to_string(), "invalid file identifier: \"../etc\"");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = FiledropError::NotFound("file 42".to_string());
        assert_eq!(err.to_string(), "file 42 not found");
    }

    #[test]
    fn test_storage_errors_keep_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = FiledropError::StorageWrite(io_err);
        assert_eq!(err.to_string(), "storage write error: disk full");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FiledropError = io_err.into();
        assert!(matches!(err, FiledropError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(FiledropError::Validation("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
