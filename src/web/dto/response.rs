//! Response DTOs for Web API.
//!
//! File listings and upload results are returned as bare JSON arrays of
//! [`FileRecord`](crate::file::FileRecord), which the browser UI consumes
//! directly; only the batch delete result needs its own shape.

use serde::Serialize;

use crate::file::{BatchOutcome, ItemFailure};

/// A single failed item in a batch operation.
#[derive(Debug, Serialize)]
pub struct FailedItem {
    /// File identifier.
    pub id: String,
    /// Reason for the failure.
    pub error: String,
}

impl From<ItemFailure> for FailedItem {
    fn from(failure: ItemFailure) -> Self {
        Self {
            id: failure.id,
            error: failure.error.to_string(),
        }
    }
}

/// Batch delete response.
#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    /// Identifiers that were deleted.
    pub deleted: Vec<String>,
    /// Identifiers that could not be deleted.
    pub failed: Vec<FailedItem>,
}

impl From<BatchOutcome> for BatchDeleteResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            deleted: outcome.deleted,
            failed: outcome.failures.into_iter().map(FailedItem::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiledropError;

    #[test]
    fn test_batch_delete_response_shape() {
        let outcome = BatchOutcome {
            deleted: vec!["1".to_string()],
            failures: vec![ItemFailure {
                id: "2".to_string(),
                error: FiledropError::NotFound("file 2".to_string()),
            }],
        };

        let json = serde_json::to_value(BatchDeleteResponse::from(outcome)).unwrap();

        assert_eq!(json["deleted"][0], "1");
        assert_eq!(json["failed"][0]["id"], "2");
        assert_eq!(json["failed"][0]["error"], "file 2 not found");
    }
}
