//! Test helpers for web API tests.
//!
//! Provides a TestServer wired to a throwaway upload directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use filedrop::config::StorageConfig;
use filedrop::web::handlers::AppState;
use filedrop::web::router::create_router;

/// A running test server and the storage backing it.
pub struct TestContext {
    /// Test server.
    pub server: TestServer,
    /// Storage configuration used by the server.
    pub storage: StorageConfig,
    _temp_dir: TempDir,
}

impl TestContext {
    /// Path of the upload directory.
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.upload_dir)
    }

    /// Path of the metadata file.
    pub fn metadata_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.metadata_file)
    }
}

/// Build a storage configuration inside `temp_dir`.
pub fn create_storage_config(temp_dir: &TempDir, max_upload_size_mb: u64) -> StorageConfig {
    let upload_dir = temp_dir.path().join("uploads");
    StorageConfig {
        metadata_file: upload_dir
            .join("metadata.json")
            .to_string_lossy()
            .to_string(),
        upload_dir: upload_dir.to_string_lossy().to_string(),
        max_upload_size_mb,
    }
}

/// Create a test server over a fresh upload directory.
pub fn create_test_server() -> TestContext {
    create_test_server_with_limit(0)
}

/// Create a test server with an upload size limit in megabytes.
pub fn create_test_server_with_limit(max_upload_size_mb: u64) -> TestContext {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = create_storage_config(&temp_dir, max_upload_size_mb);

    let app_state =
        Arc::new(AppState::from_config(&storage).expect("Failed to open test storage"));
    let router = create_router(app_state, &storage);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestContext {
        server,
        storage,
        _temp_dir: temp_dir,
    }
}

/// Build a multipart form with one "files" part per `(name, content)`.
pub fn files_form(files: &[(&str, &str)]) -> MultipartForm {
    files
        .iter()
        .fold(MultipartForm::new(), |form, (name, content)| {
            form.add_part("files", Part::bytes(content.as_bytes().to_vec()).file_name(*name))
        })
}

/// Upload files and return the JSON array of records.
pub async fn upload(server: &TestServer, files: &[(&str, &str)]) -> Vec<Value> {
    let response = server.post("/upload").multipart(files_form(files)).await;
    response.assert_status_ok();

    response
        .json::<Value>()
        .as_array()
        .cloned()
        .expect("upload response is an array")
}

/// Get the identifier from a file record.
pub fn record_id(record: &Value) -> String {
    record["id"].as_str().unwrap().to_string()
}
