//! Configuration module for Filedrop.

use serde::Deserialize;
use std::path::Path;

use crate::{FiledropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded files, named by identifier.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Path to the JSON metadata file.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    /// Maximum request body size for uploads in megabytes (0 = unlimited).
    #[serde(default)]
    pub max_upload_size_mb: u64,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_metadata_file() -> String {
    "uploads/metadata.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            metadata_file: default_metadata_file(),
            max_upload_size_mb: 0,
        }
    }
}

impl StorageConfig {
    /// Upload body limit in bytes, `None` when unlimited.
    pub fn max_upload_bytes(&self) -> Option<usize> {
        if self.max_upload_size_mb == 0 {
            return None;
        }
        let bytes = self.max_upload_size_mb.saturating_mul(1024 * 1024);
        Some(usize::try_from(bytes).unwrap_or(usize::MAX))
    }
}

/// Web UI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether to serve the browser UI from `static_path`.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "static".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            serve_static: default_serve_static(),
            static_path: default_static_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filedrop.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Web UI configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FiledropError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FiledropError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEDROP_UPLOAD_DIR`: Override the upload directory. A metadata
    ///   file kept inside the old upload directory moves along with it.
    /// - `FILEDROP_PORT`: Override the listen port
    ///
    /// Runs before logging is set up, so values that had to be ignored are
    /// returned as messages for the caller to report.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        if let Some(dir) = lookup("FILEDROP_UPLOAD_DIR") {
            if !dir.is_empty() {
                let metadata = Path::new(&self.storage.metadata_file);
                if metadata.parent() == Some(Path::new(&self.storage.upload_dir)) {
                    if let Some(name) = metadata.file_name() {
                        self.storage.metadata_file =
                            Path::new(&dir).join(name).to_string_lossy().into_owned();
                    }
                }
                self.storage.upload_dir = dir;
            }
        }

        if let Some(port) = lookup("FILEDROP_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => ignored.push(format!("Ignoring invalid FILEDROP_PORT: {port:?}")),
            }
        }

        ignored
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The upload directory or metadata file path is empty
    /// - The metadata file path is the upload directory itself
    pub fn validate(&self) -> Result<()> {
        if self.storage.upload_dir.trim().is_empty() {
            return Err(FiledropError::Validation(
                "storage.upload_dir must not be empty".to_string(),
            ));
        }
        if self.storage.metadata_file.trim().is_empty() {
            return Err(FiledropError::Validation(
                "storage.metadata_file must not be empty".to_string(),
            ));
        }
        if Path::new(&self.storage.metadata_file) == Path::new(&self.storage.upload_dir) {
            return Err(FiledropError::Validation(
                "storage.metadata_file must be a file, not the upload directory".to_string(),
            ));
        }
        Ok(())
    }
}
