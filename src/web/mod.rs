//! Web layer for Filedrop.
//!
//! HTTP routes for uploading, listing, downloading, viewing and deleting
//! files, plus health check and optional static serving of the browser UI.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
