//! # restsync Infrastructure
//!
//! Infrastructure implementations of the `restsync-core` ports.
//!
//! This crate contains:
//! - The OAuth2 credential manager and its file-backed refresh state
//! - The HTTP client and the REST API gateway
//! - The SQLite connection pool and upsert store
//! - Configuration discovery and loading
//!
//! ## Architecture
//! - Implements traits defined in `restsync-core`
//! - Depends on `restsync-domain` and `restsync-core`
//! - Contains all "impure" code (network, filesystem, database)

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::ApiGateway;
pub use auth::{CredentialManager, FileRefreshStateStore};
pub use database::{DbManager, SqliteUpsertStore};
pub use errors::{to_sync_error, InfraError};
pub use http::{HttpClient, HttpClientBuilder};
