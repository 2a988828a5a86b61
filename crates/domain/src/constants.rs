//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Endpoint resolution
pub const DEFAULT_IDENTIFIER_FIELD: &str = "id";
pub const LIST_ENVELOPE_KEY: &str = "items";

// Storage
pub const NATURAL_KEY_COLUMN: &str = "id";
pub const DEFAULT_SCHEMA: &str = "main";
pub const DEFAULT_POOL_SIZE: u32 = 4;
/// Server-managed columns that are never written, compared case-insensitively.
pub const EXCLUDED_COLUMNS: [&str; 3] = ["timestamp", "rowversion", "dateCreated"];

// Credential lifecycle
pub const TOKEN_EXPIRY_BUFFER_SECS: u64 = 60;
pub const TOKEN_REQUEST_TIMEOUT_SECS: u64 = 30;

// Resource calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("restsync/", env!("CARGO_PKG_VERSION"));

/// Returns true when `column` is one of the server-managed columns.
pub fn is_excluded_column(column: &str) -> bool {
    EXCLUDED_COLUMNS.iter().any(|excluded| excluded.eq_ignore_ascii_case(column))
}
