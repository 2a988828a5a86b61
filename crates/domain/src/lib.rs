//! # restsync Domain
//!
//! Business domain types and models for restsync.
//!
//! This crate contains:
//! - Sync configuration structures (endpoints, table mapping, token config)
//! - The `FieldValue` / `Record` payload model
//! - Domain error types and Result definitions
//! - Per-entity and per-run outcome reporting
//!
//! ## Architecture
//! - No dependencies on other restsync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod outcome;
pub mod record;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use outcome::*;
pub use record::{FieldValue, Record};
