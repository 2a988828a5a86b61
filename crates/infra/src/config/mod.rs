//! Configuration loading and management
//!
//! This module provides utilities for locating and loading the sync
//! configuration and the token configuration file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_file, probe_config_paths, resolve_token_config_path};
