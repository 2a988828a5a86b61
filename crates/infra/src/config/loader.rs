//! Configuration loader
//!
//! Loads the sync configuration from a JSON or TOML file and applies
//! environment overrides.
//!
//! ## Loading Strategy
//! 1. An explicit path (from the command line) wins
//! 2. Otherwise `RESTSYNC_CONFIG` names the file
//! 3. Otherwise well-known paths are probed
//! 4. Environment overrides are applied, then the result is validated
//!
//! ## Environment Variables
//! - `RESTSYNC_CONFIG`: Path of the sync configuration file
//! - `RESTSYNC_TOKEN_CONFIG`: Path of the token configuration file
//! - `RESTSYNC_DB_PATH`: Overrides `database.database`
//! - `RESTSYNC_DB_SCHEMA`: Overrides `database.schema`
//! - `RESTSYNC_HTTP_TIMEOUT`: Overrides `http.timeoutSeconds`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./endpointconfig.json` or `./endpointconfig.toml`
//! 2. `./restsync.json` or `./restsync.toml`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use restsync_domain::{Result, SyncConfig, SyncError};

use crate::errors::to_sync_error;

pub const CONFIG_ENV: &str = "RESTSYNC_CONFIG";
pub const TOKEN_CONFIG_ENV: &str = "RESTSYNC_TOKEN_CONFIG";
pub const DEFAULT_TOKEN_CONFIG_FILE: &str = "token_config.json";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["endpointconfig.json", "endpointconfig.toml", "restsync.json", "restsync.toml"];

/// Load and validate the sync configuration.
///
/// # Errors
/// Returns `SyncError::Config` if no file can be found, the file cannot be
/// parsed, an override is malformed, or validation fails.
pub fn load(path: Option<PathBuf>) -> Result<SyncConfig> {
    let path = path.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;

    tracing::info!(
        endpoints = config.api_endpoints.len(),
        mappings = config.table_mapping.len(),
        database = %config.database.database,
        schema = config.database.schema(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// file extension.
///
/// # Errors
/// Returns `SyncError::Config` if the file is missing or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<SyncConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<SyncConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(to_sync_error),
        "json" => serde_json::from_str(contents).map_err(to_sync_error),
        _ => Err(SyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CONFIG_FILE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Location of the token configuration file.
///
/// Explicit path, then `RESTSYNC_TOKEN_CONFIG`, then `./token_config.json`.
pub fn resolve_token_config_path(path: Option<PathBuf>) -> PathBuf {
    path.or_else(|| std::env::var(TOKEN_CONFIG_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_CONFIG_FILE))
}

fn apply_env_overrides(config: &mut SyncConfig) -> Result<()> {
    if let Some(path) = env_var("RESTSYNC_DB_PATH") {
        tracing::debug!("Database path overridden from environment");
        config.database.database = path;
    }
    if let Some(schema) = env_var("RESTSYNC_DB_SCHEMA") {
        config.database.schema = Some(schema);
    }
    if let Some(timeout) = env_var("RESTSYNC_HTTP_TIMEOUT") {
        let seconds = timeout.parse::<u64>().map_err(|e| {
            SyncError::Config(format!("Invalid RESTSYNC_HTTP_TIMEOUT '{timeout}': {e}"))
        })?;
        config.http.timeout_seconds = Some(seconds);
    }
    Ok(())
}

/// Non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{Builder, NamedTempFile};

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const OVERRIDE_VARS: [&str; 3] =
        ["RESTSYNC_DB_PATH", "RESTSYNC_DB_SCHEMA", "RESTSYNC_HTTP_TIMEOUT"];

    fn clear_overrides() {
        for key in OVERRIDE_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    const JSON_CONFIG: &str = r#"{
        "database": {"server": "localhost", "database": "sync.db", "schema": "dbo"},
        "http": {"timeoutSeconds": 10},
        "apiEndpoints": [
            {"entity": "business", "api": "https://api.example.com/business/{id}", "method": "GET"},
            {"entity": "settings", "api": "https://api.example.com/settings"}
        ],
        "tableMapping": {
            "business": {"id": "id", "name": "businessName", "timestamp": "ts"}
        }
    }"#;

    #[test]
    fn test_load_from_file_json() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_overrides();
        let file = temp_config(".json", JSON_CONFIG);

        let config = load(Some(file.path().to_path_buf())).expect("config loads");

        assert_eq!(config.database.database, "sync.db");
        assert_eq!(config.database.schema(), "dbo");
        assert_eq!(config.http.timeout_seconds, Some(10));
        assert_eq!(config.api_endpoints.len(), 2);
        assert_eq!(
            config.table_mapping.get("business").and_then(|m| m.get("name")).map(String::as_str),
            Some("businessName")
        );
    }

    #[test]
    fn test_load_from_file_toml() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_overrides();
        let file = temp_config(
            ".toml",
            r#"
            [database]
            database = "sync.db"

            [[apiEndpoints]]
            entity = "business"
            api = "https://api.example.com/business/{businessId}"
            parentKey = "businessId"

            [tableMapping.business]
            id = "businessId"
            name = "name"
            "#,
        );

        let config = load(Some(file.path().to_path_buf())).expect("config loads");
        assert_eq!(config.database.schema(), "main");
        assert_eq!(config.api_endpoints[0].identifier_field(), "businessId");
    }

    #[test]
    fn test_env_overrides_apply() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_overrides();
        std::env::set_var("RESTSYNC_DB_PATH", "/tmp/override.db");
        std::env::set_var("RESTSYNC_HTTP_TIMEOUT", "5");
        let file = temp_config(".json", JSON_CONFIG);

        let config = load(Some(file.path().to_path_buf()));
        clear_overrides();

        let config = config.expect("config loads");
        assert_eq!(config.database.database, "/tmp/override.db");
        assert_eq!(config.http.timeout_seconds, Some(5));
    }

    #[test]
    fn test_invalid_timeout_override() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_overrides();
        std::env::set_var("RESTSYNC_HTTP_TIMEOUT", "soon");
        let file = temp_config(".json", JSON_CONFIG);

        let result = load(Some(file.path().to_path_buf()));
        clear_overrides();

        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_duplicate_entities_fail_validation() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_overrides();
        let file = temp_config(
            ".json",
            r#"{
                "database": {"database": "sync.db"},
                "apiEndpoints": [
                    {"entity": "business", "api": "https://a/{id}"},
                    {"entity": "business", "api": "https://b/{id}"}
                ]
            }"#,
        );

        let err = load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, SyncError::Config(ref msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_missing_file_and_bad_format() {
        let missing = load_from_file(Some(PathBuf::from("/nonexistent/restsync.json")));
        assert!(matches!(missing, Err(SyncError::Config(ref msg)) if msg.contains("not found")));

        let yaml = temp_config(".yaml", "database: {}");
        let unsupported = load_from_file(Some(yaml.path().to_path_buf()));
        assert!(matches!(unsupported, Err(SyncError::Config(ref msg)) if msg.contains("Unsupported")));

        let broken = temp_config(".json", "{ not json");
        let invalid = load_from_file(Some(broken.path().to_path_buf()));
        assert!(matches!(invalid, Err(SyncError::Config(ref msg)) if msg.contains("invalid JSON")));

        let broken_toml = temp_config(".toml", "[database\ndatabase = ");
        let invalid = load_from_file(Some(broken_toml.path().to_path_buf()));
        assert!(matches!(invalid, Err(SyncError::Config(ref msg)) if msg.contains("invalid TOML")));
    }

    #[test]
    fn test_token_config_path_resolution() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        std::env::remove_var(TOKEN_CONFIG_ENV);

        assert_eq!(resolve_token_config_path(None), PathBuf::from("token_config.json"));

        std::env::set_var(TOKEN_CONFIG_ENV, "/etc/restsync/token.json");
        assert_eq!(resolve_token_config_path(None), PathBuf::from("/etc/restsync/token.json"));
        assert_eq!(
            resolve_token_config_path(Some(PathBuf::from("explicit.json"))),
            PathBuf::from("explicit.json")
        );
        std::env::remove_var(TOKEN_CONFIG_ENV);
    }
}
