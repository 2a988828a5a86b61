//! Configuration structures
//!
//! Two documents drive a run: the sync configuration (database target,
//! endpoint definitions and per-entity column mapping) and the token
//! configuration, which holds the rotating refresh state and is rewritten by
//! the credential manager.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDENTIFIER_FIELD, DEFAULT_POOL_SIZE, DEFAULT_SCHEMA,
    DEFAULT_USER_AGENT,
};
use crate::errors::{Result, SyncError};

/// Root of the sync configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub api_endpoints: Vec<EndpointDefinition>,
    #[serde(default)]
    pub table_mapping: TableMapping,
}

impl SyncConfig {
    /// Check the invariants serde cannot express.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] naming the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.database.database.trim().is_empty() {
            return Err(SyncError::Config("database.database must not be empty".into()));
        }
        if self.database.pool_size == Some(0) {
            return Err(SyncError::Config("database.poolSize must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for endpoint in &self.api_endpoints {
            if endpoint.entity.trim().is_empty() {
                return Err(SyncError::Config("apiEndpoints entry with empty entity".into()));
            }
            if endpoint.url_template.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "endpoint '{}' has an empty api template",
                    endpoint.entity
                )));
            }
            if !seen.insert(endpoint.entity.as_str()) {
                return Err(SyncError::Config(format!(
                    "duplicate endpoint for entity '{}'",
                    endpoint.entity
                )));
            }
        }

        for (entity, mapping) in self.table_mapping.iter() {
            if mapping.is_empty() {
                return Err(SyncError::Config(format!(
                    "tableMapping for '{entity}' has no columns"
                )));
            }
            if let Some((column, _)) = mapping.iter().find(|(_, source)| source.trim().is_empty())
            {
                return Err(SyncError::Config(format!(
                    "tableMapping for '{entity}' maps column '{column}' to an empty field"
                )));
            }
        }

        Ok(())
    }
}

/// Destination database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Informational for the SQLite store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Path of the main database file.
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<u32>,
}

impl DatabaseConfig {
    pub fn schema(&self) -> &str {
        self.schema.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_SCHEMA)
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }
}

/// Settings for resource calls against the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to reach one logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub entity: String,
    /// URL template, possibly containing `{name}` placeholders.
    #[serde(rename = "api", alias = "urlTemplate")]
    pub url_template: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Field of each listed record that holds its identifier.
    #[serde(
        rename = "parentKey",
        alias = "identifierField",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_key: Option<String>,
}

impl EndpointDefinition {
    pub fn new(entity: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            url_template: url_template.into(),
            method: HttpMethod::Get,
            parent_key: None,
        }
    }

    #[must_use]
    pub fn with_parent_key(mut self, key: impl Into<String>) -> Self {
        self.parent_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn identifier_field(&self) -> &str {
        self.parent_key.as_deref().unwrap_or(DEFAULT_IDENTIFIER_FIELD)
    }
}

/// Destination column to source field, for one entity.
pub type FieldMapping = BTreeMap<String, String>;

/// Per-entity field mappings, keyed by entity name (which is also the table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMapping(BTreeMap<String, FieldMapping>);

impl TableMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &str) -> Option<&FieldMapping> {
        self.0.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.0.contains_key(entity)
    }

    pub fn insert(&mut self, entity: impl Into<String>, mapping: FieldMapping) {
        self.0.insert(entity.into(), mapping);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldMapping)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldMapping)> for TableMapping {
    fn from_iter<I: IntoIterator<Item = (K, FieldMapping)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Refresh state for the token endpoint.
///
/// `body` carries the `refresh_token` that rotates on every refresh. Fields
/// this crate does not know about are kept so a rewrite does not drop them.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub token_url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenConfig {
    pub const REFRESH_TOKEN_KEY: &'static str = "refresh_token";

    pub fn refresh_token(&self) -> Option<&str> {
        self.body.get(Self::REFRESH_TOKEN_KEY).and_then(serde_json::Value::as_str)
    }

    pub fn set_refresh_token(&mut self, token: impl Into<String>) {
        self.body
            .insert(Self::REFRESH_TOKEN_KEY.to_owned(), serde_json::Value::String(token.into()));
    }

    /// True when the configured `Content-Type` header asks for a JSON body.
    pub fn wants_json_body(&self) -> bool {
        self.headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("content-type") && v.to_ascii_lowercase().contains("json"))
    }

    /// Body as form fields. Non-string scalars are rendered as JSON text.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.body
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("token_url", &self.token_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body", &self.body.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// On-disk shape of the token configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfigDocument {
    #[serde(rename = "tokenConfig", alias = "token_config")]
    pub token_config: TokenConfig,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenConfigDocument {
    pub fn new(token_config: TokenConfig) -> Self {
        Self { token_config, extra: serde_json::Map::new() }
    }
}
