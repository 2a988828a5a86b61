//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_domain_status_conversions;

/// Main error type for restsync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum SyncError {
    /// The token endpoint rejected the refresh or returned an unusable token.
    #[error("Authentication error{}: {message}", fmt_status(.status))]
    Auth { status: Option<u16>, message: String },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Missing path parameter '{placeholder}' for template '{template}'")]
    MissingParameter { placeholder: String, template: String },

    /// A resource call completed with a status other than 200, or a 200 whose
    /// body was not JSON.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("No table mapping for entity: {0}")]
    MappingMissing(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|code| format!(" (status {code})")).unwrap_or_default()
}

/// Isolation boundary an error is contained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScope {
    /// Stops the whole run.
    Run,
    /// Ends the current entity; the run continues with the next one.
    Entity,
    /// Fails one fetch (one identifier or one single-fetch call).
    Unit,
    /// Fails one record inside an upsert batch.
    Record,
}

impl_domain_status_conversions!(ErrorScope {
    Run => "run",
    Entity => "entity",
    Unit => "unit",
    Record => "record",
});

impl SyncError {
    /// Classify the error into the boundary that contains it.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Auth { .. } | Self::Config(_) => ErrorScope::Run,
            Self::UnknownEntity(_)
            | Self::MissingParameter { .. }
            | Self::MappingMissing(_)
            | Self::Internal(_) => ErrorScope::Entity,
            Self::Api { .. } | Self::Network(_) => ErrorScope::Unit,
            Self::Persistence(_) => ErrorScope::Record,
        }
    }

    /// Whether the error must abort the run.
    pub fn is_fatal(&self) -> bool {
        self.scope() == ErrorScope::Run
    }

    /// Short, stable name of the variant for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::UnknownEntity(_) => "unknown_entity",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::Api { .. } => "api",
            Self::MappingMissing(_) => "mapping_missing",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Internal(_) => "internal",
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } => *status,
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for restsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn scopes_follow_isolation_boundaries() {
        let auth = SyncError::Auth { status: Some(401), message: "invalid_grant".into() };
        assert_eq!(auth.scope(), ErrorScope::Run);
        assert!(auth.is_fatal());

        let missing = SyncError::MissingParameter {
            placeholder: "id".into(),
            template: "https://api/x/{id}".into(),
        };
        assert_eq!(missing.scope(), ErrorScope::Entity);
        assert_eq!(SyncError::MappingMissing("x".into()).scope(), ErrorScope::Entity);
        assert_eq!(SyncError::Api { status: 500, body: String::new() }.scope(), ErrorScope::Unit);
        assert_eq!(SyncError::Network("reset".into()).scope(), ErrorScope::Unit);
        assert_eq!(SyncError::Persistence("constraint".into()).scope(), ErrorScope::Record);
        assert!(!SyncError::Network("reset".into()).is_fatal());
    }

    #[test]
    fn display_includes_status_when_known() {
        let with_status = SyncError::Auth { status: Some(400), message: "bad".into() };
        assert_eq!(with_status.to_string(), "Authentication error (status 400): bad");

        let without = SyncError::Auth { status: None, message: "empty token".into() };
        assert_eq!(without.to_string(), "Authentication error: empty token");

        let missing = SyncError::MissingParameter {
            placeholder: "id".into(),
            template: "/users/{id}".into(),
        };
        assert_eq!(missing.to_string(), "Missing path parameter 'id' for template '/users/{id}'");
    }

    #[test]
    fn status_is_exposed_for_http_errors() {
        assert_eq!(SyncError::Api { status: 404, body: String::new() }.status(), Some(404));
        assert_eq!(SyncError::Auth { status: None, message: String::new() }.status(), None);
        assert_eq!(SyncError::Config("x".into()).status(), None);
    }

    #[test]
    fn error_scope_parses_case_insensitively() {
        assert_eq!(ErrorScope::from_str("Record").ok(), Some(ErrorScope::Record));
        assert_eq!(ErrorScope::Entity.to_string(), "entity");
        assert!(ErrorScope::from_str("batch").is_err());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(SyncError::UnknownEntity("orders".into()))
            .expect("serialize error");
        assert_eq!(json["type"], "UnknownEntity");
        assert_eq!(json["detail"], "orders");
    }
}
