//! Credential manager with automatic refresh
//!
//! Manages the access token lifecycle:
//! - In-memory cache of the current access token and its expiry
//! - Refresh through the configured token endpoint once the token is within
//!   the expiry buffer
//! - Durable persistence of rotated refresh tokens before the new access
//!   token is used
//!
//! The cache lives behind an async mutex that is held for the whole refresh,
//! so concurrent callers wait for one refresh and then share its result.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use restsync_core::{AccessTokenProvider, Clock, RefreshStateStore, SystemClock};
use restsync_domain::constants::{TOKEN_EXPIRY_BUFFER_SECS, TOKEN_REQUEST_TIMEOUT_SECS};
use restsync_domain::{Result, SyncError, TokenConfig};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::errors::to_sync_error;
use crate::http::HttpClient;

struct Credential {
    access_token: String,
    expires_at: Instant,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<ExpiresIn>,
    refresh_token: Option<String>,
}

/// Some servers send `expires_in` as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(secs) => Some(*secs),
            Self::Fractional(secs) if secs.is_finite() && *secs >= 0.0 => Some(secs.trunc() as u64),
            Self::Fractional(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Access token provider backed by an OAuth2 refresh-token grant
pub struct CredentialManager {
    http: HttpClient,
    state: Arc<dyn RefreshStateStore>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<Credential>>,
}

impl CredentialManager {
    /// Create a manager that reads and writes refresh state through `state`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(state: Arc<dyn RefreshStateStore>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(TOKEN_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            state,
            clock: Arc::new(SystemClock),
            cached: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether a cached token is currently usable without a refresh.
    pub async fn has_valid_token(&self) -> bool {
        let cached = self.cached.lock().await;
        cached.as_ref().is_some_and(|credential| self.clock.now() < credential.expires_at)
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<Credential> {
        let mut config = self.state.load().await?;
        info!(token_url = %config.token_url, "Refreshing access token");

        let headers = header_map(&config)?;
        let builder = self.http.request(Method::POST, config.token_url.as_str());
        let builder = if config.wants_json_body() {
            builder.json(&config.body)
        } else {
            builder.form(&config.form_fields())
        };

        let response = self.http.send(builder.headers(headers)).await?;
        let status = response.status();
        let body = response.text().await.map_err(to_sync_error)?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(SyncError::Auth { status: Some(status.as_u16()), message: body });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|err| SyncError::Auth {
            status: Some(status.as_u16()),
            message: format!("invalid token response: {err}"),
        })?;

        let access_token = parsed.access_token.filter(|token| !token.is_empty()).ok_or_else(|| {
            SyncError::Auth {
                status: Some(status.as_u16()),
                message: "token response has no access_token".into(),
            }
        })?;

        let expires_in = parsed.expires_in.as_ref().and_then(ExpiresIn::seconds).ok_or_else(|| {
            SyncError::Auth {
                status: Some(status.as_u16()),
                message: "token response has no usable expires_in".into(),
            }
        })?;

        if let Some(rotated) = parsed.refresh_token.filter(|token| !token.is_empty()) {
            config.set_refresh_token(rotated);
            self.state.save(&config).await?;
            info!("Persisted rotated refresh token");
        }

        let lifetime = Duration::from_secs(expires_in).saturating_sub(Duration::from_secs(TOKEN_EXPIRY_BUFFER_SECS));
        debug!(expires_in, usable_secs = lifetime.as_secs(), "Access token refreshed");

        let expires_at = self.clock.now().checked_add(lifetime).ok_or_else(|| SyncError::Auth {
            status: Some(status.as_u16()),
            message: "expires_in out of range".into(),
        })?;

        Ok(Credential { access_token, expires_at })
    }
}

#[async_trait]
impl AccessTokenProvider for CredentialManager {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(credential) = cached.as_ref() {
            if self.clock.now() < credential.expires_at {
                debug!("Using cached access token");
                return Ok(credential.access_token.clone());
            }
            debug!("Cached access token expired");
        }

        let credential = self.refresh().await.map_err(into_auth_error)?;
        let token = credential.access_token.clone();
        *cached = Some(credential);
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

fn header_map(config: &TokenConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| SyncError::Config(format!("invalid token header name '{name}': {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| SyncError::Config(format!("invalid value for token header '{name}': {err}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn into_auth_error(err: SyncError) -> SyncError {
    match err {
        auth @ SyncError::Auth { .. } => auth,
        other => SyncError::Auth { status: other.status(), message: other.to_string() },
    }
}
