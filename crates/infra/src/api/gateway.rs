//! API gateway: executes configured endpoint calls with bearer auth
//!
//! One call per invocation, no retries. Success is strictly HTTP 200 with a
//! JSON body; everything else is reported as `SyncError::Api`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use restsync_core::template::{self, PathParams};
use restsync_core::{AccessTokenProvider, EndpointRegistry, EntityGateway};
use restsync_domain::{FieldValue, HttpConfig, HttpMethod, Result, SyncError};
use tracing::{debug, info, instrument, warn};

use crate::errors::to_sync_error;
use crate::http::HttpClient;

/// Gateway to the remote REST API
pub struct ApiGateway {
    registry: Arc<EndpointRegistry>,
    auth: Arc<dyn AccessTokenProvider>,
    http: HttpClient,
}

impl ApiGateway {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        auth: Arc<dyn AccessTokenProvider>,
        http: HttpClient,
    ) -> Self {
        Self { registry, auth, http }
    }

    /// Build the HTTP client from the `http` section of the sync config.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(
        registry: Arc<EndpointRegistry>,
        auth: Arc<dyn AccessTokenProvider>,
        config: &HttpConfig,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;
        Ok(Self::new(registry, auth, http))
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl EntityGateway for ApiGateway {
    #[instrument(skip(self, params, template_override), fields(entity = %entity))]
    async fn invoke(
        &self,
        entity: &str,
        params: &PathParams,
        template_override: Option<&str>,
    ) -> Result<FieldValue> {
        let endpoint = self.registry.resolve(entity)?;
        let effective = template_override.unwrap_or(&endpoint.url_template);

        // placeholders are checked before a token is requested
        let url = template::render(effective, params).map_err(|err| {
            warn!(template = %effective, error = %err, "Missing path parameter");
            err
        })?;

        let token = self.auth.access_token().await?;

        info!(method = %endpoint.method, url = %url, "Calling API");
        let request = self
            .http
            .request(to_method(endpoint.method), url.as_str())
            .bearer_auth(token)
            .header(ACCEPT, "application/json");

        let response = self.http.send(request).await?;
        let status = response.status();
        let body = response.text().await.map_err(to_sync_error)?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), url = %url, "API call failed");
            return Err(SyncError::Api { status: status.as_u16(), body });
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|err| SyncError::Api {
            status: status.as_u16(),
            body: format!("response is not valid JSON: {err}"),
        })?;
        debug!(bytes = body.len(), "API call succeeded");

        Ok(FieldValue::from(json))
    }
}
