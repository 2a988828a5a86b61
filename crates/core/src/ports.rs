//! Port interfaces for a sync run

use async_trait::async_trait;
use restsync_domain::{FieldValue, Record, Result, TableMapping, TokenConfig, UpsertReport};

use crate::template::PathParams;

/// Supplies a currently valid bearer token
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a token that is valid now, refreshing it first if needed.
    ///
    /// Any failure is reported as `SyncError::Auth`.
    async fn access_token(&self) -> Result<String>;

    /// Drop any cached token so the next call refreshes.
    async fn invalidate(&self) {}
}

/// Durable home of the refresh state (token URL, headers, rotating body)
#[async_trait]
pub trait RefreshStateStore: Send + Sync {
    async fn load(&self) -> Result<TokenConfig>;

    /// Persist the state. Must be durable before it returns.
    async fn save(&self, config: &TokenConfig) -> Result<()>;
}

/// Executes calls against configured endpoints
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Call the endpoint registered for `entity`.
    ///
    /// `template_override` replaces the registered URL template (used for
    /// list discovery). Every placeholder of the effective template must be
    /// present in `params`.
    async fn invoke(
        &self,
        entity: &str,
        params: &PathParams,
        template_override: Option<&str>,
    ) -> Result<FieldValue>;
}

/// Writes records into the destination table for an entity
#[async_trait]
pub trait UpsertStore: Send + Sync {
    /// Upsert `records` keyed on their `id` column.
    ///
    /// Per-record failures are returned inside the report. `Err` is reserved
    /// for failures that affect the whole batch, such as a missing mapping.
    async fn upsert(
        &self,
        entity: &str,
        mapping: &TableMapping,
        records: Vec<Record>,
    ) -> Result<UpsertReport>;
}
