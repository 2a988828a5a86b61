//! Per-entity and per-run outcome reporting
//!
//! Failures below the run boundary are never propagated as `Err`; they are
//! collected here and logged, and the run carries on.

use serde::{Deserialize, Serialize};

use crate::errors::SyncError;
use crate::impl_domain_status_conversions;

/// How an entity's records are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Enumerate identifiers from the list endpoint, then fetch each detail.
    ListDiscovery,
    /// One call to a template without placeholders.
    SingleFetch,
}

impl_domain_status_conversions!(FetchStrategy {
    ListDiscovery => "list_discovery",
    SingleFetch => "single_fetch",
});

/// Terminal state of one entity in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Completed,
    /// Discovery failed or found nothing to fetch.
    Skipped,
    /// An entity-level error ended processing early.
    Aborted,
}

impl_domain_status_conversions!(EntityState {
    Completed => "completed",
    Skipped => "skipped",
    Aborted => "aborted",
});

/// Where inside an entity a failure happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureScope {
    Discovery,
    Identifier { id: String },
    SingleFetch,
    Record { index: usize, record_id: Option<String> },
    Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub scope: FailureScope,
    pub error: SyncError,
}

/// One record that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub record_id: Option<String>,
    pub error: SyncError,
}

/// Result of one upsert batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub attempted: usize,
    pub upserted: usize,
    /// Row count reported by the database across all statements.
    pub affected_rows: usize,
    pub failures: Vec<RecordFailure>,
}

impl UpsertReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub entity: String,
    pub strategy: FetchStrategy,
    pub state: EntityState,
    /// Identifiers found by list discovery.
    pub discovered: usize,
    /// Non-empty payloads returned by detail or single fetches.
    pub fetched: usize,
    pub upserted: usize,
    pub affected_rows: usize,
    pub failures: Vec<SyncFailure>,
}

impl EntityOutcome {
    pub fn new(entity: impl Into<String>, strategy: FetchStrategy) -> Self {
        Self {
            entity: entity.into(),
            strategy,
            state: EntityState::Completed,
            discovered: 0,
            fetched: 0,
            upserted: 0,
            affected_rows: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, scope: FailureScope, error: SyncError) {
        self.failures.push(SyncFailure { scope, error });
    }

    pub fn skip(&mut self) {
        self.state = EntityState::Skipped;
    }

    pub fn abort(&mut self, scope: FailureScope, error: SyncError) {
        self.record_failure(scope, error);
        self.state = EntityState::Aborted;
    }

    /// Fold an upsert batch into the entity totals.
    pub fn absorb(&mut self, report: UpsertReport) {
        self.upserted += report.upserted;
        self.affected_rows += report.affected_rows;
        for failure in report.failures {
            self.record_failure(
                FailureScope::Record { index: failure.index, record_id: failure.record_id },
                failure.error,
            );
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Entity outcomes of one run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: EntityOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcome(&self, entity: &str) -> Option<&EntityOutcome> {
        self.outcomes.iter().find(|o| o.entity == entity)
    }

    pub fn count_state(&self, state: EntityState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn total_upserted(&self) -> usize {
        self.outcomes.iter().map(|o| o.upserted).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.outcomes.iter().map(|o| o.failures.len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(EntityOutcome::has_failures)
    }
}
