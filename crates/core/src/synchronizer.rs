//! Entity synchronizer - drives a run across all configured entities
//!
//! Entities are processed strictly in configuration order and identifiers in
//! discovery order. Failures are contained at the smallest boundary that
//! fits them: a record, one identifier, or the entity. Only fatal errors
//! (authentication, configuration) end the run.

use std::collections::HashSet;
use std::sync::Arc;

use restsync_domain::{
    EndpointDefinition, EntityOutcome, EntityState, ErrorScope, FailureScope, FetchStrategy,
    FieldValue, Result, RunReport, SyncError, TableMapping,
};
use tracing::{debug, error, info, instrument, warn};

use crate::ports::{EntityGateway, UpsertStore};
use crate::registry::EndpointRegistry;
use crate::template::{self, PathParams};

/// Entity synchronizer
pub struct EntitySynchronizer {
    registry: Arc<EndpointRegistry>,
    gateway: Arc<dyn EntityGateway>,
    store: Arc<dyn UpsertStore>,
    mapping: Arc<TableMapping>,
}

impl EntitySynchronizer {
    /// `mapping` is the snapshot handed to every upsert of this run.
    pub fn new(
        registry: Arc<EndpointRegistry>,
        gateway: Arc<dyn EntityGateway>,
        store: Arc<dyn UpsertStore>,
        mapping: Arc<TableMapping>,
    ) -> Self {
        Self { registry, gateway, store, mapping }
    }

    /// Synchronize every registered entity.
    ///
    /// # Errors
    /// Only fatal errors are returned; everything else is in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let endpoints: Vec<&EndpointDefinition> = self.registry.iter().collect();
        self.run_endpoints(&endpoints).await
    }

    /// Synchronize the named entities, still in configuration order.
    ///
    /// # Errors
    /// [`SyncError::Config`] if a name is not registered, before any call is
    /// made.
    pub async fn run_selected(&self, entities: &[String]) -> Result<RunReport> {
        let unknown: Vec<&str> = entities
            .iter()
            .map(String::as_str)
            .filter(|name| self.registry.get(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(SyncError::Config(format!(
                "unknown entities requested: {}",
                unknown.join(", ")
            )));
        }

        let wanted: HashSet<&str> = entities.iter().map(String::as_str).collect();
        let endpoints: Vec<&EndpointDefinition> =
            self.registry.iter().filter(|endpoint| wanted.contains(endpoint.entity.as_str())).collect();
        self.run_endpoints(&endpoints).await
    }

    async fn run_endpoints(&self, endpoints: &[&EndpointDefinition]) -> Result<RunReport> {
        info!(entities = endpoints.len(), "Starting sync run");
        let mut report = RunReport::default();

        for endpoint in endpoints {
            let outcome = self.sync_entity(endpoint).await?;
            report.push(outcome);
        }

        info!(
            entities = report.outcomes.len(),
            completed = report.count_state(EntityState::Completed),
            skipped = report.count_state(EntityState::Skipped),
            aborted = report.count_state(EntityState::Aborted),
            upserted = report.total_upserted(),
            failures = report.total_failures(),
            "Sync run finished"
        );
        Ok(report)
    }

    /// Synchronize one entity.
    ///
    /// # Errors
    /// Only fatal errors are returned.
    #[instrument(skip(self, endpoint), fields(entity = %endpoint.entity))]
    pub async fn sync_entity(&self, endpoint: &EndpointDefinition) -> Result<EntityOutcome> {
        let strategy = EndpointRegistry::strategy_for(endpoint);
        let mut outcome = EntityOutcome::new(&endpoint.entity, strategy);
        info!(strategy = %strategy, "Syncing entity");

        match strategy {
            FetchStrategy::ListDiscovery => self.sync_collection(endpoint, &mut outcome).await?,
            FetchStrategy::SingleFetch => self.sync_single(endpoint, &mut outcome).await?,
        }

        info!(
            state = %outcome.state,
            discovered = outcome.discovered,
            fetched = outcome.fetched,
            upserted = outcome.upserted,
            failures = outcome.failures.len(),
            "Entity finished"
        );
        Ok(outcome)
    }

    async fn sync_collection(
        &self,
        endpoint: &EndpointDefinition,
        outcome: &mut EntityOutcome,
    ) -> Result<()> {
        let entity = endpoint.entity.as_str();
        let Some(placeholder) = template::last_placeholder(&endpoint.url_template) else {
            return Ok(());
        };

        let ids = match self.discover_ids(endpoint).await {
            Ok(ids) => ids,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(error = %err, "Identifier discovery failed, skipping entity");
                outcome.record_failure(FailureScope::Discovery, err);
                outcome.skip();
                return Ok(());
            }
        };

        outcome.discovered = ids.len();
        if ids.is_empty() {
            info!("No identifiers discovered, skipping entity");
            outcome.skip();
            return Ok(());
        }
        debug!(count = ids.len(), "Identifiers discovered");

        for id in ids {
            let params = PathParams::from([(placeholder.to_owned(), id.clone())]);
            match self.fetch_and_persist(entity, &params, outcome).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) if err.scope() == ErrorScope::Entity => {
                    error!(id = %id, error = %err, "Aborting entity");
                    outcome.abort(FailureScope::Entity, err);
                    return Ok(());
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "Failed to process {entity} with id={id}");
                    outcome.record_failure(FailureScope::Identifier { id }, err);
                }
            }
        }
        Ok(())
    }

    async fn sync_single(
        &self,
        endpoint: &EndpointDefinition,
        outcome: &mut EntityOutcome,
    ) -> Result<()> {
        match self.fetch_and_persist(&endpoint.entity, &PathParams::new(), outcome).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                error!(error = %err, "Single fetch failed");
                let scope = if err.scope() == ErrorScope::Entity {
                    FailureScope::Entity
                } else {
                    FailureScope::SingleFetch
                };
                outcome.abort(scope, err);
                Ok(())
            }
        }
    }

    /// Enumerate identifiers from the collection endpoint.
    ///
    /// Items lacking the identifier field, or holding a value that cannot be
    /// used in a path, are left out.
    ///
    /// # Errors
    /// Whatever the gateway returned for the list call.
    pub async fn discover_ids(&self, endpoint: &EndpointDefinition) -> Result<Vec<String>> {
        let list_url = template::list_template(&endpoint.url_template);
        let field = endpoint.identifier_field();
        debug!(list_url = %list_url, field, "Discovering identifiers");

        let payload =
            self.gateway.invoke(&endpoint.entity, &PathParams::new(), Some(&list_url)).await?;

        let ids = match payload.unwrap_envelope() {
            FieldValue::List(items) => items
                .iter()
                .filter_map(|item| item.get(field))
                .filter_map(FieldValue::as_identifier)
                .collect(),
            item @ FieldValue::Map(_) => {
                item.get(field).and_then(FieldValue::as_identifier).into_iter().collect()
            }
            other => {
                debug!(kind = other.kind(), "List response holds no items");
                Vec::new()
            }
        };
        Ok(ids)
    }

    async fn fetch_and_persist(
        &self,
        entity: &str,
        params: &PathParams,
        outcome: &mut EntityOutcome,
    ) -> Result<()> {
        let payload = self.gateway.invoke(entity, params, None).await?;
        if payload.is_empty() {
            debug!(entity, "Empty payload, nothing to persist");
            return Ok(());
        }
        outcome.fetched += 1;
        self.persist(entity, payload, outcome).await
    }

    async fn persist(
        &self,
        entity: &str,
        payload: FieldValue,
        outcome: &mut EntityOutcome,
    ) -> Result<()> {
        let (records, rejected) = payload.into_records();
        let positions = payload_positions(records.len(), &rejected);
        for index in rejected {
            warn!(entity, index, "Payload element is not an object");
            outcome.record_failure(
                FailureScope::Record { index, record_id: None },
                SyncError::Persistence("payload element is not an object".into()),
            );
        }
        if records.is_empty() {
            return Ok(());
        }

        info!(entity, records = records.len(), "Inserting data for {entity}");
        let mut report = self.store.upsert(entity, &self.mapping, records).await?;
        for failure in &mut report.failures {
            if let Some(&position) = positions.get(failure.index) {
                failure.index = position;
            }
        }
        outcome.absorb(report);
        Ok(())
    }
}

/// Payload position of every accepted record, given the sorted positions of
/// the rejected elements.
fn payload_positions(accepted: usize, rejected: &[usize]) -> Vec<usize> {
    (0..accepted + rejected.len()).filter(|i| rejected.binary_search(i).is_err()).collect()
}
