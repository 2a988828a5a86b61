//! Endpoint registry: entity name to endpoint definition

use std::collections::HashMap;

use restsync_domain::{EndpointDefinition, FetchStrategy, Result, SyncConfig, SyncError};

use crate::template;

/// Immutable lookup of endpoint definitions, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<EndpointDefinition>,
    index: HashMap<String, usize>,
}

impl EndpointRegistry {
    /// Build a registry, rejecting duplicate entity names.
    ///
    /// # Errors
    /// [`SyncError::Config`] if two definitions share an entity name.
    pub fn new(endpoints: Vec<EndpointDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(endpoints.len());
        for (position, endpoint) in endpoints.iter().enumerate() {
            if index.insert(endpoint.entity.clone(), position).is_some() {
                return Err(SyncError::Config(format!(
                    "duplicate endpoint for entity '{}'",
                    endpoint.entity
                )));
            }
        }
        Ok(Self { endpoints, index })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(config.api_endpoints.clone())
    }

    /// # Errors
    /// [`SyncError::UnknownEntity`] if no endpoint is registered for `entity`.
    pub fn resolve(&self, entity: &str) -> Result<&EndpointDefinition> {
        self.get(entity).ok_or_else(|| SyncError::UnknownEntity(entity.to_owned()))
    }

    pub fn get(&self, entity: &str) -> Option<&EndpointDefinition> {
        self.index.get(entity).map(|&position| &self.endpoints[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.endpoints.iter()
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|endpoint| endpoint.entity.as_str())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Strategy implied by the endpoint's template.
    pub fn strategy_for(endpoint: &EndpointDefinition) -> FetchStrategy {
        if template::is_parametric(&endpoint.url_template) {
            FetchStrategy::ListDiscovery
        } else {
            FetchStrategy::SingleFetch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EndpointRegistry {
        EndpointRegistry::new(vec![
            EndpointDefinition::new("business", "https://api/business/{id}"),
            EndpointDefinition::new("settings", "https://api/settings"),
            EndpointDefinition::new("contacts", "https://api/contacts/{contactId}")
                .with_parent_key("contactId"),
        ])
        .unwrap()
    }

    #[test]
    fn resolves_known_entities() {
        let registry = registry();
        let endpoint = registry.resolve("contacts").unwrap();
        assert_eq!(endpoint.url_template, "https://api/contacts/{contactId}");
        assert_eq!(endpoint.identifier_field(), "contactId");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let err = registry().resolve("invoices").unwrap_err();
        assert_eq!(err, SyncError::UnknownEntity("invoices".into()));
    }

    #[test]
    fn keeps_configuration_order() {
        let registry = registry();
        assert_eq!(registry.entities().collect::<Vec<_>>(), vec!["business", "settings", "contacts"]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let result = EndpointRegistry::new(vec![
            EndpointDefinition::new("business", "/a/{id}"),
            EndpointDefinition::new("business", "/b"),
        ]);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn strategy_follows_template() {
        let registry = registry();
        assert_eq!(
            EndpointRegistry::strategy_for(registry.resolve("business").unwrap()),
            FetchStrategy::ListDiscovery
        );
        assert_eq!(
            EndpointRegistry::strategy_for(registry.resolve("settings").unwrap()),
            FetchStrategy::SingleFetch
        );
    }
}
