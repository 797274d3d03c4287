//! Taxonomy metadata collaborator: events, properties and sampled property values.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the external taxonomy lookup.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("taxonomy lookup failed: {0}")]
    Lookup(String),
}

/// Event name with its recent usage count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCount {
    pub event: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Numeric,
    Boolean,
    DateTime,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "String",
            PropertyType::Numeric => "Numeric",
            PropertyType::Boolean => "Boolean",
            PropertyType::DateTime => "DateTime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A sample of distinct values plus the total number of distinct values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyValues {
    pub values: Vec<serde_json::Value>,
    pub total_count: usize,
}

/// Read-only taxonomy lookups for one team.
///
/// "Not found" is never an error: empty lists and `None` describe it, and the
/// toolkit turns them into descriptive text.
#[async_trait]
pub trait TaxonomyProvider: Send + Sync {
    /// Event names with usage counts, most used first.
    async fn events(&self) -> Result<Vec<EventCount>, TaxonomyError>;

    /// Properties seen on `event`; empty if the event is unknown.
    async fn event_properties(&self, event: &str) -> Result<Vec<PropertyDefinition>, TaxonomyError>;

    /// Values of `property` on `event`; `None` if the property is unknown.
    async fn event_property_values(
        &self,
        event: &str,
        property: &str,
    ) -> Result<Option<PropertyValues>, TaxonomyError>;

    /// Properties of an entity (person, session or group type).
    async fn entity_properties(&self, entity: &str) -> Result<Vec<PropertyDefinition>, TaxonomyError>;

    /// Values of an entity property; `None` if the property is unknown.
    async fn entity_property_values(
        &self,
        entity: &str,
        property: &str,
    ) -> Result<Option<PropertyValues>, TaxonomyError>;
}

/// Taxonomy held in memory; deserializable from a JSON fixture.
///
/// **Interaction**: Test double and the CLI's fixture-backed provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryTaxonomy {
    pub events: Vec<EventCount>,
    pub event_properties: HashMap<String, Vec<PropertyDefinition>>,
    pub event_property_values: HashMap<String, HashMap<String, PropertyValues>>,
    pub entity_properties: HashMap<String, Vec<PropertyDefinition>>,
    pub entity_property_values: HashMap<String, HashMap<String, PropertyValues>>,
}

impl InMemoryTaxonomy {
    pub fn with_events(mut self, events: impl IntoIterator<Item = (&'static str, u64)>) -> Self {
        self.events = events
            .into_iter()
            .map(|(event, count)| EventCount {
                event: event.to_string(),
                count,
            })
            .collect();
        self
    }
}

#[async_trait]
impl TaxonomyProvider for InMemoryTaxonomy {
    async fn events(&self) -> Result<Vec<EventCount>, TaxonomyError> {
        Ok(self.events.clone())
    }

    async fn event_properties(&self, event: &str) -> Result<Vec<PropertyDefinition>, TaxonomyError> {
        Ok(self.event_properties.get(event).cloned().unwrap_or_default())
    }

    async fn event_property_values(
        &self,
        event: &str,
        property: &str,
    ) -> Result<Option<PropertyValues>, TaxonomyError> {
        Ok(self
            .event_property_values
            .get(event)
            .and_then(|by_prop| by_prop.get(property))
            .cloned())
    }

    async fn entity_properties(&self, entity: &str) -> Result<Vec<PropertyDefinition>, TaxonomyError> {
        Ok(self.entity_properties.get(entity).cloned().unwrap_or_default())
    }

    async fn entity_property_values(
        &self,
        entity: &str,
        property: &str,
    ) -> Result<Option<PropertyValues>, TaxonomyError> {
        Ok(self
            .entity_property_values
            .get(entity)
            .and_then(|by_prop| by_prop.get(property))
            .cloned())
    }
}
