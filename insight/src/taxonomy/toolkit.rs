//! Read-only taxonomy retrieval tools.
//!
//! Every operation returns text for the model. "Not found" is a descriptive
//! sentence, never an error; only a failing provider is an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::events::escape_xml;
use super::provider::{PropertyDefinition, PropertyType, PropertyValues, TaxonomyError, TaxonomyProvider};
use crate::team::Team;

/// Values shown before the "and N more" suffix.
pub const MAX_PROPERTY_VALUES: usize = 25;

/// Toolkit bound to one team's taxonomy.
pub struct TaxonomyToolkit {
    provider: Arc<dyn TaxonomyProvider>,
    entities: Vec<String>,
}

impl TaxonomyToolkit {
    pub fn new(provider: Arc<dyn TaxonomyProvider>, team: &Team) -> Self {
        Self {
            provider,
            entities: team.entities(),
        }
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn provider(&self) -> &Arc<dyn TaxonomyProvider> {
        &self.provider
    }

    pub async fn retrieve_event_properties(&self, event_name: &str) -> Result<String, TaxonomyError> {
        let properties = self.provider.event_properties(event_name).await?;
        Ok(render_properties(&properties).unwrap_or_else(|| {
            format!(
                "Properties do not exist in the taxonomy for the event {}.",
                event_name
            )
        }))
    }

    pub async fn retrieve_event_property_values(
        &self,
        event_name: &str,
        property_name: &str,
    ) -> Result<String, TaxonomyError> {
        let values = self
            .provider
            .event_property_values(event_name, property_name)
            .await?;
        Ok(match values {
            None => format!(
                "The property {} does not exist in the taxonomy for the event {}.",
                property_name, event_name
            ),
            Some(values) => render_values(property_name, &values),
        })
    }

    pub async fn retrieve_entity_properties(&self, entity: &str) -> Result<String, TaxonomyError> {
        if let Some(message) = self.invalid_entity(entity) {
            return Ok(message);
        }
        let properties = self.provider.entity_properties(entity).await?;
        Ok(render_properties(&properties).unwrap_or_else(|| {
            format!("Properties do not exist in the taxonomy for the entity {}.", entity)
        }))
    }

    pub async fn retrieve_entity_property_values(
        &self,
        entity: &str,
        property_name: &str,
    ) -> Result<String, TaxonomyError> {
        if let Some(message) = self.invalid_entity(entity) {
            return Ok(message);
        }
        let values = self
            .provider
            .entity_property_values(entity, property_name)
            .await?;
        Ok(match values {
            None => format!(
                "The property {} does not exist in the taxonomy for the entity {}.",
                property_name, entity
            ),
            Some(values) => render_values(property_name, &values),
        })
    }

    /// The corrective instruction is the observation itself.
    pub fn handle_incorrect_response(&self, instruction: &str) -> String {
        instruction.to_string()
    }

    fn invalid_entity(&self, entity: &str) -> Option<String> {
        if self.entities.iter().any(|e| e == entity) {
            return None;
        }
        Some(format!(
            "Entity {} does not exist in the taxonomy. You must use one of the following: {}.",
            entity,
            self.entities.join(", ")
        ))
    }
}

/// `<properties>` grouped by type; `None` when nothing typed is left.
fn render_properties(properties: &[PropertyDefinition]) -> Option<String> {
    let mut by_type: BTreeMap<PropertyType, Vec<&PropertyDefinition>> = BTreeMap::new();
    for property in properties {
        if let Some(property_type) = property.property_type {
            by_type.entry(property_type).or_default().push(property);
        }
    }
    if by_type.is_empty() {
        return None;
    }
    let mut out = String::from("<properties>");
    for (property_type, props) in by_type {
        out.push('<');
        out.push_str(property_type.as_str());
        out.push('>');
        for prop in props {
            out.push_str("<prop><name>");
            out.push_str(&escape_xml(&prop.name));
            out.push_str("</name>");
            if let Some(description) = prop.description.as_deref().filter(|d| !d.is_empty()) {
                out.push_str("<description>");
                out.push_str(&escape_xml(description));
                out.push_str("</description>");
            }
            out.push_str("</prop>");
        }
        out.push_str("</");
        out.push_str(property_type.as_str());
        out.push('>');
    }
    out.push_str("</properties>");
    Some(out)
}

fn render_values(property_name: &str, values: &PropertyValues) -> String {
    if values.values.is_empty() {
        return format!("The property {} does not have any values in the taxonomy.", property_name);
    }
    let shown: Vec<String> = values
        .values
        .iter()
        .take(MAX_PROPERTY_VALUES)
        .map(format_value)
        .collect();
    let mut out = shown.join(", ");
    let remaining = values.total_count.saturating_sub(shown.len());
    if remaining > 0 {
        out.push_str(&format!(" and {} more distinct values", remaining));
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::provider::InMemoryTaxonomy;
    use serde_json::json;

    fn toolkit() -> TaxonomyToolkit {
        let mut taxonomy = InMemoryTaxonomy::default().with_events([("$pageview", 100)]);
        taxonomy.event_properties.insert(
            "$pageview".into(),
            vec![
                PropertyDefinition {
                    name: "$browser".into(),
                    property_type: Some(PropertyType::String),
                    description: Some("Name of the browser".into()),
                },
                PropertyDefinition {
                    name: "$screen_width".into(),
                    property_type: Some(PropertyType::Numeric),
                    description: None,
                },
                PropertyDefinition {
                    name: "untyped".into(),
                    property_type: None,
                    description: None,
                },
            ],
        );
        taxonomy.event_property_values.insert(
            "$pageview".into(),
            [(
                "$browser".to_string(),
                PropertyValues {
                    values: vec![json!("Chrome"), json!("Firefox")],
                    total_count: 7,
                },
            )]
            .into_iter()
            .collect(),
        );
        taxonomy.entity_property_values.insert(
            "organization".into(),
            [(
                "employees".to_string(),
                PropertyValues {
                    values: vec![json!(10), json!(250)],
                    total_count: 2,
                },
            )]
            .into_iter()
            .collect(),
        );
        let team = Team {
            group_types: vec!["organization".into()],
            ..Default::default()
        };
        TaxonomyToolkit::new(Arc::new(taxonomy), &team)
    }

    /// **Scenario**: Event properties render grouped by type; untyped properties are left out.
    #[tokio::test]
    async fn event_properties_grouped_by_type() {
        let out = toolkit().retrieve_event_properties("$pageview").await.unwrap();
        assert_eq!(
            out,
            "<properties><String><prop><name>$browser</name><description>Name of the browser</description></prop></String><Numeric><prop><name>$screen_width</name></prop></Numeric></properties>"
        );
    }

    /// **Scenario**: Unknown events and properties yield descriptive sentences instead of errors.
    #[tokio::test]
    async fn not_found_is_text() {
        let tk = toolkit();
        let out = tk.retrieve_event_properties("signed_up").await.unwrap();
        assert_eq!(out, "Properties do not exist in the taxonomy for the event signed_up.");
        let out = tk.retrieve_event_property_values("$pageview", "$os").await.unwrap();
        assert!(out.contains("does not exist"), "{}", out);
    }

    /// **Scenario**: String values are quoted and the remaining distinct count is appended.
    #[tokio::test]
    async fn values_quoted_with_remaining_count() {
        let out = toolkit()
            .retrieve_event_property_values("$pageview", "$browser")
            .await
            .unwrap();
        assert_eq!(out, "\"Chrome\", \"Firefox\" and 5 more distinct values");
    }

    /// **Scenario**: Numeric group property values render bare, without a suffix when all are shown.
    #[tokio::test]
    async fn entity_values_numeric() {
        let out = toolkit()
            .retrieve_entity_property_values("organization", "employees")
            .await
            .unwrap();
        assert_eq!(out, "10, 250");
    }

    /// **Scenario**: An entity outside person/session/group types lists the valid entities.
    #[tokio::test]
    async fn invalid_entity_lists_valid_ones() {
        let out = toolkit().retrieve_entity_properties("company").await.unwrap();
        assert_eq!(
            out,
            "Entity company does not exist in the taxonomy. You must use one of the following: person, session, organization."
        );
    }
}
