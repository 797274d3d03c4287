//! Team/project context the assistant answers for.

use serde::{Deserialize, Serialize};

/// Static project facts, loaded once per turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub name: String,
    /// IANA timezone name, e.g. `Europe/Berlin`.
    pub timezone: String,
    /// Group types ordered by group type index.
    pub group_types: Vec<String>,
    /// Product description entered by the user, if any.
    pub product_description: Option<String>,
    /// Domains the product runs on (from recorded `$host` values).
    pub app_urls: Vec<String>,
    /// Mobile app bundle ids.
    pub app_bundle_ids: Vec<String>,
}

impl Team {
    /// Entities that can carry properties: person, session and every group type.
    pub fn entities(&self) -> Vec<String> {
        let mut entities = vec!["person".to_string(), "session".to_string()];
        entities.extend(self.group_types.iter().cloned());
        entities
    }

    /// Current UTC time; prompts print it next to the project timezone name.
    pub fn now(&self) -> String {
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    pub fn timezone_or_utc(&self) -> &str {
        if self.timezone.is_empty() {
            "UTC"
        } else {
            &self.timezone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Entities list person and session first, then group types in order.
    #[test]
    fn entities_include_group_types() {
        let team = Team {
            group_types: vec!["organization".into(), "instance".into()],
            ..Default::default()
        };
        assert_eq!(
            team.entities(),
            vec!["person", "session", "organization", "instance"]
        );
    }

    /// **Scenario**: An empty timezone reads as UTC; now() renders a full timestamp.
    #[test]
    fn timezone_defaults_to_utc() {
        assert_eq!(Team::default().timezone_or_utc(), "UTC");
        let team = Team {
            timezone: "Europe/Berlin".into(),
            ..Default::default()
        };
        assert_eq!(team.timezone_or_utc(), "Europe/Berlin");
        assert_eq!(team.now().len(), "2024-01-01 00:00:00 UTC".len());
    }
}
