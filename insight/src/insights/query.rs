//! Typed insight queries produced by the generators.

use serde::{Deserialize, Serialize};

/// Insight family. Root delegates to one family per tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trends,
    Funnel,
    Retention,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Trends => "trends",
            InsightKind::Funnel => "funnel",
            InsightKind::Retention => "retention",
        }
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trends" => Ok(InsightKind::Trends),
            "funnel" => Ok(InsightKind::Funnel),
            "retention" => Ok(InsightKind::Retention),
            other => Err(format!("unknown insight kind: {}", other)),
        }
    }
}

/// Property filter on an event, person, session or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyFilter {
    pub key: String,
    /// `event`, `person`, `session` or a group type.
    #[serde(rename = "type")]
    pub entity: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// One series or funnel step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventNode {
    /// `None` means all events.
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub math: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hour,
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendsQuery {
    pub series: Vec<EventNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunnelsQuery {
    pub series: Vec<EventNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funnel_window_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionEntity {
    pub event: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPeriod {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionQuery {
    pub target_entity: RetentionEntity,
    pub returning_entity: RetentionEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<RetentionPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_intervals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
}

/// A generated query, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InsightQuery {
    Trends(TrendsQuery),
    Funnel(FunnelsQuery),
    Retention(RetentionQuery),
}

impl InsightQuery {
    pub fn kind(&self) -> InsightKind {
        match self {
            InsightQuery::Trends(_) => InsightKind::Trends,
            InsightQuery::Funnel(_) => InsightKind::Funnel,
            InsightQuery::Retention(_) => InsightKind::Retention,
        }
    }

    /// Parses a generator answer for `kind` and checks the semantic constraints
    /// serde cannot express. The error text is fed back to the model.
    pub fn parse_for(kind: InsightKind, answer: serde_json::Value) -> Result<Self, String> {
        let query: InsightQuery = serde_json::from_value(answer).map_err(|e| e.to_string())?;
        if query.kind() != kind {
            return Err(format!(
                "expected a {} query but got a {} query",
                kind,
                query.kind()
            ));
        }
        query.validate()?;
        Ok(query)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            InsightQuery::Trends(q) if q.series.is_empty() => {
                Err("a trends query needs at least one series".into())
            }
            InsightQuery::Funnel(q) if q.series.len() < 2 => {
                Err("a funnel query needs at least two steps".into())
            }
            InsightQuery::Funnel(q) if q.series.iter().any(|s| s.event.is_none()) => {
                Err("every funnel step must name an event".into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: A trends answer with a `kind` tag parses into TrendsQuery.
    #[test]
    fn parse_trends_answer() {
        let q = InsightQuery::parse_for(
            InsightKind::Trends,
            json!({"kind": "trends", "series": [{"event": "signed_up", "math": "dau"}], "interval": "week"}),
        )
        .unwrap();
        let InsightQuery::Trends(t) = q else {
            panic!("expected trends");
        };
        assert_eq!(t.series[0].event.as_deref(), Some("signed_up"));
        assert_eq!(t.interval, Some(Interval::Week));
    }

    /// **Scenario**: A single-step funnel and a query of the wrong family are rejected with readable errors.
    #[test]
    fn parse_rejects_invalid_answers() {
        let err = InsightQuery::parse_for(
            InsightKind::Funnel,
            json!({"kind": "funnel", "series": [{"event": "a"}]}),
        )
        .unwrap_err();
        assert!(err.contains("two steps"), "{}", err);

        let err = InsightQuery::parse_for(
            InsightKind::Retention,
            json!({"kind": "trends", "series": [{"event": "a"}]}),
        )
        .unwrap_err();
        assert!(err.contains("expected a retention query"), "{}", err);
    }

    /// **Scenario**: Unknown fields are a validation error, not silently dropped.
    #[test]
    fn parse_rejects_unknown_fields() {
        let err = InsightQuery::parse_for(
            InsightKind::Trends,
            json!({"kind": "trends", "series": [{"event": "a"}], "colour": "red"}),
        )
        .unwrap_err();
        assert!(err.contains("colour"), "{}", err);
    }

    /// **Scenario**: InsightKind parses from and displays as its lowercase name.
    #[test]
    fn insight_kind_names() {
        for kind in [InsightKind::Trends, InsightKind::Funnel, InsightKind::Retention] {
            assert_eq!(kind.as_str().parse::<InsightKind>().unwrap(), kind);
        }
        assert!("paths".parse::<InsightKind>().is_err());
    }
}
