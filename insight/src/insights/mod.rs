//! Insight families: typed queries and the generators that produce them.
//!
//! Each family (trends, funnel, retention) is wired as the same quad: taxonomy
//! planner ⇄ tools, then generator ⇄ tools. Only the prompts and the query type differ.

mod generator;
mod query;

pub use generator::{
    parse_generator_output, GeneratorRoute, SchemaGeneratorNode, SchemaGeneratorToolsNode,
    DEFAULT_MAX_GENERATION_ATTEMPTS,
};
pub use query::{
    EventNode, FunnelsQuery, InsightKind, InsightQuery, Interval, PropertyFilter, RetentionEntity,
    RetentionPeriod, RetentionQuery, TrendsQuery,
};

/// Node ids of one family's quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyNodeIds {
    pub planner: &'static str,
    pub planner_tools: &'static str,
    pub generator: &'static str,
    pub generator_tools: &'static str,
}

impl InsightKind {
    pub const ALL: [InsightKind; 3] = [InsightKind::Trends, InsightKind::Funnel, InsightKind::Retention];

    pub fn node_ids(&self) -> FamilyNodeIds {
        match self {
            InsightKind::Trends => FamilyNodeIds {
                planner: "trends_planner",
                planner_tools: "trends_planner_tools",
                generator: "trends_generator",
                generator_tools: "trends_generator_tools",
            },
            InsightKind::Funnel => FamilyNodeIds {
                planner: "funnel_planner",
                planner_tools: "funnel_planner_tools",
                generator: "funnel_generator",
                generator_tools: "funnel_generator_tools",
            },
            InsightKind::Retention => FamilyNodeIds {
                planner: "retention_planner",
                planner_tools: "retention_planner_tools",
                generator: "retention_generator",
                generator_tools: "retention_generator_tools",
            },
        }
    }
}
