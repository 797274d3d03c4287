//! Prompt catalog.
//!
//! All prompt text lives in `insight/prompts/*.yaml`, embedded at compile time.
//! A `PROMPTS_DIR` (or explicit directory) may override individual keys. Templates
//! use `{{name}}` placeholders, rendered by [`render`].

mod load;

pub use load::{load, load_or_default, LoadError};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::insights::InsightKind;

/// Shared ReAct prompts used by every taxonomy planner.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyPrompts {
    pub react_format: String,
    pub react_format_reminder: String,
    pub react_definitions: String,
    pub react_scratchpad: String,
    pub react_user: String,
    pub react_follow_up: String,
    pub react_missing_action: String,
    pub react_missing_action_correction: String,
    pub react_malformed_json: String,
    pub react_validation_exception: String,
    pub react_help_request: String,
    pub react_human_in_the_loop: String,
    pub react_property_filters: String,
    pub core_memory_instructions: String,
}

/// Planner and generator system prompts for one insight family.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyPrompts {
    pub planner_system: String,
    pub generator_system: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightPrompts {
    pub trends: FamilyPrompts,
    pub funnel: FamilyPrompts,
    pub retention: FamilyPrompts,
    pub generator_plan: String,
    pub generator_new_plan: String,
    pub generator_question: String,
    pub generator_failover: String,
}

impl InsightPrompts {
    pub fn family(&self, kind: InsightKind) -> &FamilyPrompts {
        match kind {
            InsightKind::Trends => &self.trends,
            InsightKind::Funnel => &self.funnel,
            InsightKind::Retention => &self.retention,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootPrompts {
    pub root_system: String,
    pub root_tool_limit: String,
    pub root_invalid_tool_call: String,
    pub docs_system: String,
    pub docs_checking: String,
    pub docs_continuation_marker: String,
    pub docs_continuation: String,
    pub query_executor_results: String,
    pub query_executor_failed: String,
    pub query_executor_rejected: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryPrompts {
    pub onboarding_greeting: String,
    pub initializer_system: String,
    pub initializer_request: String,
    pub initializer_no_data_marker: String,
    pub initializer_failure: String,
    pub interrupt_question: String,
    pub interrupt_approved: String,
    pub interrupt_rejected: String,
    pub compression_system: String,
    pub collector_system: String,
    pub collector_omit_marker: String,
    pub collector_replace_not_found: String,
    pub collector_applied: String,
}

/// Every prompt the assistant uses.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub taxonomy: TaxonomyPrompts,
    pub insights: InsightPrompts,
    pub root: RootPrompts,
    pub memory: MemoryPrompts,
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex"));

/// Renders `{{name}}` placeholders from `vars`. Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
