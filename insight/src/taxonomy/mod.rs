//! Taxonomy agent: the ReAct planner ⇄ tools loop shared by every insight family.
//!
//! The planner reasons over the team's events and properties and ends the episode
//! with `final_answer` (a plan) or `ask_user_for_help` (back to root).

mod events;
mod parser;
mod planner;
mod provider;
mod reconstruct;
mod toolkit;
mod tools;
mod tools_node;

pub use events::{
    core_event_definition, prompt_event_names, remove_line_breaks, render_events_prompt,
    CoreEventDefinition, ALL_EVENTS, CORE_EVENT_DEFINITIONS, EVENT_ELISION_THRESHOLD,
    RARE_EVENT_MAX_COUNT,
};
pub use parser::{parse_react_agent_output, parse_react_text, ReActParseError};
pub use planner::{render_scratchpad, PlannerRoute, TaxonomyPlannerNode, DEFAULT_MAX_PARSE_CORRECTIONS};
pub use provider::{
    EventCount, InMemoryTaxonomy, PropertyDefinition, PropertyType, PropertyValues, TaxonomyError,
    TaxonomyProvider,
};
pub use reconstruct::{filter_and_merge_messages, reconstruct_conversation, slice_messages_to_conversation_start};
pub use toolkit::{TaxonomyToolkit, MAX_PROPERTY_VALUES};
pub use tools::{
    render_text_description, tool_names, FieldError, TaxonomyTool, ToolValidationError,
    TAXONOMY_TOOL_DESCRIPTIONS,
};
pub use tools_node::{TaxonomyToolsNode, ToolsRoute};
