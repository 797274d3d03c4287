//! Memory collector: picks durable product facts out of the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::store::{CoreMemoryStore, MemoryStoreError};
use crate::error::AgentError;
use crate::graph::Node;
use crate::llm::{LlmClient, ToolCall, ToolSpec};
use crate::message::{merge_message_runs, Message};
use crate::prompts::{render, Prompts};
use crate::root::render_conversation;
use crate::state::{AssistantState, CollectorMessage, PartialAssistantState};

pub const MEMORY_COLLECTOR: &str = "memory_collector";
pub const MEMORY_COLLECTOR_TOOLS: &str = "memory_collector_tools";

pub const CORE_MEMORY_APPEND: &str = "core_memory_append";
pub const CORE_MEMORY_REPLACE: &str = "core_memory_replace";

/// Model rounds with tool calls before the collector stops on its own.
pub const MAX_COLLECTOR_ROUNDS: usize = 3;

crate::route_labels! {
    pub enum CollectorRoute {
        Tools => "tools",
        Next => "next",
    }
}

pub fn collector_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: CORE_MEMORY_APPEND.into(),
            description: Some("Append a new fact to the core memory.".into()),
            input_schema: json!({
                "type": "object",
                "properties": {"memory_content": {"type": "string"}},
                "required": ["memory_content"]
            }),
        },
        ToolSpec {
            name: CORE_MEMORY_REPLACE.into(),
            description: Some("Replace a fragment of the core memory with an updated fact.".into()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "original_fragment": {"type": "string"},
                    "new_fragment": {"type": "string"}
                },
                "required": ["original_fragment", "new_fragment"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct AppendArgs {
    memory_content: String,
}

#[derive(Debug, Deserialize)]
struct ReplaceArgs {
    original_fragment: String,
    new_fragment: String,
}

fn store_failed(e: MemoryStoreError) -> AgentError {
    AgentError::ExecutionFailed(e.to_string())
}

fn pending_tool_calls(state: &AssistantState) -> Option<&[ToolCall]> {
    match state.memory_collection_messages.last() {
        Some(CollectorMessage::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => {
            Some(tool_calls)
        }
        _ => None,
    }
}

/// Asks the model for memory edits; its private exchange lives in
/// `memory_collection_messages` and is cleared when it is done.
pub struct MemoryCollectorNode {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn CoreMemoryStore>,
}

impl MemoryCollectorNode {
    pub fn new(prompts: Arc<Prompts>, llm: Arc<dyn LlmClient>, store: Arc<dyn CoreMemoryStore>) -> Self {
        Self { prompts, llm, store }
    }

    pub fn router(state: &AssistantState) -> CollectorRoute {
        if pending_tool_calls(state).is_some() {
            CollectorRoute::Tools
        } else {
            CollectorRoute::Next
        }
    }
}

#[async_trait]
impl Node<AssistantState> for MemoryCollectorNode {
    fn id(&self) -> &str {
        MEMORY_COLLECTOR
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let done = PartialAssistantState {
            memory_collection_messages: Some(Vec::new()),
            ..Default::default()
        };
        let rounds = state
            .memory_collection_messages
            .iter()
            .filter(|m| matches!(m, CollectorMessage::Assistant { .. }))
            .count();
        if rounds >= MAX_COLLECTOR_ROUNDS {
            debug!(rounds, "memory collector round limit reached");
            return Ok(done);
        }
        let memory_prompts = &self.prompts.memory;
        let memory = self.store.get().await.map_err(store_failed)?;
        let mut messages = vec![Message::system(render(
            &memory_prompts.collector_system,
            &[
                ("omit_marker", memory_prompts.collector_omit_marker.trim()),
                ("core_memory", &memory.text),
            ],
        ))];
        messages.extend(render_conversation(&state.messages));
        for entry in &state.memory_collection_messages {
            messages.push(match entry {
                CollectorMessage::Assistant { content, tool_calls } => {
                    let calls: Vec<String> = tool_calls
                        .iter()
                        .map(|c| format!("[called {} with {}]", c.name, c.arguments))
                        .collect();
                    Message::assistant(format!("{}{}", content, calls.join("\n")))
                }
                CollectorMessage::ToolResult { content, .. } => {
                    Message::user(format!("[tool result]\n{}", content))
                }
            });
        }

        let response = self
            .llm
            .invoke(&merge_message_runs(messages), &collector_tools())
            .await?;
        if response.tool_calls.is_empty() {
            return Ok(done);
        }
        let mut collected = state.memory_collection_messages.clone();
        collected.push(CollectorMessage::Assistant {
            content: response.content,
            tool_calls: response.tool_calls,
        });
        Ok(PartialAssistantState {
            memory_collection_messages: Some(collected),
            ..Default::default()
        })
    }
}

/// Applies the collector's memory edits and records their results.
pub struct MemoryCollectorToolsNode {
    prompts: Arc<Prompts>,
    store: Arc<dyn CoreMemoryStore>,
}

impl MemoryCollectorToolsNode {
    pub fn new(prompts: Arc<Prompts>, store: Arc<dyn CoreMemoryStore>) -> Self {
        Self { prompts, store }
    }

    async fn apply(&self, call: &ToolCall) -> Result<String, AgentError> {
        let memory = &self.prompts.memory;
        let applied = memory.collector_applied.trim_end().to_string();
        let invalid = |e: serde_json::Error| format!("Invalid arguments for {}: {}", call.name, e);
        match call.name.as_str() {
            CORE_MEMORY_APPEND => match serde_json::from_str::<AppendArgs>(&call.arguments) {
                Ok(args) => {
                    self.store.append(&args.memory_content).await.map_err(store_failed)?;
                    Ok(applied)
                }
                Err(e) => Ok(invalid(e)),
            },
            CORE_MEMORY_REPLACE => match serde_json::from_str::<ReplaceArgs>(&call.arguments) {
                Ok(args) => {
                    let replaced = self
                        .store
                        .replace(&args.original_fragment, &args.new_fragment)
                        .await
                        .map_err(store_failed)?;
                    if replaced {
                        Ok(applied)
                    } else {
                        Ok(memory.collector_replace_not_found.trim_end().to_string())
                    }
                }
                Err(e) => Ok(invalid(e)),
            },
            other => Ok(format!("The tool `{}` does not exist.", other)),
        }
    }
}

#[async_trait]
impl Node<AssistantState> for MemoryCollectorToolsNode {
    fn id(&self) -> &str {
        MEMORY_COLLECTOR_TOOLS
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let Some(calls) = pending_tool_calls(state) else {
            return Err(AgentError::ExecutionFailed(
                "memory collector tools ran without pending tool calls".into(),
            ));
        };
        let mut collected = state.memory_collection_messages.clone();
        for call in calls {
            let content = self.apply(call).await?;
            if content != self.prompts.memory.collector_applied.trim_end() {
                warn!(tool = %call.name, result = %content, "memory edit not applied");
            }
            collected.push(CollectorMessage::ToolResult {
                tool_call_id: call.id.clone(),
                content,
            });
        }
        Ok(PartialAssistantState {
            memory_collection_messages: Some(collected),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_memory::InMemoryCoreMemory;
    use crate::graph::GraphState;
    use crate::llm::MockLlm;
    use crate::state::AssistantMessage;

    fn prompts() -> Arc<Prompts> {
        Arc::new(Prompts::embedded().unwrap())
    }

    /// **Scenario**: Append and replace calls edit memory, results are recorded, and the loop ends when the model stops calling tools.
    #[tokio::test]
    async fn collects_and_applies_edits() {
        let store = Arc::new(InMemoryCoreMemory::new());
        store.set("Sells shoes.").await.unwrap();
        let llm = Arc::new(
            MockLlm::new()
                .with_tool_calls(vec![
                    ToolCall {
                        name: CORE_MEMORY_APPEND.into(),
                        arguments: json!({"memory_content": "Customers are runners."}).to_string(),
                        id: Some("m1".into()),
                    },
                    ToolCall {
                        name: CORE_MEMORY_REPLACE.into(),
                        arguments: json!({"original_fragment": "hats", "new_fragment": "caps"}).to_string(),
                        id: Some("m2".into()),
                    },
                ])
                .with_text("[Done]"),
        );
        let collector = MemoryCollectorNode::new(prompts(), llm.clone(), store.clone());
        let tools = MemoryCollectorToolsNode::new(prompts(), store.clone());
        let mut state = AssistantState {
            messages: vec![AssistantMessage::human("Our customers are runners.")],
            ..Default::default()
        };

        state.apply(collector.run(&state).await.unwrap());
        assert_eq!(MemoryCollectorNode::router(&state), CollectorRoute::Tools);
        state.apply(tools.run(&state).await.unwrap());
        assert_eq!(state.memory_collection_messages.len(), 3);
        assert!(matches!(
            &state.memory_collection_messages[2],
            CollectorMessage::ToolResult { content, .. } if content.contains("not found")
        ));
        assert_eq!(store.get().await.unwrap().text, "Sells shoes.\nCustomers are runners.");

        state.apply(collector.run(&state).await.unwrap());
        assert!(state.memory_collection_messages.is_empty());
        assert_eq!(MemoryCollectorNode::router(&state), CollectorRoute::Next);
        assert_eq!(llm.calls()[0].tool_names, vec![CORE_MEMORY_APPEND, CORE_MEMORY_REPLACE]);
        assert!(llm.calls()[1]
            .messages
            .iter()
            .any(|m| m.content().contains("[called core_memory_append")));
    }

    /// **Scenario**: Invalid arguments are reported back as a tool result without touching memory.
    #[tokio::test]
    async fn invalid_arguments_reported() {
        let store = Arc::new(InMemoryCoreMemory::new());
        let tools = MemoryCollectorToolsNode::new(prompts(), store.clone());
        let state = AssistantState {
            memory_collection_messages: vec![CollectorMessage::Assistant {
                content: String::new(),
                tool_calls: vec![ToolCall {
                    name: CORE_MEMORY_APPEND.into(),
                    arguments: "{}".into(),
                    id: Some("m1".into()),
                }],
            }],
            ..Default::default()
        };
        let update = tools.run(&state).await.unwrap();
        let collected = update.memory_collection_messages.unwrap();
        assert!(matches!(&collected[1], CollectorMessage::ToolResult { content, .. } if content.contains("Invalid arguments")));
        assert!(store.get().await.unwrap().text.is_empty());
    }

    /// **Scenario**: After the round limit the collector stops without calling the model.
    #[tokio::test]
    async fn round_limit_stops_collector() {
        let llm = Arc::new(MockLlm::new());
        let collector = MemoryCollectorNode::new(prompts(), llm.clone(), Arc::new(InMemoryCoreMemory::new()));
        let round = CollectorMessage::Assistant {
            content: String::new(),
            tool_calls: vec![],
        };
        let state = AssistantState {
            memory_collection_messages: vec![round; MAX_COLLECTOR_ROUNDS],
            ..Default::default()
        };
        let update = collector.run(&state).await.unwrap();
        assert_eq!(update.memory_collection_messages, Some(vec![]));
        assert!(llm.calls().is_empty());
    }
}
