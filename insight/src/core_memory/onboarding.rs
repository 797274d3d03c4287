//! Memory onboarding: seed core memory from the product description or from
//! research on the product's domains, confirmed by the user.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::store::{CoreMemory, CoreMemoryStore, MemoryStoreError, ScrapingStatus};
use crate::error::AgentError;
use crate::graph::{GraphInterrupt, Interrupt, Node};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::prompts::{render, Prompts};
use crate::state::{new_message_id, AssistantMessage, AssistantState, PartialAssistantState};
use crate::team::Team;

pub const MEMORY_ONBOARDING: &str = "memory_onboarding";
pub const MEMORY_INITIALIZER: &str = "memory_initializer";
pub const MEMORY_INITIALIZER_INTERRUPT: &str = "memory_initializer_interrupt";

crate::route_labels! {
    pub enum OnboardingRoute {
        Continue => "continue",
        InitializeMemory => "initialize_memory",
    }
}

crate::route_labels! {
    pub enum InitializerRoute {
        Continue => "continue",
        Interrupt => "interrupt",
    }
}

fn store_failed(e: MemoryStoreError) -> AgentError {
    AgentError::ExecutionFailed(e.to_string())
}

/// START gate: onboarding runs until memory is completed or skipped.
pub fn should_run_onboarding(memory: &CoreMemory) -> bool {
    !memory.is_initialized()
}

/// Decides how core memory gets initialized.
pub struct MemoryOnboardingNode {
    prompts: Arc<Prompts>,
    team: Arc<Team>,
    store: Arc<dyn CoreMemoryStore>,
}

impl MemoryOnboardingNode {
    pub fn new(prompts: Arc<Prompts>, team: Arc<Team>, store: Arc<dyn CoreMemoryStore>) -> Self {
        Self {
            prompts,
            team,
            store,
        }
    }

    /// Continue when the node added nothing after the human message; otherwise research.
    pub fn router(state: &AssistantState) -> OnboardingRoute {
        match state.last_message() {
            Some(message) if message.is_human() => OnboardingRoute::Continue,
            _ => OnboardingRoute::InitializeMemory,
        }
    }
}

#[async_trait]
impl Node<AssistantState> for MemoryOnboardingNode {
    fn id(&self) -> &str {
        MEMORY_ONBOARDING
    }

    async fn run(&self, _state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        if let Some(description) = self.team.product_description.as_deref().filter(|d| !d.is_empty()) {
            debug!("core memory seeded from the product description");
            self.store.set(description).await.map_err(store_failed)?;
            self.store
                .set_scraping_status(ScrapingStatus::Completed)
                .await
                .map_err(store_failed)?;
            return Ok(PartialAssistantState::default());
        }
        if self.team.app_urls.is_empty() && self.team.app_bundle_ids.is_empty() {
            debug!("no domains or bundle ids to research; skipping core memory");
            self.store
                .set_scraping_status(ScrapingStatus::Skipped)
                .await
                .map_err(store_failed)?;
            return Ok(PartialAssistantState::default());
        }
        self.store
            .set_scraping_status(ScrapingStatus::Pending)
            .await
            .map_err(store_failed)?;
        Ok(PartialAssistantState::default().with_messages(vec![AssistantMessage::assistant(
            self.prompts.memory.onboarding_greeting.trim_end(),
        )]))
    }
}

/// Researches the product from its domains and bundle ids.
pub struct MemoryInitializerNode {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    team: Arc<Team>,
    store: Arc<dyn CoreMemoryStore>,
}

impl MemoryInitializerNode {
    pub fn new(
        prompts: Arc<Prompts>,
        llm: Arc<dyn LlmClient>,
        team: Arc<Team>,
        store: Arc<dyn CoreMemoryStore>,
    ) -> Self {
        Self {
            prompts,
            llm,
            team,
            store,
        }
    }

    pub fn router(state: &AssistantState) -> InitializerRoute {
        if state.memory_scraping_status == Some(ScrapingStatus::Skipped) {
            InitializerRoute::Continue
        } else {
            InitializerRoute::Interrupt
        }
    }
}

#[async_trait]
impl Node<AssistantState> for MemoryInitializerNode {
    fn id(&self) -> &str {
        MEMORY_INITIALIZER
    }

    async fn run(&self, _state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let memory = &self.prompts.memory;
        let marker = memory.initializer_no_data_marker.trim();
        let sources: Vec<&str> = self
            .team
            .app_urls
            .iter()
            .chain(self.team.app_bundle_ids.iter())
            .map(String::as_str)
            .collect();
        let messages = [
            Message::system(render(&memory.initializer_system, &[("no_data_marker", marker)])),
            Message::user(render(&memory.initializer_request, &[("urls", &sources.join(", "))])),
        ];
        let response = self.llm.invoke(&messages, &[]).await?;
        let research = response.content.trim();

        if research.is_empty() || research.contains(marker) {
            info!("product research found nothing; core memory skipped");
            self.store
                .set_scraping_status(ScrapingStatus::Skipped)
                .await
                .map_err(store_failed)?;
            return Ok(PartialAssistantState {
                memory_scraping_status: Some(ScrapingStatus::Skipped),
                ..Default::default()
            }
            .with_messages(vec![AssistantMessage::Failure {
                id: new_message_id(),
                content: Some(memory.initializer_failure.trim_end().to_string()),
            }]));
        }
        Ok(PartialAssistantState::default().with_messages(vec![AssistantMessage::assistant(research)]))
    }
}

/// Asks the user to confirm the research, then stores or discards it.
///
/// Without a human reply after the research the node interrupts the turn with the
/// confirmation question. A reply starting with "yes" approves.
pub struct MemoryInitializerInterruptNode {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn CoreMemoryStore>,
}

impl MemoryInitializerInterruptNode {
    pub fn new(prompts: Arc<Prompts>, llm: Arc<dyn LlmClient>, store: Arc<dyn CoreMemoryStore>) -> Self {
        Self { prompts, llm, store }
    }

    fn question(&self) -> &str {
        self.prompts.memory.interrupt_question.trim_end()
    }

    fn research<'a>(&self, state: &'a AssistantState) -> Option<&'a str> {
        state.messages.iter().rev().find_map(|m| match m {
            AssistantMessage::Assistant { content, .. } if content != self.question() => {
                Some(content.as_str())
            }
            _ => None,
        })
    }
}

/// Whether a confirmation reply approves.
pub fn is_approval(reply: &str) -> bool {
    reply.trim().to_lowercase().starts_with("yes")
}

#[async_trait]
impl Node<AssistantState> for MemoryInitializerInterruptNode {
    fn id(&self) -> &str {
        MEMORY_INITIALIZER_INTERRUPT
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let reply = match state.last_message() {
            Some(AssistantMessage::Human { content, .. }) => content.as_str(),
            _ => {
                let question = AssistantMessage::assistant(self.question());
                let value = serde_json::to_value(&question)
                    .unwrap_or_else(|_| json!({"type": "assistant", "content": self.question()}));
                return Err(GraphInterrupt(Interrupt::new(value).with_reason("memory_confirmation")).into());
            }
        };
        let memory = &self.prompts.memory;

        if !is_approval(reply) {
            self.store
                .set_scraping_status(ScrapingStatus::Skipped)
                .await
                .map_err(store_failed)?;
            return Ok(PartialAssistantState {
                memory_scraping_status: Some(ScrapingStatus::Skipped),
                ..Default::default()
            }
            .with_messages(vec![AssistantMessage::assistant(memory.interrupt_rejected.trim_end())]));
        }

        let research = self.research(state).ok_or_else(|| {
            AgentError::ExecutionFailed("no product research to confirm".into())
        })?;
        let messages = [
            Message::system(memory.compression_system.trim_end()),
            Message::user(research),
        ];
        let compressed = self.llm.invoke(&messages, &[]).await?.content;
        self.store.set(compressed.trim()).await.map_err(store_failed)?;
        self.store
            .set_scraping_status(ScrapingStatus::Completed)
            .await
            .map_err(store_failed)?;
        info!("core memory initialized from product research");
        Ok(PartialAssistantState {
            memory_scraping_status: Some(ScrapingStatus::Completed),
            ..Default::default()
        }
        .with_messages(vec![AssistantMessage::assistant(memory.interrupt_approved.trim_end())]))
    }
}
