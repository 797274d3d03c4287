//! Core memory: durable facts about the team's product.
//!
//! Onboarding seeds it (from the product description or a confirmed research
//! summary); the collector edits it after every human message.

mod collector;
mod onboarding;
mod store;

pub use collector::{
    collector_tools, CollectorRoute, MemoryCollectorNode, MemoryCollectorToolsNode,
    CORE_MEMORY_APPEND, CORE_MEMORY_REPLACE, MAX_COLLECTOR_ROUNDS, MEMORY_COLLECTOR,
    MEMORY_COLLECTOR_TOOLS,
};
pub use onboarding::{
    is_approval, should_run_onboarding, InitializerRoute, MemoryInitializerInterruptNode,
    MemoryInitializerNode, MemoryOnboardingNode, OnboardingRoute, MEMORY_INITIALIZER,
    MEMORY_INITIALIZER_INTERRUPT, MEMORY_ONBOARDING,
};
pub use store::{CoreMemory, CoreMemoryStore, InMemoryCoreMemory, MemoryStoreError, ScrapingStatus};
