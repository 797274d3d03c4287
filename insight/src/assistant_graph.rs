//! Assistant graph assembly: the full conversational turn as one state graph.
//!
//! Chain: memory gate (START) → onboarding → initializer → confirmation interrupt →
//! memory collector ⇄ tools → root → root tools. Root delegates to one insight
//! family (planner ⇄ tools, generator ⇄ tools, query executor, back to root), to
//! docs search, or ends the turn.
//!
//! The graph is built per turn: the memory gate label is decided from the core
//! memory snapshot taken before the turn, and node-level caches (the planner's
//! events prompt) live as long as the compiled graph.

use std::sync::Arc;

use crate::core_memory::{
    CoreMemoryStore, InitializerRoute, MemoryCollectorNode, MemoryCollectorToolsNode,
    MemoryInitializerInterruptNode, MemoryInitializerNode, MemoryOnboardingNode, OnboardingRoute,
    CollectorRoute, MEMORY_COLLECTOR, MEMORY_COLLECTOR_TOOLS, MEMORY_INITIALIZER,
    MEMORY_INITIALIZER_INTERRUPT, MEMORY_ONBOARDING,
};
use crate::docs::{DocsRoute, DocsSearchNode, DOCS};
use crate::graph::{CompilationError, CompiledStateGraph, StateGraph, END, START};
use crate::insights::{
    GeneratorRoute, InsightKind, SchemaGeneratorNode, SchemaGeneratorToolsNode,
    DEFAULT_MAX_GENERATION_ATTEMPTS,
};
use crate::llm::LlmClient;
use crate::memory::Checkpointer;
use crate::prompts::Prompts;
use crate::query_executor::{QueryExecutorNode, QueryRunner, QUERY_EXECUTOR};
use crate::root::{RootNode, RootNodeTools, RootRoute, DEFAULT_MAX_ROOT_TOOL_CALLS, ROOT, ROOT_TOOLS};
use crate::state::AssistantState;
use crate::taxonomy::{
    PlannerRoute, TaxonomyPlannerNode, TaxonomyProvider, TaxonomyToolkit, TaxonomyToolsNode,
    ToolsRoute, DEFAULT_MAX_PARSE_CORRECTIONS,
};
use crate::team::Team;

/// Loop bounds of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSettings {
    /// Consecutive unparseable planner outputs before the turn fails.
    pub max_parse_corrections: usize,
    /// Generator attempts before a failure message is emitted.
    pub max_generation_attempts: usize,
    /// Root delegations per turn.
    pub max_root_tool_calls: u32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_parse_corrections: DEFAULT_MAX_PARSE_CORRECTIONS,
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            max_root_tool_calls: DEFAULT_MAX_ROOT_TOOL_CALLS,
        }
    }
}

/// Collaborators shared by every node of the assistant graph.
///
/// **Interaction**: Used by `Assistant` to build a graph per turn; tests may build
/// and invoke it directly.
#[derive(Clone)]
pub struct AssistantGraph {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    team: Arc<Team>,
    taxonomy: Arc<dyn TaxonomyProvider>,
    query_runner: Arc<dyn QueryRunner>,
    core_memory: Arc<dyn CoreMemoryStore>,
    settings: GraphSettings,
}

impl AssistantGraph {
    pub fn new(
        prompts: Arc<Prompts>,
        llm: Arc<dyn LlmClient>,
        team: Arc<Team>,
        taxonomy: Arc<dyn TaxonomyProvider>,
        query_runner: Arc<dyn QueryRunner>,
        core_memory: Arc<dyn CoreMemoryStore>,
    ) -> Self {
        Self {
            prompts,
            llm,
            team,
            taxonomy,
            query_runner,
            core_memory,
            settings: GraphSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GraphSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn core_memory(&self) -> &Arc<dyn CoreMemoryStore> {
        &self.core_memory
    }

    /// Assembles the turn graph. `run_onboarding` is the memory gate taken at START.
    pub fn build(&self, run_onboarding: bool) -> StateGraph<AssistantState> {
        let graph = self.add_memory(StateGraph::new(), run_onboarding);
        let graph = self.add_root(graph);
        let graph = InsightKind::ALL
            .into_iter()
            .fold(graph, |graph, kind| self.add_insight_family(graph, kind));
        let graph = self.add_docs(graph);
        graph
            .add_node(
                QUERY_EXECUTOR,
                Arc::new(QueryExecutorNode::new(self.prompts.clone(), self.query_runner.clone())),
            )
            .add_edge(QUERY_EXECUTOR, ROOT)
    }

    pub fn compile(
        &self,
        run_onboarding: bool,
        checkpointer: Option<Arc<dyn Checkpointer<AssistantState>>>,
    ) -> Result<CompiledStateGraph<AssistantState>, CompilationError> {
        let graph = self.build(run_onboarding);
        match checkpointer {
            Some(cp) => graph.compile_with_checkpointer(cp),
            None => graph.compile(),
        }
    }

    fn add_memory(
        &self,
        graph: StateGraph<AssistantState>,
        run_onboarding: bool,
    ) -> StateGraph<AssistantState> {
        let onboarding = MemoryOnboardingNode::new(
            self.prompts.clone(),
            self.team.clone(),
            self.core_memory.clone(),
        );
        let initializer = MemoryInitializerNode::new(
            self.prompts.clone(),
            self.llm.clone(),
            self.team.clone(),
            self.core_memory.clone(),
        );
        let interrupt = MemoryInitializerInterruptNode::new(
            self.prompts.clone(),
            self.llm.clone(),
            self.core_memory.clone(),
        );
        let collector =
            MemoryCollectorNode::new(self.prompts.clone(), self.llm.clone(), self.core_memory.clone());
        let collector_tools =
            MemoryCollectorToolsNode::new(self.prompts.clone(), self.core_memory.clone());

        graph
            .add_node(MEMORY_ONBOARDING, Arc::new(onboarding))
            .add_node(MEMORY_INITIALIZER, Arc::new(initializer))
            .add_node(MEMORY_INITIALIZER_INTERRUPT, Arc::new(interrupt))
            .add_node(MEMORY_COLLECTOR, Arc::new(collector))
            .add_node(MEMORY_COLLECTOR_TOOLS, Arc::new(collector_tools))
            .add_conditional_edges(
                START,
                move |_: &AssistantState| Ok(run_onboarding),
                [(true, MEMORY_ONBOARDING), (false, MEMORY_COLLECTOR)],
            )
            .add_conditional_edges(
                MEMORY_ONBOARDING,
                |s: &AssistantState| Ok(MemoryOnboardingNode::router(s)),
                [
                    (OnboardingRoute::Continue, MEMORY_COLLECTOR),
                    (OnboardingRoute::InitializeMemory, MEMORY_INITIALIZER),
                ],
            )
            .add_conditional_edges(
                MEMORY_INITIALIZER,
                |s: &AssistantState| Ok(MemoryInitializerNode::router(s)),
                [
                    (InitializerRoute::Continue, MEMORY_COLLECTOR),
                    (InitializerRoute::Interrupt, MEMORY_INITIALIZER_INTERRUPT),
                ],
            )
            .add_edge(MEMORY_INITIALIZER_INTERRUPT, MEMORY_COLLECTOR)
            .add_conditional_edges(
                MEMORY_COLLECTOR,
                |s: &AssistantState| Ok(MemoryCollectorNode::router(s)),
                [
                    (CollectorRoute::Tools, MEMORY_COLLECTOR_TOOLS),
                    (CollectorRoute::Next, ROOT),
                ],
            )
            .add_edge(MEMORY_COLLECTOR_TOOLS, MEMORY_COLLECTOR)
    }

    fn add_root(&self, graph: StateGraph<AssistantState>) -> StateGraph<AssistantState> {
        let root = RootNode::new(
            self.prompts.clone(),
            self.llm.clone(),
            self.team.clone(),
            self.core_memory.clone(),
        )
        .with_max_tool_calls(self.settings.max_root_tool_calls);
        let trends = InsightKind::Trends.node_ids().planner;
        let funnel = InsightKind::Funnel.node_ids().planner;
        let retention = InsightKind::Retention.node_ids().planner;

        graph
            .add_node(ROOT, Arc::new(root))
            .add_node(ROOT_TOOLS, Arc::new(RootNodeTools::new(self.prompts.clone())))
            .add_edge(ROOT, ROOT_TOOLS)
            .add_conditional_edges(
                ROOT_TOOLS,
                |s: &AssistantState| Ok(RootNodeTools::router(s)),
                [
                    (RootRoute::Trends, trends),
                    (RootRoute::Funnel, funnel),
                    (RootRoute::Retention, retention),
                    (RootRoute::Docs, DOCS),
                    (RootRoute::Root, ROOT),
                    (RootRoute::End, END),
                ],
            )
    }

    /// Planner ⇄ tools, then generator ⇄ tools, then the query executor.
    fn add_insight_family(
        &self,
        graph: StateGraph<AssistantState>,
        kind: InsightKind,
    ) -> StateGraph<AssistantState> {
        let ids = kind.node_ids();
        let toolkit = Arc::new(TaxonomyToolkit::new(self.taxonomy.clone(), &self.team));
        let planner = TaxonomyPlannerNode::new(
            ids.planner,
            self.prompts.insights.family(kind).planner_system.clone(),
            self.prompts.clone(),
            self.llm.clone(),
            toolkit.clone(),
            self.team.clone(),
            self.core_memory.clone(),
        )
        .with_max_parse_corrections(self.settings.max_parse_corrections);
        let planner_tools = TaxonomyToolsNode::new(ids.planner_tools, toolkit, self.prompts.clone());
        let generator = SchemaGeneratorNode::new(ids.generator, kind, self.prompts.clone(), self.llm.clone())
            .with_max_attempts(self.settings.max_generation_attempts);
        let generator_tools = SchemaGeneratorToolsNode::new(ids.generator_tools);

        graph
            .add_node(ids.planner, Arc::new(planner))
            .add_node(ids.planner_tools, Arc::new(planner_tools))
            .add_node(ids.generator, Arc::new(generator))
            .add_node(ids.generator_tools, Arc::new(generator_tools))
            .add_conditional_edges(
                ids.planner,
                TaxonomyPlannerNode::router,
                [(PlannerRoute::Tools, ids.planner_tools)],
            )
            .add_conditional_edges(
                ids.planner_tools,
                |s: &AssistantState| Ok(TaxonomyToolsNode::router(s)),
                [
                    (ToolsRoute::Continue, ids.planner),
                    (ToolsRoute::PlanFound, ids.generator),
                    (ToolsRoute::Root, ROOT),
                ],
            )
            .add_conditional_edges(
                ids.generator,
                |s: &AssistantState| Ok(SchemaGeneratorNode::router(s)),
                [
                    (GeneratorRoute::Tools, ids.generator_tools),
                    (GeneratorRoute::Next, QUERY_EXECUTOR),
                ],
            )
            .add_edge(ids.generator_tools, ids.generator)
    }

    fn add_docs(&self, graph: StateGraph<AssistantState>) -> StateGraph<AssistantState> {
        graph
            .add_node(DOCS, Arc::new(DocsSearchNode::new(self.prompts.clone(), self.llm.clone())))
            .add_conditional_edges(
                DOCS,
                |s: &AssistantState| Ok(DocsSearchNode::router(s)),
                [(DocsRoute::Root, ROOT), (DocsRoute::End, END)],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_memory::InMemoryCoreMemory;
    use crate::llm::MockLlm;
    use crate::query_executor::InMemoryQueryRunner;
    use crate::taxonomy::InMemoryTaxonomy;

    fn assistant_graph() -> AssistantGraph {
        AssistantGraph::new(
            Arc::new(Prompts::embedded().unwrap()),
            Arc::new(MockLlm::new()),
            Arc::new(Team::default()),
            Arc::new(InMemoryTaxonomy::default()),
            Arc::new(InMemoryQueryRunner::default()),
            Arc::new(InMemoryCoreMemory::new()),
        )
    }

    /// **Scenario**: The full turn graph compiles with either memory gate value.
    #[test]
    fn full_graph_compiles() {
        assert!(assistant_graph().compile(true, None).is_ok());
        assert!(assistant_graph().compile(false, None).is_ok());
    }

    /// **Scenario**: Settings override the loop bounds without affecting assembly.
    #[test]
    fn settings_are_applied() {
        let settings = GraphSettings {
            max_parse_corrections: 1,
            max_generation_attempts: 1,
            max_root_tool_calls: 1,
        };
        let graph = assistant_graph().with_settings(settings);
        assert_eq!(graph.settings, settings);
        assert!(graph.compile(false, None).is_ok());
    }
}
