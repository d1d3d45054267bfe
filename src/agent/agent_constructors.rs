use std::sync::Arc;

use crate::agent::agent::{Agent, AgentModelConfig, DEFAULT_MAX_ITER};
use crate::agent::output_handler::OutputHandler;
use crate::agent::provider::ProviderFactory;
use crate::agent::role::AgentRole;
use crate::agent::state::AgentState;
use crate::config::AgentDefinition;
use crate::llm::{LlmError, LlmProvider};

impl Agent {
    /// Create a new basic Agent bound to an LLM client
    pub fn new(role: AgentRole, llm_config: AgentModelConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: None,
            template: role.clone(),
            role,
            allow_delegation: false,
            max_iter: DEFAULT_MAX_ITER,
            llm_config,
            tools: Vec::new(),
            trained_suggestions: Vec::new(),
            state: AgentState::new(),
            output_handler: OutputHandler::new(),
            provider,
        }
    }

    /// Create an Agent from a YAML definition, building its client with `factory`
    pub fn from_definition(
        definition: &AgentDefinition,
        llm_config: AgentModelConfig,
        factory: &dyn ProviderFactory,
    ) -> Result<Self, LlmError> {
        let provider = factory.create(&llm_config.llm_config)?;
        let role = AgentRole::new(
            definition.role.clone(),
            definition.goal.clone(),
            definition.backstory.clone(),
        );

        let mut agent = Self::new(role, llm_config, provider).with_delegation(definition.allow_delegation);
        if let Some(max_iter) = definition.max_iter {
            agent = agent.with_max_iter(max_iter);
        }
        Ok(agent)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_delegation(mut self, allow_delegation: bool) -> Self {
        self.allow_delegation = allow_delegation;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn crate::tools::Tool>>) -> Self {
        self.tools = tools;
        self
    }
}
