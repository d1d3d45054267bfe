use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agent::output_handler::OutputHandler;
use crate::agent::provider::{LlmConfig, Provider};
use crate::agent::role::{normalize_role, AgentRole};
use crate::agent::state::AgentState;
use crate::llm::LlmProvider;
use crate::tools::Tool;

/// Default number of tool rounds before the agent is pushed for a final answer
pub const DEFAULT_MAX_ITER: usize = 20;

/// Core Agent structure
#[derive(Clone)]
pub struct Agent {
    pub id: String,
    /// Definition key, e.g. `researcher`
    pub name: Option<String>,

    /// Role as rendered with the current kickoff inputs
    pub role: AgentRole,
    pub(crate) template: AgentRole,
    pub allow_delegation: bool,
    pub max_iter: usize,

    pub llm_config: AgentModelConfig,
    pub tools: Vec<Arc<dyn Tool>>,

    /// Instructions distilled from training runs
    pub trained_suggestions: Vec<String>,

    pub state: AgentState,
    pub output_handler: OutputHandler,

    pub provider: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role.role)
            .field("allow_delegation", &self.allow_delegation)
            .field("model", &self.llm_config.model_name)
            .field("tools", &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// LLM Configuration for agents
#[derive(Debug, Clone)]
pub struct AgentModelConfig {
    pub model_name: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub llm_config: LlmConfig,
}

impl AgentModelConfig {
    pub fn new(llm_config: LlmConfig, model_name: String, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            model_name,
            temperature,
            max_tokens,
            llm_config,
        }
    }

    /// Resolve a `MODEL`-style identifier against an optional `API_BASE`
    pub fn from_model_id(model_id: &str, api_base: Option<String>, api_key: Option<String>) -> Self {
        let (provider, model_name) = Provider::parse_model_id(model_id, api_base.as_deref());
        let llm_config = match api_base {
            Some(base) => LlmConfig::new_with_base_url(provider, api_key, base),
            None => LlmConfig::new(provider, api_key),
        };
        Self::new(llm_config, model_name, None, None)
    }
}

/// Agent error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LLMError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Agent did not produce a final answer after {0} tool iterations")]
    MaxIterationsExceeded(usize),
}

/// Detailed information about a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    /// Parameters passed to the tool (as JSON string)
    pub parameters: String,
    pub result: String,
    pub execution_time_ms: u64,
    pub error: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: String, parameters: String, result: String, execution_time_ms: u64) -> Self {
        Self {
            tool_name,
            parameters,
            result,
            execution_time_ms,
            error: None,
        }
    }

    pub fn with_error(tool_name: String, parameters: String, error: String, execution_time_ms: u64) -> Self {
        Self {
            tool_name,
            parameters,
            result: String::new(),
            execution_time_ms,
            error: Some(error),
        }
    }
}

/// Agent Response with execution metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The actual response content from the agent
    pub content: String,
    pub success: bool,
    pub execution_time_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    /// Number of completion requests made
    pub requests: u32,
    pub tools_used: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
    pub model_used: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Everything an execution run produced besides timing
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub requests: u32,
    pub tools_used: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentResponse {
    pub fn success(outcome: ExecutionOutcome, execution_time_ms: u64, model_used: String) -> Self {
        Self {
            content: outcome.content,
            success: true,
            execution_time_ms,
            input_tokens: outcome.input_tokens,
            output_tokens: outcome.output_tokens,
            total_tokens: outcome.input_tokens + outcome.output_tokens,
            requests: outcome.requests,
            tools_used: outcome.tools_used,
            tool_calls: outcome.tool_calls,
            model_used,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: String, execution_time_ms: u64, model_used: String) -> Self {
        Self {
            content: String::new(),
            success: false,
            execution_time_ms,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            requests: 0,
            tools_used: Vec::new(),
            tool_calls: Vec::new(),
            model_used,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Total time spent inside tools, delegated coworker runs included
    pub fn tool_execution_time_ms(&self) -> u64 {
        self.tool_calls.iter().map(|tc| tc.execution_time_ms).sum()
    }
}

impl Agent {
    pub fn template(&self) -> &AgentRole {
        &self.template
    }

    /// Whether `name` refers to this agent, by definition key or by role
    pub fn answers_to(&self, name: &str) -> bool {
        let key_matches = self
            .name
            .as_deref()
            .is_some_and(|key| normalize_role(key) == normalize_role(name));
        key_matches || self.role.matches(name) || self.template.matches(name)
    }
}
