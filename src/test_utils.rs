//! Scripted stand-ins for the network and the terminal used across unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::agent::{Agent, AgentModelConfig, AgentRole, LlmConfig, Provider, ProviderFactory};
use crate::crew::{CrewError, FeedbackSource, TaskOutput};
use crate::llm::{CompletionRequest, CompletionResponse, LlmError, LlmProvider};
use crate::task::Task;
use crate::tools::{Tool, ToolError};

enum Fallback {
    Nothing,
    Message(String),
    Error(String),
}

struct ScriptedState {
    responses: VecDeque<Result<CompletionResponse, LlmError>>,
    requests: Vec<CompletionRequest>,
}

/// LLM provider replaying a fixed script and recording every request
#[derive(Clone)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptedState>>,
    fallback: Arc<Fallback>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
        Self::build(responses, Fallback::Nothing)
    }

    /// Once the script runs out, answer every request with `message`
    pub fn with_fallback(responses: Vec<Result<CompletionResponse, LlmError>>, message: &str) -> Self {
        Self::build(responses, Fallback::Message(message.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::build(vec![], Fallback::Error(message.to_string()))
    }

    fn build(responses: Vec<Result<CompletionResponse, LlmError>>, fallback: Fallback) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                responses: responses.into(),
                requests: Vec::new(),
            })),
            fallback: Arc::new(fallback),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        match state.responses.pop_front() {
            Some(response) => response,
            None => match self.fallback.as_ref() {
                Fallback::Nothing => Err(LlmError::EmptyResponse),
                Fallback::Message(message) => Ok(CompletionResponse::message(message.clone())),
                Fallback::Error(message) => Err(LlmError::ApiError {
                    status: 500,
                    message: message.clone(),
                }),
            },
        }
    }
}

/// Hands out queued providers in creation order, then the default one
pub struct ScriptedProviderFactory {
    queued: Mutex<VecDeque<ScriptedProvider>>,
    default: ScriptedProvider,
    pub configs: Mutex<Vec<LlmConfig>>,
}

impl ScriptedProviderFactory {
    pub fn new(default: ScriptedProvider) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default,
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, provider: ScriptedProvider) -> Self {
        self.queued.lock().unwrap().push_back(provider);
        self
    }
}

impl ProviderFactory for ScriptedProviderFactory {
    fn create(&self, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        self.configs.lock().unwrap().push(config.clone());
        let provider = self.queued.lock().unwrap().pop_front().unwrap_or_else(|| self.default.clone());
        Ok(Arc::new(provider))
    }
}

pub fn test_model_config() -> AgentModelConfig {
    AgentModelConfig::new(LlmConfig::new(Provider::OpenAI, None), "test-model".to_string(), None, None)
}

/// Agent named `role` whose goal and backstory derive from the role name
pub fn scripted_agent(role: &str, provider: ScriptedProvider) -> Agent {
    Agent::new(
        AgentRole::new(role.to_string(), format!("{} goal", role), format!("{} backstory", role)),
        test_model_config(),
        Arc::new(provider),
    )
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> String {
        "Echo the given text".to_string()
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn run(&self, arguments: Value) -> Result<String, ToolError> {
        Ok(format!("echo: {}", arguments["text"].as_str().unwrap_or_default()))
    }
}

/// Feedback source answering from a fixed list, then with empty feedback
pub struct ScriptedFeedback {
    answers: Mutex<VecDeque<String>>,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedFeedback {
    pub fn new(answers: Vec<&str>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(String::from).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FeedbackSource for ScriptedFeedback {
    async fn collect(&self, _task: &Task, output: &TaskOutput) -> Result<String, CrewError> {
        self.seen.lock().unwrap().push(output.raw.clone());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}
