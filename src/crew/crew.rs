use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::feedback::{FeedbackSource, StdinFeedback};
use super::{CrewError, UsageMetrics};
use crate::agent::{Agent, AgentModelConfig, HttpProviderFactory, ProviderFactory};
use crate::config::settings::DEFAULT_TRAINING_DATA_FILE;
use crate::storage::{KickoffTaskOutputsStorage, StoredTaskOutput};
use crate::task::Task;
use crate::tools::SharedAgent;

/// How tasks are assigned to agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    /// Each task runs on its assigned agent, in order
    Sequential,
    /// A manager agent runs every task and delegates to the crew agents
    Hierarchical,
}

/// Agents and tasks executed together
pub struct Crew {
    pub agents: Vec<SharedAgent>,
    pub tasks: Vec<Task>,
    pub process: Process,
    pub(crate) manager: Option<SharedAgent>,
    pub(crate) storage: Option<KickoffTaskOutputsStorage>,
    pub(crate) provider_factory: Arc<dyn ProviderFactory>,
    pub(crate) api_base: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) trained_agents_file: Option<PathBuf>,
    pub(crate) training_data_file: PathBuf,
    pub(crate) feedback: Arc<dyn FeedbackSource>,
    /// Usage accumulated over every kickoff of this crew
    pub usage_metrics: UsageMetrics,
}

impl Crew {
    pub fn new(agents: Vec<Agent>, tasks: Vec<Task>, process: Process) -> Self {
        Self {
            agents: agents.into_iter().map(|a| Arc::new(Mutex::new(a))).collect(),
            tasks,
            process,
            manager: None,
            storage: None,
            provider_factory: Arc::new(HttpProviderFactory),
            api_base: None,
            api_key: None,
            trained_agents_file: None,
            training_data_file: PathBuf::from(DEFAULT_TRAINING_DATA_FILE),
            feedback: Arc::new(StdinFeedback),
            usage_metrics: UsageMetrics::default(),
        }
    }

    pub fn with_manager(mut self, manager: Agent) -> Self {
        self.manager = Some(Arc::new(Mutex::new(manager)));
        self
    }

    pub fn with_storage(mut self, storage: KickoffTaskOutputsStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Factory used for evaluator agents bound to other models
    pub fn with_provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.provider_factory = factory;
        self
    }

    /// `API_BASE` and key applied when resolving evaluator models
    pub fn with_llm_defaults(mut self, api_base: Option<String>, api_key: Option<String>) -> Self {
        self.api_base = api_base;
        self.api_key = api_key;
        self
    }

    pub fn with_trained_agents_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.trained_agents_file = Some(path.into());
        self
    }

    pub fn with_training_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.training_data_file = path.into();
        self
    }

    pub fn with_feedback_source(mut self, feedback: Arc<dyn FeedbackSource>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn manager(&self) -> Option<&SharedAgent> {
        self.manager.as_ref()
    }

    /// Check the crew can run under its process
    pub async fn validate(&self) -> Result<(), CrewError> {
        if self.tasks.is_empty() {
            return Err(CrewError::Validation("the crew has no tasks".to_string()));
        }

        match self.process {
            Process::Hierarchical => {
                let manager = self.manager.as_ref().ok_or_else(|| {
                    CrewError::Validation("a hierarchical crew requires a manager agent".to_string())
                })?;
                let manager_role = manager.lock().await.role.role.clone();
                for agent in &self.agents {
                    if Arc::ptr_eq(agent, manager) || agent.lock().await.role.matches(&manager_role) {
                        return Err(CrewError::Validation(format!(
                            "manager agent '{}' must not be part of the crew agents",
                            manager_role
                        )));
                    }
                }
            }
            Process::Sequential => {
                for task in &self.tasks {
                    let assigned = task.agent.as_deref().ok_or_else(|| {
                        CrewError::Validation(format!("task '{}' has no agent assigned", task.summary()))
                    })?;
                    if self.find_agent(assigned).await.is_none() {
                        return Err(CrewError::Validation(format!(
                            "agent '{}' assigned to task '{}' is not part of the crew",
                            assigned,
                            task.summary()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) async fn find_agent(&self, name: &str) -> Option<SharedAgent> {
        for agent in &self.agents {
            if agent.lock().await.answers_to(name) {
                return Some(Arc::clone(agent));
            }
        }
        None
    }

    /// Agent that executes `task` under the crew's process
    pub(crate) async fn executing_agent(&self, task: &Task) -> Result<SharedAgent, CrewError> {
        match self.process {
            Process::Hierarchical => self
                .manager
                .clone()
                .ok_or_else(|| CrewError::Validation("a hierarchical crew requires a manager agent".to_string())),
            Process::Sequential => {
                let assigned = task.agent.as_deref().unwrap_or_default();
                self.find_agent(assigned).await.ok_or_else(|| {
                    CrewError::Validation(format!("agent '{}' is not part of the crew", assigned))
                })
            }
        }
    }

    /// Model config and client of an evaluator bound to `model_id`
    pub(crate) fn evaluator_agent(&self, model_id: &str, role: crate::agent::AgentRole) -> Result<Agent, CrewError> {
        let config = AgentModelConfig::from_model_id(model_id, self.api_base.clone(), self.api_key.clone());
        let provider = self.provider_factory.create(&config.llm_config)?;
        Ok(Agent::new(role, config, provider))
    }

    /// Rows of the latest kickoff's task output log
    pub async fn stored_task_outputs(&self) -> Result<Vec<StoredTaskOutput>, CrewError> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            CrewError::Config("no task output log is configured for this crew".to_string())
        })?;
        Ok(storage.load().await?)
    }
}

impl std::fmt::Debug for Crew {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crew")
            .field("agents", &self.agents.len())
            .field("tasks", &self.tasks.len())
            .field("process", &self.process)
            .field("has_manager", &self.manager.is_some())
            .field("usage_metrics", &self.usage_metrics)
            .finish()
    }
}
