//! The research crew: two specialists led by a research manager.

use std::sync::Arc;
use tracing::info;

use crate::agent::{Agent, AgentModelConfig, HttpProviderFactory, ProviderFactory};
use crate::config::{CrewDefinitions, Settings};
use crate::crew::{Crew, CrewError, Process};
use crate::storage::KickoffTaskOutputsStorage;
use crate::task::{OutputFormat, Task};

pub const REPORT_FILE: &str = "report.md";

pub struct LatestAiDevelopment {
    settings: Settings,
    definitions: CrewDefinitions,
    provider_factory: Arc<dyn ProviderFactory>,
}

impl LatestAiDevelopment {
    /// Load agent and task definitions from the configured directory
    pub fn new(settings: Settings) -> Result<Self, CrewError> {
        let definitions = CrewDefinitions::load(&settings.config_dir)?;
        Ok(Self::with_definitions(settings, definitions))
    }

    pub fn with_definitions(settings: Settings, definitions: CrewDefinitions) -> Self {
        Self {
            settings,
            definitions,
            provider_factory: Arc::new(HttpProviderFactory),
        }
    }

    pub fn with_provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.provider_factory = factory;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn model_config(&self) -> AgentModelConfig {
        AgentModelConfig::from_model_id(
            &self.settings.model,
            self.settings.api_base.clone(),
            self.settings.api_key.clone(),
        )
    }

    fn agent(&self, key: &str) -> Result<Agent, CrewError> {
        let definition = self.definitions.agent(key)?;
        let agent = Agent::from_definition(definition, self.model_config(), self.provider_factory.as_ref())?;
        Ok(agent.with_name(key))
    }

    fn task(&self, key: &str) -> Result<Task, CrewError> {
        let definition = self.definitions.task(key)?;
        let mut task = Task::new(definition.description.clone(), definition.expected_output.clone()).with_name(key);
        if let Some(agent) = &definition.agent {
            task = task.with_agent(agent.clone());
        }
        if let Some(output_file) = &definition.output_file {
            task = task.with_output_file(output_file.clone());
        }
        Ok(task)
    }

    pub fn researcher(&self) -> Result<Agent, CrewError> {
        self.agent("researcher")
    }

    pub fn reporting_analyst(&self) -> Result<Agent, CrewError> {
        self.agent("reporting_analyst")
    }

    pub fn manager(&self) -> Result<Agent, CrewError> {
        Ok(self.agent("manager")?.with_delegation(true))
    }

    pub fn research_task(&self) -> Result<Task, CrewError> {
        self.task("research_task")
    }

    pub fn reporting_task(&self) -> Result<Task, CrewError> {
        Ok(self
            .task("reporting_task")?
            .with_output_file(REPORT_FILE)
            .with_output_format(OutputFormat::Markdown))
    }

    /// Hierarchical crew with the task output log opened under the storage directory
    pub async fn crew(&self) -> Result<Crew, CrewError> {
        let storage = KickoffTaskOutputsStorage::open(&self.settings.task_outputs_db()).await?;
        info!(model = %self.settings.model, "assembling crew");

        Ok(Crew::new(
            vec![self.researcher()?, self.reporting_analyst()?],
            vec![self.research_task()?, self.reporting_task()?],
            Process::Hierarchical,
        )
        .with_manager(self.manager()?)
        .with_storage(storage)
        .with_provider_factory(self.provider_factory.clone())
        .with_llm_defaults(self.settings.api_base.clone(), self.settings.api_key.clone())
        .with_trained_agents_file(&self.settings.trained_agents_file)
        .with_training_data_file(&self.settings.training_data_file))
    }
}
