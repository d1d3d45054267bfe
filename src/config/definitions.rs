use ::config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::crew::CrewError;

const DEFAULT_AGENTS_YAML: &str = include_str!("../../config/agents.yaml");
const DEFAULT_TASKS_YAML: &str = include_str!("../../config/tasks.yaml");

/// Entry of `agents.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub allow_delegation: bool,
    #[serde(default)]
    pub max_iter: Option<usize>,
}

/// Entry of `tasks.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskDefinition {
    pub description: String,
    pub expected_output: String,
    /// Key of the agent definition that owns the task
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
}

/// Agent and task definitions, keyed by name
#[derive(Debug, Clone)]
pub struct CrewDefinitions {
    pub agents: HashMap<String, AgentDefinition>,
    pub tasks: HashMap<String, TaskDefinition>,
}

impl CrewDefinitions {
    /// Load `agents.yaml` and `tasks.yaml` from `config_dir`, using the
    /// built-in copies for any file that is missing
    pub fn load(config_dir: &Path) -> Result<Self, CrewError> {
        let agents = read_or_default(&config_dir.join("agents.yaml"), DEFAULT_AGENTS_YAML)?;
        let tasks = read_or_default(&config_dir.join("tasks.yaml"), DEFAULT_TASKS_YAML)?;
        Self::from_yaml(&agents, &tasks)
    }

    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, CrewError> {
        let mut agents: HashMap<String, AgentDefinition> = parse_yaml(agents_yaml)?;
        let mut tasks: HashMap<String, TaskDefinition> = parse_yaml(tasks_yaml)?;

        // Folded YAML scalars keep a trailing newline
        for agent in agents.values_mut() {
            agent.role = agent.role.trim().to_string();
            agent.goal = agent.goal.trim().to_string();
            agent.backstory = agent.backstory.trim().to_string();
        }
        for task in tasks.values_mut() {
            task.description = task.description.trim().to_string();
            task.expected_output = task.expected_output.trim().to_string();
            task.agent = task.agent.take().map(|a| a.trim().to_string());
        }

        Ok(Self { agents, tasks })
    }

    pub fn agent(&self, key: &str) -> Result<&AgentDefinition, CrewError> {
        self.agents
            .get(key)
            .ok_or_else(|| CrewError::Config(format!("agent definition '{}' not found in agents.yaml", key)))
    }

    pub fn task(&self, key: &str) -> Result<&TaskDefinition, CrewError> {
        self.tasks
            .get(key)
            .ok_or_else(|| CrewError::Config(format!("task definition '{}' not found in tasks.yaml", key)))
    }
}

fn read_or_default(path: &Path, default: &str) -> Result<String, CrewError> {
    if path.exists() {
        debug!(path = %path.display(), "loading definitions");
        Ok(std::fs::read_to_string(path)?)
    } else {
        debug!(path = %path.display(), "definitions file not found, using built-in copy");
        Ok(default.to_string())
    }
}

fn parse_yaml<T: DeserializeOwned>(source: &str) -> Result<T, CrewError> {
    let parsed = Config::builder()
        .add_source(File::from_str(source, FileFormat::Yaml))
        .build()?
        .try_deserialize()?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_definitions() {
        let definitions = CrewDefinitions::from_yaml(DEFAULT_AGENTS_YAML, DEFAULT_TASKS_YAML).unwrap();

        let researcher = definitions.agent("researcher").unwrap();
        assert_eq!(researcher.role, "{topic} Senior Data Researcher");
        assert!(!researcher.allow_delegation);
        assert!(definitions.agent("manager").unwrap().allow_delegation);
        assert!(definitions.agent("reporting_analyst").is_ok());

        let research = definitions.task("research_task").unwrap();
        assert!(research.description.contains("{current_year}"));
        assert_eq!(research.agent.as_deref(), Some("researcher"));
        assert!(definitions.task("reporting_task").is_ok());
    }

    #[test]
    fn test_missing_key_names_it() {
        let definitions = CrewDefinitions::from_yaml(DEFAULT_AGENTS_YAML, DEFAULT_TASKS_YAML).unwrap();
        let err = definitions.agent("writer").unwrap_err();
        assert!(err.to_string().contains("'writer'"));
    }

    #[test]
    fn test_load_prefers_files_in_config_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("agents.yaml"),
            "researcher:\n  role: Analyst of {topic}\n  goal: Dig\n  backstory: Curious\n  max_iter: 5\n",
        )
        .unwrap();

        let definitions = CrewDefinitions::load(dir.path()).unwrap();
        let researcher = definitions.agent("researcher").unwrap();
        assert_eq!(researcher.role, "Analyst of {topic}");
        assert_eq!(researcher.max_iter, Some(5));
        assert!(definitions.agent("manager").is_err());
        // tasks.yaml absent: built-in tasks
        assert!(definitions.task("reporting_task").is_ok());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(CrewDefinitions::from_yaml("researcher: [unclosed", "").is_err());
    }
}
