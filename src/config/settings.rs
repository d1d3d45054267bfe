use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_STORAGE_DIR: &str = ".crew";
pub const DEFAULT_TRAINED_AGENTS_FILE: &str = "trained_agents_data.json";
pub const DEFAULT_TRAINING_DATA_FILE: &str = "training_data.json";
pub const TASK_OUTPUTS_DB: &str = "latest_kickoff_task_outputs.db";

/// Runtime settings, read from the environment (after `.env` is loaded)
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `MODEL`: model identifier, e.g. `ollama/llama3.1` or `gpt-4o-mini`
    pub model: String,
    /// `API_BASE`: base URL of the model server
    pub api_base: Option<String>,
    /// `API_KEY`, falling back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    pub config_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub trained_agents_file: PathBuf,
    pub training_data_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
            api_key: None,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            trained_agents_file: PathBuf::from(DEFAULT_TRAINED_AGENTS_FILE),
            training_data_file: PathBuf::from(DEFAULT_TRAINING_DATA_FILE),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            model: get("MODEL").unwrap_or(defaults.model),
            api_base: get("API_BASE"),
            api_key: get("API_KEY").or_else(|| get("OPENAI_API_KEY")),
            config_dir: get("CREW_CONFIG_DIR").map(PathBuf::from).unwrap_or(defaults.config_dir),
            storage_dir: get("CREW_STORAGE_DIR").map(PathBuf::from).unwrap_or(defaults.storage_dir),
            trained_agents_file: get("TRAINED_AGENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.trained_agents_file),
            training_data_file: get("TRAINING_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.training_data_file),
        }
    }

    pub fn task_outputs_db(&self) -> PathBuf {
        self.storage_dir.join(TASK_OUTPUTS_DB)
    }
}
