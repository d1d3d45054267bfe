use serde::{Deserialize, Serialize};

use crate::task::interpolation::{interpolate, Inputs, InterpolationError};

/// Who an agent is: the role it plays, what it is after and where it comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRole {
    /// Name of the role, e.g. "AI LLMs Senior Data Researcher"
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl AgentRole {
    pub fn new(role: String, goal: String, backstory: String) -> Self {
        Self { role, goal, backstory }
    }

    pub fn interpolate(&self, inputs: &Inputs) -> Result<AgentRole, InterpolationError> {
        Ok(AgentRole {
            role: interpolate(&self.role, inputs)?,
            goal: interpolate(&self.goal, inputs)?,
            backstory: interpolate(&self.backstory, inputs)?,
        })
    }

    /// Case-insensitive role comparison used for coworker and trained-data lookup
    pub fn matches(&self, name: &str) -> bool {
        normalize_role(&self.role) == normalize_role(name)
    }
}

pub fn normalize_role(name: &str) -> String {
    name.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}
