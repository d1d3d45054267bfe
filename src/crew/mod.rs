pub mod crew;
pub mod crew_output;
pub mod evaluator;
pub mod execution;
pub mod feedback;
pub mod replay;
pub mod training;

#[cfg(test)]
mod tests;

pub use crew::{Crew, Process};
pub use crew_output::{CrewOutput, TaskOutput, UsageMetrics};
pub use evaluator::{CrewEvaluator, EvaluationReport, TaskEvaluation};
pub use feedback::{FeedbackSource, StdinFeedback};
pub use training::{TrainedAgentData, TrainedAgentSuggestions, TrainingData, TrainingEntry};

use crate::agent::AgentError;
use crate::llm::LlmError;
use crate::storage::StorageError;
use crate::task::InterpolationError;

/// Crate-level error for crew assembly and execution
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid definitions: {0}")]
    Definitions(#[from] ::config::ConfigError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("Crew validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Task with id {0} not found in the crew's tasks")]
    TaskNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Feedback error: {0}")]
    Feedback(String),
}
