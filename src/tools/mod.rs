pub mod delegation;

pub use delegation::{delegation_tools, AskQuestionTool, DelegateWorkTool, SharedAgent};

use async_trait::async_trait;

use crate::llm::ToolDefinition;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Execution(String),
}

/// A function the model may call while working on a task
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> String;
    /// JSON schema of the argument object
    fn parameters(&self) -> serde_json::Value;
    async fn run(&self, arguments: serde_json::Value) -> Result<String, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }
}
