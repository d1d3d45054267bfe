pub mod openai;
pub mod types;

pub use openai::OpenAiCompatibleProvider;
pub use types::*;

use async_trait::async_trait;

/// Chat completion backend bound to an agent
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
