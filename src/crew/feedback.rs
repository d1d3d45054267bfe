use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{CrewError, TaskOutput};
use crate::task::Task;

/// Where human feedback comes from during training
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Feedback on `output`; an empty string means the output is accepted as is
    async fn collect(&self, task: &Task, output: &TaskOutput) -> Result<String, CrewError>;
}

/// Prompts on stdout and reads one line from stdin
pub struct StdinFeedback;

#[async_trait]
impl FeedbackSource for StdinFeedback {
    async fn collect(&self, task: &Task, output: &TaskOutput) -> Result<String, CrewError> {
        let prompt = format!(
            "\n## Result of task '{}' by {}:\n{}\n\n\
             Provide feedback on the final result. This will be used to improve the agent's next attempt \
             (leave empty to accept):\n> ",
            task.summary(),
            output.agent,
            output.raw
        );

        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(CrewError::Feedback("stdin closed while waiting for feedback".to_string()));
        }
        Ok(line.trim().to_string())
    }
}
