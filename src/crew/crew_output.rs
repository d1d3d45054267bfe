use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentResponse;
use crate::task::Task;

/// Result of one task within a kickoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub name: Option<String>,
    pub description: String,
    pub expected_output: String,
    pub raw: String,
    /// Role of the agent that produced the output
    pub agent: String,
    pub summary: String,
    /// Parsed output when the task asks for JSON
    pub json: Option<Value>,
}

impl TaskOutput {
    pub fn new(task: &Task, agent: impl Into<String>, raw: String) -> Self {
        let json = if task.output_format.is_json() {
            serde_json::from_str(&raw).ok()
        } else {
            None
        };

        Self {
            task_id: task.id.clone(),
            name: task.name.clone(),
            description: task.description.clone(),
            expected_output: task.expected_output.clone(),
            raw,
            agent: agent.into(),
            summary: task.summary(),
            json,
        }
    }
}

/// Token and request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub successful_requests: u64,
}

impl UsageMetrics {
    pub fn add_response(&mut self, response: &AgentResponse) {
        self.prompt_tokens += response.input_tokens as u64;
        self.completion_tokens += response.output_tokens as u64;
        self.total_tokens += response.total_tokens as u64;
        self.successful_requests += response.requests as u64;
    }

    pub fn add(&mut self, other: &UsageMetrics) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.successful_requests += other.successful_requests;
    }
}

/// Result of a kickoff or replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Raw output of the last task
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub token_usage: UsageMetrics,
}

impl CrewOutput {
    pub fn new(tasks_output: Vec<TaskOutput>, token_usage: UsageMetrics) -> Self {
        let raw = tasks_output.last().map(|o| o.raw.clone()).unwrap_or_default();
        Self {
            raw,
            tasks_output,
            token_usage,
        }
    }
}

impl std::fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::JsonFieldType;

    #[test]
    fn test_task_output_parses_json_tasks_only() {
        let json_task = Task::new_simple_json(
            "Score the report".to_string(),
            "A score".to_string(),
            vec![("quality".to_string(), JsonFieldType::Number)],
            true,
        );
        let output = TaskOutput::new(&json_task, "Evaluator", r#"{"quality": 8}"#.to_string());
        assert_eq!(output.json.unwrap()["quality"], 8);

        let text_task = Task::new("Write the report".to_string(), "A report".to_string());
        let output = TaskOutput::new(&text_task, "Analyst", r#"{"quality": 8}"#.to_string());
        assert!(output.json.is_none());
        assert_eq!(output.summary, "Write the report...");
    }

    #[test]
    fn test_crew_output_raw_is_last_task() {
        let task = Task::new("A".to_string(), "B".to_string());
        let first = TaskOutput::new(&task, "x", "first".to_string());
        let last = TaskOutput::new(&task, "x", "last".to_string());

        let output = CrewOutput::new(vec![first, last], UsageMetrics::default());
        assert_eq!(output.raw, "last");
        assert_eq!(output.to_string(), "last");
        assert_eq!(CrewOutput::new(vec![], UsageMetrics::default()).raw, "");
    }
}
