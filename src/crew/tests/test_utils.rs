use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::agent::{Agent, AgentRole};
use crate::crew::{Crew, Process};
use crate::llm::{CompletionResponse, LlmToolCall};
use crate::task::{Inputs, OutputFormat, Task};
use crate::test_utils::{test_model_config, ScriptedProvider};

pub const MANAGER: &str = "AI LLMs Research Manager";
pub const RESEARCHER: &str = "AI LLMs Senior Data Researcher";
pub const ANALYST: &str = "AI LLMs Reporting Analyst";

pub fn inputs() -> Inputs {
    Inputs::from([
        ("topic".to_string(), "AI LLMs".to_string()),
        ("current_year".to_string(), "2026".to_string()),
    ])
}

/// Agent whose role and goal mention `{topic}`
pub fn templated_agent(role: &str, provider: &ScriptedProvider) -> Agent {
    Agent::new(
        AgentRole::new(
            format!("{{topic}} {}", role),
            "Explore {topic}".to_string(),
            format!("A seasoned {}", role.to_lowercase()),
        ),
        test_model_config(),
        Arc::new(provider.clone()),
    )
}

pub fn research_task() -> Task {
    Task::new(
        "Conduct a thorough research about {topic} in {current_year}".to_string(),
        "A list with 10 bullet points of the most relevant information about {topic}".to_string(),
    )
    .with_name("research_task")
    .with_agent("researcher")
}

pub fn reporting_task(output_file: &Path) -> Task {
    Task::new(
        "Expand each topic of the research on {topic} into a full section".to_string(),
        "A fully fledged report formatted as markdown".to_string(),
    )
    .with_name("reporting_task")
    .with_agent("reporting_analyst")
    .with_output_file(output_file.display().to_string())
    .with_output_format(OutputFormat::Markdown)
}

pub struct HierarchicalFixture {
    pub crew: Crew,
    pub manager: ScriptedProvider,
    pub researcher: ScriptedProvider,
    pub analyst: ScriptedProvider,
}

pub fn hierarchical_crew(
    output_file: &Path,
    manager: ScriptedProvider,
    researcher: ScriptedProvider,
    analyst: ScriptedProvider,
) -> HierarchicalFixture {
    let crew = Crew::new(
        vec![
            templated_agent("Senior Data Researcher", &researcher).with_name("researcher"),
            templated_agent("Reporting Analyst", &analyst).with_name("reporting_analyst"),
        ],
        vec![research_task(), reporting_task(output_file)],
        Process::Hierarchical,
    )
    .with_manager(templated_agent("Research Manager", &manager).with_name("manager").with_delegation(true));

    HierarchicalFixture {
        crew,
        manager,
        researcher,
        analyst,
    }
}

pub fn delegate_call(coworker: &str, task: &str) -> CompletionResponse {
    CompletionResponse::tool_calls(vec![LlmToolCall::new(
        "call_1",
        "delegate_work_to_coworker",
        json!({"task": task, "context": "We are writing a report", "coworker": coworker}).to_string(),
    )])
}

/// Text of the task prompt of the `n`th request
pub fn task_prompt(provider: &ScriptedProvider, n: usize) -> String {
    provider.requests()[n].messages[1].content.clone().unwrap_or_default()
}
