//! Coworker tools handed to agents allowed to delegate.
//!
//! In a hierarchical crew the manager holds both tools over every crew agent;
//! the coworker runs a fresh task built from the tool arguments.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{Tool, ToolError};
use crate::agent::Agent;
use crate::task::Task;

pub type SharedAgent = Arc<Mutex<Agent>>;

const MANAGER_REQUEST: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

#[derive(Clone)]
struct Coworker {
    role: String,
    agent: SharedAgent,
}

#[derive(Clone)]
struct Coworkers(Vec<Coworker>);

impl Coworkers {
    fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.role.as_str()).collect()
    }

    fn find(&self, name: &str) -> Result<&Coworker, ToolError> {
        let wanted = crate::agent::normalize_role(name);
        self.0
            .iter()
            .find(|c| crate::agent::normalize_role(&c.role) == wanted)
            .ok_or_else(|| {
                let options: Vec<String> = self.names().iter().map(|n| format!("- {}", n)).collect();
                ToolError::Execution(format!(
                    "Coworker mentioned not found, it must be one of the following options:\n{}",
                    options.join("\n")
                ))
            })
    }

    /// Run `request` on the named coworker and return its answer
    async fn execute(&self, coworker: &str, request: String, context: &str) -> Result<String, ToolError> {
        let coworker = self.find(coworker)?;
        info!(coworker = %coworker.role, "delegating to coworker");

        let task = Task::new(request, MANAGER_REQUEST.to_string());
        // A coworker that is itself mid-task (delegating back) cannot be re-entered
        let mut agent = coworker.agent.try_lock().map_err(|_| {
            ToolError::Execution(format!(
                "Coworker {} is busy with another task, try a different coworker",
                coworker.role
            ))
        })?;
        let context = Some(context).filter(|c| !c.trim().is_empty());
        agent
            .execute_task(&task, context)
            .await
            .map(|response| response.content)
            .map_err(|e| ToolError::Execution(e.to_string()))
    }

    fn parameters(&self, request_field: &str, request_description: &str) -> Value {
        json!({
            "type": "object",
            "properties": {
                request_field: {"type": "string", "description": request_description},
                "context": {"type": "string", "description": "Everything the coworker needs to know; they know nothing about the task"},
                "coworker": {"type": "string", "enum": self.names(), "description": "Role of the coworker"}
            },
            "required": [request_field, "context", "coworker"]
        })
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[derive(Deserialize)]
struct DelegateWorkArgs {
    task: String,
    #[serde(default)]
    context: String,
    coworker: String,
}

#[derive(Deserialize)]
struct AskQuestionArgs {
    question: String,
    #[serde(default)]
    context: String,
    coworker: String,
}

pub struct DelegateWorkTool {
    coworkers: Coworkers,
}

pub struct AskQuestionTool {
    coworkers: Coworkers,
}

#[async_trait]
impl Tool for DelegateWorkTool {
    fn name(&self) -> &str {
        "delegate_work_to_coworker"
    }

    fn description(&self) -> String {
        format!(
            "Delegate a specific task to one of the following coworkers: {}\n\
             The input to this tool should be the coworker, the task you want them to do, and ALL necessary \
             context to execute the task, they know nothing about the task, so share absolutely everything you \
             know, don't reference things but instead explain them.",
            self.coworkers.names().join(", ")
        )
    }

    fn parameters(&self) -> Value {
        self.coworkers.parameters("task", "The task to delegate")
    }

    async fn run(&self, arguments: Value) -> Result<String, ToolError> {
        let args: DelegateWorkArgs = parse_args(arguments)?;
        self.coworkers.execute(&args.coworker, args.task, &args.context).await
    }
}

#[async_trait]
impl Tool for AskQuestionTool {
    fn name(&self) -> &str {
        "ask_question_to_coworker"
    }

    fn description(&self) -> String {
        format!(
            "Ask a specific question to one of the following coworkers: {}\n\
             The input to this tool should be the coworker, the question you have for them, and ALL necessary \
             context to ask the question properly, they know nothing about the question, so share absolutely \
             everything you know, don't reference things but instead explain them.",
            self.coworkers.names().join(", ")
        )
    }

    fn parameters(&self) -> Value {
        self.coworkers.parameters("question", "The question to ask")
    }

    async fn run(&self, arguments: Value) -> Result<String, ToolError> {
        let args: AskQuestionArgs = parse_args(arguments)?;
        self.coworkers.execute(&args.coworker, args.question, &args.context).await
    }
}

/// Build both delegation tools over `agents`
pub async fn delegation_tools(agents: &[SharedAgent]) -> Vec<Arc<dyn Tool>> {
    let mut coworkers = Vec::with_capacity(agents.len());
    for agent in agents {
        let role = agent.lock().await.role.role.clone();
        coworkers.push(Coworker {
            role,
            agent: Arc::clone(agent),
        });
    }
    let coworkers = Coworkers(coworkers);

    vec![
        Arc::new(DelegateWorkTool {
            coworkers: coworkers.clone(),
        }),
        Arc::new(AskQuestionTool { coworkers }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::test_utils::{scripted_agent, ScriptedProvider};

    fn shared(agent: Agent) -> SharedAgent {
        Arc::new(Mutex::new(agent))
    }

    #[tokio::test]
    async fn test_delegate_runs_coworker_with_context() {
        let researcher_llm = ScriptedProvider::new(vec![Ok(CompletionResponse::message("Findings: A, B"))]);
        let researcher = shared(scripted_agent("AI LLMs Senior Data Researcher", researcher_llm.clone()));
        let tools = delegation_tools(&[researcher.clone()]).await;

        let result = tools[0]
            .run(json!({
                "task": "List recent LLM releases",
                "context": "Focus on open weights",
                "coworker": "\"ai llms senior data researcher\""
            }))
            .await
            .unwrap();
        assert_eq!(result, "Findings: A, B");

        let request = &researcher_llm.requests()[0];
        let prompt = request.messages[1].content.clone().unwrap();
        assert!(prompt.contains("Current Task: List recent LLM releases"));
        assert!(prompt.contains(MANAGER_REQUEST));
        assert!(prompt.contains("Focus on open weights"));
        assert_eq!(researcher.lock().await.state.success_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_coworker_lists_options() {
        let tools = delegation_tools(&[
            shared(scripted_agent("Researcher", ScriptedProvider::new(vec![]))),
            shared(scripted_agent("Reporting Analyst", ScriptedProvider::new(vec![]))),
        ])
        .await;

        let err = tools[1]
            .run(json!({"question": "Why?", "context": "", "coworker": "Manager"}))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("- Researcher"));
        assert!(message.contains("- Reporting Analyst"));
    }

    #[tokio::test]
    async fn test_busy_coworker_is_reported() {
        let researcher = shared(scripted_agent("Researcher", ScriptedProvider::new(vec![])));
        let tools = delegation_tools(&[researcher.clone()]).await;

        let _guard = researcher.lock().await;
        let err = tools[0]
            .run(json!({"task": "Dig", "context": "", "coworker": "Researcher"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("busy"));
    }

    #[tokio::test]
    async fn test_missing_arguments_are_invalid() {
        let tools = delegation_tools(&[shared(scripted_agent("Researcher", ScriptedProvider::new(vec![])))]).await;
        let err = tools[0].run(json!({"coworker": "Researcher"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_definitions_advertise_coworkers() {
        let tools = delegation_tools(&[shared(scripted_agent("Researcher", ScriptedProvider::new(vec![])))]).await;
        let definition = tools[0].definition();
        assert_eq!(definition.name, "delegate_work_to_coworker");
        assert!(definition.description.contains("coworkers: Researcher"));
        assert_eq!(definition.parameters["properties"]["coworker"]["enum"][0], "Researcher");
        assert_eq!(tools[1].name(), "ask_question_to_coworker");
    }
}
