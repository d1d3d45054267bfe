use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::agent::{Agent, AgentError, AgentResponse, ExecutionOutcome, ToolCall};
use crate::llm::{ChatMessage, ChatMessageRole, CompletionKind, CompletionRequest, ToolDefinition};
use crate::task::Task;
use crate::tools::ToolError;

const MAX_RETRIES: usize = 3;

impl Agent {
    /// Execute a task, optionally with context from earlier tasks, and return
    /// the validated answer with execution metrics
    pub async fn execute_task(&mut self, task: &Task, context: Option<&str>) -> Result<AgentResponse, AgentError> {
        let start_time = Instant::now();
        self.state.start_task(task.id.clone());
        info!(agent = %self.role.role, task = %task.summary(), "agent started task");

        let result = self.process_task_with_metrics(task, context).await;
        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        let model_used = self.llm_config.model_name.clone();

        let response = match &result {
            Ok(outcome) => AgentResponse::success(outcome.clone(), execution_time_ms, model_used),
            Err(error) => {
                warn!(agent = %self.role.role, error = %error, "agent failed task");
                AgentResponse::error(error.to_string(), execution_time_ms, model_used)
            }
        };

        self.update_performance_metrics_from_response(&response);
        self.state.complete_task(response.success);

        result.map(|_| {
            info!(
                agent = %self.role.role,
                elapsed_ms = response.execution_time_ms,
                tokens = response.total_tokens,
                tools = response.tools_used.len(),
                tool_ms = response.tool_execution_time_ms(),
                "agent finished task"
            );
            response
        })
    }

    /// Run the tool loop, then validate the answer; retries LLM failures and
    /// asks for corrections on invalid output. Usage of failed attempts counts
    /// towards the total.
    async fn process_task_with_metrics(&self, task: &Task, context: Option<&str>) -> Result<ExecutionOutcome, AgentError> {
        let mut messages = self.build_initial_messages(task, context);
        let mut total = ExecutionOutcome::default();
        let mut last_error = AgentError::LLMError("no attempt made".to_string());

        for attempt in 1..=MAX_RETRIES {
            match self.execute_with_llm_with_metrics(&mut messages, &mut total).await {
                Ok(content) => {
                    match self.output_handler.process_output(&content, &task.output_format) {
                        Ok(processed) => {
                            total.content = processed;
                            return Ok(total);
                        }
                        Err(validation_error) => {
                            warn!(agent = %self.role.role, attempt, error = %validation_error, "invalid output");
                            messages.push(ChatMessage::assistant(content));
                            messages.push(ChatMessage::user(format!(
                                "Your previous response was invalid: {}. Please provide a corrected response in the required format.",
                                validation_error
                            )));
                            last_error = AgentError::ValidationError(format!(
                                "Output validation failed after {} attempts: {}",
                                MAX_RETRIES, validation_error
                            ));
                        }
                    }
                }
                Err(error @ AgentError::MaxIterationsExceeded(_)) => return Err(error),
                Err(error) => {
                    warn!(agent = %self.role.role, attempt, error = %error, "LLM execution failed");
                    last_error = AgentError::LLMError(format!(
                        "LLM execution failed after {} attempts: {}",
                        MAX_RETRIES, error
                    ));
                }
            }
        }

        Err(last_error)
    }

    /// Core LLM execution loop: call the model, run requested tools, feed results back.
    /// Requests, tokens and tool calls are added to `outcome` as they happen.
    async fn execute_with_llm_with_metrics(
        &self,
        messages: &mut Vec<ChatMessage>,
        outcome: &mut ExecutionOutcome,
    ) -> Result<String, AgentError> {
        let tool_definitions: Vec<ToolDefinition> = self.tools.iter().map(|t| t.definition()).collect();
        let mut iterations = 0;

        loop {
            let force_final_answer = iterations >= self.max_iter;
            if force_final_answer {
                messages.push(ChatMessage::user(
                    "You have used the maximum number of tool calls. Provide your best final answer now without calling any tools.",
                ));
            }

            let request = CompletionRequest::new(
                messages.clone(),
                self.llm_config.model_name.clone(),
                self.llm_config.temperature,
                self.llm_config.max_tokens,
                if force_final_answer { Vec::new() } else { tool_definitions.clone() },
            );

            let response = self
                .provider
                .completion(request)
                .await
                .map_err(|e| AgentError::LLMError(e.to_string()))?;
            outcome.requests += 1;

            let (input_tokens, output_tokens) = match response.usage {
                Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
                None => (self.count_input_tokens(messages), self.count_output_tokens(&response.kind)),
            };
            outcome.input_tokens += input_tokens;
            outcome.output_tokens += output_tokens;

            match response.kind {
                CompletionKind::Message { content } => return Ok(content),
                CompletionKind::ToolCall { .. } if force_final_answer => {
                    return Err(AgentError::MaxIterationsExceeded(self.max_iter));
                }
                CompletionKind::ToolCall { tool_calls } => {
                    iterations += 1;
                    messages.push(ChatMessage::new(
                        ChatMessageRole::Assistant,
                        None,
                        Some(tool_calls.clone()),
                        None,
                    ));

                    for call in tool_calls {
                        let tool_name = call.function.name.clone();
                        let tool_args = call.function.arguments.clone();
                        debug!(agent = %self.role.role, tool = %tool_name, arguments = %tool_args, "executing tool");

                        let tool_start = Instant::now();
                        let result = self.execute_tool(&tool_name, &tool_args).await;
                        let tool_execution_time = tool_start.elapsed().as_millis() as u64;
                        outcome.tools_used.push(tool_name.clone());

                        let tool_result_content = match result {
                            Ok(output) => {
                                outcome.tool_calls.push(ToolCall::new(
                                    tool_name,
                                    tool_args,
                                    output.clone(),
                                    tool_execution_time,
                                ));
                                output
                            }
                            Err(e) => {
                                warn!(agent = %self.role.role, tool = %tool_name, error = %e, "tool execution failed");
                                let message = format!("Error executing tool {}: {}", tool_name, e);
                                outcome.tool_calls.push(ToolCall::with_error(
                                    tool_name,
                                    tool_args,
                                    e.to_string(),
                                    tool_execution_time,
                                ));
                                message
                            }
                        };

                        messages.push(ChatMessage::tool_result(call.id, tool_result_content));
                    }
                }
            }
        }
    }

    async fn execute_tool(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let tool = self.tools.iter().find(|t| t.name() == name).ok_or_else(|| {
            let available: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
            ToolError::Execution(format!(
                "Unknown tool '{}'. Available tools: {}",
                name,
                available.join(", ")
            ))
        })?;

        let arguments: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        tool.run(arguments).await
    }

    /// Estimate input tokens when the server reports no usage
    fn count_input_tokens(&self, messages: &[ChatMessage]) -> u32 {
        let total_chars: usize = messages
            .iter()
            .map(|msg| {
                // Add role and formatting overhead
                msg.content.as_deref().map_or(0, str::len) + 20
            })
            .sum();
        // ~3.5 characters per token for English text
        (total_chars as f64 / 3.5) as u32
    }

    fn count_output_tokens(&self, kind: &CompletionKind) -> u32 {
        let chars = match kind {
            CompletionKind::Message { content } => content.len(),
            CompletionKind::ToolCall { tool_calls } => tool_calls
                .iter()
                .map(|c| c.function.name.len() + c.function.arguments.len())
                .sum(),
        };
        (chars as f64 / 3.5) as u32
    }

    fn update_performance_metrics_from_response(&mut self, response: &AgentResponse) {
        self.state.performance_metrics.record_task_completion(
            response.success,
            response.execution_time_ms as f64,
            response.total_tokens,
        );
        for call in &response.tool_calls {
            self.state.performance_metrics.record_tool_usage(
                call.tool_name.clone(),
                call.error.is_none(),
                call.execution_time_ms as f64,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, LlmError, LlmToolCall, TokenUsage};
    use crate::task::JsonFieldType;
    use crate::test_utils::{scripted_agent, EchoTool, ScriptedProvider};
    use std::sync::Arc;

    fn research_task() -> Task {
        Task::new("Research AI LLMs".to_string(), "Ten bullet points".to_string())
    }

    #[tokio::test]
    async fn test_plain_answer_with_reported_usage() {
        let provider = ScriptedProvider::new(vec![Ok(CompletionResponse::message("- point one")
            .with_usage(TokenUsage { prompt_tokens: 40, completion_tokens: 4 }))]);
        let mut agent = scripted_agent("Researcher", provider.clone());

        let response = agent.execute_task(&research_task(), None).await.unwrap();
        assert_eq!(response.content, "- point one");
        assert_eq!(response.total_tokens, 44);
        assert_eq!(response.requests, 1);
        assert_eq!(agent.state.success_count, 1);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_calls_are_executed_and_fed_back() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("call_1", "echo", r#"{"text":"ping"}"#)])),
            Ok(CompletionResponse::message("pong received")),
        ]);
        let mut agent = scripted_agent("Researcher", provider.clone()).with_tools(vec![Arc::new(EchoTool)]);

        let response = agent.execute_task(&research_task(), None).await.unwrap();
        assert_eq!(response.content, "pong received");
        assert_eq!(response.tools_used, vec!["echo".to_string()]);
        assert_eq!(response.tool_calls[0].result, "echo: ping");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, ChatMessageRole::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(last.content.as_deref(), Some("echo: ping"));
        assert_eq!(agent.state.performance_metrics.tool_usage_stats["echo"].success_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("call_1", "search", "{}")])),
            Ok(CompletionResponse::message("fine, no search")),
        ]);
        let mut agent = scripted_agent("Researcher", provider.clone());

        let response = agent.execute_task(&research_task(), None).await.unwrap();
        assert!(response.tool_calls[0].error.is_some());
        let requests = provider.requests();
        let tool_message = requests[1].messages.last().unwrap().content.clone().unwrap();
        assert!(tool_message.contains("Unknown tool 'search'"));
    }

    #[tokio::test]
    async fn test_max_iterations_forces_final_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("c1", "echo", r#"{"text":"a"}"#)])),
            Ok(CompletionResponse::message("final")),
        ]);
        let mut agent = scripted_agent("Researcher", provider.clone())
            .with_tools(vec![Arc::new(EchoTool)])
            .with_max_iter(1);

        let response = agent.execute_task(&research_task(), None).await.unwrap();
        assert_eq!(response.content, "final");
        let requests = provider.requests();
        assert!(requests[1].tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_after_limit_is_error() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("c1", "echo", "{}")])),
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("c2", "echo", "{}")])),
        ]);
        let mut agent = scripted_agent("Researcher", provider)
            .with_tools(vec![Arc::new(EchoTool)])
            .with_max_iter(1);

        let err = agent.execute_task(&research_task(), None).await.unwrap_err();
        assert_eq!(err, AgentError::MaxIterationsExceeded(1));
        assert_eq!(agent.state.error_count, 1);
    }

    #[tokio::test]
    async fn test_invalid_json_gets_a_correction_round() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::message("about an 8")),
            Ok(CompletionResponse::message("```json\n{\"quality\": 8}\n```")),
        ]);
        let mut agent = scripted_agent("Evaluator", provider.clone());
        let task = Task::new_simple_json(
            "Score".to_string(),
            "Score".to_string(),
            vec![("quality".to_string(), JsonFieldType::Number)],
            true,
        );

        let response = agent.execute_task(&task, None).await.unwrap();
        assert_eq!(response.content, "{\"quality\": 8}");
        let requests = provider.requests();
        let correction = requests[1].messages.last().unwrap().content.clone().unwrap();
        assert!(correction.starts_with("Your previous response was invalid"));
    }

    #[tokio::test]
    async fn test_usage_of_failed_attempt_is_kept() {
        let provider = ScriptedProvider::new(vec![
            Ok(CompletionResponse::tool_calls(vec![LlmToolCall::new("c1", "echo", r#"{"text":"a"}"#)])
                .with_usage(TokenUsage { prompt_tokens: 30, completion_tokens: 5 })),
            Err(LlmError::EmptyResponse),
            Ok(CompletionResponse::message("done").with_usage(TokenUsage { prompt_tokens: 50, completion_tokens: 2 })),
        ]);
        let mut agent = scripted_agent("Researcher", provider.clone()).with_tools(vec![Arc::new(EchoTool)]);

        let response = agent.execute_task(&research_task(), None).await.unwrap();
        assert_eq!(response.content, "done");
        assert_eq!(response.requests, 2);
        assert_eq!(response.total_tokens, 87);
        assert_eq!(response.tools_used, vec!["echo".to_string()]);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_llm_failures_exhaust_retries() {
        let provider = ScriptedProvider::failing("connection refused");
        let mut agent = scripted_agent("Researcher", provider.clone());

        let err = agent.execute_task(&research_task(), None).await.unwrap_err();
        match err {
            AgentError::LLMError(message) => {
                assert!(message.contains("after 3 attempts"));
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(provider.requests().len(), 3);
        assert_eq!(agent.state.performance_metrics.failed_tasks, 1);
    }
}
