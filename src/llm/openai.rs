use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    ChatMessage, CompletionKind, CompletionRequest, CompletionResponse, LlmError, LlmToolCall,
    TokenUsage, ToolDefinition,
};
use super::LlmProvider;

/// Client for any server speaking the OpenAI chat completions protocol
/// (OpenAI itself, Ollama's `/v1` endpoint, proxies such as OpenRouter).
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<LlmToolCall>>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub(crate) fn build_request_body(request: &CompletionRequest) -> Result<serde_json::Value, LlmError> {
    let body = WireRequest {
        model: &request.model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: request
            .tools
            .iter()
            .map(|function| WireTool {
                tool_type: "function",
                function,
            })
            .collect(),
    };
    Ok(serde_json::to_value(body)?)
}

pub(crate) fn parse_response_body(body: &str) -> Result<CompletionResponse, LlmError> {
    let response: WireResponse = serde_json::from_str(body)?;
    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
    });

    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?
        .message;

    let kind = match (message.tool_calls, message.content) {
        (Some(tool_calls), _) if !tool_calls.is_empty() => CompletionKind::ToolCall { tool_calls },
        (_, Some(content)) => CompletionKind::Message { content },
        _ => return Err(LlmError::EmptyResponse),
    };

    Ok(CompletionResponse { kind, usage })
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn completion(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_request_body(&request)?;
        debug!(model = %request.model, endpoint = %self.endpoint(), "sending completion request");

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_response_body(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_base_url() {
        let provider = OpenAiCompatibleProvider::new("http://localhost:11434/v1/".to_string(), None);
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_body_includes_tools_and_skips_empty_fields() {
        let request = CompletionRequest::new(
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            "llama3.1".to_string(),
            None,
            Some(256),
            vec![ToolDefinition {
                name: "delegate_work_to_coworker".to_string(),
                description: "Delegate".to_string(),
                parameters: json!({"type": "object"}),
            }],
        );

        let body = build_request_body(&request).unwrap();
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("temperature").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1].get("tool_calls").is_none());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "delegate_work_to_coworker");
    }

    #[test]
    fn test_request_body_omits_tools_when_none() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")], "m".to_string(), Some(0.2), None, vec![]);
        let body = build_request_body(&request).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_message_response_with_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Final report"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
        .to_string();

        let response = parse_response_body(&body).unwrap();
        assert_eq!(response.kind, CompletionKind::Message { content: "Final report".to_string() });
        assert_eq!(response.usage, Some(TokenUsage { prompt_tokens: 12, completion_tokens: 3 }));
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "ask_question_to_coworker", "arguments": "{\"question\":\"q\"}"}
                }]
            }}]
        })
        .to_string();

        let response = parse_response_body(&body).unwrap();
        match response.kind {
            CompletionKind::ToolCall { tool_calls } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].function.name, "ask_question_to_coworker");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        let body = json!({"choices": []}).to_string();
        assert!(matches!(parse_response_body(&body), Err(LlmError::EmptyResponse)));
    }
}
