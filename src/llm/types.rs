use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message in OpenAI wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<LlmToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(
        role: ChatMessageRole,
        content: Option<String>,
        tool_calls: Option<Vec<LlmToolCall>>,
        tool_call_id: Option<String>,
    ) -> Self {
        Self {
            role,
            content,
            tool_calls,
            tool_call_id,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::System, Some(content.into()), None, None)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::User, Some(content.into()), None, None)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatMessageRole::Assistant, Some(content.into()), None, None)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            ChatMessageRole::Tool,
            Some(content.into()),
            None,
            Some(tool_call_id.into()),
        )
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

impl LlmToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as sent by the model
    pub arguments: String,
}

/// Function tool advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(
        messages: Vec<ChatMessage>,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            messages,
            model,
            temperature,
            max_tokens,
            tools,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionKind {
    Message { content: String },
    ToolCall { tool_calls: Vec<LlmToolCall> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub kind: CompletionKind,
    /// Usage as reported by the server, when it reports any
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: CompletionKind::Message {
                content: content.into(),
            },
            usage: None,
        }
    }

    pub fn tool_calls(tool_calls: Vec<LlmToolCall>) -> Self {
        Self {
            kind: CompletionKind::ToolCall { tool_calls },
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Empty response from model")]
    EmptyResponse,
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
