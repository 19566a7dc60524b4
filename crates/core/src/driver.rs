//! Driver trait — the abstraction over language-model backends.
//!
//! A Driver is a stateless request/response interface: it receives the full
//! message transcript plus optional tool schemas and an optional output
//! format, and returns free text, a structured (JSON) payload, or a list of
//! tool calls. Network transport lives in the implementations; the agent
//! loop only depends on this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::message::{Message, MessageToolCall};

/// How the model may use the offered tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides between text and tool calls.
    #[default]
    Auto,
    /// The model must not call tools.
    None,
    /// The model must call at least one tool.
    Required,
}

/// Constrains the shape of the generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text.
    Text,
    /// Any syntactically valid JSON object.
    JsonObject,
    /// A JSON object conforming to the given schema.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    /// Whether the driver is expected to return JSON content.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRequest {
    /// The conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Tool choice mode, only meaningful when tools are offered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Structured-output constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl DriverRequest {
    /// A plain free-text request at temperature 0.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: 0.0,
            tools: Vec::new(),
            tool_choice: None,
            response_format: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = tools;
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_response_format(mut self, format: Option<ResponseFormat>) -> Self {
        self.response_format = format;
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverResponse {
    /// Generated text, or JSON text when a structured format was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested instead of (or alongside) text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl DriverResponse {
    /// A text-only response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    /// A response that only requests tool calls.
    pub fn tool_calls(tool_calls: Vec<MessageToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
            usage: None,
        }
    }

    /// The generated text, or an empty string when there is none.
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// The core Driver trait.
///
/// Every model backend implements this. The agent loop calls `generate`
/// without knowing which backend is behind it.
#[async_trait]
pub trait Driver: Send + Sync {
    /// A human-readable name for this driver (e.g., "openai", "replay").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn generate(&self, request: DriverRequest) -> Result<DriverResponse, DriverError>;
}
