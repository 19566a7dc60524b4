//! Shared test helpers: scripted responses and small tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use taskpilot_core::driver::DriverResponse;
use taskpilot_core::error::ToolError;
use taskpilot_core::message::MessageToolCall;
use taskpilot_core::tool::{Tool, ToolRegistry, ToolResult};

use crate::agent::Agent;
use crate::replay::ReplayDriver;

static NEXT_CALL_ID: AtomicUsize = AtomicUsize::new(1);

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
        Ok(ToolResult::ok(text))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Fails every time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "upstream unavailable".into(),
        })
    }
}

pub fn registry_with(tools: Vec<Box<dyn Tool>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

/// A tool call with a unique correlation id.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    let n = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
    MessageToolCall {
        id: format!("call_{name}_{n}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// The OBSERVE self-check response.
pub fn verdict(complete: bool) -> DriverResponse {
    DriverResponse::text(serde_json::json!({ "complete": complete }).to_string())
}

/// Build an agent over a replay driver with echo and failing tools.
pub fn agent_with(responses: Vec<DriverResponse>) -> (Agent, Arc<ReplayDriver>) {
    let driver = Arc::new(ReplayDriver::new(responses));
    let tools = Arc::new(registry_with(vec![Box::new(EchoTool), Box::new(FailingTool)]));
    let agent = Agent::new(driver.clone(), "You are a test agent.", tools);
    (agent, driver)
}
