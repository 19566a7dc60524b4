//! Tool dispatch — resolving and running the tool calls of one ACTION.
//!
//! The dispatcher resolves every call in a batch against the registry
//! before running any of them, so a batch that names an unknown tool has no
//! side effects. Resolved calls run sequentially in the order the driver
//! returned them. A failing tool never aborts the task: its error becomes
//! the observation the model sees next.

use std::fmt::Write as _;
use std::time::Instant;

use chrono::Utc;
use taskpilot_core::agent::UnknownToolPolicy;
use taskpilot_core::error::ToolError;
use taskpilot_core::event::{DomainEvent, EventBus};
use taskpilot_core::message::{Message, MessageToolCall};
use taskpilot_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, warn};

use crate::error::StepError;

/// Runs driver-requested tool calls against a registry.
pub struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
    unknown_tools: UnknownToolPolicy,
    event_bus: Option<&'a EventBus>,
}

/// Everything one batch of tool calls adds to scratch memory.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The assistant message carrying the tool calls.
    pub request: Message,
    /// One tool message per call, in call order.
    pub results: Vec<Message>,
    /// Results joined for display.
    pub observations: String,
    /// Calls whose result is an error observation.
    pub failures: usize,
}

impl Dispatch {
    /// Human-readable summary of the batch: each call, then all results.
    pub fn summary(&self) -> String {
        let mut text = String::new();
        for call in &self.request.tool_calls {
            let _ = write!(text, "Calling tool:\n```json\n{}\n```\n", call.name);
            let _ = write!(text, "Parameters:\n```json\n{}\n```\n\n", call.arguments);
        }
        let _ = write!(text, "Results:\n```json\n{}\n```", self.observations);
        text
    }

    /// Messages to append to scratch memory, in order.
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.results.len() + 1);
        messages.push(self.request);
        messages.extend(self.results);
        messages
    }
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            unknown_tools: UnknownToolPolicy::Abort,
            event_bus: None,
        }
    }

    pub fn with_unknown_tools(mut self, policy: UnknownToolPolicy) -> Self {
        self.unknown_tools = policy;
        self
    }

    pub fn with_event_bus(mut self, bus: Option<&'a EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    /// Execute a batch of tool calls.
    ///
    /// Fails only when a call names an unregistered tool and the policy is
    /// [`UnknownToolPolicy::Abort`].
    pub async fn dispatch(&self, calls: Vec<MessageToolCall>) -> Result<Dispatch, StepError> {
        if self.unknown_tools == UnknownToolPolicy::Abort {
            if let Some(call) = calls.iter().find(|c| !self.registry.contains(&c.name)) {
                return Err(StepError::UnknownTool {
                    name: call.name.clone(),
                });
            }
        }

        debug!(tool_count = calls.len(), "Dispatching tool calls");

        let mut results = Vec::with_capacity(calls.len());
        let mut observations = String::new();
        let mut failures = 0;

        for call in &calls {
            let (output, success) = self.invoke(call).await;
            if !success {
                failures += 1;
            }
            observations.push_str("\n\n");
            observations.push_str(&output);
            results.push(Message::tool_result(&call.id, output));
        }

        Ok(Dispatch {
            request: Message::assistant_tool_calls(calls),
            results,
            observations,
            failures,
        })
    }

    /// Run one call, returning the observation text and whether it succeeded.
    async fn invoke(&self, call: &MessageToolCall) -> (String, bool) {
        if !self.registry.contains(&call.name) {
            warn!(tool = %call.name, "Driver called an unregistered tool");
            return (format!("Error: tool '{}' is not available", call.name), false);
        }

        let arguments = match parse_arguments(&call.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                return (format!("Error: {e}"), false);
            }
        };

        let tool_call = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        };

        let start = Instant::now();
        let result = self.registry.execute(&tool_call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, success) = match result {
            Ok(tool_result) => (tool_result.output, tool_result.success),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (format!("Error: {e}"), false)
            }
        };

        if let Some(bus) = self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }

        (output, success)
    }
}

/// Decode driver-supplied arguments into a keyword-argument object.
///
/// An empty string means "no arguments".
pub fn parse_arguments(raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("not valid JSON ({e})")))?;
    if !value.is_object() {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".into(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_tool_call, registry_with, EchoTool, FailingTool};
    use taskpilot_core::message::Role;

    #[tokio::test]
    async fn known_tool_yields_one_message_with_call_id() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let dispatcher = ToolDispatcher::new(&registry);

        let call = make_tool_call("echo", serde_json::json!({"text": "x"}));
        let dispatch = dispatcher.dispatch(vec![call.clone()]).await.unwrap();

        assert_eq!(dispatch.results.len(), 1);
        assert_eq!(dispatch.results[0].role, Role::Tool);
        assert_eq!(dispatch.results[0].tool_call_id.as_deref(), Some(call.id.as_str()));
        assert_eq!(dispatch.results[0].content, "x");
        assert_eq!(dispatch.failures, 0);
        assert_eq!(dispatch.request.tool_calls, vec![call]);
    }

    #[tokio::test]
    async fn unknown_tool_aborts_before_running_anything() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let dispatcher = ToolDispatcher::new(&registry);

        let calls = vec![
            make_tool_call("echo", serde_json::json!({"text": "first"})),
            make_tool_call("teleport", serde_json::json!({})),
        ];
        let err = dispatcher.dispatch(calls).await.unwrap_err();
        assert!(matches!(err, StepError::UnknownTool { ref name } if name == "teleport"));
    }

    #[tokio::test]
    async fn unknown_tool_observed_when_policy_allows() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let dispatcher =
            ToolDispatcher::new(&registry).with_unknown_tools(UnknownToolPolicy::Observe);

        let calls = vec![
            make_tool_call("teleport", serde_json::json!({})),
            make_tool_call("echo", serde_json::json!({"text": "still runs"})),
        ];
        let dispatch = dispatcher.dispatch(calls).await.unwrap();
        assert_eq!(dispatch.results.len(), 2);
        assert!(dispatch.results[0].content.starts_with("Error:"));
        assert!(dispatch.results[0].content.contains("teleport"));
        assert_eq!(dispatch.results[1].content, "still runs");
        assert_eq!(dispatch.failures, 1);
    }

    #[tokio::test]
    async fn failing_tool_becomes_error_observation() {
        let registry = registry_with(vec![Box::new(FailingTool)]);
        let dispatcher = ToolDispatcher::new(&registry);

        let dispatch = dispatcher
            .dispatch(vec![make_tool_call("flaky", serde_json::json!({}))])
            .await
            .unwrap();
        assert_eq!(dispatch.results.len(), 1);
        assert!(dispatch.results[0].content.starts_with("Error: "));
        assert!(dispatch.results[0].content.contains("upstream unavailable"));
        assert!(dispatch.observations.contains("Error: "));
        assert_eq!(dispatch.failures, 1);
    }

    #[tokio::test]
    async fn malformed_arguments_are_recoverable() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let dispatcher = ToolDispatcher::new(&registry);

        let call = MessageToolCall {
            id: "call_bad".into(),
            name: "echo".into(),
            arguments: "[1, 2".into(),
        };
        let dispatch = dispatcher.dispatch(vec![call]).await.unwrap();
        assert!(dispatch.results[0].content.starts_with("Error: Invalid tool arguments"));
        assert_eq!(dispatch.results[0].tool_call_id.as_deref(), Some("call_bad"));
    }

    #[tokio::test]
    async fn tool_execution_is_published() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let dispatcher = ToolDispatcher::new(&registry).with_event_bus(Some(&bus));

        dispatcher
            .dispatch(vec![make_tool_call("echo", serde_json::json!({"text": "hi"}))])
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::ToolExecuted { tool_name, success: true, .. } if tool_name == "echo"
        ));
    }

    #[tokio::test]
    async fn summary_lists_calls_then_results() {
        let registry = registry_with(vec![Box::new(EchoTool)]);
        let dispatcher = ToolDispatcher::new(&registry);

        let dispatch = dispatcher
            .dispatch(vec![
                make_tool_call("echo", serde_json::json!({"text": "alpha"})),
                make_tool_call("echo", serde_json::json!({"text": "beta"})),
            ])
            .await
            .unwrap();

        let summary = dispatch.summary();
        assert_eq!(summary.matches("Calling tool:").count(), 2);
        assert!(summary.contains(r#"{"text":"alpha"}"#));
        let results_at = summary.find("Results:").unwrap();
        assert!(summary[results_at..].contains("alpha"));
        assert!(summary[results_at..].contains("beta"));

        let messages = dispatch.into_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].tool_calls.len(), 2);
    }

    #[test]
    fn empty_arguments_mean_no_arguments() {
        assert_eq!(parse_arguments("").unwrap(), serde_json::json!({}));
        assert!(parse_arguments("42").is_err());
    }
}
