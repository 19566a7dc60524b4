//! Built-in tool implementations for TaskPilot.
//!
//! Two tools cover the research workflow the agent is built for: search
//! the web for relevant pages, then scrape the ones worth reading.

pub mod web_scrape;
pub mod web_search;

use std::time::Duration;

use taskpilot_config::ToolsConfig;
use taskpilot_core::error::ToolError;
use taskpilot_core::tool::ToolRegistry;

pub use web_scrape::WebScrapeTool;
pub use web_search::WebSearchTool;

/// Create a tool registry with every built-in tool.
///
/// `web_search` is registered even without an API key; calling it then
/// yields a `NotConfigured` error the model can observe.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WebSearchTool::new(config)));
    registry.register(Box::new(WebScrapeTool::new(config)));
    registry
}

/// HTTP client shared by the web tools.
fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("taskpilot/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a transport error to the tool error the model will see.
fn request_error(tool_name: &str, timeout_secs: u64, error: reqwest::Error) -> ToolError {
    if error.is_timeout() {
        ToolError::Timeout {
            tool_name: tool_name.into(),
            timeout_secs,
        }
    } else {
        ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: error.to_string(),
        }
    }
}
