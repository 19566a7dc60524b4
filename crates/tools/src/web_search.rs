//! Web search tool backed by the Serper Google search API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskpilot_config::ToolsConfig;
use taskpilot_core::error::ToolError;
use taskpilot_core::tool::{Tool, ToolResult};
use tracing::debug;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

/// Upper bound on `num_results`, whatever the model asks for.
const MAX_RESULTS: usize = 10;

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    default_results: usize,
    timeout_secs: u64,
}

impl WebSearchTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            client: crate::http_client(config.request_timeout_secs),
            api_key: config.serper_api_key.clone(),
            default_results: config.search_results,
            timeout_secs: config.request_timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search Google for information. Returns a list of relevant results with titles, links, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return",
                    "default": self.default_results
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let num_results = arguments["num_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.default_results)
            .clamp(1, MAX_RESULTS);

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::NotConfigured("web_search needs tools.serper_api_key or SERPER_API_KEY".into())
        })?;

        debug!(query, num_results, "Searching the web");

        let response = self
            .client
            .post(SERPER_ENDPOINT)
            .header("X-API-KEY", api_key)
            .json(&SearchRequest {
                q: query,
                num: num_results,
            })
            .send()
            .await
            .map_err(|e| crate::request_error(self.name(), self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("search API returned {status}"),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("unreadable search response: {e}"),
            })?;

        let results: Vec<SearchResult> = body.organic.into_iter().take(num_results).collect();
        Ok(ToolResult {
            success: true,
            output: format_results(query, &results),
            data: serde_json::to_value(&results).ok(),
        })
    }
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n{}\n{}", i + 1, r.title, r.link, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}
