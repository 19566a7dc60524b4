//! Web scrape tool: fetch a page and return its readable text.

use async_trait::async_trait;
use taskpilot_config::ToolsConfig;
use taskpilot_core::error::ToolError;
use taskpilot_core::tool::{Tool, ToolResult};
use tracing::debug;

/// Line width used when rendering HTML to text.
const TEXT_WIDTH: usize = 100;

pub struct WebScrapeTool {
    client: reqwest::Client,
    max_chars: usize,
    timeout_secs: u64,
}

impl WebScrapeTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            client: crate::http_client(config.request_timeout_secs),
            max_chars: config.scrape_max_chars,
            timeout_secs: config.request_timeout_secs,
        }
    }
}

#[async_trait]
impl Tool for WebScrapeTool {
    fn name(&self) -> &str {
        "web_scrape"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its text content. Use it to read links found with web_search."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The http:// or https:// URL to read"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        debug!(url, "Scraping page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| crate::request_error(self.name(), self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("{url} returned {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| crate::request_error(self.name(), self.timeout_secs, e))?;

        let text = html_to_text(&body).map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason,
        })?;

        let (output, truncated) = truncate_chars(&text, self.max_chars);
        Ok(ToolResult {
            success: true,
            output,
            data: Some(serde_json::json!({
                "url": url,
                "status": status.as_u16(),
                "truncated": truncated,
            })),
        })
    }
}

fn html_to_text(html: &[u8]) -> Result<String, String> {
    html2text::from_read(html, TEXT_WIDTH).map_err(|e| format!("could not render page: {e}"))
}

/// Keep at most `max` characters, marking the cut.
fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((cut, _)) => (format!("{}\n\n[truncated]", &text[..cut]), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> WebScrapeTool {
        WebScrapeTool::new(&ToolsConfig::default())
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let err = tool()
            .execute(serde_json::json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_url_returns_error() {
        assert!(tool().execute(serde_json::json!({})).await.is_err());
    }

    #[test]
    fn html_renders_as_text() {
        let html = b"<html><body><h1>Acme</h1><p>We publish an annual <b>ESG</b> report.</p></body></html>";
        let text = html_to_text(html).unwrap();
        assert!(text.contains("Acme"));
        assert!(text.contains("annual"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let (short, cut) = truncate_chars("héllo", 10);
        assert_eq!(short, "héllo");
        assert!(!cut);

        let (long, cut) = truncate_chars("héllo wörld", 4);
        assert!(long.starts_with("héll\n\n[truncated]"));
        assert!(cut);
    }

    #[test]
    fn tool_definition() {
        let def = tool().to_definition();
        assert_eq!(def.name, "web_scrape");
        assert!(!def.description.is_empty());
    }
}
