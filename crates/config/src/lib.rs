//! Configuration loading and validation for TaskPilot.
//!
//! Loads configuration from `~/.taskpilot/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taskpilot_core::agent::{AgentConfig, MIN_MEMORY_WINDOW};

pub use taskpilot_core::agent::UnknownToolPolicy;

/// The root configuration structure.
///
/// Maps directly to `~/.taskpilot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Execution loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Settings for the built-in web tools.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Serper API key for `web_search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serper_api_key: Option<String>,

    /// Results returned by `web_search` when the caller does not ask for a count
    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Characters of page text kept by `web_scrape`
    #[serde(default = "default_scrape_max_chars")]
    pub scrape_max_chars: usize,

    /// Timeout for each outbound HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_search_results() -> usize {
    5
}
fn default_scrape_max_chars() -> usize {
    8000
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            serper_api_key: None,
            search_results: default_search_results(),
            scrape_max_chars: default_scrape_max_chars(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("search_results", &self.search_results)
            .field("scrape_max_chars", &self.scrape_max_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ToolsConfig {
    pub fn has_search_key(&self) -> bool {
        self.serper_api_key.is_some()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.taskpilot/config.toml).
    ///
    /// Environment variables override the file:
    /// - `TASKPILOT_MAX_ITERATIONS`
    /// - `TASKPILOT_MEMORY_WINDOW`
    /// - `SERPER_API_KEY` (only when the file sets no key)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = var("TASKPILOT_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_env("TASKPILOT_MAX_ITERATIONS", &raw)?;
        }

        if let Some(raw) = var("TASKPILOT_MEMORY_WINDOW") {
            self.agent.memory_window = parse_env("TASKPILOT_MEMORY_WINDOW", &raw)?;
        }

        if self.tools.serper_api_key.is_none() {
            self.tools.serper_api_key = var("SERPER_API_KEY").filter(|k| !k.trim().is_empty());
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".taskpilot")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations < 1 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.memory_window < MIN_MEMORY_WINDOW {
            return Err(ConfigError::ValidationError(format!(
                "agent.memory_window must be at least {MIN_MEMORY_WINDOW}"
            )));
        }

        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.tools.search_results == 0 {
            return Err(ConfigError::ValidationError(
                "tools.search_results must be > 0".into(),
            ));
        }

        if self.tools.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Render this configuration as TOML with secrets left out.
    pub fn to_redacted_toml(&self) -> String {
        let mut shown = self.clone();
        shown.tools.serper_api_key = None;
        toml::to_string_pretty(&shown).unwrap_or_default()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_redacted_toml()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{name} must be a number, got '{raw}'")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
