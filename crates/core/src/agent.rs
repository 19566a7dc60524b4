//! Agent configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the agent's behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Role description, becomes the system message of every session
    #[serde(default = "default_description")]
    pub description: String,

    /// Maximum advancements per task; the last one is always the answer
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Persistent memory length that triggers eviction of the oldest task
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Sampling temperature for every generation
    #[serde(default)]
    pub temperature: f32,

    /// What to do when the driver calls a tool that was never offered
    #[serde(default)]
    pub unknown_tools: UnknownToolPolicy,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const DEFAULT_MEMORY_WINDOW: usize = 10;

/// Smallest window that still keeps the system message plus one exchange.
pub const MIN_MEMORY_WINDOW: usize = 4;

fn default_description() -> String {
    "You are a diligent research assistant. Break the user's request into steps, \
     use the tools you are given to gather information, and answer precisely."
        .into()
}
fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_memory_window() -> usize {
    DEFAULT_MEMORY_WINDOW
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            description: default_description(),
            max_iterations: default_max_iterations(),
            memory_window: default_memory_window(),
            temperature: 0.0,
            unknown_tools: UnknownToolPolicy::default(),
        }
    }
}

/// Handling of tool calls naming a tool that is not registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownToolPolicy {
    /// Treat it as a protocol violation and abort the task (default)
    #[default]
    Abort,
    /// Report it back to the model as an error observation
    Observe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.memory_window, 10);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.unknown_tools, UnknownToolPolicy::Abort);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"max_iterations": 4, "unknown_tools": "observe"}"#).unwrap();
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.memory_window, 10);
        assert_eq!(config.unknown_tools, UnknownToolPolicy::Observe);
        assert!(!config.description.is_empty());
    }
}
