//! Observable units of progress emitted by the execution loop.
//!
//! Every advancement yields one [`AgentStep`]. Intermediate steps carry
//! human-readable progress; the last step of a task is always
//! [`AgentStep::Result`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The controller state that produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Plan,
    Action,
    Observe,
    Output,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Action => "action",
            Self::Observe => "observe",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a running task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStep {
    /// Intermediate progress text.
    Progress {
        phase: Phase,
        iteration: u32,
        content: String,
    },

    /// The terminal result of the task.
    Result(AgentResult),
}

impl AgentStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// Display text of the step, regardless of variant.
    pub fn content(&self) -> String {
        match self {
            Self::Progress { content, .. } => content.clone(),
            Self::Result(result) => result.output.to_text(),
        }
    }

    /// SSE-style event name for this step.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Result(_) => "result",
        }
    }
}

/// How a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The driver judged the task complete and produced an answer.
    Answered,
    /// The iteration budget ran out first.
    Exhausted,
    /// An unrecovered error aborted the task.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        }
    }
}

/// The final answer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentOutput {
    Text(String),
    Structured(serde_json::Value),
}

impl AgentOutput {
    /// Text form: plain text as-is, structured output as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }
}

/// Terminal result of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub output: AgentOutput,
    pub outcome: Outcome,
    /// Advancements used, including the terminal one.
    pub iterations: u32,
}

impl AgentResult {
    pub fn is_answer(&self) -> bool {
        self.outcome == Outcome::Answered
    }

    /// Decode a structured answer into the caller's type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.output {
            AgentOutput::Structured(value) => T::deserialize(value),
            AgentOutput::Text(text) => serde_json::from_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serializes_with_phase() {
        let step = AgentStep::Progress {
            phase: Phase::Observe,
            iteration: 3,
            content: "Completed Task.".into(),
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains(r#""type":"progress""#));
        assert!(json.contains(r#""phase":"observe""#));
        assert!(!step.is_terminal());
        assert_eq!(step.event_type(), "progress");
    }

    #[test]
    fn result_is_terminal() {
        let step = AgentStep::Result(AgentResult {
            output: AgentOutput::Text("done".into()),
            outcome: Outcome::Answered,
            iterations: 4,
        });
        assert!(step.is_terminal());
        assert_eq!(step.content(), "done");
        assert_eq!(step.event_type(), "result");
    }

    #[test]
    fn structured_output_parses_into_caller_type() {
        #[derive(Deserialize)]
        struct Summary {
            available: bool,
            summary: String,
        }

        let result = AgentResult {
            output: AgentOutput::Structured(serde_json::json!({
                "available": true,
                "summary": "Reports scope 1 emissions yearly"
            })),
            outcome: Outcome::Answered,
            iterations: 5,
        };
        let summary: Summary = result.parse().unwrap();
        assert!(summary.available);
        assert!(summary.summary.contains("scope 1"));
    }

    #[test]
    fn text_output_parse_fails_on_prose() {
        let result = AgentResult {
            output: AgentOutput::Text("An error occurred. Please try again.".into()),
            outcome: Outcome::Failed,
            iterations: 1,
        };
        assert!(result.parse::<serde_json::Value>().is_err());
        assert!(!result.is_answer());
    }
}
