//! Fixed instructions and canned messages used by the step controller.

use serde::Deserialize;

pub const PLAN_INSTRUCTION: &str = "WRITE WHAT YOU SHOULD DO NEXT:";

pub const ACTION_INSTRUCTION: &str = "WORK ON WHAT YOU SHOULD DO NEXT:";

pub const ANSWER_INSTRUCTION: &str = "ANSWER THE USER'S REQUEST.";

pub const SEED_PREAMBLE: &str = "SOME INFO YOU ARE GIVEN TO START THE TASK:";

pub const COMPLETED: &str = "Completed Task.";

pub const CONTINUING: &str = "Continuing Task...";

pub const ERROR_MESSAGE: &str = "An error occurred. Please try again.";

pub const EXHAUSTED_MESSAGE: &str =
    "I was unable to finish this task within the step limit. Please try again.";

/// The completion self-check answer requested during OBSERVE.
#[derive(Debug, Deserialize)]
pub struct CompletionVerdict {
    pub complete: bool,
}

/// JSON schema of [`CompletionVerdict`].
pub fn verdict_schema() -> serde_json::Value {
    serde_json::json!({
        "title": "StepCheck",
        "type": "object",
        "properties": {
            "complete": {
                "title": "Complete",
                "description": "true if the current step is complete",
                "type": "boolean"
            }
        },
        "required": ["complete"]
    })
}

/// The OBSERVE instruction, embedding the verdict schema.
pub fn observe_instruction() -> String {
    format!(
        "DO YOU HAVE ENOUGH INFORMATION TO COMPLETE THE TASK?\n\n\
         The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\n\
         As an example, for the schema {{\"properties\": {{\"foo\": {{\"title\": \"Foo\", \"description\": \"a list of strings\", \
         \"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": [\"foo\"]}}\n\
         the object {{\"foo\": [\"bar\", \"baz\"]}} is a well-formatted instance of the schema. \
         The object {{\"properties\": {{\"foo\": [\"bar\", \"baz\"]}}}} is not well-formatted.\n\n\
         Here is the output schema:\n```\n{}\n```",
        verdict_schema()
    )
}

/// Task text as seen by the driver, with the optional seed input appended.
pub fn task_text(task: &str, seed_input: Option<&str>) -> String {
    match seed_input {
        Some(input) if !input.trim().is_empty() => {
            format!("{task}\n\n{SEED_PREAMBLE}\n{input}")
        }
        _ => task.to_string(),
    }
}
