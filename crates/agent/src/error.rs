//! Errors that end a task early.
//!
//! Every variant here is fatal to the current task only. The execution loop
//! matches on it, logs it, and turns it into the failure answer; none of
//! them escape a [`TaskRun`](crate::TaskRun).

use taskpilot_core::error::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    /// The driver asked for a tool it was never offered.
    #[error("Driver called tool '{name}', which matches none of the provided tools")]
    UnknownTool { name: String },

    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The completion self-check did not decode as `{"complete": bool}`.
    #[error("Malformed completion verdict: {0}")]
    MalformedVerdict(String),

    /// A structured answer was requested but the driver returned non-JSON.
    #[error("Malformed structured answer: {0}")]
    MalformedAnswer(String),
}
