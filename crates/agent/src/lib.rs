//! The task execution engine of TaskPilot.
//!
//! A task runs through a **Plan → Act → Observe → Output** cycle:
//!
//! 1. **Plan**: the driver writes what it should do next
//! 2. **Act**: the driver works on it, optionally calling tools
//! 3. **Observe**: the driver judges whether the task is complete
//! 4. **Output**: the driver answers, and the exchange is committed to memory
//!
//! Each advancement yields one [`AgentStep`], pulled lazily by the caller.
//! The iteration budget guarantees that every task ends with
//! [`AgentStep::Result`], even when the driver never judges it complete.

pub mod agent;
mod controller;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod prompts;
pub mod replay;
pub mod run;
pub mod step;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::Agent;
pub use dispatcher::{Dispatch, ToolDispatcher};
pub use error::StepError;
pub use memory::{ChatMemory, MIN_MEMORY_WINDOW, MemoryError, ScratchMemory, Session};
pub use replay::ReplayDriver;
pub use run::TaskRun;
pub use step::{AgentOutput, AgentResult, AgentStep, Outcome, Phase};
