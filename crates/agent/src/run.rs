//! The execution loop for a single task.
//!
//! A [`TaskRun`] is a pull-based producer: each call to
//! [`TaskRun::next_step`] performs exactly one advancement of the step
//! controller and returns the step it produced. Nothing happens between
//! calls, so the caller controls pacing and may stop at any point.
//!
//! Guarantees:
//! - the last step of every run is [`AgentStep::Result`];
//! - a run never performs more than `max_iterations` advancements;
//! - errors are matched here and turned into the failure answer, never
//!   returned to the caller;
//! - the session's history is only written by the terminal step, so a run
//!   dropped early leaves it unchanged.

use chrono::Utc;
use futures::Stream;
use taskpilot_core::event::DomainEvent;
use taskpilot_core::message::Message;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::memory::{ScratchMemory, Session};
use crate::prompts;
use crate::step::{AgentOutput, AgentResult, AgentStep, Outcome, Phase};

/// One task in flight on a session.
pub struct TaskRun<'a> {
    pub(crate) agent: &'a Agent,
    pub(crate) session: &'a mut Session,
    /// The task's user message, committed to history with the answer.
    pub(crate) task: Message,
    pub(crate) scratch: ScratchMemory,
    pub(crate) phase: Phase,
    pub(crate) iterations: u32,
    pub(crate) finished: bool,
}

impl<'a> TaskRun<'a> {
    pub(crate) fn new(
        agent: &'a Agent,
        session: &'a mut Session,
        task: &str,
        seed_input: Option<&str>,
    ) -> Self {
        let task = Message::user(prompts::task_text(task, seed_input));

        info!(
            session_id = %session.id(),
            history = session.history().len(),
            max_iterations = agent.max_iterations(),
            "Task started"
        );

        if let Some(bus) = agent.event_bus() {
            bus.publish(DomainEvent::TaskStarted {
                session_id: session.id().to_string(),
                task_preview: task.content.chars().take(80).collect(),
                timestamp: Utc::now(),
            });
        }

        Self {
            agent,
            session,
            task,
            scratch: ScratchMemory::new(),
            phase: Phase::Plan,
            iterations: 0,
            finished: false,
        }
    }

    /// The state the next advancement will run.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advancements performed so far.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The task's user message as the driver sees it.
    pub fn task(&self) -> &Message {
        &self.task
    }

    /// Messages produced so far by this task.
    pub fn scratch(&self) -> &[Message] {
        self.scratch.messages()
    }

    /// What the driver is shown: history, then the task, then scratch.
    pub fn transcript(&self) -> Vec<Message> {
        let history = self.session.history();
        let mut messages = Vec::with_capacity(history.len() + 1 + self.scratch.len());
        messages.extend_from_slice(history);
        messages.push(self.task.clone());
        messages.extend_from_slice(self.scratch.messages());
        messages
    }

    /// Perform one advancement.
    ///
    /// Returns `None` only after the terminal step has been returned.
    pub async fn next_step(&mut self) -> Option<AgentStep> {
        if self.finished {
            return None;
        }

        let exhausted = self.iterations + 1 >= self.agent.max_iterations();
        self.iterations += 1;

        if exhausted {
            warn!(
                session_id = %self.session.id(),
                iterations = self.iterations,
                "Iteration budget reached, forcing output"
            );
            return Some(self.finish(Outcome::Exhausted).await);
        }

        debug!(
            session_id = %self.session.id(),
            iteration = self.iterations,
            phase = %self.phase,
            "Advancing task"
        );

        match self.advance().await {
            Ok(step) => Some(step),
            Err(e) => {
                error!(
                    session_id = %self.session.id(),
                    phase = %self.phase,
                    error = %e,
                    "Task aborted"
                );
                self.report_error(format!("{} step", self.phase), &e);
                Some(self.finish(Outcome::Failed).await)
            }
        }
    }

    /// Drain the run and return the terminal result.
    pub async fn run_to_end(mut self) -> AgentResult {
        while let Some(step) = self.next_step().await {
            if let AgentStep::Result(result) = step {
                return result;
            }
        }
        // next_step yields a result before it ever yields None.
        AgentResult {
            output: AgentOutput::Text(prompts::ERROR_MESSAGE.into()),
            outcome: Outcome::Failed,
            iterations: self.iterations,
        }
    }

    /// Expose the run as a lazy stream of steps.
    pub fn into_stream(self) -> impl Stream<Item = AgentStep> + 'a {
        futures::stream::unfold(self, |mut run| async move {
            let step = run.next_step().await?;
            Some((step, run))
        })
    }

    pub(crate) fn report_error(&self, context: String, error: &dyn std::error::Error) {
        if let Some(bus) = self.agent.event_bus() {
            bus.publish(DomainEvent::ErrorOccurred {
                context,
                error_message: error.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}
