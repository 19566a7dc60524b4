//! The step controller: one advancement per state.
//!
//! ```text
//! PLAN ──▶ ACTION ──▶ OBSERVE ──┬──▶ OUTPUT (terminal)
//!   ▲                           │
//!   └────── not complete ───────┘
//! ```
//!
//! Every state appends its instruction and its outcome to scratch memory.
//! Only [`TaskRun::finish`] writes to the session's chat memory.

use chrono::Utc;
use taskpilot_core::driver::{DriverRequest, DriverResponse, ResponseFormat, ToolChoice};
use taskpilot_core::event::DomainEvent;
use taskpilot_core::message::Message;
use tracing::{debug, error, info};

use crate::dispatcher::ToolDispatcher;
use crate::error::StepError;
use crate::prompts::{self, CompletionVerdict};
use crate::run::TaskRun;
use crate::step::{AgentOutput, AgentResult, AgentStep, Outcome, Phase};

impl TaskRun<'_> {
    /// Run the current state once.
    pub(crate) async fn advance(&mut self) -> Result<AgentStep, StepError> {
        match self.phase {
            Phase::Plan => self.plan().await,
            Phase::Action => self.act().await,
            Phase::Observe => self.observe().await,
            Phase::Output => Ok(self.finish(Outcome::Answered).await),
        }
    }

    async fn plan(&mut self) -> Result<AgentStep, StepError> {
        self.scratch.push(Message::system(prompts::PLAN_INSTRUCTION));
        let response = self.generate(DriverRequest::new(self.transcript())).await?;

        let plan = response.content_text().to_string();
        self.scratch.push(Message::assistant(plan.clone()));
        Ok(self.progress(Phase::Plan, Phase::Action, plan))
    }

    async fn act(&mut self) -> Result<AgentStep, StepError> {
        self.scratch.push(Message::system(prompts::ACTION_INSTRUCTION));

        let tools = self.agent.tools();
        let mut request = DriverRequest::new(self.transcript());
        if !tools.is_empty() {
            request = request.with_tools(tools.definitions(), ToolChoice::Auto);
        }
        let response = self.generate(request).await?;

        if response.tool_calls.is_empty() {
            let text = response.content_text().to_string();
            self.scratch.push(Message::assistant(text.clone()));
            return Ok(self.progress(Phase::Action, Phase::Observe, text));
        }

        let dispatch = ToolDispatcher::new(tools)
            .with_unknown_tools(self.agent.unknown_tools())
            .with_event_bus(self.agent.event_bus())
            .dispatch(response.tool_calls)
            .await?;

        if dispatch.failures > 0 {
            debug!(failures = dispatch.failures, "Tool batch had failures");
        }

        let summary = dispatch.summary();
        self.scratch.extend(dispatch.into_messages());
        Ok(self.progress(Phase::Action, Phase::Observe, summary))
    }

    async fn observe(&mut self) -> Result<AgentStep, StepError> {
        self.scratch.push(Message::system(prompts::observe_instruction()));
        let request = DriverRequest::new(self.transcript())
            .with_response_format(Some(ResponseFormat::JsonObject));
        let response = self.generate(request).await?;

        let verdict: CompletionVerdict =
            serde_json::from_str(strip_code_fence(response.content_text()))
                .map_err(|e| StepError::MalformedVerdict(e.to_string()))?;

        if verdict.complete {
            self.scratch.push(Message::assistant(prompts::COMPLETED));
            Ok(self.progress(Phase::Observe, Phase::Output, prompts::COMPLETED.into()))
        } else {
            self.scratch.push(Message::assistant(prompts::CONTINUING));
            Ok(self.progress(Phase::Observe, Phase::Plan, prompts::CONTINUING.into()))
        }
    }

    /// Generate the final answer in the caller's requested shape.
    async fn answer(&mut self) -> Result<AgentOutput, StepError> {
        self.scratch.push(Message::system(prompts::ANSWER_INSTRUCTION));
        let format = self.agent.response_format().cloned();
        let structured = format.as_ref().is_some_and(ResponseFormat::is_structured);

        let request = DriverRequest::new(self.transcript()).with_response_format(format);
        let response = self.generate(request).await?;
        let text = response.content_text();

        if structured {
            let value = serde_json::from_str(strip_code_fence(text))
                .map_err(|e| StepError::MalformedAnswer(e.to_string()))?;
            Ok(AgentOutput::Structured(value))
        } else {
            Ok(AgentOutput::Text(text.to_string()))
        }
    }

    /// Produce the terminal step and commit the task to chat memory.
    ///
    /// Resets the run so the session is ready for the next task.
    pub(crate) async fn finish(&mut self, outcome: Outcome) -> AgentStep {
        self.phase = Phase::Output;

        let output = match outcome {
            Outcome::Answered => match self.answer().await {
                Ok(output) => output,
                Err(e) => return self.fail_answer(e),
            },
            Outcome::Exhausted => AgentOutput::Text(prompts::EXHAUSTED_MESSAGE.into()),
            Outcome::Failed => AgentOutput::Text(prompts::ERROR_MESSAGE.into()),
        };

        self.commit(output, outcome)
    }

    /// A failed final answer still ends the task with the failure message.
    fn fail_answer(&mut self, error: StepError) -> AgentStep {
        error!(session_id = %self.session.id(), error = %error, "Answer generation failed");
        self.report_error("output step".into(), &error);
        self.commit(AgentOutput::Text(prompts::ERROR_MESSAGE.into()), Outcome::Failed)
    }

    fn commit(&mut self, output: AgentOutput, outcome: Outcome) -> AgentStep {
        let task = std::mem::replace(&mut self.task, Message::user(String::new()));
        let evicted = self
            .session
            .chat_mut()
            .commit(task, Message::assistant(output.to_text()));

        let iterations = self.iterations;
        self.scratch.clear();
        self.phase = Phase::Plan;
        self.iterations = 0;
        self.finished = true;

        info!(
            session_id = %self.session.id(),
            outcome = outcome.as_str(),
            iterations,
            evicted,
            "Task finished"
        );

        if let Some(bus) = self.agent.event_bus() {
            bus.publish(DomainEvent::TaskFinished {
                session_id: self.session.id().to_string(),
                outcome: outcome.as_str().to_string(),
                iterations,
                timestamp: Utc::now(),
            });
        }

        AgentStep::Result(AgentResult {
            output,
            outcome,
            iterations,
        })
    }

    async fn generate(&self, request: DriverRequest) -> Result<DriverResponse, StepError> {
        let request = request.with_temperature(self.agent.temperature());
        debug!(
            driver = self.agent.driver().name(),
            phase = %self.phase,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting generation"
        );
        Ok(self.agent.driver().generate(request).await?)
    }

    /// Record an intermediate step and move to the next state.
    fn progress(&mut self, from: Phase, to: Phase, content: String) -> AgentStep {
        self.phase = to;

        if let Some(bus) = self.agent.event_bus() {
            bus.publish(DomainEvent::StepEmitted {
                session_id: self.session.id().to_string(),
                phase: from.as_str().to_string(),
                iteration: self.iterations,
                timestamp: Utc::now(),
            });
        }

        AgentStep::Progress {
            phase: from,
            iteration: self.iterations,
            content,
        }
    }
}

/// Drop a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}
