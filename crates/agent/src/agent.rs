//! The agent: a driver, a tool set, and the limits a task runs under.

use std::sync::Arc;

use futures::Stream;
use taskpilot_core::agent::{AgentConfig, UnknownToolPolicy, DEFAULT_MAX_ITERATIONS, DEFAULT_MEMORY_WINDOW};
use taskpilot_core::driver::{Driver, ResponseFormat};
use taskpilot_core::event::EventBus;
use taskpilot_core::tool::ToolRegistry;

use crate::memory::Session;
use crate::run::TaskRun;
use crate::step::{AgentResult, AgentStep};

/// Executes tasks through the plan → act → observe → output cycle.
///
/// An `Agent` is immutable configuration. Conversation state lives in a
/// [`Session`], which the caller owns and lends to each task.
pub struct Agent {
    /// The model backend
    driver: Arc<dyn Driver>,

    /// Tools offered during ACTION
    tools: Arc<ToolRegistry>,

    /// Role description used as the system message of new sessions
    description: String,

    /// Advancement budget per task
    max_iterations: u32,

    /// Chat memory window for new sessions
    memory_window: usize,

    /// Sampling temperature for every generation
    temperature: f32,

    /// Shape of the final answer; free text when unset
    response_format: Option<ResponseFormat>,

    /// Handling of tool calls naming unregistered tools
    unknown_tools: UnknownToolPolicy,

    /// Event bus for domain events
    event_bus: Option<Arc<EventBus>>,
}

impl Agent {
    /// Create an agent with default limits.
    pub fn new(
        driver: Arc<dyn Driver>,
        description: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            driver,
            tools,
            description: description.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            memory_window: DEFAULT_MEMORY_WINDOW,
            temperature: 0.0,
            response_format: None,
            unknown_tools: UnknownToolPolicy::default(),
            event_bus: None,
        }
    }

    /// Create an agent from the `[agent]` configuration section.
    pub fn from_config(
        driver: Arc<dyn Driver>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        Self::new(driver, config.description.clone(), tools)
            .with_max_iterations(config.max_iterations)
            .with_memory_window(config.memory_window)
            .with_temperature(config.temperature)
            .with_unknown_tools(config.unknown_tools)
    }

    /// Set the maximum number of advancements per task.
    ///
    /// A budget of zero is raised to one, which is the terminal step alone.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the chat memory window for sessions created by this agent.
    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.memory_window = window;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Require the final answer to be JSON matching `schema`.
    pub fn with_response_schema(self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.with_response_format(ResponseFormat::JsonSchema {
            name: name.into(),
            schema,
        })
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_unknown_tools(mut self, policy: UnknownToolPolicy) -> Self {
        self.unknown_tools = policy;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn response_format(&self) -> Option<&ResponseFormat> {
        self.response_format.as_ref()
    }

    pub fn unknown_tools(&self) -> UnknownToolPolicy {
        self.unknown_tools
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_deref()
    }

    /// A fresh session anchored by this agent's role description.
    pub fn new_session(&self) -> Session {
        Session::new(&self.description, self.memory_window)
    }

    /// Prepare a task without advancing it.
    pub fn start<'a>(
        &'a self,
        session: &'a mut Session,
        task: &str,
        seed_input: Option<&str>,
    ) -> TaskRun<'a> {
        TaskRun::new(self, session, task, seed_input)
    }

    /// Run a task lazily, one step per poll.
    ///
    /// Dropping the stream before the terminal step abandons the task and
    /// leaves the session's history untouched.
    pub fn stream<'a>(
        &'a self,
        session: &'a mut Session,
        task: &str,
        seed_input: Option<&str>,
    ) -> impl Stream<Item = AgentStep> + use<'a> {
        self.start(session, task, seed_input).into_stream()
    }

    /// Run a task to completion and return only its result.
    pub async fn execute(
        &self,
        session: &mut Session,
        task: &str,
        seed_input: Option<&str>,
    ) -> AgentResult {
        self.start(session, task, seed_input).run_to_end().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayDriver;

    fn agent() -> Agent {
        Agent::new(
            Arc::new(ReplayDriver::new(vec![])),
            "role",
            Arc::new(ToolRegistry::new()),
        )
    }

    #[test]
    fn defaults() {
        let agent = agent();
        assert_eq!(agent.max_iterations(), 20);
        assert_eq!(agent.temperature(), 0.0);
        assert!(agent.response_format().is_none());
        assert_eq!(agent.unknown_tools(), UnknownToolPolicy::Abort);
        assert!(agent.event_bus().is_none());
    }

    #[test]
    fn from_config_applies_every_field() {
        let config = AgentConfig {
            description: "Supplier analyst".into(),
            max_iterations: 7,
            memory_window: 6,
            temperature: 0.2,
            unknown_tools: UnknownToolPolicy::Observe,
        };
        let agent = Agent::from_config(
            Arc::new(ReplayDriver::new(vec![])),
            Arc::new(ToolRegistry::new()),
            &config,
        );
        assert_eq!(agent.description(), "Supplier analyst");
        assert_eq!(agent.max_iterations(), 7);
        assert_eq!(agent.unknown_tools(), UnknownToolPolicy::Observe);
        assert_eq!(agent.new_session().chat().window(), 6);
    }

    #[test]
    fn response_schema_is_structured() {
        let agent = agent().with_response_schema("summary", serde_json::json!({"type": "object"}));
        assert!(agent.response_format().unwrap().is_structured());
    }

    #[tokio::test]
    async fn zero_iteration_budget_is_raised_to_one() {
        let driver = Arc::new(ReplayDriver::new(vec![]));
        let agent = Agent::new(driver.clone(), "role", Arc::new(ToolRegistry::new()))
            .with_max_iterations(0);
        assert_eq!(agent.max_iterations(), 1);

        let mut session = agent.new_session();
        let result = agent.execute(&mut session, "task", None).await;
        assert_eq!(result.outcome, crate::step::Outcome::Exhausted);
        assert_eq!(result.iterations, 1);
        assert!(result.iterations <= agent.max_iterations());
        assert_eq!(driver.calls(), 0);
    }

    #[test]
    fn new_session_uses_description() {
        let session = agent().new_session();
        assert_eq!(session.chat().system_prompt(), "role");
    }
}
