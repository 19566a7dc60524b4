//! `taskpilot run` — Run one task and stream its steps.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use taskpilot_agent::{Agent, AgentStep, ReplayDriver};
use taskpilot_config::AppConfig;
use taskpilot_core::event::{DomainEvent, EventBus};

pub struct RunArgs {
    pub task: String,
    pub replay: PathBuf,
    pub input: Option<String>,
    pub max_iterations: Option<u32>,
    pub quiet: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = args.max_iterations {
        if max == 0 {
            return Err("--max-iterations must be at least 1".into());
        }
        config.agent.max_iterations = max;
    }

    let driver = Arc::new(ReplayDriver::from_file(&args.replay)?);
    let tools = Arc::new(taskpilot_tools::default_registry(&config.tools));

    let event_bus = Arc::new(EventBus::default());
    let mut events = event_bus.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DomainEvent::ToolExecuted {
                tool_name,
                success,
                duration_ms,
                ..
            } = event.as_ref()
            {
                tracing::debug!(tool = %tool_name, success, duration_ms, "Tool executed");
            }
        }
    });

    let agent = Agent::from_config(driver.clone(), tools, &config.agent).with_event_bus(event_bus);
    let mut session = agent.new_session();

    let steps = agent.stream(&mut session, &args.task, args.input.as_deref());
    let mut steps = std::pin::pin!(steps);
    while let Some(step) = steps.next().await {
        match step {
            AgentStep::Progress {
                phase,
                iteration,
                content,
            } => {
                if !args.quiet {
                    println!("── {phase} ({iteration}) ──");
                    println!("{content}");
                    println!();
                }
            }
            AgentStep::Result(result) => {
                if !args.quiet {
                    println!(
                        "── {} after {} steps ──",
                        result.outcome.as_str(),
                        result.iterations
                    );
                }
                println!("{}", result.output.to_text());
            }
        }
    }

    logger.abort();

    if driver.remaining() > 0 {
        tracing::warn!(
            unused = driver.remaining(),
            "Replay file has responses the task never used"
        );
    }

    Ok(())
}
