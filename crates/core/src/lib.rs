//! # taskpilot core
//!
//! Domain types, traits, and error definitions for the taskpilot agent
//! engine. This crate carries no runtime machinery; it defines the contracts
//! the agent loop and its collaborators are written against.
//!
//! ## Design Philosophy
//!
//! The language-model backend ([`Driver`]) and the capabilities offered to
//! it ([`Tool`]) are traits here. Implementations live with the host
//! application, which keeps the agent loop testable with scripted stand-ins.

pub mod agent;
pub mod driver;
pub mod error;
pub mod event;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, UnknownToolPolicy};
pub use driver::{Driver, DriverRequest, DriverResponse, ResponseFormat, ToolChoice, ToolDefinition, Usage};
pub use error::{DriverError, Error, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, SessionId};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
