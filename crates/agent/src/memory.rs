//! Conversational memory — persistent chat history and per-task scratch.
//!
//! Two sequences make up what the driver sees:
//!
//! - [`ChatMemory`] survives across tasks. It is anchored by the role
//!   description (system message) and holds one user/assistant pair per
//!   completed task, trimmed as a sliding window.
//! - [`ScratchMemory`] holds the plan/action/observation messages of the
//!   task currently running and is discarded when that task ends.
//!
//! A [`Session`] owns the chat memory of one independent conversation. The
//! caller keeps it and lends it to each task.

use serde::{Deserialize, Serialize};
use taskpilot_core::message::{Message, Role, SessionId};
use taskpilot_core::agent::DEFAULT_MEMORY_WINDOW;
use thiserror::Error;
use tracing::debug;

pub use taskpilot_core::agent::MIN_MEMORY_WINDOW;

/// A stored chat memory that breaks its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Chat memory has no messages")]
    Empty,

    #[error("Chat memory must start with a system message, found {0:?}")]
    MissingSystemMessage(Role),

    #[error("Chat memory has a second system message at index {0}")]
    ExtraSystemMessage(usize),

    #[error("Chat memory holds {len} messages, which does not fit a window of {window}")]
    ExceedsWindow { len: usize, window: usize },
}

/// Cross-task chat history with a fixed-size sliding window.
///
/// Invariants:
/// - index 0 is always the system message;
/// - after every commit the length is below `window`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChatMemory")]
pub struct ChatMemory {
    messages: Vec<Message>,
    window: usize,
}

/// The stored shape of [`ChatMemory`], checked before use.
#[derive(Deserialize)]
struct RawChatMemory {
    messages: Vec<Message>,
    window: usize,
}

impl TryFrom<RawChatMemory> for ChatMemory {
    type Error = MemoryError;

    fn try_from(raw: RawChatMemory) -> Result<Self, Self::Error> {
        let window = raw.window.max(MIN_MEMORY_WINDOW);
        let first = raw.messages.first().ok_or(MemoryError::Empty)?;
        if first.role != Role::System {
            return Err(MemoryError::MissingSystemMessage(first.role));
        }
        if let Some(index) = raw.messages.iter().skip(1).position(|m| m.role == Role::System) {
            return Err(MemoryError::ExtraSystemMessage(index + 1));
        }
        if raw.messages.len() >= window {
            return Err(MemoryError::ExceedsWindow {
                len: raw.messages.len(),
                window,
            });
        }
        Ok(Self {
            messages: raw.messages,
            window,
        })
    }
}

impl ChatMemory {
    /// Create a memory seeded with the role description.
    ///
    /// Windows smaller than [`MIN_MEMORY_WINDOW`] are raised to it.
    pub fn new(system_prompt: impl Into<String>, window: usize) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            window: window.max(MIN_MEMORY_WINDOW),
        }
    }

    /// The full history, system message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The role description this memory is anchored by.
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system message is never evicted.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of completed task exchanges currently remembered.
    pub fn exchanges(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }

    /// Record a finished task: its user message and the final answer.
    ///
    /// Returns the number of evicted messages (0 or 2).
    pub fn commit(&mut self, task: Message, answer: Message) -> usize {
        self.messages.push(task);
        self.messages.push(answer);

        if self.messages.len() >= self.window {
            // Oldest exchange goes; index 0 stays.
            self.messages.drain(1..3);
            debug!(
                remaining = self.messages.len(),
                window = self.window,
                "Evicted oldest exchange from chat memory"
            );
            return 2;
        }
        0
    }
}

/// Messages produced while a single task runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScratchMemory {
    messages: Vec<Message>,
}

impl ScratchMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// The conversation state of one independent agent session.
///
/// Exactly one task may borrow a session at a time; the borrow checker
/// enforces this because a running task holds `&mut Session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    chat: ChatMemory,
}

impl Session {
    /// Start a session with the given role description and memory window.
    pub fn new(system_prompt: impl Into<String>, window: usize) -> Self {
        Self {
            id: SessionId::new(),
            chat: ChatMemory::new(system_prompt, window),
        }
    }

    /// Start a session with the default memory window.
    pub fn with_default_window(system_prompt: impl Into<String>) -> Self {
        Self::new(system_prompt, DEFAULT_MEMORY_WINDOW)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The persistent chat history.
    pub fn history(&self) -> &[Message] {
        self.chat.messages()
    }

    pub fn chat(&self) -> &ChatMemory {
        &self.chat
    }

    pub(crate) fn chat_mut(&mut self) -> &mut ChatMemory {
        &mut self.chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_tasks(memory: &mut ChatMemory, count: usize) {
        for i in 0..count {
            memory.commit(
                Message::user(format!("task {i}")),
                Message::assistant(format!("answer {i}")),
            );
        }
    }

    #[test]
    fn new_memory_holds_only_system_message() {
        let memory = ChatMemory::new("You are helpful.", 10);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.messages()[0].role, Role::System);
        assert_eq!(memory.system_prompt(), "You are helpful.");
        assert_eq!(memory.exchanges(), 0);
    }

    #[test]
    fn commit_appends_pair_below_window() {
        let mut memory = ChatMemory::new("sys", 10);
        let evicted = memory.commit(Message::user("q"), Message::assistant("a"));
        assert_eq!(evicted, 0);
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.messages()[1].role, Role::User);
        assert_eq!(memory.messages()[2].role, Role::Assistant);
    }

    #[test]
    fn fifth_task_evicts_oldest_pair() {
        let mut memory = ChatMemory::new("sys", 10);
        complete_tasks(&mut memory, 4);
        assert_eq!(memory.len(), 9);

        let evicted = memory.commit(Message::user("task 4"), Message::assistant("answer 4"));
        assert_eq!(evicted, 2);
        assert_eq!(memory.len(), 9);
        assert_eq!(memory.messages()[0].role, Role::System);
        assert_eq!(memory.messages()[1].content, "task 1");
        assert_eq!(memory.messages()[2].content, "answer 1");
    }

    #[test]
    fn length_stays_bounded_over_many_tasks() {
        let mut memory = ChatMemory::new("sys", 10);
        for i in 0..50 {
            memory.commit(Message::user(format!("t{i}")), Message::assistant(format!("a{i}")));
            assert!(memory.len() < memory.window());
            assert_eq!(memory.system_prompt(), "sys");
        }
        // Most recent exchange is always last.
        assert_eq!(memory.messages().last().unwrap().content, "a49");
    }

    #[test]
    fn tiny_window_is_raised_to_minimum() {
        let mut memory = ChatMemory::new("sys", 0);
        assert_eq!(memory.window(), MIN_MEMORY_WINDOW);
        memory.commit(Message::user("q"), Message::assistant("a"));
        assert_eq!(memory.exchanges(), 1);
        assert_eq!(memory.messages()[0].role, Role::System);
        assert_eq!(memory.messages()[2].content, "a");
    }

    #[test]
    fn minimum_window_keeps_latest_exchange() {
        let mut memory = ChatMemory::new("sys", MIN_MEMORY_WINDOW);
        complete_tasks(&mut memory, 3);
        assert_eq!(memory.exchanges(), 1);
        assert_eq!(memory.messages()[1].content, "task 2");
        assert_eq!(memory.messages()[2].content, "answer 2");
    }

    #[test]
    fn stored_session_roundtrips() {
        let mut session = Session::new("role", 6);
        session
            .chat_mut()
            .commit(Message::user("q"), Message::assistant("a"));

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn stored_memory_without_system_message_rejected() {
        let json = r#"{"id":"s1","chat":{"messages":[],"window":10}}"#;
        let err = serde_json::from_str::<Session>(json).unwrap_err();
        assert!(err.to_string().contains("no messages"));

        let mut value = serde_json::to_value(ChatMemory::new("sys", 10)).unwrap();
        value["messages"][0]["role"] = "user".into();
        let err = serde_json::from_value::<ChatMemory>(value).unwrap_err();
        assert!(err.to_string().contains("must start with a system message"));
    }

    #[test]
    fn stored_memory_with_second_system_message_rejected() {
        let mut memory = ChatMemory::new("sys", 10);
        memory.commit(Message::system("again"), Message::assistant("a"));
        let json = serde_json::to_string(&memory).unwrap();
        let err = serde_json::from_str::<ChatMemory>(&json).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn stored_tiny_window_is_raised_and_checked() {
        let mut value = serde_json::to_value(ChatMemory::new("sys", 10)).unwrap();
        value["window"] = 0.into();
        let memory: ChatMemory = serde_json::from_value(value).unwrap();
        assert_eq!(memory.window(), MIN_MEMORY_WINDOW);
        assert!(!memory.is_empty());

        let mut memory = ChatMemory::new("sys", 10);
        complete_tasks(&mut memory, 2);
        let mut value = serde_json::to_value(&memory).unwrap();
        value["window"] = 2.into();
        let err = serde_json::from_value::<ChatMemory>(value).unwrap_err();
        assert!(err.to_string().contains("does not fit a window of 4"));
    }

    #[test]
    fn scratch_clear_empties_everything() {
        let mut scratch = ScratchMemory::new();
        scratch.push(Message::system("plan"));
        scratch.extend([Message::assistant("step"), Message::tool_result("c1", "ok")]);
        assert_eq!(scratch.len(), 3);
        scratch.clear();
        assert!(scratch.is_empty());
    }

    #[test]
    fn session_history_starts_with_role_description() {
        let session = Session::with_default_window("role");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.chat().window(), DEFAULT_MEMORY_WINDOW);
    }
}
