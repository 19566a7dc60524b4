//! A driver that plays back recorded responses.
//!
//! Useful for demos, regression fixtures, and tests: every `generate` call
//! returns the next recorded [`DriverResponse`] and remembers the request it
//! was given. When the recording runs out the driver fails with
//! [`DriverError::Exhausted`], which the agent treats like any other
//! backend failure.
//!
//! Recordings are JSON, either a bare array of responses or an object with a
//! `responses` array:
//!
//! ```json
//! { "responses": [
//!     { "content": "Look the company up." },
//!     { "tool_calls": [{ "id": "c1", "name": "web_search", "arguments": "{\"query\":\"acme\"}" }] },
//!     { "content": "{\"complete\": true}" },
//!     { "content": "Acme makes anvils." }
//! ] }
//! ```

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use taskpilot_core::driver::{Driver, DriverRequest, DriverResponse};
use taskpilot_core::error::{DriverError, Error};
use tracing::debug;

#[derive(Deserialize)]
#[serde(untagged)]
enum Recording {
    List(Vec<DriverResponse>),
    Wrapped { responses: Vec<DriverResponse> },
}

/// Plays back a fixed sequence of driver responses.
pub struct ReplayDriver {
    responses: Mutex<VecDeque<DriverResponse>>,
    requests: Mutex<Vec<DriverRequest>>,
}

impl ReplayDriver {
    pub fn new(responses: Vec<DriverResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Parse a JSON recording.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let responses = match serde_json::from_str::<Recording>(json)? {
            Recording::List(responses) | Recording::Wrapped { responses } => responses,
        };
        Ok(Self::new(responses))
    }

    /// Load a JSON recording from disk.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read replay file {}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    /// Responses not yet played.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    /// Number of `generate` calls received so far.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<DriverRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Driver for ReplayDriver {
    fn name(&self) -> &str {
        "replay"
    }

    async fn generate(&self, request: DriverRequest) -> Result<DriverResponse, DriverError> {
        let call = {
            let mut requests = lock(&self.requests);
            requests.push(request);
            requests.len()
        };

        let next = lock(&self.responses).pop_front();
        match next {
            Some(response) => {
                debug!(call, tool_calls = response.tool_calls.len(), "Replaying recorded response");
                Ok(response)
            }
            None => Err(DriverError::Exhausted(format!(
                "recording ended before call #{call}"
            ))),
        }
    }
}
