//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Error;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::tool::Tool;

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
        }
    }

    /// Queue a response to be returned by the next complete() call.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        self.queue_completion(content, FinishReason::Stop);
    }

    /// Queue a response that ended for the given reason.
    pub fn queue_completion(&self, content: &str, finish_reason: FinishReason) {
        let response = CompletionResponse {
            message: Message::assistant(content),
            thinking: None,
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason,
        };
        self.responses.lock().unwrap().insert(0, Ok(response));
    }

    /// Queue a failure for the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(Error::api(500, "No mock response queued")))
    }
}

/// A mock tool that records every argument it is called with.
///
/// Queued results are returned in FIFO order; once the queue is empty the tool
/// answers `result for <argument>`.
pub struct MockTool {
    description: String,
    results: Mutex<Vec<Result<String, Error>>>,
    calls: Mutex<Vec<String>>,
}

impl MockTool {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            results: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_result(&self, result: Result<String, Error>) {
        self.results.lock().unwrap().insert(0, result);
    }

    /// Arguments received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, argument: &str) -> Result<String, Error> {
        self.calls.lock().unwrap().push(argument.to_string());
        self.results
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(format!("result for {}", argument)))
    }
}
