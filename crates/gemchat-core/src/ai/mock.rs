use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatBackend, ChatRequest};
use crate::error::ApiError;

/// Scripted backend for tests and offline runs.
///
/// Replies are handed out in the order they were queued; once the queue is
/// empty every call answers with "Mock answer".
#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<String, ApiError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, text: &str) {
        self.lock_replies().push_back(Ok(text.to_string()));
    }

    pub fn push_error(&self, error: ApiError) {
        self.lock_replies().push_back(Err(error));
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, ApiError>>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn model(&self) -> &str {
        "mock"
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<String, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| Ok("Mock answer".to_string()))
    }
}
