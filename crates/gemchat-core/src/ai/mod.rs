pub mod gemini;
pub mod mock;

pub use gemini::GeminiClient;
pub use mock::MockBackend;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::state::HistoryTurn;

/// Everything needed to ask the model for its next reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub history: Vec<HistoryTurn>,
    pub message: String,
    pub max_output_tokens: u32,
}

/// A hosted model that can continue a conversation.
///
/// Implementations are built once at startup and shared behind an `Arc`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier shown in the UI
    fn model(&self) -> &str;

    async fn send_message(&self, request: &ChatRequest) -> Result<String, ApiError>;
}
