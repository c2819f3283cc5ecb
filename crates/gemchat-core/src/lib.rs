pub mod ai;
pub mod chat;
pub mod config;
pub mod error;
pub mod pending;
pub mod state;

// Re-export main types for convenience
pub use ai::{ChatBackend, ChatRequest, GeminiClient, MockBackend};
pub use chat::{dispatch, ChatSession, Notice, OutgoingRequest, SessionSettings};
pub use config::Config;
pub use error::{ApiError, ChatError, SendError};
pub use pending::{ConcurrencyMode, PendingRequests, RequestId};
pub use state::{ChatMessage, ChatRole, Conversation, HistoryTurn};
