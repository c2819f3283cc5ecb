use std::time::Duration;

/// Rejections detected before anything is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("a request is already in flight")]
    Busy,
}

/// Failures of a dispatched request
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("prompt blocked: {0}")]
    Blocked(String),
    #[error("response contained no text")]
    EmptyResponse,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request task aborted: {0}")]
    Aborted(String),
}

/// Any way a send can end without a reply
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
