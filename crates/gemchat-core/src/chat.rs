//! The chat session: draft, transcript, and request lifecycle.
//!
//! Sending is split in two so a UI never holds the session across an await:
//! [`ChatSession::begin_send`] validates the draft and produces an
//! [`OutgoingRequest`], the caller runs [`dispatch`] wherever it likes, and
//! [`ChatSession::complete_send`] applies the outcome.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::ai::{ChatBackend, ChatRequest};
use crate::error::{ApiError, ChatError, SendError};
use crate::pending::{ConcurrencyMode, PendingRequests, RequestId};
use crate::state::Conversation;

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
pub const SENT_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Modal notices shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PromptRequired,
    RequestFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::PromptRequired => "Please enter a prompt",
            Notice::RequestFailed => "An error occurred while processing your request.",
        }
    }
}

impl SendError {
    /// Notice to raise, if any. A busy send is refused silently because the
    /// send control is already shown disabled.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            SendError::EmptyPrompt => Some(Notice::PromptRequired),
            SendError::Busy => None,
        }
    }
}

impl ChatError {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            ChatError::Send(e) => e.notice(),
            ChatError::Api(_) => Some(Notice::RequestFailed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_output_tokens: u32,
    pub concurrency: ConcurrencyMode,
    pub sent_notice: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            concurrency: ConcurrencyMode::default(),
            sent_notice: SENT_NOTICE_DURATION,
        }
    }
}

/// A request that has been marked pending and is ready to dispatch
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub id: RequestId,
    pub request: ChatRequest,
}

/// Prompt text and send time captured at dispatch
#[derive(Debug)]
struct SentPrompt {
    id: RequestId,
    text: String,
    sent_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct ChatSession {
    conversation: Conversation,
    draft: String,
    pending: PendingRequests,
    prompts: Vec<SentPrompt>,
    sent_at: Option<Instant>,
    settings: SessionSettings,
}

impl ChatSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            conversation: Conversation::new(),
            draft: String::new(),
            pending: PendingRequests::new(settings.concurrency),
            prompts: Vec::new(),
            sent_at: None,
            settings,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Whether the send control is enabled
    pub fn can_send(&self) -> bool {
        self.pending.can_dispatch()
    }

    /// Validate the draft, allocate an id and mark it pending.
    pub fn begin_send(&mut self) -> Result<OutgoingRequest, SendError> {
        if self.draft.is_empty() {
            return Err(SendError::EmptyPrompt);
        }
        if !self.pending.can_dispatch() {
            return Err(SendError::Busy);
        }

        let id = self.pending.allocate();
        self.pending.mark_pending(id);
        self.prompts.push(SentPrompt {
            id,
            text: self.draft.clone(),
            sent_at: Local::now(),
        });

        let request = ChatRequest {
            history: self.conversation.history(),
            message: self.draft.clone(),
            max_output_tokens: self.settings.max_output_tokens,
        };

        tracing::debug!(request = %id, history = request.history.len(), "Dispatching message");
        Ok(OutgoingRequest { id, request })
    }

    /// Apply the outcome of a dispatched request.
    ///
    /// The id is cleared before anything else, whatever the outcome. On
    /// success the exchange is appended and the draft cleared; on failure the
    /// transcript and draft are left as they were and the error is returned.
    /// Outcomes for ids that are not pending are ignored.
    pub fn complete_send(
        &mut self,
        id: RequestId,
        outcome: Result<String, ApiError>,
        now: Instant,
    ) -> Result<(), ApiError> {
        let Some(elapsed) = self.pending.clear(id) else {
            tracing::warn!(request = %id, "Ignoring reply for a request that is not pending");
            return Ok(());
        };
        let prompt = self.take_prompt(id);

        match outcome {
            Ok(reply) => {
                tracing::debug!(request = %id, ?elapsed, chars = reply.len(), "Reply received");
                let (text, sent_at) = match prompt {
                    Some(p) => (p.text, Some(p.sent_at)),
                    None => (String::new(), None),
                };
                self.conversation
                    .push_exchange(text, sent_at, reply, Some(Local::now()));
                self.draft.clear();
                self.sent_at = Some(now);
                Ok(())
            }
            Err(e) => {
                tracing::error!(request = %id, ?elapsed, error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Begin, dispatch and complete in one step.
    pub async fn send(
        &mut self,
        backend: &dyn ChatBackend,
        timeout: Option<Duration>,
    ) -> Result<(), ChatError> {
        let outgoing = self.begin_send()?;
        let outcome = dispatch(backend, &outgoing.request, timeout).await;
        self.complete_send(outgoing.id, outcome, Instant::now())?;
        Ok(())
    }

    /// Whether the "message sent" banner is showing at `now`
    pub fn sent_notice_visible(&self, now: Instant) -> bool {
        self.sent_at
            .map(|at| now.saturating_duration_since(at) < self.settings.sent_notice)
            .unwrap_or(false)
    }

    /// Expire the "message sent" banner once its time is up
    pub fn tick(&mut self, now: Instant) {
        if self.sent_at.is_some() && !self.sent_notice_visible(now) {
            self.sent_at = None;
        }
    }

    fn take_prompt(&mut self, id: RequestId) -> Option<SentPrompt> {
        let idx = self.prompts.iter().position(|p| p.id == id)?;
        Some(self.prompts.remove(idx))
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

/// Run one request against `backend`, bounded by `timeout` when set.
pub async fn dispatch(
    backend: &dyn ChatBackend,
    request: &ChatRequest,
    timeout: Option<Duration>,
) -> Result<String, ApiError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, backend.send_message(request))
            .await
            .map_err(|_| ApiError::Timeout(limit))?,
        None => backend.send_message(request).await,
    }
}
