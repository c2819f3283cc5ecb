use std::sync::Arc;
use std::time::{Duration, Instant};

use gemchat_core::{
    dispatch, ApiError, ChatBackend, ChatSession, Notice, OutgoingRequest, RequestId,
    SessionSettings,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::tui::AppEvent;
use crate::ui::{self, ChatLayout};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,

    // Input state
    pub cursor: usize, // cursor position in the draft, in chars

    // Modal notice; swallows input until dismissed
    pub alert: Option<Notice>,

    // Transcript view
    pub chat_scroll: u16,
    pub animation_frame: u8, // 0-2 for the typing ellipsis

    // Last known terminal area, for layout and mouse hit-testing
    pub viewport: Rect,

    backend: Arc<dyn ChatBackend>,
    request_timeout: Option<Duration>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        settings: SessionSettings,
        request_timeout: Option<Duration>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            session: ChatSession::new(settings),
            cursor: 0,
            alert: None,
            chat_scroll: 0,
            animation_frame: 0,
            viewport: Rect::default(),
            backend,
            request_timeout,
            events,
        }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model()
    }

    pub fn layout(&self) -> ChatLayout {
        ChatLayout::new(self.viewport)
    }

    /// Submit the draft. The reply comes back later as `AppEvent::Reply`.
    pub fn send(&mut self) {
        let OutgoingRequest { id, request } = match self.session.begin_send() {
            Ok(outgoing) => outgoing,
            Err(e) => {
                match e.notice() {
                    Some(notice) => self.alert = Some(notice),
                    None => tracing::debug!(reason = %e, "Send ignored"),
                }
                return;
            }
        };

        let backend = self.backend.clone();
        let timeout = self.request_timeout;
        let task = tokio::spawn(async move { dispatch(backend.as_ref(), &request, timeout).await });

        // Report back even if the request task dies, so the id is always cleared
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = task
                .await
                .unwrap_or_else(|e| Err(ApiError::Aborted(e.to_string())));
            if tx.send(AppEvent::Reply { id, outcome }).is_err() {
                tracing::debug!(request = %id, "Reply dropped, event loop has stopped");
            }
        });

        self.scroll_to_bottom();
    }

    pub fn on_reply(&mut self, id: RequestId, outcome: Result<String, ApiError>) {
        if self
            .session
            .complete_send(id, outcome, Instant::now())
            .is_err()
        {
            self.alert = Some(Notice::RequestFailed);
        }
        self.cursor = self.cursor.min(self.session.draft().chars().count());
        self.scroll_to_bottom();
    }

    /// Tick animation frame and expire the sent banner (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if self.session.pending().is_any_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.session.tick(now);
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.session.draft().to_string();
        let byte_pos = char_to_byte_index(&draft, self.cursor);
        draft.insert(byte_pos, c);
        self.session.set_draft(draft);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let mut draft = self.session.draft().to_string();
            let byte_pos = char_to_byte_index(&draft, self.cursor);
            draft.remove(byte_pos);
            self.session.set_draft(draft);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.session.draft().chars().count();
        if self.cursor < char_count {
            let mut draft = self.session.draft().to_string();
            let byte_pos = char_to_byte_index(&draft, self.cursor);
            draft.remove(byte_pos);
            self.session.set_draft(draft);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.session.draft().chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.session.draft().chars().count();
    }

    // Transcript scrolling

    fn max_scroll(&self) -> u16 {
        let area = self.layout().messages;
        let inner_width = area.width.saturating_sub(2);
        let inner_height = area.height.saturating_sub(2);
        ui::transcript_height(self, inner_width).saturating_sub(inner_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn half_page(&self) -> u16 {
        (self.layout().messages.height.saturating_sub(2) / 2).max(1)
    }

    /// Scroll the transcript so the newest message (or typing line) is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }
}
