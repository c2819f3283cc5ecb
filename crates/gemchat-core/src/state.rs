//! UI-agnostic conversation state
//!
//! These types are shared by every front end and don't depend on any
//! specific UI framework.

use chrono::{DateTime, Local};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: Option<DateTime<Local>>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    /// Role name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// One prior turn replayed to the API as history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Append-only transcript for a single session.
///
/// Messages only ever enter in user/model pairs, so the transcript always
/// alternates starting with the user.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record a completed exchange: the user's prompt followed by the reply,
    /// each stamped with when it was sent or received.
    pub fn push_exchange(
        &mut self,
        prompt: impl Into<String>,
        sent_at: Option<DateTime<Local>>,
        reply: impl Into<String>,
        received_at: Option<DateTime<Local>>,
    ) {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: prompt.into(),
            timestamp: sent_at,
        });
        self.messages.push(ChatMessage {
            role: ChatRole::Model,
            content: reply.into(),
            timestamp: received_at,
        });
    }

    /// Transcript in order, shaped as API history
    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .map(|msg| HistoryTurn {
                role: msg.role,
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_exchange_keeps_user_before_model() {
        let mut conversation = Conversation::new();
        conversation.push_exchange("Hello", None, "Hi there", None);

        let roles: Vec<ChatRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Model]);
        assert_eq!(conversation.messages()[0].content, "Hello");
        assert_eq!(conversation.messages()[1].content, "Hi there");
    }

    #[test]
    fn test_history_preserves_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.push_exchange("one", None, "1", None);
        conversation.push_exchange("two", None, "2", None);

        let history = conversation.history();
        let contents: Vec<&str> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "1", "two", "2"]);
        assert_eq!(history[2].role, ChatRole::User);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Model.as_str(), "model");
    }
}
