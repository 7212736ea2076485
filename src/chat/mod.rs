//! `TakaBot` chat
//!
//! [`engine::ChatEngine`] is the synchronous state machine
//! (`idle → awaiting response → typing → idle`), [`responder::Responder`]
//! produces replies and [`session::ChatSession`] drives both on tokio timers.

use thiserror::Error;

use crate::{auth::AccessMode, marketplace::MarketplaceQuery};

pub mod engine;
pub mod responder;
pub mod reveal;
pub mod session;

use engine::RequestId;

/// Questions offered as one-tap buttons.
pub const PRESET_QUESTIONS: [&str; 2] = [
    "What types of waste have highest demand?",
    "How does the AI scanner work?",
];

const GUEST_GREETING: &str = "Hi! 👋 I'm TakaBot. You're in Guest Mode, so I can answer basic questions about:\n\n• Waste types and demand\n• How the AI scanner works\n\nPlease use the preset questions below or ask about these topics.";

const MEMBER_GREETING: &str = "Hi! 👋 I'm TakaBot, your waste trading assistant. I can help you with:\n\n• Finding waste materials near you\n• Checking market prices and demand\n• Using the AI scanner\n• Understanding quality grades\n\nWhat can I help you with today?";

/// Chat errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Message was blank after trimming
    #[error("Message is empty")]
    Empty,

    /// A reply is still being produced for this request
    #[error("Still answering request {0}")]
    Busy(RequestId),

    /// Call refers to a request that is no longer current
    #[error("Request {0} is no longer current")]
    StaleRequest(RequestId),

    /// Responder failed
    #[error("Responder failed: {0}")]
    Responder(String),
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    /// The person chatting
    User,

    /// `TakaBot`
    Bot,
}

/// Where an action button leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Marketplace page with a query applied
    Marketplace(MarketplaceQuery),
}

/// Button attached to a bot message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAction {
    /// Button label
    pub label: String,

    /// Target
    pub navigation: Navigation,
}

impl ChatAction {
    /// "View Glass Bottles": glass listings in Kenya.
    pub fn view_glass_bottles() -> Self {
        Self {
            label: "View Glass Bottles".to_string(),
            navigation: Navigation::Marketplace(
                MarketplaceQuery::search("glass").in_country("Kenya"),
            ),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author
    pub author: Author,

    /// Full text
    pub text: String,

    /// Optional button
    pub action: Option<ChatAction>,
}

impl ChatMessage {
    /// Message from the person chatting.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
            action: None,
        }
    }

    /// Message from `TakaBot`.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            author: Author::Bot,
            text: text.into(),
            action: None,
        }
    }

    /// Attach a button.
    #[must_use]
    pub fn with_action(mut self, action: Option<ChatAction>) -> Self {
        self.action = action;
        self
    }
}

/// Opening message for `mode`.
pub fn greeting(mode: AccessMode) -> &'static str {
    match mode {
        AccessMode::Guest => GUEST_GREETING,
        AccessMode::Member => MEMBER_GREETING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_differ_by_mode() {
        assert!(greeting(AccessMode::Guest).contains("Guest Mode"));
        assert!(greeting(AccessMode::Member).contains("Understanding quality grades"));
    }

    #[test]
    fn glass_action_targets_kenya() {
        let action = ChatAction::view_glass_bottles();

        let Navigation::Marketplace(query) = &action.navigation;

        assert_eq!(query.to_string(), "search=glass&location=Kenya");
    }
}
