//! Reply sources.

use async_trait::async_trait;
use mockall::automock;
use tracing::debug;

use crate::auth::AccessMode;

use super::{ChatAction, ChatError, engine::RequestId};

const HIGHEST_DEMAND: &str = "What types of waste have highest demand?";
const SCANNER: &str = "How does the AI scanner work?";
const PRICING: &str = "How do I price my waste materials?";
const QUALITY: &str = "How to improve waste quality grade?";

const HIGHEST_DEMAND_REPLY: &str = "Currently, HDPE plastics, aluminum, and clean cardboard have the highest demand. Electronic waste and copper also show strong market interest.";
const SCANNER_REPLY: &str = "Upload a photo of your waste, enter quantity details, and our AI analyzes material type, quality grade, and provides market value estimates with 94% accuracy.";
const PRICING_REPLY: &str = "Pricing depends on material type, quality grade, and market demand. Our AI provides estimated values based on current market rates. Clean, sorted materials typically get 15-30% higher prices.";
const QUALITY_REPLY: &str = "Clean materials thoroughly, sort by type/color, remove contamination, and ensure proper storage. Grade A materials can be worth 2-3x more than Grade C.";

const GUEST_FALLBACK: &str = "Sorry, as a guest you can only ask the predefined questions shown below. Please select one of the preset questions or sign in for full chatbot access.";
const MEMBER_FALLBACK: &str = "I can help with waste trading, pricing, and platform features. Try asking about pricing, demand, or how our AI scanner works!";
const GLASS_REPLY: &str = "I found 1 glass bottle listing near you! There's a supplier in Thika, Kenya offering 'Glass Bottles - Mixed' (500 kg, Grade B) for KSh 19,500. The listing has medium market demand and is negotiable. Click below to view it in the marketplace.";

/// A submitted message awaiting a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Request the reply belongs to
    pub id: RequestId,

    /// Message exactly as entered
    pub text: String,

    /// Access level of the person asking
    pub mode: AccessMode,
}

/// Reply text with an optional button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Full reply text
    pub text: String,

    /// Button shown under the reply
    pub action: Option<ChatAction>,
}

impl ChatReply {
    /// Reply without a button.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }
}

/// Produces replies to chat messages.
#[automock]
#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply to `request`.
    async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

/// Responder backed by fixed question tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

impl CannedResponder {
    /// Reply for `text` without going through the async interface.
    pub fn reply(text: &str, mode: AccessMode) -> ChatReply {
        match mode {
            AccessMode::Guest => ChatReply::text(guest_answer(text).unwrap_or(GUEST_FALLBACK)),
            AccessMode::Member if asks_for_glass_nearby(text) => ChatReply {
                text: GLASS_REPLY.to_string(),
                action: Some(ChatAction::view_glass_bottles()),
            },
            AccessMode::Member => ChatReply::text(member_answer(text).unwrap_or(MEMBER_FALLBACK)),
        }
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        debug!(id = %request.id, mode = %request.mode, "canned reply");

        Ok(Self::reply(&request.text, request.mode))
    }
}

fn guest_answer(text: &str) -> Option<&'static str> {
    match text {
        HIGHEST_DEMAND => Some(HIGHEST_DEMAND_REPLY),
        SCANNER => Some(SCANNER_REPLY),
        _ => None,
    }
}

fn member_answer(text: &str) -> Option<&'static str> {
    match text {
        PRICING => Some(PRICING_REPLY),
        QUALITY => Some(QUALITY_REPLY),
        _ => guest_answer(text),
    }
}

fn asks_for_glass_nearby(text: &str) -> bool {
    let lower = text.to_lowercase();

    lower.contains("glass") && (lower.contains("near") || lower.contains("looking"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_table_has_two_entries() {
        assert_eq!(CannedResponder::reply(SCANNER, AccessMode::Guest).text, SCANNER_REPLY);
        assert_eq!(
            CannedResponder::reply(HIGHEST_DEMAND, AccessMode::Guest).text,
            HIGHEST_DEMAND_REPLY
        );
        assert_eq!(CannedResponder::reply(PRICING, AccessMode::Guest).text, GUEST_FALLBACK);
    }

    #[test]
    fn guests_never_get_the_glass_rule() {
        let reply = CannedResponder::reply("looking for glass near me", AccessMode::Guest);

        assert_eq!(reply.text, GUEST_FALLBACK);
        assert!(reply.action.is_none());
    }

    #[test]
    fn member_table_has_four_entries() {
        for (question, answer) in [
            (HIGHEST_DEMAND, HIGHEST_DEMAND_REPLY),
            (SCANNER, SCANNER_REPLY),
            (PRICING, PRICING_REPLY),
            (QUALITY, QUALITY_REPLY),
        ] {
            assert_eq!(CannedResponder::reply(question, AccessMode::Member).text, answer);
        }
    }

    #[test]
    fn glass_rule_is_case_insensitive_and_carries_action() {
        let reply = CannedResponder::reply("Any GLASS near Thika?", AccessMode::Member);

        assert_eq!(reply.text, GLASS_REPLY);
        assert_eq!(reply.action, Some(ChatAction::view_glass_bottles()));
        assert_eq!(
            CannedResponder::reply("I'm looking for glass", AccessMode::Member).text,
            GLASS_REPLY
        );
    }

    #[test]
    fn glass_alone_falls_back() {
        let reply = CannedResponder::reply("glass", AccessMode::Member);

        assert_eq!(reply.text, MEMBER_FALLBACK);
        assert!(reply.action.is_none());
    }

    #[test]
    fn matching_is_exact() {
        let reply = CannedResponder::reply("how does the ai scanner work?", AccessMode::Member);

        assert_eq!(reply.text, MEMBER_FALLBACK);
    }
}
