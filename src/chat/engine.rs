//! Chat state machine
//!
//! Holds no timers: callers feed it the reply once it arrives and advance the
//! reveal one tick at a time. Every submission gets a [`RequestId`]; calls that
//! carry any other id are rejected.

use std::fmt;

use tracing::{debug, warn};

use crate::auth::AccessMode;

use super::{
    ChatAction, ChatError, ChatMessage, Navigation, greeting,
    responder::{ChatReply, ChatRequest},
    reveal::{Reveal, RevealStep},
};

/// Identifies one submission and the reply it is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of advancing the reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealProgress {
    /// Text shown so far
    Typing(String),

    /// Reveal is over; the full reply was appended to the transcript
    Finished(ChatMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Awaiting(RequestId),
    Typing {
        id: RequestId,
        reply: ChatReply,
        reveal: Reveal,
    },
}

impl Phase {
    fn request(&self) -> Option<RequestId> {
        match self {
            Phase::Idle => None,
            Phase::Awaiting(id) | Phase::Typing { id, .. } => Some(*id),
        }
    }
}

/// `TakaBot` conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEngine {
    mode: AccessMode,
    transcript: Vec<ChatMessage>,
    phase: Phase,
    next_id: u64,
    sentence_limit: usize,
    panel_open: bool,
}

impl ChatEngine {
    /// Start a conversation with the greeting for `mode`.
    pub fn new(mode: AccessMode, sentence_limit: usize) -> Self {
        Self {
            mode,
            transcript: vec![ChatMessage::bot(greeting(mode))],
            phase: Phase::Idle,
            next_id: 1,
            sentence_limit,
            panel_open: false,
        }
    }

    /// Access level replies are chosen for.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Messages so far, greeting first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Whether a new message can be submitted.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Whether the "thinking" indicator should show.
    pub fn is_thinking(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    /// Partially revealed reply, while typing.
    pub fn typing_text(&self) -> Option<&str> {
        match &self.phase {
            Phase::Typing { reveal, .. } => Some(reveal.shown()),
            _ => None,
        }
    }

    /// Request currently in flight.
    pub fn current_request(&self) -> Option<RequestId> {
        self.phase.request()
    }

    /// Submit a message.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Empty`] for blank input and [`ChatError::Busy`]
    /// while a reply is pending.
    pub fn submit(&mut self, text: &str) -> Result<ChatRequest, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::Empty);
        }

        if let Some(current) = self.phase.request() {
            warn!(%current, "message submitted while busy");

            return Err(ChatError::Busy(current));
        }

        let id = RequestId(self.next_id);

        self.next_id += 1;
        self.transcript.push(ChatMessage::user(text));
        self.phase = Phase::Awaiting(id);

        debug!(%id, "awaiting reply");

        Ok(ChatRequest {
            id,
            text: text.to_string(),
            mode: self.mode,
        })
    }

    /// Start revealing the reply for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StaleRequest`] unless `id` is awaiting its reply.
    pub fn begin_reveal(&mut self, id: RequestId, reply: ChatReply) -> Result<(), ChatError> {
        if self.phase != Phase::Awaiting(id) {
            return Err(ChatError::StaleRequest(id));
        }

        let reveal = Reveal::new(&reply.text, self.sentence_limit);

        self.phase = Phase::Typing { id, reply, reveal };

        debug!(%id, "typing");

        Ok(())
    }

    /// Reveal one more character of the reply for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StaleRequest`] unless `id` is being typed.
    pub fn advance(&mut self, id: RequestId) -> Result<RevealProgress, ChatError> {
        let Phase::Typing {
            id: current,
            reveal,
            ..
        } = &mut self.phase
        else {
            return Err(ChatError::StaleRequest(id));
        };

        if *current != id {
            return Err(ChatError::StaleRequest(id));
        }

        if reveal.step() == RevealStep::Typing {
            return Ok(RevealProgress::Typing(reveal.shown().to_string()));
        }

        let Phase::Typing { reply, .. } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Err(ChatError::StaleRequest(id));
        };

        let message = ChatMessage::bot(reply.text).with_action(reply.action);

        self.transcript.push(message.clone());

        debug!(%id, "reply finished");

        Ok(RevealProgress::Finished(message))
    }

    /// Give up on `id`, returning to idle. Used when the responder fails.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StaleRequest`] if `id` is not in flight.
    pub fn abandon(&mut self, id: RequestId) -> Result<(), ChatError> {
        if self.phase.request() != Some(id) {
            return Err(ChatError::StaleRequest(id));
        }

        self.phase = Phase::Idle;

        Ok(())
    }

    /// Whether the chat panel is open.
    pub fn is_open(&self) -> bool {
        self.panel_open
    }

    /// Open the panel.
    pub fn open(&mut self) {
        self.panel_open = true;
    }

    /// Close the panel. The conversation is kept.
    pub fn close(&mut self) {
        self.panel_open = false;
    }

    /// Flip the panel, returning whether it is now open.
    pub fn toggle(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    /// Follow a message button: the panel closes and the target is returned.
    pub fn activate(&mut self, action: &ChatAction) -> Navigation {
        self.close();

        action.navigation.clone()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::chat::{Author, responder::CannedResponder};

    use super::*;

    fn finish(engine: &mut ChatEngine, id: RequestId) -> Result<ChatMessage, ChatError> {
        loop {
            if let RevealProgress::Finished(message) = engine.advance(id)? {
                return Ok(message);
            }
        }
    }

    #[test]
    fn starts_idle_with_greeting() {
        let engine = ChatEngine::new(AccessMode::Guest, 3);

        assert!(engine.is_idle());
        assert_eq!(engine.transcript().len(), 1);
        assert!(
            engine
                .transcript()
                .first()
                .is_some_and(|message| message.text.contains("Guest Mode"))
        );
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut engine = ChatEngine::new(AccessMode::Member, 3);

        assert_eq!(engine.submit("   "), Err(ChatError::Empty));
        assert_eq!(engine.transcript().len(), 1);
    }

    #[test]
    fn full_exchange_appends_full_reply() -> TestResult {
        let mut engine = ChatEngine::new(AccessMode::Guest, 3);

        let request = engine.submit("How does the AI scanner work?")?;

        assert!(engine.is_thinking());

        let reply = CannedResponder::reply(&request.text, request.mode);

        engine.begin_reveal(request.id, reply.clone())?;

        let message = finish(&mut engine, request.id)?;

        assert_eq!(message.author, Author::Bot);
        assert_eq!(message.text, reply.text);
        assert!(engine.is_idle());
        assert!(engine.typing_text().is_none());
        assert_eq!(engine.transcript().len(), 3);

        Ok(())
    }

    #[test]
    fn reveal_is_cut_at_third_sentence_but_message_is_whole() -> TestResult {
        let mut engine = ChatEngine::new(AccessMode::Member, 3);
        let request = engine.submit("?")?;
        let text = "One. Two. Three. Four.";

        engine.begin_reveal(request.id, ChatReply::text(text))?;

        let mut last_typed = String::new();

        let message = loop {
            match engine.advance(request.id)? {
                RevealProgress::Typing(shown) => last_typed = shown,
                RevealProgress::Finished(message) => break message,
            }
        };

        assert_eq!(last_typed, "One. Two. Three");
        assert_eq!(message.text, text);

        Ok(())
    }

    #[test]
    fn busy_while_awaiting_or_typing() -> TestResult {
        let mut engine = ChatEngine::new(AccessMode::Member, 3);
        let request = engine.submit("hello")?;

        assert_eq!(engine.submit("again"), Err(ChatError::Busy(request.id)));

        engine.begin_reveal(request.id, ChatReply::text("Hi."))?;

        assert_eq!(engine.submit("again"), Err(ChatError::Busy(request.id)));

        finish(&mut engine, request.id)?;

        assert!(engine.submit("again").is_ok());

        Ok(())
    }

    #[test]
    fn stale_ids_are_rejected() -> TestResult {
        let mut engine = ChatEngine::new(AccessMode::Member, 3);
        let first = engine.submit("one")?;

        engine.abandon(first.id)?;

        let second = engine.submit("two")?;

        assert_ne!(first.id, second.id);
        assert_eq!(
            engine.begin_reveal(first.id, ChatReply::text("late")),
            Err(ChatError::StaleRequest(first.id))
        );
        assert_eq!(engine.advance(second.id), Err(ChatError::StaleRequest(second.id)));

        Ok(())
    }

    #[test]
    fn activating_action_closes_panel() -> TestResult {
        let mut engine = ChatEngine::new(AccessMode::Member, 3);

        assert!(engine.toggle());

        let request = engine.submit("looking for glass near Nairobi")?;

        engine.begin_reveal(request.id, CannedResponder::reply(&request.text, request.mode))?;

        let message = finish(&mut engine, request.id)?;
        let action = message.action.ok_or("expected an action")?;
        let Navigation::Marketplace(query) = engine.activate(&action);

        assert_eq!(query.to_string(), "search=glass&location=Kenya");
        assert!(!engine.is_open());

        Ok(())
    }
}
