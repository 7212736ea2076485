//! Async chat driver
//!
//! Runs the "thinking" delay, asks the [`Responder`] and ticks the reveal on a
//! tokio interval, broadcasting [`ChatEvent`]s along the way.

use std::{fmt, sync::Arc, time::Duration};

use tokio::{
    runtime::Handle,
    sync::{Mutex, broadcast},
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, info, instrument, warn};

use crate::auth::AccessMode;

use super::{
    ChatAction, ChatError, ChatMessage, Navigation,
    engine::{ChatEngine, RequestId, RevealProgress},
    responder::Responder,
};

const EVENT_CAPACITY: usize = 256;

/// Progress notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Waiting for the reply
    Thinking(RequestId),

    /// Reply revealed so far
    Typing(RequestId, String),

    /// Message appended to the transcript, the user's own included
    Message(ChatMessage),
}

/// Request in flight. Dropping it before [`InFlight::finish`] returns the
/// engine to idle.
struct InFlight {
    engine: Arc<Mutex<ChatEngine>>,
    id: RequestId,
    armed: bool,
}

impl InFlight {
    fn new(engine: &Arc<Mutex<ChatEngine>>, id: RequestId) -> Self {
        Self {
            engine: Arc::clone(engine),
            id,
            armed: true,
        }
    }

    fn finish(mut self) {
        self.armed = false;
    }

    async fn abandon(mut self) {
        self.armed = false;

        abandon(&mut *self.engine.lock().await, self.id);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let id = self.id;

        debug!(%id, "reply cancelled");

        if let Ok(mut engine) = self.engine.try_lock() {
            abandon(&mut engine, id);
        } else if let Ok(handle) = Handle::try_current() {
            let engine = Arc::clone(&self.engine);

            handle.spawn(async move { abandon(&mut *engine.lock().await, id) });
        } else {
            warn!(%id, "no runtime to release cancelled request");
        }
    }
}

fn abandon(engine: &mut ChatEngine, id: RequestId) {
    if let Err(error) = engine.abandon(id) {
        debug!(%id, %error, "request already settled");
    }
}

/// Chat driven on tokio timers.
pub struct ChatSession {
    engine: Arc<Mutex<ChatEngine>>,
    responder: Arc<dyn Responder>,
    response_delay: Duration,
    typing_interval: Duration,
    events: broadcast::Sender<ChatEvent>,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("response_delay", &self.response_delay)
            .field("typing_interval", &self.typing_interval)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Start a session for `mode`.
    pub fn new(
        mode: AccessMode,
        responder: Arc<dyn Responder>,
        sentence_limit: usize,
        response_delay: Duration,
        typing_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            engine: Arc::new(Mutex::new(ChatEngine::new(mode, sentence_limit))),
            responder,
            response_delay,
            typing_interval,
            events,
        }
    }

    /// Receive events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Messages so far.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.engine.lock().await.transcript().to_vec()
    }

    /// Open or close the panel, returning whether it is now open.
    pub async fn toggle_panel(&self) -> bool {
        self.engine.lock().await.toggle()
    }

    /// Whether the panel is open.
    pub async fn is_open(&self) -> bool {
        self.engine.lock().await.is_open()
    }

    /// Follow a message button, closing the panel.
    pub async fn activate(&self, action: &ChatAction) -> Navigation {
        info!(label = %action.label, "chat action");

        self.engine.lock().await.activate(action)
    }

    /// Send a message and wait until the reply has been typed out.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Empty`] or [`ChatError::Busy`] if the message is
    /// not accepted, or the responder's error.
    #[instrument(skip(self))]
    pub async fn send(&self, text: &str) -> Result<ChatMessage, ChatError> {
        let request = self.engine.lock().await.submit(text)?;
        let id = request.id;
        let in_flight = InFlight::new(&self.engine, id);

        self.emit(ChatEvent::Message(ChatMessage::user(request.text.as_str())));
        self.emit(ChatEvent::Thinking(id));

        sleep(self.response_delay).await;

        let reply = match self.responder.respond(&request).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%id, %error, "responder failed");

                in_flight.abandon().await;

                return Err(error);
            }
        };

        self.engine.lock().await.begin_reveal(id, reply)?;

        let mut ticks = interval(self.typing_interval);

        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticks.tick().await;

        loop {
            ticks.tick().await;

            match self.engine.lock().await.advance(id)? {
                RevealProgress::Typing(shown) => self.emit(ChatEvent::Typing(id, shown)),
                RevealProgress::Finished(message) => {
                    in_flight.finish();

                    debug!(%id, "reply delivered");

                    self.emit(ChatEvent::Message(message.clone()));

                    return Ok(message);
                }
            }
        }
    }

    fn emit(&self, event: ChatEvent) {
        // No receivers is fine.
        _ = self.events.send(event);
    }
}
