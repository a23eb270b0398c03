//! The long-lived conversation with the model.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use garden_guru_model::{ModelMessage, ModelRequest};
use tracing::Instrument;

use crate::model_client::ModelClient;
use crate::outcome::Outcome;
use crate::prompts::{CHAT_FALLBACK, CHAT_PERSONA};
use crate::transcript::Message;

/// The lifecycle stage of a [`ChatSession`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No turn has been taken since creation or the last reset.
    #[default]
    Uninitialized,
    /// The session holds a conversation context.
    Active,
}

struct SessionInner {
    state: SessionState,
    // Bumped on every reset. A turn only writes back into the context
    // when the epoch it started in is still current.
    epoch: u64,
    context: Vec<ModelMessage>,
}

impl SessionInner {
    #[inline]
    fn activate(&mut self) {
        if self.state == SessionState::Uninitialized {
            debug!(epoch = self.epoch, "chat session activated");
            self.state = SessionState::Active;
        }
    }
}

/// A conversation with the model.
///
/// The session owns the context that is sent to the model, and that
/// context is independent of what the user sees. Each turn transmits the
/// context plus exactly one new user message; the display history is never
/// replayed. Clearing the display therefore leaves the model's memory
/// intact until [`ChatSession::reset`] is called.
///
/// Clones share the same conversation. Turns are not serialized: two turns
/// running at the same time both see the context as it was when they
/// started.
#[derive(Clone)]
pub struct ChatSession {
    client: ModelClient,
    persona: Arc<str>,
    inner: Arc<Mutex<SessionInner>>,
}

impl ChatSession {
    /// Creates a session with the Garden Guru persona.
    #[inline]
    pub fn new(client: ModelClient) -> Self {
        Self::with_persona(client, CHAT_PERSONA)
    }

    /// Creates a session with a custom system instruction.
    pub fn with_persona<S: Into<Arc<str>>>(client: ModelClient, persona: S) -> Self {
        Self {
            client,
            persona: persona.into(),
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                epoch: 0,
                context: Vec::new(),
            })),
        }
    }

    /// Returns the current lifecycle stage.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Returns how many messages the model currently remembers.
    #[inline]
    pub fn context_len(&self) -> usize {
        self.lock().context.len()
    }

    /// Activates the session ahead of the first turn. Does nothing if it is
    /// already active.
    #[inline]
    pub fn activate(&self) {
        self.lock().activate();
    }

    /// Drops the conversation context and returns to the uninitialized
    /// stage. Replies of turns still in flight are discarded.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = SessionState::Uninitialized;
        inner.epoch += 1;
        inner.context.clear();
        debug!(epoch = inner.epoch, "chat session reset");
    }

    /// Sends one user message and returns the model's reply.
    ///
    /// `prior_history` is what the user currently sees. It is accepted for
    /// the caller's convenience but not transmitted, the session context is
    /// authoritative. On failure the context is left unchanged and the
    /// fixed chat fallback is returned in [`Outcome::Failed`].
    pub async fn send_turn(&self, prior_history: &[Message], text: &str) -> Outcome {
        let (epoch, request) = {
            let mut inner = self.lock();
            inner.activate();
            let mut messages = inner.context.clone();
            messages.push(ModelMessage::user_text(text));
            let request = ModelRequest {
                system_instruction: Some(self.persona.to_string()),
                messages,
            };
            (inner.epoch, request)
        };

        let result = self
            .client
            .send_request(request)
            .instrument(debug_span!(
                "chat turn",
                epoch,
                displayed = prior_history.len()
            ))
            .await;
        let outcome = Outcome::from_response(result, CHAT_FALLBACK);

        match &outcome {
            Outcome::Reply(reply) => {
                let mut inner = self.lock();
                if inner.epoch == epoch {
                    inner.context.push(ModelMessage::user_text(text));
                    inner.context.push(ModelMessage::Model(reply.clone()));
                } else {
                    debug!("session was reset during the turn, reply dropped");
                }
            }
            Outcome::Failed(_) => error!("error sending message to bot"),
        }
        outcome
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
