//! State behind the two interactive surfaces: the image analysis panel
//! and the chat panel.
//!
//! Each surface runs at most one request at a time. A submission while
//! the surface is busy is rejected, a superseding action cancels the
//! request in flight, and results of requests that are no longer current
//! never reach the state.

mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::Instrument;

use crate::analysis::PlantAnalyzer;
use crate::chat::ChatSession;
use crate::image::ImageInput;
use crate::outcome::{Failure, Outcome};
use crate::transcript::Message;
pub use builder::WorkbenchBuilder;
pub use state::Snapshot;
use state::WorkbenchState;

/// Why a submission was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitError {
    /// Analysis was requested before an image was selected.
    NoImage,
    /// The surface is still waiting for its previous request.
    Busy,
    /// The chat message is blank.
    EmptyMessage,
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::NoImage => f.write_str("Please upload an image first."),
            SubmitError::Busy => f.write_str("Still working on the last request."),
            SubmitError::EmptyMessage => f.write_str("The message is empty."),
        }
    }
}

impl std::error::Error for SubmitError {}

struct Shared {
    analyzer: PlantAnalyzer,
    session: ChatSession,
    state: Mutex<WorkbenchState>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl Shared {
    #[inline]
    fn lock(&self) -> MutexGuard<'_, WorkbenchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn publish(&self, state: &WorkbenchState) {
        self.snapshot_tx
            .send_replace(state.snapshot(self.session.state()));
    }

    /// Stores the analysis outcome. Only a successful analysis is announced
    /// in the chat transcript; a failure stays on the analysis surface
    /// instead of being posted to the chat as fallback text.
    fn finish_analysis(&self, ticket: u64, outcome: Outcome) {
        let mut state = self.lock();
        if !state.analysis.finish(ticket) {
            debug!(ticket, "dropping a stale analysis result");
            return;
        }
        if let Outcome::Reply(text) = &outcome {
            state.transcript.push(Message::analysis(text));
        }
        state.analysis_result = Some(outcome);
        self.publish(&state);
    }

    fn finish_chat(&self, ticket: u64, outcome: Outcome) {
        let mut state = self.lock();
        if !state.chat.finish(ticket) {
            debug!(ticket, "dropping a stale chat reply");
            return;
        }
        state.last_chat_failure = outcome.failure().map(Failure::kind);
        state.transcript.push(Message::model(outcome.into_text()));
        self.publish(&state);
    }
}

/// The presentation state of the app, plus the operations the surfaces
/// trigger.
///
/// Requests run as Tokio tasks, so the submitting methods must be called
/// within a Tokio runtime. State changes are published as [`Snapshot`]s.
/// Clones share the same state.
#[derive(Clone)]
pub struct Workbench {
    shared: Arc<Shared>,
}

impl Workbench {
    fn from_parts(analyzer: PlantAnalyzer, session: ChatSession) -> Self {
        let state = WorkbenchState::default();
        let (snapshot_tx, _) = watch::channel(state.snapshot(session.state()));
        let shared = Shared {
            analyzer,
            session,
            state: Mutex::new(state),
            snapshot_tx,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Subscribes to state snapshots.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Returns the latest snapshot.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Returns the chat session backing the chat surface.
    #[inline]
    pub fn session(&self) -> &ChatSession {
        &self.shared.session
    }

    /// Selects the image to analyze.
    ///
    /// The previous result is cleared, and an analysis still running for
    /// the previous image is cancelled.
    pub fn select_image(&self, image: ImageInput) {
        let mut state = self.shared.lock();
        if state.analysis.cancel() {
            debug!("analysis superseded by a new image");
        }
        state.image = Some(image);
        state.analysis_result = None;
        self.shared.publish(&state);
    }

    /// Starts analyzing the selected image.
    pub fn analyze(&self) -> Result<(), SubmitError> {
        let mut state = self.shared.lock();
        let Some(image) = state.image.clone() else {
            return Err(SubmitError::NoImage);
        };
        if state.analysis.is_busy() {
            return Err(SubmitError::Busy);
        }
        state.analysis_result = None;

        let ticket = state.next_ticket();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(
            async move {
                let outcome = shared.analyzer.analyze(&image).await;
                shared.finish_analysis(ticket, outcome);
            }
            .instrument(debug_span!("analysis task", ticket)),
        );
        state.analysis.start(ticket, task.abort_handle());
        self.shared.publish(&state);
        Ok(())
    }

    /// Posts a chat message and starts waiting for the reply.
    ///
    /// The message shows up in the transcript right away. The reply, or the
    /// fallback text if the turn fails, is appended when it arrives.
    pub fn send_message(&self, text: &str) -> Result<(), SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        let mut state = self.shared.lock();
        if state.chat.is_busy() {
            return Err(SubmitError::Busy);
        }
        let prior_history = state.transcript.messages().to_vec();
        state.transcript.push(Message::user(text));
        state.last_chat_failure = None;

        let ticket = state.next_ticket();
        let shared = Arc::clone(&self.shared);
        let text = text.to_owned();
        let task = tokio::spawn(
            async move {
                let outcome =
                    shared.session.send_turn(&prior_history, &text).await;
                shared.finish_chat(ticket, outcome);
            }
            .instrument(debug_span!("chat task", ticket)),
        );
        state.chat.start(ticket, task.abort_handle());
        self.shared.publish(&state);
        Ok(())
    }

    /// Clears the displayed chat history.
    ///
    /// The chat session is left alone, so the model still remembers the
    /// conversation. Use [`Workbench::reset_conversation`] to forget it too.
    pub fn clear_history(&self) {
        let mut state = self.shared.lock();
        state.transcript.clear();
        self.shared.publish(&state);
    }

    /// Clears the displayed history and starts a fresh chat session,
    /// cancelling a turn in flight.
    pub fn reset_conversation(&self) {
        let mut state = self.shared.lock();
        state.chat.cancel();
        state.transcript.clear();
        state.last_chat_failure = None;
        self.shared.session.reset();
        self.shared.publish(&state);
    }

    /// Cancels the running analysis. Returns `false` if none was running.
    pub fn cancel_analysis(&self) -> bool {
        let mut state = self.shared.lock();
        let cancelled = state.analysis.cancel();
        if cancelled {
            self.shared.publish(&state);
        }
        cancelled
    }

    /// Cancels the chat turn in flight. Returns `false` if none was running.
    ///
    /// The user message stays in the transcript without a reply.
    pub fn cancel_chat(&self) -> bool {
        let mut state = self.shared.lock();
        let cancelled = state.chat.cancel();
        if cancelled {
            self.shared.publish(&state);
        }
        cancelled
    }
}
