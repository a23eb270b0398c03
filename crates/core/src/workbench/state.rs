use garden_guru_model::ErrorKind;
use tokio::task::AbortHandle;

use crate::chat::SessionState;
use crate::image::ImageInput;
use crate::outcome::Outcome;
use crate::transcript::{Message, Transcript};

struct RunningTask {
    ticket: u64,
    handle: AbortHandle,
}

/// One interactive surface. It is busy exactly while a task is recorded.
#[derive(Default)]
pub(super) struct Surface {
    task: Option<RunningTask>,
}

impl Surface {
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    #[inline]
    pub fn start(&mut self, ticket: u64, handle: AbortHandle) {
        debug_assert!(self.task.is_none(), "surface is already busy");
        self.task = Some(RunningTask { ticket, handle });
    }

    /// Marks the task with `ticket` as done. Returns `false` if that task
    /// is no longer the current one.
    #[inline]
    pub fn finish(&mut self, ticket: u64) -> bool {
        match &self.task {
            Some(task) if task.ticket == ticket => {
                self.task = None;
                true
            }
            _ => false,
        }
    }

    /// Aborts the current task, if any.
    #[inline]
    pub fn cancel(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.handle.abort();
        debug!(ticket = task.ticket, "task cancelled");
        true
    }
}

#[derive(Default)]
pub(super) struct WorkbenchState {
    pub image: Option<ImageInput>,
    pub analysis: Surface,
    pub analysis_result: Option<Outcome>,
    pub chat: Surface,
    pub last_chat_failure: Option<ErrorKind>,
    pub transcript: Transcript,
    next_ticket: u64,
}

impl WorkbenchState {
    #[inline]
    pub fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    pub fn snapshot(&self, session: SessionState) -> Snapshot {
        Snapshot {
            image_type: self
                .image
                .as_ref()
                .map(|image| image.mime().essence_str().to_owned()),
            analysis_busy: self.analysis.is_busy(),
            analysis: self.analysis_result.clone(),
            chat_busy: self.chat.is_busy(),
            transcript: self.transcript.messages().to_vec(),
            last_chat_failure: self.last_chat_failure,
            session,
        }
    }
}

/// A point-in-time copy of the workbench state, for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The media type of the selected image, if one is selected.
    pub image_type: Option<String>,
    /// Whether an analysis is running.
    pub analysis_busy: bool,
    /// The result of the last finished analysis for the selected image.
    pub analysis: Option<Outcome>,
    /// Whether a chat turn is running.
    pub chat_busy: bool,
    /// The displayed chat history.
    pub transcript: Vec<Message>,
    /// Set when the last model message is a fallback for a failed turn.
    pub last_chat_failure: Option<ErrorKind>,
    /// The stage of the chat session.
    pub session: SessionState,
}
