//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use garden_guru_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    done: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        // In case this method is called after completion.
        if this.done {
            return Poll::Ready(Ok(None));
        }

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            let event = match this.events.get(this.event_idx) {
                Some(PresetEvent::MessageDelta(msg)) => {
                    this.event_idx += 1;
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                // Nothing is produced after a blocked finish.
                Some(PresetEvent::Blocked) => {
                    this.done = true;
                    ModelResponseEvent::Completed(ModelFinishReason::Blocked)
                }
                None => {
                    this.done = true;
                    ModelResponseEvent::Completed(ModelFinishReason::Stop)
                }
            };
            return Poll::Ready(Ok(Some(event)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

#[derive(Default)]
struct Journal {
    requests: Vec<ModelRequest>,
    attempts: HashMap<usize, u64>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The added steps will be
/// selected according to the history messages in your request. If there are no
/// enough steps in the script, an error will be returned.
///
/// Every request is recorded, and clones of a provider share the record, so a
/// test can keep a clone to inspect what was actually sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    journal: Arc<Mutex<Journal>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    /// Adds a user step followed by an assistant step answering it.
    #[inline]
    pub fn add_turn(&mut self, preset: PresetResponse) {
        self.add_user_input_step();
        self.add_assistant_response_step(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .clone()
    }

    fn select_events(&self, req: &ModelRequest) -> Result<Vec<PresetEvent>, Error> {
        let mut journal =
            self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        journal.requests.push(req.clone());

        let step_idx = req.messages.len();
        let Some(step) = self.conversation_script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };
        let preset = match step {
            ConversationStep::UserInput => {
                return Err(Error {
                    message: "not an assistant response step",
                    kind: ErrorKind::Other,
                });
            }
            ConversationStep::AssistantResponse(preset) => preset,
        };

        let attempt = journal.attempts.entry(step_idx).or_default();
        let this_attempt = *attempt;
        *attempt += 1;
        if preset.should_fail(this_attempt) {
            return Err(Error {
                message: "preset failure",
                kind: ErrorKind::Other,
            });
        }
        Ok(preset.events.clone())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let resp = self.select_events(req).map(|events| TestModelResponse {
            events,
            event_idx: 0,
            done: false,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use garden_guru_model::ModelMessage;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, ModelFinishReason) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
                .await
                .unwrap()
                .unwrap();
            match event {
                ModelResponseEvent::Completed(reason) => return (msg, reason),
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("Water it ".to_owned()),
            PresetEvent::MessageDelta("weekly.".to_owned()),
        ]));

        let mut req = ModelRequest {
            system_instruction: Some("Be friendly.".to_owned()),
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert_eq!(reason, ModelFinishReason::Stop);

        req.messages.push(ModelMessage::Model(msg));
        req.messages
            .push(ModelMessage::user_text("How often should I water?"));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _) = collect_response(resp).await;
        assert_eq!(msg, "Water it weekly.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], req);
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_turn(PresetResponse::with_text("Finally").with_failures(1));

        let req = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);

        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _) = collect_response(resp).await;
        assert_eq!(msg, "Finally");
    }

    #[tokio::test]
    async fn test_blocked() {
        let mut provider = TestModelProvider::default();
        provider.add_turn(PresetResponse::with_events([
            PresetEvent::MessageDelta("Partial".to_owned()),
            PresetEvent::Blocked,
        ]));

        let req = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, reason) = collect_response(resp).await;
        assert_eq!(msg, "Partial");
        assert_eq!(reason, ModelFinishReason::Blocked);
    }

    #[tokio::test]
    async fn test_missing_steps() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        };
        assert!(provider.send_request(&req).await.is_err());
        assert_eq!(provider.requests().len(), 1);
    }
}
