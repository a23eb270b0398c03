use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use garden_guru_model::{ErrorKind, ModelResponse, ModelResponseEvent};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{self, GenerateContentChunk};

struct PartialState {
    sse: Sse,
    // Events decoded from one chunk but not yet handed out. A single chunk
    // can carry several text parts and a finish reason.
    pending_events: VecDeque<ModelResponseEvent>,
    // Set once a finish reason was seen. Anything after it is ignored.
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            pending_events: Default::default(),
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                // Only a finish reason marks a complete reply.
                return Err(Error::new(
                    "stream ended without a finish reason",
                    ErrorKind::Other,
                ));
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<GenerateContentChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(error) = chunk.error {
            warn!("stream broken by the service: {}", error.describe());
            return Err(Error::new(error.describe(), error.kind()));
        }
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason)
        {
            return Err(Error::new(
                format!("prompt blocked: {reason}"),
                ErrorKind::Moderated,
            ));
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            continue;
        };
        let parts = candidate.content.into_iter().flat_map(|c| c.parts);
        for part in parts {
            if part.thought == Some(true) {
                continue;
            }
            match part.text {
                Some(text) if !text.is_empty() => partial_state
                    .pending_events
                    .push_back(ModelResponseEvent::MessageDelta(text)),
                _ => {}
            }
        }
        if let Some(reason) = candidate.finish_reason {
            partial_state
                .pending_events
                .push_back(ModelResponseEvent::Completed(proto::finish_reason(
                    &reason,
                )));
            partial_state.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use garden_guru_model::ModelFinishReason;

    use super::*;
    use crate::Chunks;

    async fn collect(
        chunks: Vec<Bytes>,
    ) -> Result<(String, Option<ModelFinishReason>), Error> {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let mut text = String::new();
        let mut reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    text.push_str(&delta)
                }
                ModelResponseEvent::Completed(r) => reason = Some(r),
            }
        }
        Ok((text, reason))
    }

    #[tokio::test]
    async fn test_simple_events() {
        let (text, reason) = collect(vec![Bytes::from_static(include_bytes!(
            "../fixtures/stream_response.txt"
        ))])
        .await
        .unwrap();
        assert_eq!(
            text,
            "**Rose** (*Rosa* spp.)\n\n### Watering\nWater deeply twice a week."
        );
        assert_eq!(reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let err = collect(vec![Bytes::from_static(
            b"data: {\"promptFeedback\": {\"blockReason\": \"SAFETY\"}}\r\n\r\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_safety_finish() {
        let (text, reason) = collect(vec![Bytes::from_static(
            b"data: {\"candidates\": [{\"finishReason\": \"SAFETY\"}]}\n\n",
        )])
        .await
        .unwrap();
        assert!(text.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Blocked));
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let err = collect(vec![Bytes::from_static(b"data: {not json\n\n")])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_truncated_stream() {
        let err = collect(vec![Bytes::from_static(
            b"data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"Half\"}]}}]}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_error_after_delta() {
        let err = collect(vec![
            Bytes::from_static(
                b"data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"**Rose** (*Rosa*\"}]}}]}\r\n\r\n",
            ),
            Bytes::from_static(
                b"data: {\"error\": {\"code\": 500, \"message\": \"Internal error\", \"status\": \"INTERNAL\"}}\r\n\r\n",
            ),
        ])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        assert_eq!(err.message(), "INTERNAL: Internal error");

        let err = collect(vec![Bytes::from_static(
            b"data: {\"error\": {\"code\": 429, \"message\": \"Quota\", \"status\": \"RESOURCE_EXHAUSTED\"}}\n\n",
        )])
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimitExceeded);
    }
}
