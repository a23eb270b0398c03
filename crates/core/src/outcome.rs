//! The tagged result of an orchestration call.

use std::fmt::{self, Display, Formatter};

use garden_guru_model::{ErrorKind, ModelFinishReason, ModelProviderError};

use crate::model_client::ModelClientResponse;

/// What an orchestration call produced.
///
/// Failures never escape as errors. They come back as [`Outcome::Failed`]
/// carrying a user-facing fallback text, so a caller can either render the
/// two variants differently or just call [`Outcome::text`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The model replied with this text.
    Reply(String),
    /// The request failed.
    Failed(Failure),
}

/// Describes a failed orchestration call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    kind: ErrorKind,
    fallback: &'static str,
}

impl Failure {
    #[inline]
    pub(crate) fn new(kind: ErrorKind, fallback: &'static str) -> Self {
        Self { kind, fallback }
    }

    /// Returns what kind of failure this was. Only meant for diagnostics,
    /// no failure is retried.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the text to show in place of a reply.
    #[inline]
    pub fn fallback(&self) -> &'static str {
        self.fallback
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.fallback)
    }
}

impl Outcome {
    /// Converts a model client result, collapsing every failure mode into
    /// [`Outcome::Failed`] with the given fallback.
    ///
    /// A response stopped by a safety filter, or one without any text, is a
    /// failure as well.
    pub(crate) fn from_response(
        result: Result<ModelClientResponse, Box<dyn ModelProviderError>>,
        fallback: &'static str,
    ) -> Self {
        let resp = match result {
            Ok(resp) => resp,
            Err(err) => {
                error!(kind = %err.kind(), "model request failed: {err}");
                return Outcome::Failed(Failure::new(err.kind(), fallback));
            }
        };
        if resp.finish_reason == Some(ModelFinishReason::Blocked) {
            error!("model response was blocked");
            return Outcome::Failed(Failure::new(
                ErrorKind::Moderated,
                fallback,
            ));
        }
        if resp.text.is_empty() {
            error!(finish_reason = ?resp.finish_reason, "model returned no text");
            return Outcome::Failed(Failure::new(ErrorKind::Other, fallback));
        }
        Outcome::Reply(resp.text)
    }

    /// Returns the reply text, or the fallback text of a failure.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Outcome::Reply(text) => text,
            Outcome::Failed(failure) => failure.fallback,
        }
    }

    /// Consumes the outcome, returning the reply or the fallback text.
    #[inline]
    pub fn into_text(self) -> String {
        match self {
            Outcome::Reply(text) => text,
            Outcome::Failed(failure) => failure.fallback.to_owned(),
        }
    }

    /// Returns `true` if the model replied.
    #[inline]
    pub fn is_reply(&self) -> bool {
        matches!(self, Outcome::Reply(_))
    }

    /// Returns the failure, if any.
    #[inline]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Reply(_) => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }
}
