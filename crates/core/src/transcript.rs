//! The display history of the chat.

use crate::prompts::ANALYSIS_INTRO;

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person using the app.
    User,
    /// The model.
    Model,
}

/// A message as it is displayed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message {
    /// The author.
    pub role: Role,
    /// Markdown-like text, rendered as-is apart from line breaks.
    pub text: String,
}

impl Message {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates a model message.
    #[inline]
    pub fn model<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }

    /// Creates the model message that posts an analysis result into the
    /// chat.
    #[inline]
    pub fn analysis(text: &str) -> Self {
        Self::model(format!("{ANALYSIS_INTRO}{text}"))
    }

    /// Renders the text as HTML, see [`render_html`].
    #[inline]
    pub fn to_html(&self) -> String {
        render_html(&self.text)
    }
}

/// The messages shown to the user, in arrival order.
///
/// Messages are only ever appended. The whole transcript can be cleared,
/// which has no effect on any chat session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Appends a message.
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes every message.
    #[inline]
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Turns reply text into HTML by replacing every line feed with `<br />`.
///
/// No other transform is applied, markdown syntax stays as it is.
pub fn render_html(text: &str) -> String {
    text.replace('\n', "<br />")
}
