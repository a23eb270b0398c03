use serde::{Deserialize, Serialize};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// Instructions that steer the model for the whole conversation.
    pub system_instruction: Option<String>,
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// A user turn, which may mix text and inline media.
    User(Vec<ContentPart>),
    /// A model turn.
    Model(String),
}

impl ModelMessage {
    /// Creates a user message with a single text part.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        ModelMessage::User(vec![ContentPart::Text(text.into())])
    }
}

/// One part of a user message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Media embedded in the request body.
    InlineData(InlineData),
}

/// Media bytes embedded in a request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InlineData {
    /// The IANA media type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// The base64 encoded payload.
    pub data: String,
}
