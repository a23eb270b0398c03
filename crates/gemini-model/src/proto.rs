use garden_guru_model::{
    ContentPart, ErrorKind, InlineData, ModelFinishReason, ModelMessage,
    ModelRequest,
};
use serde::{Deserialize, Serialize};

// ------------------------
// Types shared by both ends
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    // Set on thought summaries of thinking models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    // Sent in place of candidates when the stream breaks on the server.
    pub error: Option<ErrorDetail>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

impl ErrorDetail {
    pub fn kind(&self) -> ErrorKind {
        match self.status.as_deref() {
            Some("RESOURCE_EXHAUSTED") => ErrorKind::RateLimitExceeded,
            Some("PERMISSION_DENIED" | "UNAUTHENTICATED") => {
                ErrorKind::Unauthorized
            }
            _ => ErrorKind::Other,
        }
    }

    pub fn describe(&self) -> String {
        match &self.status {
            Some(status) => format!("{status}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: req.system_instruction.as_ref().map(|text| {
            Content {
                role: None,
                parts: vec![text_part(text.clone())],
            }
        }),
        contents: req.messages.iter().map(create_content).collect(),
    }
}

#[inline]
fn create_content(msg: &ModelMessage) -> Content {
    match msg {
        ModelMessage::User(parts) => Content {
            role: Some("user".to_owned()),
            parts: parts.iter().map(create_part).collect(),
        },
        ModelMessage::Model(text) => Content {
            role: Some("model".to_owned()),
            parts: vec![text_part(text.clone())],
        },
    }
}

#[inline]
fn create_part(part: &ContentPart) -> Part {
    match part {
        ContentPart::Text(text) => text_part(text.clone()),
        ContentPart::InlineData(InlineData { mime_type, data }) => Part {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            thought: None,
        },
    }
}

#[inline]
fn text_part(text: String) -> Part {
    Part {
        text: Some(text),
        inline_data: None,
        thought: None,
    }
}

pub fn finish_reason(reason: &str) -> ModelFinishReason {
    match reason {
        "STOP" => ModelFinishReason::Stop,
        "MAX_TOKENS" => ModelFinishReason::MaxTokens,
        "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
        | "RECITATION" | "IMAGE_SAFETY" => ModelFinishReason::Blocked,
        _ => ModelFinishReason::Other,
    }
}

/// Extracts a readable message from an error response body.
pub fn error_message(body: &str) -> Option<String> {
    let ErrorBody { error } = serde_json::from_str(body).ok()?;
    Some(error.describe())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            system_instruction: Some("You are Garden Guru.".to_owned()),
            messages: vec![
                ModelMessage::User(vec![
                    ContentPart::InlineData(InlineData {
                        mime_type: "image/jpeg".to_owned(),
                        data: "/9j/4AAQ".to_owned(),
                    }),
                    ContentPart::Text("Identify this plant.".to_owned()),
                ]),
                ModelMessage::Model("It is a rose.".to_owned()),
                ModelMessage::user_text("How often should I water?"),
            ],
        };
        let expected = json!({
            "systemInstruction": {
                "parts": [{ "text": "You are Garden Guru." }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        {
                            "inlineData": {
                                "mimeType": "image/jpeg",
                                "data": "/9j/4AAQ"
                            }
                        },
                        { "text": "Identify this plant." }
                    ]
                },
                {
                    "role": "model",
                    "parts": [{ "text": "It is a rose." }]
                },
                {
                    "role": "user",
                    "parts": [{ "text": "How often should I water?" }]
                }
            ]
        });
        let actual = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_request_without_system_instruction() {
        let request = ModelRequest {
            system_instruction: None,
            messages: vec![ModelMessage::user_text("Hi")],
        };
        let actual = serde_json::to_value(create_request(&request)).unwrap();
        assert!(actual.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_chunk() {
        let chunk: GenerateContentChunk = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "**Rose**" }],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }],
                "usageMetadata": { "promptTokenCount": 263 },
                "modelVersion": "gemini-2.5-flash"
            }"#,
        )
        .unwrap();
        let candidate = &chunk.candidates[0];
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        let content = candidate.content.as_ref().unwrap();
        assert_eq!(content.parts[0].text.as_deref(), Some("**Rose**"));
    }

    #[test]
    fn test_finish_reason() {
        assert_eq!(finish_reason("STOP"), ModelFinishReason::Stop);
        assert_eq!(finish_reason("MAX_TOKENS"), ModelFinishReason::MaxTokens);
        assert_eq!(finish_reason("SAFETY"), ModelFinishReason::Blocked);
        assert_eq!(
            finish_reason("FINISH_REASON_UNSPECIFIED"),
            ModelFinishReason::Other
        );
    }

    #[test]
    fn test_error_message() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "Resource has been exhausted.",
                "status": "RESOURCE_EXHAUSTED"
            }
        }"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("RESOURCE_EXHAUSTED: Resource has been exhausted.")
        );
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_parse_error_chunk() {
        let chunk: GenerateContentChunk = serde_json::from_str(
            r#"{"error": {"code": 403, "message": "Denied", "status": "PERMISSION_DENIED"}}"#,
        )
        .unwrap();
        assert!(chunk.candidates.is_empty());
        let error = chunk.error.unwrap();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
        assert_eq!(error.describe(), "PERMISSION_DENIED: Denied");

        let error = ErrorDetail {
            message: "Quota".to_owned(),
            status: Some("RESOURCE_EXHAUSTED".to_owned()),
        };
        assert_eq!(error.kind(), ErrorKind::RateLimitExceeded);
        let error = ErrorDetail {
            message: "Internal error".to_owned(),
            status: Some("INTERNAL".to_owned()),
        };
        assert_eq!(error.kind(), ErrorKind::Other);
    }
}
