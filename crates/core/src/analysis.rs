//! Single-shot plant identification.

use garden_guru_model::{ContentPart, ModelMessage, ModelRequest};
use tracing::Instrument;

use crate::image::ImageInput;
use crate::model_client::ModelClient;
use crate::outcome::Outcome;
use crate::prompts::{ANALYSIS_FALLBACK, ANALYSIS_PROMPT};

/// Sends plant photos to the model and returns its care guide.
///
/// Every call is independent, nothing is remembered between analyses.
#[derive(Clone)]
pub struct PlantAnalyzer {
    client: ModelClient,
}

impl PlantAnalyzer {
    /// Creates an analyzer on top of the given client.
    #[inline]
    pub fn new(client: ModelClient) -> Self {
        Self { client }
    }

    /// Identifies the plant in `image`.
    ///
    /// On success the model's text is returned exactly as received. Any
    /// failure is logged and comes back as [`Outcome::Failed`] with the
    /// fixed analysis fallback.
    pub async fn analyze(&self, image: &ImageInput) -> Outcome {
        let request = build_request(image);
        let result = self
            .client
            .send_request(request)
            .instrument(debug_span!(
                "analyze plant",
                mime = %image.mime(),
                len = image.bytes().len()
            ))
            .await;
        let outcome = Outcome::from_response(result, ANALYSIS_FALLBACK);
        if outcome.is_reply() {
            debug!("analysis finished");
        } else {
            error!("error analyzing plant image");
        }
        outcome
    }
}

fn build_request(image: &ImageInput) -> ModelRequest {
    ModelRequest {
        system_instruction: None,
        messages: vec![ModelMessage::User(vec![
            ContentPart::InlineData(image.to_inline_data()),
            ContentPart::Text(ANALYSIS_PROMPT.to_owned()),
        ])],
    }
}
