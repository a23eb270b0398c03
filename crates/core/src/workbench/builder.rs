use garden_guru_model::ModelProvider;

use super::Workbench;
use crate::analysis::PlantAnalyzer;
use crate::chat::ChatSession;
use crate::model_client::ModelClient;

/// [`Workbench`] builder.
pub struct WorkbenchBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) persona: Option<String>,
}

impl WorkbenchBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            persona: None,
        }
    }

    /// Replaces the chat persona.
    #[inline]
    pub fn with_persona<S: Into<String>>(mut self, persona: S) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Builds the workbench. Both surfaces share one model client.
    #[inline]
    pub fn build(self) -> Workbench {
        let WorkbenchBuilder {
            model_client,
            persona,
        } = self;

        let analyzer = PlantAnalyzer::new(model_client.clone());
        let session = match persona {
            Some(persona) => ChatSession::with_persona(model_client, persona),
            None => ChatSession::new(model_client),
        };
        Workbench::from_parts(analyzer, session)
    }
}
