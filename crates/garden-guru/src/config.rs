use std::env;
use std::fmt::{self, Debug, Display, Formatter};

use garden_guru_core::{Workbench, WorkbenchBuilder};
use garden_guru_gemini_model::{
    GeminiConfig, GeminiConfigBuilder, GeminiProvider,
};

/// The environment variable holding the service API key. Required.
pub const API_KEY_VAR: &str = "API_KEY";
/// The environment variable overriding the model name.
pub const MODEL_VAR: &str = "GEMINI_MODEL";
/// The environment variable overriding the API endpoint.
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Errors from loading the [`Config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigError {
    /// The API key is not set, or is blank.
    MissingApiKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey => {
                write!(f, "{API_KEY_VAR} environment variable not set")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Startup configuration.
///
/// A `Config` always holds an API key, and it is the only way this crate
/// builds a service client, so nothing can talk to the service without one.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
}

impl Config {
    /// Loads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let api_key = var(API_KEY_VAR).ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            api_key,
            model: var(MODEL_VAR),
            base_url: var(BASE_URL_VAR),
        })
    }

    /// Returns the provider configuration.
    pub fn gemini_config(&self) -> GeminiConfig {
        let mut builder = GeminiConfigBuilder::with_api_key(&self.api_key);
        if let Some(model) = &self.model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url);
        }
        builder.build()
    }

    /// Builds the service client.
    #[inline]
    pub fn into_provider(self) -> GeminiProvider {
        GeminiProvider::new(self.gemini_config())
    }

    /// Builds a workbench talking to the service.
    #[inline]
    pub fn into_workbench(self) -> Workbench {
        WorkbenchBuilder::with_model_provider(self.into_provider()).build()
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}
