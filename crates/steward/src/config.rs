//! Settings read from the process environment.

use std::env;

use steward_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

/// Variable holding the model credential.
pub const API_KEY_VAR: &str = "GITHUB_OPENAI_API_KEY";
/// Checked when [`API_KEY_VAR`] is unset.
pub const FALLBACK_API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Overrides the model endpoint.
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
/// Overrides the model name.
pub const MODEL_VAR: &str = "OPENAI_MODEL";
/// Credential for the web search tool.
pub const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// The configuration could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No model credential was found.
    #[error("neither GITHUB_OPENAI_API_KEY nor OPENAI_API_KEY is set")]
    MissingApiKey,
}

/// Everything needed to set up a session.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Model credential.
    pub api_key: String,
    /// Model endpoint, the provider default when `None`.
    pub base_url: Option<String>,
    /// Model name, the provider default when `None`.
    pub model: Option<String>,
    /// Web search credential. Searches fail without it.
    pub tavily_api_key: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let api_key = get(API_KEY_VAR)
            .or_else(|| get(FALLBACK_API_KEY_VAR))
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            api_key,
            base_url: get(BASE_URL_VAR),
            model: get(MODEL_VAR),
            tavily_api_key: get(TAVILY_API_KEY_VAR),
        })
    }

    /// Replaces the endpoint if `base_url` is given.
    #[inline]
    pub fn override_base_url(mut self, base_url: Option<String>) -> Self {
        if base_url.is_some() {
            self.base_url = base_url;
        }
        self
    }

    /// Replaces the model if `model` is given.
    #[inline]
    pub fn override_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.model = model;
        }
        self
    }

    /// Builds the model provider configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut builder = OpenAIConfigBuilder::with_api_key(&*self.api_key);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(&**base_url);
        }
        if let Some(model) = &self.model {
            builder = builder.with_model(&**model);
        }
        builder.build()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field(
                "tavily_api_key",
                &self.tavily_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
