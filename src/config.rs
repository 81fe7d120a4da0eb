use serde::{Deserialize, Serialize};

/// Connection settings for the OpenAI-compatible completion endpoint.
///
/// Persisted as an opaque JSON blob via [`crate::persistence::StateStorage`];
/// there is no internal versioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Bearer API key for the endpoint
    pub api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model identifier passed through in each request
    pub model: String,
}

impl AiConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Whether enough is configured to attempt an enrichment call.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }
}
