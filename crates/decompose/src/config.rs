use serde::{Deserialize, Serialize};

use crate::DecomposeError;

/// Configuration for the LLM-backed decomposition strategy.
///
/// The endpoint is any OpenAI-compatible chat-completions server; `api_url`
/// is the base URL (the `/v1/chat/completions` path is appended). Leaving
/// `api_url` unset disables the LLM path entirely; construction helpers then
/// select the identity strategy instead, and nothing fails at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecomposeConfig {
    /// Base URL of the chat-completions endpoint; `None` disables the LLM.
    pub api_url: Option<String>,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Model identifier passed through to the endpoint.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "gemini-2.0-flash".into(),
            timeout_secs: 20,
        }
    }
}

impl DecomposeConfig {
    /// Whether the LLM path is configured at all.
    pub fn enabled(&self) -> bool {
        self.api_url
            .as_deref()
            .map(str::trim)
            .is_some_and(|url| !url.is_empty())
    }

    /// Check the configuration for driving the LLM path.
    pub fn validate(&self) -> Result<(), DecomposeError> {
        if !self.enabled() {
            return Err(DecomposeError::InvalidConfig(
                "api_url is required for the LLM strategy".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(DecomposeError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        Ok(())
    }
}
