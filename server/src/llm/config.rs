//! Completion service configuration parsed from environment variables.

use super::types::CompletionError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: CompletionTimeouts,
}

impl CompletionConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `COMPLETIONS_API_KEY_ENV` (names the env var containing the key)
    ///
    /// Optional:
    /// - `COMPLETIONS_MODEL`: default `gpt-4o`
    /// - `COMPLETIONS_BASE_URL`: default OpenAI API base URL; trailing
    ///   slashes are trimmed
    /// - `COMPLETIONS_REQUEST_TIMEOUT_SECS`: default 120
    /// - `COMPLETIONS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::MissingApiKey`] when the key indirection or
    /// the key itself is unset.
    pub fn from_env() -> Result<Self, CompletionError> {
        let key_var = std::env::var("COMPLETIONS_API_KEY_ENV")
            .map_err(|_| CompletionError::MissingApiKey { var: "COMPLETIONS_API_KEY_ENV".into() })?;
        let api_key = std::env::var(&key_var).map_err(|_| CompletionError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("COMPLETIONS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = std::env::var("COMPLETIONS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = CompletionTimeouts {
            request_secs: env_parse_u64("COMPLETIONS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("COMPLETIONS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
