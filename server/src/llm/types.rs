//! Provider-neutral completion trait and errors.

use protocol::{ChatDelta, ChatMessage};
use tokio::sync::mpsc;

/// Errors produced by completion provider operations.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the completion service failed.
    #[error("completion request failed: {0}")]
    Request(String),

    /// The completion service returned a non-success HTTP status.
    #[error("completion response error: status {status}")]
    Response { status: u16, body: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Streaming completion seam. Enables mocking in relay tests.
#[async_trait::async_trait]
pub trait Completions: Send + Sync {
    /// Stream completion deltas for the given transcript into `deltas`.
    ///
    /// Returns once the upstream stream is exhausted. A dropped receiver is
    /// treated as cancellation: the provider stops consuming upstream and
    /// returns Ok.
    ///
    /// # Errors
    ///
    /// Returns a [`CompletionError`] if the upstream request fails before or
    /// during streaming.
    async fn complete(&self, messages: Vec<ChatMessage>, deltas: mpsc::Sender<ChatDelta>)
    -> Result<(), CompletionError>;
}
