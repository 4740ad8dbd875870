//! OpenAI-compatible streaming completion provider.
//!
//! Sends `stream: true` chat-completion requests and decodes the SSE
//! response incrementally with the shared [`SseDecoder`], forwarding each
//! delta the moment its frame completes. Works against any endpoint that
//! speaks the OpenAI chat-completions wire shape.

use std::time::Duration;

use protocol::{ChatDelta, ChatMessage, SseDecoder, StreamEvent};
use serde_json::json;
use tokio::sync::mpsc;

use super::config::CompletionConfig;
use super::types::{CompletionError, Completions};

pub struct OpenAiCompletions {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletions {
    /// Build a provider from environment variables. See
    /// [`CompletionConfig::from_env`] for the variable set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, CompletionError> {
        Self::from_config(CompletionConfig::from_env()?)
    }

    /// Build a provider from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| CompletionError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, api_key: config.api_key, base_url: config.base_url, model: config.model })
    }

    /// Return the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn request_body(model: &str, messages: &[ChatMessage]) -> serde_json::Value {
    json!({
        "model": model,
        "messages": messages,
        "stream": true,
    })
}

#[async_trait::async_trait]
impl Completions for OpenAiCompletions {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        deltas: mpsc::Sender<ChatDelta>,
    ) -> Result<(), CompletionError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, &messages))
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Response { status: status.as_u16(), body });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| CompletionError::Request(e.to_string()))?;
            for event in decoder.feed(&bytes) {
                match event {
                    StreamEvent::Delta(delta) => {
                        // A closed receiver means the relay abandoned the
                        // stream; stop consuming upstream.
                        if deltas.send(delta).await.is_err() {
                            return Ok(());
                        }
                    }
                    StreamEvent::Done => return Ok(()),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
