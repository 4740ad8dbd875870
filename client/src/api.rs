//! DESIGN
//! ======
//!
//! Bearer-authenticated HTTP wrapper over the server's REST and SSE
//! endpoints. Each method maps one-to-one onto a route; no caching or retry
//! lives here. [`ApiClient`] implements [`Transport`] so the pipeline can
//! run against it or against a scripted stand-in.
//!
//! `send_message` is the only streaming call: it returns the raw SSE byte
//! stream and leaves frame decoding to the caller's
//! [`protocol::SseDecoder`].

use async_trait::async_trait;
use futures::StreamExt;
use protocol::{
    ChatRequest, Content, ConversationDetail, ConversationSummary, SignedUrl, VoiceAppendRequest,
    VoiceSession,
};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::pipeline::{ByteStream, Transport};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unknown conversation: {0}")]
    UnknownConversation(Uuid),
    #[error("stream ended before completion")]
    IncompleteStream,
    #[error("invalid response payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client bound to one server and one session token.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct DevSessionResponse {
    token: String,
    user_id: Uuid,
}

#[derive(Deserialize)]
struct UploadResponse {
    path: String,
}

/// Identity returned by the auth endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionIdentity {
    pub id: Uuid,
    pub name: String,
}

impl ApiClient {
    /// Build a client for `base_url` (trailing slash tolerated) using
    /// `token` as the bearer credential.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http()?,
            base_url: normalize_base_url(base_url),
            token: token.to_owned(),
        })
    }

    /// Mint a development session and return a client bound to it, along
    /// with the new user's id. Only works against servers started with dev
    /// auth enabled.
    pub async fn dev_session(base_url: &str, name: &str) -> Result<(Self, Uuid), ClientError> {
        let base_url = normalize_base_url(base_url);
        let http = build_http()?;
        let response = http
            .post(format!("{base_url}/api/dev/session"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let session: DevSessionResponse = response.json().await?;
        Ok((Self { http, base_url, token: session.token }, session.user_id))
    }

    /// The bearer token this client authenticates with.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response =
            self.http.get(self.url(path)).bearer_auth(&self.token).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    pub async fn me(&self) -> Result<SessionIdentity, ClientError> {
        self.get_json("/api/auth/me").await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response =
            self.http.post(self.url("/api/auth/logout")).bearer_auth(&self.token).send().await?;
        check_status(response).await?;
        Ok(())
    }

    // =========================================================================
    // VOICE AND ASSETS
    // =========================================================================

    pub async fn voice_append(
        &self,
        conversation_id: Uuid,
        request: &VoiceAppendRequest,
    ) -> Result<VoiceSession, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/conversations/{conversation_id}/voice")))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn voice_delete(&self, voice_session_id: Uuid) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/voice/{voice_session_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Resolve a relative storage path to a time-limited public URL.
    pub async fn sign(&self, path: &str) -> Result<SignedUrl, ClientError> {
        let response = self
            .http
            .get(self.url("/api/assets/sign"))
            .bearer_auth(&self.token)
            .query(&[("path", path)])
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn list(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        self.get_json("/api/conversations").await
    }

    async fn detail(&self, id: Uuid) -> Result<ConversationDetail, ClientError> {
        self.get_json(&format!("/api/conversations/{id}")).await
    }

    async fn create_with_first_message(
        &self,
        content: &Content,
    ) -> Result<ConversationSummary, ClientError> {
        let body = serde_json::json!({
            "messages": [{ "role": "user", "content": content }],
        });
        let response = self
            .http
            .post(self.url("/api/conversations"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn send_message(
        &self,
        id: Uuid,
        request: &ChatRequest,
    ) -> Result<ByteStream, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/conversations/{id}/message")))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from))))
    }

    async fn rename(&self, id: Uuid, title: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/api/conversations/{id}")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/conversations/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/api/assets"))
            .bearer_auth(&self.token)
            .query(&[("name", filename)])
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = check_status(response).await?.json().await?;
        Ok(uploaded.path)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn build_http() -> Result<reqwest::Client, ClientError> {
    // No overall request timeout: SSE responses stay open for the length of
    // the completion.
    Ok(reqwest::Client::builder().connect_timeout(Duration::from_secs(10)).build()?)
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status { status: status.as_u16(), body })
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
