//! DESIGN
//! ======
//!
//! The send pipeline: everything that happens between the user hitting
//! enter and the assistant's reply settling into the cache.
//!
//! A send runs these steps in order:
//!
//! 1. Resolve the target conversation (current, or a fresh local draft).
//! 2. Upload an attached image, degrading to text-only if the upload fails.
//! 3. Optimistically append the user turn and an empty assistant turn to
//!    the cache, so the UI shows both immediately.
//! 4. Pick the relay call for the conversation's lifecycle state:
//!    - local draft: create the server record from the first message,
//!      promote the draft to the server id, then relay with an empty
//!      message list so the server completes over its stored history;
//!    - durable: relay the single new user turn;
//!    - temporary: relay the full local history, nothing is stored.
//! 5. Decode SSE deltas as they arrive, appending text to the assistant
//!    turn and reporting each fragment to the caller's callback.
//! 6. Treat a stream that ends without the terminal frame as failed, and
//!    resolve any failure to a fixed visible error message in the
//!    assistant turn. No automatic retry.
//! 7. Refresh the conversation listing, ignoring refresh failures.
//!
//! The pipeline never talks HTTP itself; it drives a [`Transport`], which
//! in production is [`crate::ApiClient`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use protocol::{
    ChatMessage, ChatRequest, Content, ContentPart, ConversationDetail, ConversationSummary,
    ImageRef, Role, SseDecoder, StreamEvent,
};
use std::pin::Pin;
use uuid::Uuid;

use crate::api::ClientError;
use crate::cache::ConversationCache;

/// Terminal assistant text shown when a send fails for any reason.
pub const ASSISTANT_ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

/// Raw SSE body bytes from a relay call, in arrival-sized chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Server operations the pipeline depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn list(&self) -> Result<Vec<ConversationSummary>, ClientError>;
    async fn detail(&self, id: Uuid) -> Result<ConversationDetail, ClientError>;
    async fn create_with_first_message(
        &self,
        content: &Content,
    ) -> Result<ConversationSummary, ClientError>;
    async fn send_message(&self, id: Uuid, request: &ChatRequest)
    -> Result<ByteStream, ClientError>;
    async fn rename(&self, id: Uuid, title: &str) -> Result<(), ClientError>;
    async fn delete(&self, id: Uuid) -> Result<(), ClientError>;
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ClientError>;
}

/// An image the user attached to an outgoing message.
#[derive(Clone, Debug)]
pub struct ImageAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Cache plus transport, orchestrating the conversation workflows.
pub struct Pipeline<T: Transport> {
    cache: ConversationCache,
    transport: T,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T) -> Self {
        Self { cache: ConversationCache::new(), transport }
    }

    #[must_use]
    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Start a new conversation locally. Nothing is sent to the server
    /// until the first message goes out.
    pub fn create(&mut self, is_temporary: bool) -> Uuid {
        self.cache.create(is_temporary)
    }

    /// Pull the server's conversation listing into the cache. Failures are
    /// logged and swallowed: the cached view stays usable.
    pub async fn refresh(&mut self) {
        match self.transport.list().await {
            Ok(summaries) => self.cache.merge_summaries(&summaries),
            Err(err) => tracing::warn!(error = %err, "conversation list refresh failed"),
        }
    }

    /// Select a conversation and ensure its transcript is loaded. Cached
    /// turns are visible immediately; for durable conversations the full
    /// detail is fetched and merged afterwards.
    pub async fn load(&mut self, id: Uuid) -> Result<(), ClientError> {
        if !self.cache.set_current(id) {
            return Err(ClientError::UnknownConversation(id));
        }
        let is_local =
            self.cache.get(id).map(|conv| conv.is_local).unwrap_or(true);
        if is_local {
            return Ok(());
        }
        let detail = self.transport.detail(id).await?;
        self.cache.apply_detail(detail);
        Ok(())
    }

    /// Rename a conversation. The cache updates immediately; the server
    /// call is best-effort for durable conversations.
    pub async fn rename(&mut self, id: Uuid, title: &str) -> Result<(), ClientError> {
        let Some(conv) = self.cache.get(id) else {
            return Err(ClientError::UnknownConversation(id));
        };
        let is_local = conv.is_local;
        self.cache.rename(id, title);
        if !is_local {
            self.transport.rename(id, title).await?;
        }
        Ok(())
    }

    /// Delete a conversation. For durable conversations the server delete
    /// runs first; on failure the cached entry is left alone.
    pub async fn remove(&mut self, id: Uuid) -> Result<(), ClientError> {
        let Some(conv) = self.cache.get(id) else {
            return Err(ClientError::UnknownConversation(id));
        };
        if !conv.is_local {
            self.transport.delete(id).await?;
        }
        self.cache.remove(id);
        Ok(())
    }

    // =========================================================================
    // SEND
    // =========================================================================

    /// Send a message to the current conversation (creating one if none is
    /// selected) and stream the reply into the cache. Returns the final
    /// conversation id, which differs from the pre-send id when a draft was
    /// promoted.
    pub async fn send(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Result<Uuid, ClientError> {
        self.send_with(text, image, |_| {}).await
    }

    /// [`Pipeline::send`] with a callback invoked for each streamed text
    /// fragment, in order.
    pub async fn send_with(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
        mut on_delta: impl FnMut(&str) + Send,
    ) -> Result<Uuid, ClientError> {
        let mut conv_id = match self.cache.current_id() {
            Some(id) => id,
            None => self.cache.create(false),
        };

        let content = self.build_content(text, image).await;
        self.cache.push_turn(conv_id, Role::User, content.clone());
        self.cache.push_turn(conv_id, Role::Assistant, Content::Text(String::new()));

        let outcome = self.run_send(&mut conv_id, content, &mut on_delta).await;
        if let Err(err) = &outcome {
            tracing::warn!(conversation = %conv_id, error = %err, "send failed");
            self.cache.set_assistant_text(conv_id, ASSISTANT_ERROR_MESSAGE);
        }
        self.cache.touch(conv_id);
        self.refresh().await;
        outcome.map(|()| conv_id)
    }

    /// Attach an uploaded image to the text when one was provided. Upload
    /// failure degrades to a text-only message rather than blocking the
    /// send.
    async fn build_content(&self, text: &str, image: Option<ImageAttachment>) -> Content {
        let Some(image) = image else {
            return Content::Text(text.to_owned());
        };
        match self.transport.upload(&image.filename, image.bytes).await {
            Ok(path) => Content::Parts(vec![
                ContentPart::Text { text: text.to_owned() },
                ContentPart::ImageUrl { image_url: ImageRef { url: path } },
            ]),
            Err(err) => {
                tracing::warn!(error = %err, filename = %image.filename, "image upload failed, sending text only");
                Content::Text(text.to_owned())
            }
        }
    }

    async fn run_send(
        &mut self,
        conv_id: &mut Uuid,
        content: Content,
        on_delta: &mut (impl FnMut(&str) + Send),
    ) -> Result<(), ClientError> {
        let (is_local, is_temporary) = self
            .cache
            .get(*conv_id)
            .map(|conv| (conv.is_local, conv.is_temporary))
            .ok_or(ClientError::UnknownConversation(*conv_id))?;

        let request = if is_temporary {
            // Full local history minus the empty assistant placeholder; the
            // server stores nothing for temporary conversations.
            let messages = self
                .cache
                .get(*conv_id)
                .map(|conv| {
                    conv.turns
                        .iter()
                        .filter(|turn| !turn.content.is_empty())
                        .map(|turn| ChatMessage { role: turn.role, content: turn.content.clone() })
                        .collect()
                })
                .unwrap_or_default();
            ChatRequest { messages, is_temporary: true }
        } else if is_local {
            // Creating the record stores the user turn server-side, so the
            // relay call carries no messages and completes over the stored
            // history.
            let summary = self.transport.create_with_first_message(&content).await?;
            self.cache.promote(*conv_id, &summary);
            *conv_id = summary.id;
            ChatRequest { messages: Vec::new(), is_temporary: false }
        } else {
            ChatRequest {
                messages: vec![ChatMessage { role: Role::User, content }],
                is_temporary: false,
            }
        };

        let mut stream = self.transport.send_message(*conv_id, &request).await?;
        let mut decoder = SseDecoder::new();
        let mut saw_done = false;
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                match event {
                    StreamEvent::Delta(delta) => {
                        if delta.uses_tool() {
                            self.cache.mark_tool_used(*conv_id);
                        }
                        if let Some(fragment) = &delta.content {
                            self.cache.append_assistant_text(*conv_id, fragment);
                            on_delta(fragment);
                        }
                    }
                    StreamEvent::Done => {
                        saw_done = true;
                        break 'read;
                    }
                }
            }
        }
        if !saw_done {
            return Err(ClientError::IncompleteStream);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
