//! Conversation, turn, and voice-session wire types.
//!
//! Transcript turns are append-only: a turn's `index` is its position in the
//! conversation's history array, assigned at append time and never reused.
//! Content is either a flat string or an ordered list of typed parts so that
//! multimodal messages (text plus image references) share one shape with
//! plain text.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ROLES AND CONTENT
// =============================================================================

/// Author of a transcript turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One typed part of a multimodal message.
///
/// Unrecognized part types deserialize as [`ContentPart::Unknown`] so a newer
/// peer can add part kinds without breaking older readers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A plain text segment.
    Text { text: String },
    /// A reference to an image, either a URL or a relative storage path.
    ImageUrl { image_url: ImageRef },
    /// Any unrecognized part type, ignored by downstream logic.
    #[serde(other)]
    Unknown,
}

/// Image reference carried inside an `image_url` content part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Either an absolute URL or a relative storage path resolved to a
    /// signed URL at render time.
    pub url: String,
}

/// Message content, either plain text or structured parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// A simple string payload.
    Text(String),
    /// An ordered sequence of typed parts.
    Parts(Vec<ContentPart>),
}

impl Content {
    /// First plain-text payload of this content: the string itself for
    /// [`Content::Text`], or the first `text` part for [`Content::Parts`].
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            }),
        }
    }

    /// Append a text fragment to this content.
    ///
    /// For [`Content::Text`] the fragment is concatenated in place. For
    /// [`Content::Parts`] it extends the last text part, or pushes a new one
    /// if none exists yet.
    pub fn push_text(&mut self, fragment: &str) {
        match self {
            Self::Text(text) => text.push_str(fragment),
            Self::Parts(parts) => {
                let last_text = parts.iter_mut().rev().find_map(|part| match part {
                    ContentPart::Text { text } => Some(text),
                    _ => None,
                });
                match last_text {
                    Some(text) => text.push_str(fragment),
                    None => parts.push(ContentPart::Text { text: fragment.to_owned() }),
                }
            }
        }
    }

    /// True when the content carries no text and no other parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

// =============================================================================
// TURNS
// =============================================================================

/// One role-tagged entry in a conversation's append-only transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Position in the transcript array. Never reassigned.
    pub index: u64,
    pub role: Role,
    pub content: Content,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set when the completion that produced this turn invoked a tool.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tool_used: bool,
}

impl Turn {
    /// Build a turn stamped with the current time.
    #[must_use]
    pub fn new(index: u64, role: Role, content: Content) -> Self {
        Self { index, role, content, created_at: OffsetDateTime::now_utc(), tool_used: false }
    }
}

// =============================================================================
// RELAY REQUEST
// =============================================================================

/// A single message submitted to the completion relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

/// Body of a completion relay call.
///
/// For a durable conversation the client sends only the new user turn; the
/// server already holds the prior transcript. Temporary conversations send
/// the full local history because the server stores nothing for them. An
/// empty `messages` list asks the relay to complete over the stored history
/// as-is without appending a new turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_temporary: bool,
}

// =============================================================================
// CONVERSATION RECORDS
// =============================================================================

/// Conversation metadata as listed by the directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Full conversation view: metadata plus transcript plus voice sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub turns: Vec<Turn>,
    /// Voice sessions in creation order.
    #[serde(default)]
    pub voice_sessions: Vec<VoiceSession>,
}

// =============================================================================
// VOICE SESSIONS
// =============================================================================

/// One entry of a voice session's transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceTranscriptEntry {
    pub role: Role,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Identifier of the synthesizing voice, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
}

/// A TTS or conversational-audio record attached to a conversation.
///
/// `audio_url` is a relative storage path, never a public link; callers
/// resolve it to a time-limited signed URL when the audio is actually played.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceSession {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub transcript: Vec<VoiceTranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of a voice session append call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceAppendRequest {
    /// Text that was synthesized or transcribed.
    pub text: String,
    /// Relative storage path of the audio object, when one was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
}

// =============================================================================
// SIGNED URLS
// =============================================================================

/// A time-limited resolvable link to an otherwise-private stored object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
