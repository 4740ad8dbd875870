//! Shared wire model for the conversation sync protocol.
//!
//! This crate owns the JSON representation used by both `server` and `client`:
//! conversation records, transcript turns with multimodal content, voice
//! sessions, and the SSE delta frames produced by the completion relay. It has
//! no I/O; the incremental [`SseDecoder`] works on raw byte chunks so either
//! side can drive it from whatever stream it has.

pub mod stream;
pub mod types;

pub use stream::{ChatChunk, ChatDelta, SseDecoder, StreamEvent, ToolCallDelta};
pub use types::{
    ChatMessage, ChatRequest, Content, ContentPart, ConversationDetail, ConversationSummary,
    ImageRef, Role, SignedUrl, Turn, VoiceAppendRequest, VoiceSession, VoiceTranscriptEntry,
};

/// Payload of the SSE frame that terminates a completion stream.
pub const STREAM_DONE: &str = "[DONE]";
