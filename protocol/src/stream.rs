//! Streamed completion frames and the incremental SSE decoder.
//!
//! DESIGN
//! ======
//! The completion relay emits OpenAI-shaped chunks, one SSE frame per delta:
//! `data: {"choices":[{"delta":{"content":"..."}}]}\n\n`, terminated by
//! `data: [DONE]\n\n`. The decoder makes no assumption about how frames align
//! with network reads: a single read may carry several frames, a frame may be
//! split across reads, and `[DONE]` may sit mid-buffer between other lines.
//! Every complete line is evaluated independently.
//!
//! ERROR HANDLING
//! ==============
//! Lines that are not valid SSE data frames, and payloads that do not parse
//! as a delta chunk, are skipped rather than surfaced. Upstream providers add
//! fields over time; a strict schema here would turn every addition into a
//! client outage.

use serde::{Deserialize, Serialize};

use crate::STREAM_DONE;

// =============================================================================
// DELTA PAYLOAD
// =============================================================================

/// One streamed chunk of an in-progress completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatChunk {
    /// Build the chunk the relay emits for a plain text delta.
    #[must_use]
    pub fn content(text: &str) -> Self {
        Self {
            choices: vec![ChatChoice {
                delta: ChatDelta { content: Some(text.to_owned()), tool_calls: None },
                finish_reason: None,
            }],
        }
    }

    /// Build the chunk the relay emits for an arbitrary delta.
    #[must_use]
    pub fn from_delta(delta: ChatDelta) -> Self {
        Self { choices: vec![ChatChoice { delta, finish_reason: None }] }
    }

    /// The first choice's delta, dropping the chunk.
    #[must_use]
    pub fn into_delta(self) -> Option<ChatDelta> {
        self.choices.into_iter().next().map(|choice| choice.delta)
    }
}

/// One alternative within a chunk. Providers always send exactly one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub delta: ChatDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Incremental change carried by a chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatDelta {
    /// Text appended to the assistant message, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present when the model invoked a tool during generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

impl ChatDelta {
    /// True when this delta signals a tool or function invocation.
    #[must_use]
    pub fn uses_tool(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Fragment of a streamed tool invocation. Only the fields the client needs
/// are modeled; argument fragments stay raw JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<serde_json::Value>,
}

// =============================================================================
// DECODER
// =============================================================================

/// Event produced by the decoder for each meaningful SSE line.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A parsed delta chunk.
    Delta(ChatDelta),
    /// The `[DONE]` sentinel; the stream is complete.
    Done,
}

/// Incremental newline-delimited SSE frame decoder.
///
/// Feed raw byte chunks as they arrive; complete lines are decoded
/// immediately and a trailing partial line is buffered for the next read.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one network read and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Bytes held back as an incomplete trailing line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<StreamEvent> {
    // A multibyte code point never contains b'\n', so splitting on newlines
    // before UTF-8 validation cannot cut a character in half.
    let line = std::str::from_utf8(raw).ok()?.trim();
    let payload = line.strip_prefix("data:")?.trim_start();

    if payload == STREAM_DONE {
        return Some(StreamEvent::Done);
    }

    serde_json::from_str::<ChatChunk>(payload)
        .ok()
        .and_then(ChatChunk::into_delta)
        .map(StreamEvent::Delta)
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
