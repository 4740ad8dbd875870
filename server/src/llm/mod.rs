//! Completion service adapter.
//!
//! DESIGN
//! ======
//! The relay talks to the completion service through the [`Completions`]
//! trait: given a transcript, the provider pushes incremental deltas into an
//! mpsc sender as they arrive from upstream. Nothing is buffered; the relay
//! frames and flushes each delta the moment it lands. The only concrete
//! provider speaks the OpenAI-compatible streaming API; tests substitute a
//! scripted mock.

pub mod config;
#[cfg(test)]
pub mod mock;
pub mod openai;
pub mod types;

pub use openai::OpenAiCompletions;
pub use types::{CompletionError, Completions};
