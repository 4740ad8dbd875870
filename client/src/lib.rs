//! DESIGN
//! ======
//!
//! Client-side conversation state and the streaming send pipeline.
//!
//! The crate splits into three layers:
//!
//! - [`cache`]: a pure, synchronous [`cache::ConversationCache`] holding the
//!   local view of every conversation, including unsaved drafts and temporary
//!   conversations the server never sees. All reads are served from here
//!   first; network results are merged back in.
//! - [`api`]: [`api::ApiClient`], a thin bearer-authenticated HTTP wrapper
//!   over the server's REST and SSE endpoints.
//! - [`pipeline`]: [`pipeline::Pipeline`], the orchestration that turns a
//!   user's outgoing message into optimistic cache updates, the right relay
//!   call for the conversation's lifecycle state, and incremental assistant
//!   text as SSE deltas arrive.
//!
//! The pipeline talks to the server through the [`pipeline::Transport`]
//! trait rather than [`api::ApiClient`] directly, so the whole send flow
//! (draft promotion, error resolution, temporary isolation) is testable
//! against a scripted transport with no network.

pub mod api;
pub mod cache;
pub mod pipeline;

pub use api::{ApiClient, ClientError};
pub use cache::{CachedConversation, ConversationCache};
pub use pipeline::{ASSISTANT_ERROR_MESSAGE, ImageAttachment, Pipeline, Transport};
