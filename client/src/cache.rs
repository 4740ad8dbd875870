//! DESIGN
//! ======
//!
//! Local conversation cache: the single source of truth for what the user
//! sees. Every conversation the client knows about lives here, whether it
//! came from the server directory or was created locally and not yet saved.
//!
//! Lifecycle states, tracked per entry:
//!
//! - local draft: `is_local` with no turns yet. Exists only in this cache
//!   under a client-generated id. Promoted to a durable entry (server id,
//!   server title) atomically once the server creates the record.
//! - durable: listed by the server; `loaded` says whether the full
//!   transcript has been fetched or only the summary row.
//! - temporary: `is_temporary`, permanently `is_local`. Never promoted,
//!   never merged away, gone when the cache is dropped.
//!
//! The cache is synchronous and does no I/O; `pipeline` drives it.

use protocol::{Content, ConversationDetail, ConversationSummary, Role, Turn, VoiceSession};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ENTRIES
// =============================================================================

/// One conversation as the client currently sees it.
#[derive(Clone, Debug)]
pub struct CachedConversation {
    pub id: Uuid,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Temporary conversations never touch the server.
    pub is_temporary: bool,
    /// True until the server has a record for this conversation.
    pub is_local: bool,
    /// True once `turns` reflects the full transcript rather than just a
    /// directory summary.
    pub loaded: bool,
    pub turns: Vec<Turn>,
    pub voice_sessions: Vec<VoiceSession>,
}

impl CachedConversation {
    fn local_draft(is_temporary: bool) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            title: "New Conversation".to_owned(),
            created_at: now,
            updated_at: now,
            is_temporary,
            is_local: true,
            loaded: true,
            turns: Vec::new(),
            voice_sessions: Vec::new(),
        }
    }

    fn from_summary(summary: &ConversationSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title.clone(),
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            is_temporary: false,
            is_local: false,
            loaded: false,
            turns: Vec::new(),
            voice_sessions: Vec::new(),
        }
    }

    /// A local draft with no content yet. Creating a new conversation while
    /// one of these is current reuses it instead of stacking empties.
    #[must_use]
    pub fn is_empty_draft(&self) -> bool {
        self.is_local && self.turns.is_empty() && self.voice_sessions.is_empty()
    }
}

// =============================================================================
// CACHE
// =============================================================================

/// In-memory conversation directory plus transcripts, most recent first.
#[derive(Debug, Default)]
pub struct ConversationCache {
    conversations: Vec<CachedConversation>,
    current_id: Option<Uuid>,
}

impl ConversationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All conversations, ordered by `updated_at` descending with
    /// `created_at` descending as the tiebreak.
    #[must_use]
    pub fn conversations(&self) -> &[CachedConversation] {
        &self.conversations
    }

    #[must_use]
    pub fn current_id(&self) -> Option<Uuid> {
        self.current_id
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&CachedConversation> {
        self.conversations.iter().find(|conv| conv.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut CachedConversation> {
        self.conversations.iter_mut().find(|conv| conv.id == id)
    }

    /// Start a new conversation and make it current.
    ///
    /// Idempotent while the current conversation is still an empty local
    /// draft of the same temporariness: repeated calls return the same id
    /// rather than piling up blank entries.
    pub fn create(&mut self, is_temporary: bool) -> Uuid {
        if let Some(current) = self.current_id.and_then(|id| self.get(id)) {
            if current.is_empty_draft() && current.is_temporary == is_temporary {
                return current.id;
            }
        }
        let draft = CachedConversation::local_draft(is_temporary);
        let id = draft.id;
        self.conversations.insert(0, draft);
        self.current_id = Some(id);
        id
    }

    /// Select `id` as the current conversation. Returns false when the id is
    /// not in the cache.
    pub fn set_current(&mut self, id: Uuid) -> bool {
        if self.get(id).is_some() {
            self.current_id = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_current(&mut self) {
        self.current_id = None;
    }

    // =========================================================================
    // TRANSCRIPT MUTATION
    // =========================================================================

    /// Append a turn, assigning the next transcript index. Returns the
    /// assigned index, or `None` when the conversation is unknown.
    pub fn push_turn(&mut self, id: Uuid, role: Role, content: Content) -> Option<u64> {
        let conv = self.get_mut(id)?;
        let index = conv.turns.len() as u64;
        conv.turns.push(Turn::new(index, role, content));
        Some(index)
    }

    /// Append streamed text to the trailing assistant turn.
    pub fn append_assistant_text(&mut self, id: Uuid, fragment: &str) {
        if let Some(turn) = self.trailing_assistant(id) {
            turn.content.push_text(fragment);
        }
    }

    /// Flag the trailing assistant turn as having used a tool.
    pub fn mark_tool_used(&mut self, id: Uuid) {
        if let Some(turn) = self.trailing_assistant(id) {
            turn.tool_used = true;
        }
    }

    /// Replace the trailing assistant turn's content outright. Used to
    /// resolve a failed stream to a terminal error message.
    pub fn set_assistant_text(&mut self, id: Uuid, text: &str) {
        if let Some(turn) = self.trailing_assistant(id) {
            turn.content = Content::Text(text.to_owned());
        }
    }

    fn trailing_assistant(&mut self, id: Uuid) -> Option<&mut Turn> {
        self.get_mut(id)?.turns.last_mut().filter(|turn| turn.role == Role::Assistant)
    }

    /// Bump `updated_at` to now and restore recency order.
    pub fn touch(&mut self, id: Uuid) {
        if let Some(conv) = self.get_mut(id) {
            conv.updated_at = OffsetDateTime::now_utc();
            self.sort();
        }
    }

    // =========================================================================
    // SERVER RECONCILIATION
    // =========================================================================

    /// Replace a local draft's identity with the record the server created
    /// for it, in one step. Turns already streamed into the draft are kept;
    /// id, title, and timestamps come from the server. Returns false when
    /// `old_id` is not in the cache.
    pub fn promote(&mut self, old_id: Uuid, summary: &ConversationSummary) -> bool {
        let Some(conv) = self.get_mut(old_id) else {
            return false;
        };
        conv.id = summary.id;
        conv.title = summary.title.clone();
        conv.created_at = summary.created_at;
        conv.updated_at = summary.updated_at;
        conv.is_local = false;
        if self.current_id == Some(old_id) {
            self.current_id = Some(summary.id);
        }
        self.sort();
        true
    }

    /// Overwrite an entry's transcript and voice sessions with a fetched
    /// detail view, inserting the entry if it is not cached yet.
    pub fn apply_detail(&mut self, detail: ConversationDetail) {
        match self.get_mut(detail.id) {
            Some(conv) => {
                conv.title = detail.title;
                conv.created_at = detail.created_at;
                conv.updated_at = detail.updated_at;
                conv.turns = detail.turns;
                conv.voice_sessions = detail.voice_sessions;
                conv.loaded = true;
            }
            None => self.conversations.push(CachedConversation {
                id: detail.id,
                title: detail.title,
                created_at: detail.created_at,
                updated_at: detail.updated_at,
                is_temporary: false,
                is_local: false,
                loaded: true,
                turns: detail.turns,
                voice_sessions: detail.voice_sessions,
            }),
        }
        self.sort();
    }

    /// Reconcile against a fresh server listing.
    ///
    /// Server rows win for titles and timestamps; cached transcripts are
    /// kept where ids match. Local drafts and temporary conversations
    /// survive untouched. Durable entries the server no longer lists were
    /// deleted elsewhere and are dropped.
    pub fn merge_summaries(&mut self, summaries: &[ConversationSummary]) {
        let mut merged: Vec<CachedConversation> = Vec::with_capacity(summaries.len());
        let mut stash: Vec<CachedConversation> = Vec::new();
        for conv in self.conversations.drain(..) {
            if conv.is_local {
                merged.push(conv);
            } else {
                stash.push(conv);
            }
        }
        for summary in summaries {
            match stash.iter().position(|conv| conv.id == summary.id) {
                Some(pos) => {
                    let mut conv = stash.swap_remove(pos);
                    conv.title = summary.title.clone();
                    conv.created_at = summary.created_at;
                    conv.updated_at = summary.updated_at;
                    merged.push(conv);
                }
                None => merged.push(CachedConversation::from_summary(summary)),
            }
        }
        self.conversations = merged;
        self.sort();
        if let Some(current) = self.current_id {
            if self.get(current).is_none() {
                self.current_id = None;
            }
        }
    }

    pub fn rename(&mut self, id: Uuid, title: &str) {
        if let Some(conv) = self.get_mut(id) {
            conv.title = title.to_owned();
        }
    }

    /// Drop a conversation. Clears the current selection when it pointed at
    /// the removed entry.
    pub fn remove(&mut self, id: Uuid) {
        self.conversations.retain(|conv| conv.id != id);
        if self.current_id == Some(id) {
            self.current_id = None;
        }
    }

    fn sort(&mut self) {
        self.conversations.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then(b.created_at.cmp(&a.created_at))
        });
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
