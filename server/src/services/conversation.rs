//! Conversation service: directory CRUD and the transcript store.
//!
//! DESIGN
//! ======
//! A conversation's transcript lives in the `history` jsonb column as an
//! append-only array of turns; a turn's identity is its array position.
//! Appends are read-modify-write with no optimistic-concurrency token, so two
//! concurrent appends to one conversation race on last-write-wins. A single
//! client serializes its own sends (input stays disabled while a send is
//! unresolved), which leaves only the cross-device case exposed; the cost of
//! that race is a lost concurrent append, not a corrupt transcript. Kept as
//! is rather than silently adding a version column.

use protocol::{Content, ConversationDetail, ConversationSummary, Role, Turn, VoiceSession};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("conversation not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Longest derived title before truncation, in characters.
pub const TITLE_MAX_CHARS: usize = 30;

const DEFAULT_TITLE: &str = "New Conversation";

// =============================================================================
// TITLE DERIVATION
// =============================================================================

/// Derive a conversation title from the first user turn's content.
///
/// Flat string content is used directly; multimodal content contributes its
/// first text part, never an image reference. Titles longer than
/// [`TITLE_MAX_CHARS`] are cut at a character boundary with an ellipsis
/// marker appended. Pure and deterministic: the same first turn always yields
/// the same title.
#[must_use]
pub fn derive_title(content: &Content) -> String {
    let text = content.text().map(str::trim).filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TITLE);

    if text.chars().count() > TITLE_MAX_CHARS {
        let prefix: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{prefix}...")
    } else {
        text.to_owned()
    }
}

// =============================================================================
// DIRECTORY CRUD
// =============================================================================

/// Create a conversation from its first user turn.
///
/// The title is derived from the turn's text content and the transcript
/// starts with exactly that turn.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_with_first_turn(
    pool: &PgPool,
    user_id: Uuid,
    content: Content,
) -> Result<ConversationSummary, ConversationError> {
    let title = derive_title(&content);
    let first_turn = Turn::new(0, Role::User, content);

    let row = sqlx::query(
        "INSERT INTO conversations (user_id, title, history)
         VALUES ($1, $2, $3)
         RETURNING id, title, created_at, updated_at",
    )
    .bind(user_id)
    .bind(&title)
    .bind(Json(vec![first_turn]))
    .fetch_one(pool)
    .await?;

    Ok(summary_from_row(&row))
}

/// List the caller's conversations, most recently updated first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<ConversationSummary>, ConversationError> {
    let rows = sqlx::query(
        "SELECT id, title, created_at, updated_at
         FROM conversations
         WHERE user_id = $1
         ORDER BY updated_at DESC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(summary_from_row).collect())
}

/// Load one conversation with its full transcript and voice sessions.
///
/// # Errors
///
/// Returns [`ConversationError::NotFound`] when the conversation does not
/// exist or belongs to another user.
pub async fn detail(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<ConversationDetail, ConversationError> {
    let row = sqlx::query(
        "SELECT id, title, history, created_at, updated_at
         FROM conversations
         WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ConversationError::NotFound(id))?;

    let voice_rows = sqlx::query(
        "SELECT id, conversation_id, transcript, audio_url, created_at
         FROM voice_sessions
         WHERE conversation_id = $1
         ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let Json(turns): Json<Vec<Turn>> = row.get("history");
    let voice_sessions = voice_rows
        .iter()
        .map(|r| {
            let Json(transcript) = r.get("transcript");
            VoiceSession {
                id: r.get("id"),
                conversation_id: r.get("conversation_id"),
                transcript,
                audio_url: r.get("audio_url"),
                created_at: r.get("created_at"),
            }
        })
        .collect();

    Ok(ConversationDetail {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        turns,
        voice_sessions,
    })
}

/// Load only the transcript of a conversation.
///
/// # Errors
///
/// Returns [`ConversationError::NotFound`] when the conversation does not
/// exist or belongs to another user.
pub async fn history(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Vec<Turn>, ConversationError> {
    let row = sqlx::query("SELECT history FROM conversations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ConversationError::NotFound(id))?;

    let Json(turns): Json<Vec<Turn>> = row.get("history");
    Ok(turns)
}

/// Append one turn to a conversation's transcript and bump its recency.
///
/// The stored transcript is reloaded so the new turn's index reflects the
/// current array length; last-write-wins under concurrent appends.
///
/// # Errors
///
/// Returns [`ConversationError::NotFound`] when the conversation does not
/// exist or belongs to another user.
pub async fn append_turn(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    role: Role,
    content: Content,
    tool_used: bool,
) -> Result<Turn, ConversationError> {
    let mut turns = history(pool, user_id, id).await?;
    let mut turn = Turn::new(turns.len() as u64, role, content);
    turn.tool_used = tool_used;
    turns.push(turn.clone());

    sqlx::query(
        "UPDATE conversations SET history = $1, updated_at = now()
         WHERE id = $2 AND user_id = $3",
    )
    .bind(Json(turns))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(turn)
}

/// Rename a conversation. Touches metadata only, never the transcript.
///
/// # Errors
///
/// Returns [`ConversationError::NotFound`] when the conversation does not
/// exist or belongs to another user.
pub async fn rename(pool: &PgPool, user_id: Uuid, id: Uuid, title: &str) -> Result<(), ConversationError> {
    let result = sqlx::query("UPDATE conversations SET title = $1 WHERE id = $2 AND user_id = $3")
        .bind(title)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ConversationError::NotFound(id));
    }
    Ok(())
}

/// Delete a conversation; its turns and voice sessions cascade with it.
///
/// # Errors
///
/// Returns [`ConversationError::NotFound`] when the conversation does not
/// exist or belongs to another user.
pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), ConversationError> {
    let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ConversationError::NotFound(id));
    }
    Ok(())
}

fn summary_from_row(row: &sqlx::postgres::PgRow) -> ConversationSummary {
    ConversationSummary {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
