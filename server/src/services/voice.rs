//! Voice session service.
//!
//! Voice sessions sit parallel to text turns: a TTS utterance or a recorded
//! conversational-AI exchange is stored as its own row, tagged with the
//! synthesizing voice, and merged into the conversation detail view. The
//! `audio_url` column holds a relative storage path; callers resolve it to a
//! signed URL when the audio is actually played.

use protocol::{Role, VoiceAppendRequest, VoiceSession, VoiceTranscriptEntry};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(Uuid),
    #[error("voice session not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append a voice session to a conversation and bump the conversation's
/// recency so it sorts to the head of the directory.
///
/// # Errors
///
/// Returns [`VoiceError::ConversationNotFound`] when the conversation does
/// not exist or belongs to another user.
pub async fn append(
    pool: &PgPool,
    user_id: Uuid,
    conversation_id: Uuid,
    request: VoiceAppendRequest,
) -> Result<VoiceSession, VoiceError> {
    let owned = sqlx::query("SELECT 1 AS one FROM conversations WHERE id = $1 AND user_id = $2")
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if owned.is_none() {
        return Err(VoiceError::ConversationNotFound(conversation_id));
    }

    let transcript = vec![VoiceTranscriptEntry {
        role: Role::Assistant,
        text: request.text,
        timestamp: request.timestamp,
        voice_id: request.voice_id,
        voice_name: request.voice_name,
    }];

    let row = sqlx::query(
        "INSERT INTO voice_sessions (conversation_id, user_id, transcript, audio_url)
         VALUES ($1, $2, $3, $4)
         RETURNING id, created_at",
    )
    .bind(conversation_id)
    .bind(user_id)
    .bind(Json(&transcript))
    .bind(&request.audio_url)
    .fetch_one(pool)
    .await?;

    sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
        .bind(conversation_id)
        .execute(pool)
        .await?;

    Ok(VoiceSession {
        id: row.get("id"),
        conversation_id,
        transcript,
        audio_url: request.audio_url,
        created_at: row.get("created_at"),
    })
}

/// Delete a single voice session. The conversation's text transcript is
/// untouched.
///
/// # Errors
///
/// Returns [`VoiceError::NotFound`] when the session does not exist or
/// belongs to another user.
pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), VoiceError> {
    let result = sqlx::query("DELETE FROM voice_sessions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(VoiceError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "voice_test.rs"]
mod tests;
