//! Voice session routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use protocol::{VoiceAppendRequest, VoiceSession};
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::voice::{self, VoiceError};
use crate::state::AppState;

/// `POST /api/conversations/:id/voice`: attach a TTS or conversational-AI
/// recording to a conversation.
pub async fn append(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<VoiceAppendRequest>,
) -> Result<Json<VoiceSession>, StatusCode> {
    if body.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let session = voice::append(&state.pool, auth.user.id, id, body)
        .await
        .map_err(error_to_status)?;

    tracing::info!(conversation_id = %id, voice_session_id = %session.id, "voice session appended");
    Ok(Json(session))
}

/// `DELETE /api/voice/:id`: remove one voice session.
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    voice::delete(&state.pool, auth.user.id, id)
        .await
        .map_err(error_to_status)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

fn error_to_status(err: VoiceError) -> StatusCode {
    match err {
        VoiceError::ConversationNotFound(_) | VoiceError::NotFound(_) => StatusCode::NOT_FOUND,
        VoiceError::Database(e) => {
            tracing::error!(error = %e, "voice database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
