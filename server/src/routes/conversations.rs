//! Conversation directory routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use protocol::{ChatMessage, ConversationDetail, ConversationSummary, Role};
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::conversation::{self, ConversationError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateConversationBody {
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub struct RenameBody {
    pub title: String,
}

/// `GET /api/conversations`: list the caller's conversations by recency.
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<ConversationSummary>>, StatusCode> {
    let summaries = conversation::list(&state.pool, auth.user.id)
        .await
        .map_err(error_to_status)?;
    Ok(Json(summaries))
}

/// `POST /api/conversations`: create with first message. The transcript
/// starts with the submitted user turn and the title is derived from it.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateConversationBody>,
) -> Result<Json<ConversationSummary>, StatusCode> {
    let Some(first) = body.messages.into_iter().next() else {
        return Err(StatusCode::BAD_REQUEST);
    };
    if first.role != Role::User || first.content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let summary = conversation::create_with_first_turn(&state.pool, auth.user.id, first.content)
        .await
        .map_err(error_to_status)?;

    tracing::info!(conversation_id = %summary.id, title = %summary.title, "conversation created");
    Ok(Json(summary))
}

/// `GET /api/conversations/:id`: metadata plus full transcript plus voice
/// sessions.
pub async fn detail(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetail>, StatusCode> {
    let detail = conversation::detail(&state.pool, auth.user.id, id)
        .await
        .map_err(error_to_status)?;
    Ok(Json(detail))
}

/// `PATCH /api/conversations/:id`: rename. Metadata only, no transcript
/// side effects.
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameBody>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    conversation::rename(&state.pool, auth.user.id, id, &body.title)
        .await
        .map_err(error_to_status)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// `DELETE /api/conversations/:id`: delete the record; turns and voice
/// sessions cascade.
pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    conversation::delete(&state.pool, auth.user.id, id)
        .await
        .map_err(error_to_status)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

pub(crate) fn error_to_status(err: ConversationError) -> StatusCode {
    match err {
        ConversationError::NotFound(_) => StatusCode::NOT_FOUND,
        ConversationError::Database(e) => {
            tracing::error!(error = %e, "conversation database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "conversations_test.rs"]
mod tests;
