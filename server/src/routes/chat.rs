//! Completion relay route.
//!
//! DESIGN
//! ======
//! Per-request flow: authenticate, load history, append the user turn,
//! stream, persist the assistant turn. The user turn is written to the
//! transcript store BEFORE streaming begins, so a disconnect mid-stream
//! never loses the user's message. The assistant turn is written only after
//! the upstream stream fully completes; when the client disappears first the
//! partial output is intentionally dropped rather than persisted.
//!
//! Temporary conversations bypass all persistence: the transcript comes
//! entirely from the request body and nothing is read from or written to the
//! store.
//!
//! An empty `messages` list completes over the stored history as-is without
//! appending a new turn; the client uses this right after
//! create-with-first-message, whose user turn is already stored.
//!
//! ERROR HANDLING
//! ==============
//! Only auth, a missing conversation, and a pre-stream persistence failure
//! produce a non-2xx response. Once streaming has started, upstream and
//! persistence failures are absorbed: the stream simply ends without the
//! `[DONE]` sentinel and the failure is logged. The client resolves its
//! placeholder from that.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::StreamExt;
use protocol::{ChatChunk, ChatDelta, ChatMessage, ChatRequest, Content, Role, STREAM_DONE, Turn};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::llm::Completions;
use crate::routes::auth::AuthUser;
use crate::routes::conversations::error_to_status;
use crate::services::conversation;
use crate::state::AppState;

/// `POST /api/conversations/:id/message`: append the submitted user turn
/// and stream the assistant's completion back as SSE.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(completions) = state.completions.clone() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    // Reject a malformed new turn before touching the store.
    if let Some(last) = request.messages.last() {
        if last.role != Role::User || last.content.is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let messages = if request.is_temporary {
        // Nothing stored for temporary conversations; the request body is
        // the entire context.
        request.messages
    } else {
        load_and_append(&state.pool, auth.user.id, id, request.messages.last().cloned()).await?
    };

    let (frame_tx, frame_rx) = mpsc::channel::<String>(32);
    tokio::spawn(relay_stream(
        completions,
        state.pool.clone(),
        auth.user.id,
        id,
        request.is_temporary,
        messages,
        frame_tx,
    ));

    let stream = ReceiverStream::new(frame_rx).map(|payload| Ok::<_, Infallible>(Event::default().data(payload)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Load the stored transcript, persist the new user turn ahead of the
/// stream, and return the full provider context.
async fn load_and_append(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    new_turn: Option<ChatMessage>,
) -> Result<Vec<ChatMessage>, StatusCode> {
    let mut turns = conversation::history(pool, user_id, id)
        .await
        .map_err(error_to_status)?;

    if let Some(message) = new_turn {
        // Pre-stream write: a disconnect later cannot lose this turn. A
        // failure here aborts the request.
        let turn = conversation::append_turn(pool, user_id, id, Role::User, message.content, false)
            .await
            .map_err(error_to_status)?;
        turns.push(turn);
    }

    Ok(turns.into_iter().map(to_message).collect())
}

fn to_message(turn: Turn) -> ChatMessage {
    ChatMessage { role: turn.role, content: turn.content }
}

/// Pump upstream deltas to the client, then persist the assistant turn.
///
/// Each delta is framed and flushed as its own SSE data frame, nothing is
/// buffered. A failed send on `frames` means the client is gone; the pump
/// stops, the dropped delta receiver cancels the provider, and the assistant
/// turn is never persisted.
async fn relay_stream(
    completions: Arc<dyn Completions>,
    pool: PgPool,
    user_id: Uuid,
    conversation_id: Uuid,
    is_temporary: bool,
    messages: Vec<ChatMessage>,
    frames: mpsc::Sender<String>,
) {
    let (delta_tx, mut delta_rx) = mpsc::channel::<ChatDelta>(32);
    let upstream = tokio::spawn(async move { completions.complete(messages, delta_tx).await });

    let mut full = String::new();
    let mut tool_used = false;
    let mut delta_count = 0_u64;
    let mut client_gone = false;

    while let Some(delta) = delta_rx.recv().await {
        delta_count += 1;
        if delta.uses_tool() {
            tool_used = true;
        }
        if let Some(text) = &delta.content {
            full.push_str(text);
        }

        let Ok(payload) = serde_json::to_string(&ChatChunk::from_delta(delta)) else {
            continue;
        };
        if frames.send(payload).await.is_err() {
            client_gone = true;
            break;
        }
    }
    drop(delta_rx);

    let upstream_result = match upstream.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(%conversation_id, error = %e, "completion task panicked");
            return;
        }
    };

    if client_gone {
        tracing::info!(%conversation_id, delta_count, "client gone mid-stream; assistant turn dropped");
        return;
    }
    if let Err(e) = upstream_result {
        tracing::warn!(%conversation_id, delta_count, error = %e, "completion stream failed");
        return;
    }

    if frames.send(STREAM_DONE.to_owned()).await.is_err() {
        tracing::info!(%conversation_id, "client gone before [DONE]; assistant turn dropped");
        return;
    }

    if is_temporary {
        tracing::info!(%conversation_id, delta_count, "temporary exchange complete; nothing persisted");
        return;
    }

    match conversation::append_turn(&pool, user_id, conversation_id, Role::Assistant, Content::from(full), tool_used)
        .await
    {
        Ok(turn) => {
            tracing::info!(%conversation_id, index = turn.index, delta_count, "assistant turn persisted");
        }
        Err(e) => {
            // The stream already completed for the client; log and move on.
            tracing::error!(%conversation_id, error = %e, "assistant turn persistence failed");
        }
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
