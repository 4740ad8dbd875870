//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the directory CRUD, the SSE completion relay, voice sessions, and
//! asset upload/signing under a single Axum router with CORS and request
//! tracing. Every `/api` endpoint except the signed asset fetch requires a
//! bearer session token.

pub mod assets;
pub mod auth;
pub mod chat;
pub mod conversations;
pub mod voice;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/dev/session", post(auth::dev_session))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/conversations", get(conversations::list).post(conversations::create))
        .route(
            "/api/conversations/{id}",
            get(conversations::detail)
                .patch(conversations::rename)
                .delete(conversations::remove),
        )
        .route("/api/conversations/{id}/message", post(chat::send_message))
        .route("/api/conversations/{id}/voice", post(voice::append))
        .route("/api/voice/{id}", delete(voice::remove))
        .route("/api/assets", post(assets::upload))
        .route("/api/assets/sign", get(assets::sign))
        .route("/api/assets/{*path}", get(assets::fetch))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
