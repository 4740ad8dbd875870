//! Asset routes: upload, signing, and signed fetch.
//!
//! The fetch route is the one unauthenticated `/api` endpoint: the signed
//! URL itself is the credential, so audio elements and image tags can load
//! objects without header plumbing. Upload and sign both require a session.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use protocol::SignedUrl;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::services::storage::{DEFAULT_SIGN_TTL_SECS, StorageError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SignQuery {
    pub path: String,
}

#[derive(Deserialize)]
pub struct FetchQuery {
    pub expires: i64,
    pub sig: String,
}

/// `POST /api/assets?name=<filename>`: store the raw body under a per-user
/// path and return `{path}`. The caller keeps the relative path; it is
/// resolved to a signed URL at render time.
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let path = state
        .assets
        .store(auth.user.id, &query.name, &body)
        .await
        .map_err(error_to_status)?;

    tracing::info!(user_id = %auth.user.id, %path, size = body.len(), "asset stored");
    Ok(Json(serde_json::json!({ "path": path })))
}

/// `GET /api/assets/sign?path=<path>`: mint a short-lived signed URL for a
/// stored object.
pub async fn sign(State(state): State<AppState>, _auth: AuthUser, Query(query): Query<SignQuery>) -> Json<SignedUrl> {
    Json(state.assets.sign(&query.path, DEFAULT_SIGN_TTL_SECS))
}

/// `GET /api/assets/*path?expires=..&sig=..`: serve object bytes after
/// validating the signature and expiry.
pub async fn fetch(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<FetchQuery>,
) -> Result<Response, StatusCode> {
    if !state.assets.verify(&path, query.expires, &query.sig) {
        return Err(StatusCode::FORBIDDEN);
    }

    let bytes = state.assets.read(&path).await.map_err(error_to_status)?;
    Ok(([(CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

fn error_to_status(err: StorageError) -> StatusCode {
    match &err {
        StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        StorageError::MissingSecret | StorageError::Io(_) => {
            tracing::error!(error = %err, "asset storage error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
