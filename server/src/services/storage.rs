//! Disk-backed object store with signed-URL resolution.
//!
//! DESIGN
//! ======
//! Uploaded objects (chat images, TTS audio) live under a per-user relative
//! path; the transcript and voice rows store only that path, never a public
//! link. A signed URL carries an expiry and a keyed SHA-256 digest over
//! `secret:path:expiry`; the fetch route validates both before serving bytes.

use std::path::{Path, PathBuf};

use protocol::SignedUrl;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use super::session::bytes_to_hex;

/// Default lifetime of a signed URL.
pub const DEFAULT_SIGN_TTL_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ASSET_SIGNING_SECRET required")]
    MissingSecret,
    #[error("invalid asset path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asset storage configuration: root directory plus signing secret.
#[derive(Debug, Clone)]
pub struct AssetConfig {
    dir: PathBuf,
    secret: String,
}

impl AssetConfig {
    /// Build from `ASSET_DIR` (default `./assets`) and `ASSET_SIGNING_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingSecret`] when the secret is unset, or an
    /// io error if the directory cannot be created.
    pub fn from_env() -> Result<Self, StorageError> {
        let dir = std::env::var("ASSET_DIR").map_or_else(|_| PathBuf::from("./assets"), PathBuf::from);
        let secret = std::env::var("ASSET_SIGNING_SECRET").map_err(|_| StorageError::MissingSecret)?;
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, secret })
    }

    #[cfg(test)]
    #[must_use]
    pub fn for_tests(dir: PathBuf, secret: &str) -> Self {
        Self { dir, secret: secret.to_owned() }
    }

    /// Store object bytes under a fresh per-user relative path, returning it.
    ///
    /// # Errors
    ///
    /// Returns an io error if the write fails.
    pub async fn store(&self, user_id: Uuid, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = format!("{user_id}/{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let full = self.dir.join(&path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(path)
    }

    /// Turn a stored path into a time-limited signed URL.
    #[must_use]
    pub fn sign(&self, path: &str, ttl_secs: i64) -> SignedUrl {
        let expires_at = OffsetDateTime::now_utc() + time::Duration::seconds(ttl_secs);
        let expires = expires_at.unix_timestamp();
        let sig = self.signature(path, expires);
        SignedUrl { url: format!("/api/assets/{path}?expires={expires}&sig={sig}"), expires_at }
    }

    /// Validate a signed fetch: the digest must match and the expiry must be
    /// in the future.
    #[must_use]
    pub fn verify(&self, path: &str, expires: i64, sig: &str) -> bool {
        if OffsetDateTime::now_utc().unix_timestamp() >= expires {
            return false;
        }
        self.signature(path, expires) == sig
    }

    /// Read a stored object's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for traversal attempts, or an io
    /// error if the object is missing.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        if !is_safe_path(path) {
            return Err(StorageError::InvalidPath(path.to_owned()));
        }
        Ok(tokio::fs::read(self.dir.join(path)).await?)
    }

    fn signature(&self, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{path}:{expires}", self.secret));
        bytes_to_hex(&hasher.finalize())
    }
}

/// Relative paths only: no empty segments, no `.`/`..`, no absolute roots.
fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && !Path::new(path).is_absolute()
        && path.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "object".to_owned() } else { cleaned }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
