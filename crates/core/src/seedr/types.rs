//! Types for the Seedr REST API.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to Seedr.
#[derive(Debug, Error)]
pub enum SeedrError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeedrError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SeedrError::Timeout
        } else if e.is_connect() {
            SeedrError::ConnectionFailed(e.to_string())
        } else {
            SeedrError::ApiError(e.to_string())
        }
    }
}

/// A folder in the Seedr root directory (a finished transfer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedrFolder {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_update: Option<String>,
}

/// Body of `GET /folder`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FolderListing {
    #[serde(default)]
    pub folders: Vec<SeedrFolder>,
}

/// Body returned by the add-transfer endpoints.
///
/// Seedr answers 200 even when it refuses a torrent; the refusal is carried
/// in `result`/`error`, so callers must go through [`outcome`](Self::outcome).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddTorrentResponse {
    /// `true` on success, `false` or a reason string on refusal.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub user_torrent_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub torrent_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What Seedr decided about an upload that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted { title: String, torrent_hash: Option<String> },
    Rejected { reason: String },
}

impl AddTorrentResponse {
    pub fn outcome(&self) -> UploadOutcome {
        if let Some(error) = &self.error {
            return UploadOutcome::Rejected {
                reason: error.clone(),
            };
        }

        match &self.result {
            Some(serde_json::Value::Bool(false)) => {
                return UploadOutcome::Rejected {
                    reason: match self.code {
                        Some(code) => format!("rejected with code {}", code),
                        None => "rejected".to_string(),
                    },
                };
            }
            Some(serde_json::Value::String(reason)) => {
                return UploadOutcome::Rejected {
                    reason: reason.clone(),
                };
            }
            _ => {}
        }

        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => UploadOutcome::Accepted {
                title: title.to_string(),
                torrent_hash: self.torrent_hash.clone(),
            },
            _ => UploadOutcome::Rejected {
                reason: "response carried no title".to_string(),
            },
        }
    }
}

/// Result of a completed folder transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSummary {
    /// Archive bytes received.
    pub bytes: u64,
    /// Files unpacked into the destination.
    pub files: usize,
}

/// Operations the orchestrator needs from the seedbox.
#[async_trait]
pub trait SeedrApi: Send + Sync {
    /// List the folders in the account root.
    async fn list_root_folders(&self) -> Result<Vec<SeedrFolder>, SeedrError>;

    /// Start a transfer from a magnet URI.
    async fn add_magnet(&self, magnet: &str) -> Result<AddTorrentResponse, SeedrError>;

    /// Start a transfer from a .torrent file on disk.
    async fn add_torrent_file(&self, path: &Path) -> Result<AddTorrentResponse, SeedrError>;

    /// Stream folder `id` as a zip archive into the file `archive`.
    /// The parent directory must already exist. Returns the bytes written.
    async fn download_archive(&self, id: i64, archive: &Path) -> Result<u64, SeedrError>;
}
