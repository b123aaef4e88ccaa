//! Types for the lifecycle orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors that abort a job body.
///
/// Per-torrent failures never surface here; they are logged and counted in
/// the job's report.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Torrent store error.
    #[error("torrent store error: {0}")]
    Store(#[from] crate::torrent::TorrentError),

    /// Seedr API error.
    #[error("seedr error: {0}")]
    Seedr(#[from] crate::seedr::SeedrError),

    /// Local file system error.
    #[error("file system error: {0}")]
    Relocator(#[from] crate::relocator::RelocatorError),

    /// Reading a descriptor failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required data on a record.
    #[error("missing data on torrent: {0}")]
    MissingData(String),
}

/// Result of one Discover run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverReport {
    /// Descriptors found across all blackholes.
    pub seen: usize,
    /// Records created for descriptors seen for the first time.
    pub created: usize,
}

/// Result of one Upload run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub attempted: usize,
    pub uploaded: usize,
    /// Seedr answered but refused the torrent.
    pub rejected: usize,
    /// The request itself failed (network, HTTP, unreadable descriptor).
    pub failed: usize,
}

/// Result of one Cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// How a transfer ended, as seen by its continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Files are in the watch folder; the record is `Completed`.
    Completed { files_moved: usize },
    /// Some entries could not be moved; the record stays `Downloaded`.
    PartiallyRelocated { failed: usize },
    /// The transfer failed; the record is back at `Uploaded`.
    RolledBack { reason: String },
    /// The continuation could not update the store.
    ContinuationFailed { reason: String },
}

/// What a Download run did.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Another download holds the single-flight slot.
    Busy,
    /// Nothing is ready on Seedr.
    Idle,
    /// A transfer was started. The handle resolves once its continuation
    /// has finished; the job itself never waits on it.
    Started {
        seedr_id: i64,
        handle: JoinHandle<TransferOutcome>,
    },
}

impl DownloadOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, DownloadOutcome::Started { .. })
    }
}

/// Record counts per lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: i64,
    pub uploaded: i64,
    pub downloading: i64,
    pub downloaded: i64,
    pub completed: i64,
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub torrents: StatusCounts,
}
