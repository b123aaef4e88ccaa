//! Torrent storage trait and error type.

use std::fmt;

use super::{NewTorrent, Torrent, TorrentKey, TorrentStatus};

/// Error type for torrent store operations.
#[derive(Debug)]
pub enum TorrentError {
    /// No record matches the lookup.
    NotFound(String),
    /// The requested status change is not a legal lifecycle edge.
    InvalidTransition {
        torrent: String,
        from: TorrentStatus,
        to: TorrentStatus,
    },
    /// Database error.
    Database(String),
}

impl fmt::Display for TorrentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentError::NotFound(what) => write!(f, "Torrent not found: {}", what),
            TorrentError::InvalidTransition { torrent, from, to } => write!(
                f,
                "Cannot move torrent {} from {} to {}",
                torrent, from, to
            ),
            TorrentError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TorrentError {}

impl From<rusqlite::Error> for TorrentError {
    fn from(e: rusqlite::Error) -> Self {
        TorrentError::Database(e.to_string())
    }
}

/// A successful upload waiting to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedTorrent {
    pub key: TorrentKey,
    /// Title Seedr assigned to the transfer.
    pub torrent_name: String,
}

/// A remote folder matched to a local record during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedrIdAssignment {
    pub torrent_name: String,
    pub seedr_id: i64,
}

/// Trait for torrent storage backends.
///
/// Every method taking a slice applies the whole batch in one transaction:
/// either all rows change or none do.
pub trait TorrentStore: Send + Sync {
    /// Insert records at `New` for every descriptor whose natural key is not
    /// present yet. Existing records are left untouched.
    /// Returns how many records were created.
    fn create_if_absent_many(&self, torrents: &[NewTorrent]) -> Result<usize, TorrentError>;

    /// Get a record by natural key.
    fn get(&self, key: &TorrentKey) -> Result<Option<Torrent>, TorrentError>;

    /// All records, in discovery order.
    fn list_all(&self) -> Result<Vec<Torrent>, TorrentError>;

    /// Records in the given status, in discovery order.
    fn list_by_status(&self, status: TorrentStatus) -> Result<Vec<Torrent>, TorrentError>;

    /// Number of records in the given status.
    fn count_by_status(&self, status: TorrentStatus) -> Result<i64, TorrentError>;

    /// Move `New` records to `Uploaded`, recording their Seedr title.
    fn mark_uploaded(&self, uploads: &[UploadedTorrent]) -> Result<(), TorrentError>;

    /// Record Seedr folder ids by torrent name. Records that already carry a
    /// `seedr_id` are never changed. Returns how many records were updated.
    fn assign_seedr_ids(&self, assignments: &[SeedrIdAssignment]) -> Result<usize, TorrentError>;

    /// Change the status of the record holding `seedr_id`.
    fn update_status_by_seedr_id(
        &self,
        seedr_id: i64,
        status: TorrentStatus,
    ) -> Result<Torrent, TorrentError>;

    /// Change the status of a record by natural key.
    fn update_status(&self, key: &TorrentKey, status: TorrentStatus)
        -> Result<Torrent, TorrentError>;

    /// Permanently delete records. Missing keys are ignored.
    /// Returns how many rows were removed.
    fn delete_many(&self, keys: &[TorrentKey]) -> Result<usize, TorrentError>;
}
