//! Torrent record and its lifecycle enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Downstream consumer that owns a torrent's folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaManager {
    Sonarr,
    Radarr,
}

impl MediaManager {
    pub const ALL: [MediaManager; 2] = [MediaManager::Sonarr, MediaManager::Radarr];

    /// Returns the string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaManager::Sonarr => "sonarr",
            MediaManager::Radarr => "radarr",
        }
    }
}

impl fmt::Display for MediaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sonarr" => Ok(MediaManager::Sonarr),
            "radarr" => Ok(MediaManager::Radarr),
            other => Err(format!("unknown media manager: {}", other)),
        }
    }
}

/// How a descriptor is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentType {
    /// Raw `.torrent` metainfo file.
    Torrent,
    /// `.magnet` text file holding a magnet URI.
    Magnet,
}

impl TorrentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentType::Torrent => "torrent",
            TorrentType::Magnet => "magnet",
        }
    }

    /// Classify a blackhole file by extension (case-insensitive).
    ///
    /// Returns `None` for anything that is not a torrent descriptor.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".torrent") {
            Some(TorrentType::Torrent)
        } else if lower.ends_with(".magnet") {
            Some(TorrentType::Magnet)
        } else {
            None
        }
    }
}

impl FromStr for TorrentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "torrent" => Ok(TorrentType::Torrent),
            "magnet" => Ok(TorrentType::Magnet),
            other => Err(format!("unknown torrent type: {}", other)),
        }
    }
}

/// Lifecycle state of a torrent record.
///
/// ```text
/// New -> Uploaded -> Downloading -> Downloaded -> Completed
///                        |
///                        +-> Uploaded (transfer failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    New,
    Uploaded,
    Downloading,
    Downloaded,
    Completed,
}

impl TorrentStatus {
    pub const ALL: [TorrentStatus; 5] = [
        TorrentStatus::New,
        TorrentStatus::Uploaded,
        TorrentStatus::Downloading,
        TorrentStatus::Downloaded,
        TorrentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::New => "new",
            TorrentStatus::Uploaded => "uploaded",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::Downloaded => "downloaded",
            TorrentStatus::Completed => "completed",
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: TorrentStatus) -> bool {
        use TorrentStatus::*;
        matches!(
            (self, next),
            (New, Uploaded)
                | (Uploaded, Downloading)
                | (Downloading, Downloaded)
                | (Downloading, Uploaded)
                | (Downloaded, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TorrentStatus::Completed)
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TorrentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TorrentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown torrent status: {}", s))
    }
}

/// Natural key of a torrent record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TorrentKey {
    pub filename: String,
    pub media_manager: MediaManager,
}

impl TorrentKey {
    pub fn new(filename: impl Into<String>, media_manager: MediaManager) -> Self {
        Self {
            filename: filename.into(),
            media_manager,
        }
    }
}

impl fmt::Display for TorrentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_manager, self.filename)
    }
}

/// A blackhole file seen by discovery, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTorrent {
    pub filename: String,
    pub media_manager: MediaManager,
    pub torrent_type: TorrentType,
}

impl NewTorrent {
    pub fn key(&self) -> TorrentKey {
        TorrentKey::new(self.filename.clone(), self.media_manager)
    }
}

/// A persisted torrent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    /// Row id; ascending order is discovery order.
    pub id: i64,
    pub filename: String,
    pub media_manager: MediaManager,
    #[serde(rename = "type")]
    pub torrent_type: TorrentType,
    /// Title assigned by Seedr once the upload was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent_name: Option<String>,
    /// Seedr folder id, resolved by reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seedr_id: Option<i64>,
    pub status: TorrentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Torrent {
    pub fn key(&self) -> TorrentKey {
        TorrentKey::new(self.filename.clone(), self.media_manager)
    }
}
