//! Testing utilities and mock implementations.
//!
//! `MockSeedrClient` stands in for the Seedr REST API so the whole
//! lifecycle can run against temp directories and an in-memory store.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedarr_core::testing::{fixtures, MockSeedrClient};
//!
//! let seedr = MockSeedrClient::new();
//! seedr.add_folder(7, "Movie.2024.1080p").await;
//! let config = fixtures::orchestrator_config(temp_dir.path());
//! ```

mod mock_seedr;

pub use mock_seedr::{MockDownload, MockSeedrClient, MockUpload, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::MediaManagerPaths;
    use crate::orchestrator::OrchestratorConfig;
    use crate::seedr::SeedrFolder;
    use crate::torrent::{MediaManager, NewTorrent, TorrentType};

    /// Folder layout for one media manager under `root/<name>/`.
    pub fn media_manager_paths(root: &Path, media_manager: MediaManager) -> MediaManagerPaths {
        let base = root.join(media_manager.as_str());
        MediaManagerPaths {
            blackhole: base.join("blackhole"),
            download: base.join("download"),
            watch: base.join("watch"),
        }
    }

    /// Orchestrator configuration rooted in a temp directory.
    pub fn orchestrator_config(root: &Path) -> OrchestratorConfig {
        OrchestratorConfig {
            sonarr: media_manager_paths(root, MediaManager::Sonarr),
            radarr: media_manager_paths(root, MediaManager::Radarr),
            download_timeout: None,
            min_match_score: 0.6,
        }
    }

    /// A discovered descriptor, typed from its extension.
    pub fn new_torrent(filename: &str, media_manager: MediaManager) -> NewTorrent {
        NewTorrent {
            filename: filename.to_string(),
            media_manager,
            torrent_type: TorrentType::from_filename(filename).unwrap_or(TorrentType::Torrent),
        }
    }

    pub fn seedr_folder(id: i64, name: &str) -> SeedrFolder {
        SeedrFolder {
            id,
            name: name.to_string(),
            size: 1024 * 1024 * 700,
            last_update: None,
        }
    }
}
