//! Orchestrator configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, MediaManagerPaths};
use crate::torrent::MediaManager;

/// Folder layout and tuning the job bodies need.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub sonarr: MediaManagerPaths,
    pub radarr: MediaManagerPaths,
    /// Abort a transfer after this long (None = never).
    pub download_timeout: Option<Duration>,
    /// Minimum reconciliation score (0.0-1.0).
    pub min_match_score: f32,
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sonarr: config.sonarr.clone(),
            radarr: config.radarr.clone(),
            download_timeout: config.download.timeout_secs.map(Duration::from_secs),
            min_match_score: config.reconciler.min_score,
        }
    }

    pub fn paths(&self, media_manager: MediaManager) -> &MediaManagerPaths {
        match media_manager {
            MediaManager::Sonarr => &self.sonarr,
            MediaManager::Radarr => &self.radarr,
        }
    }

    /// Where a descriptor lives.
    pub fn blackhole_path(&self, media_manager: MediaManager, filename: &str) -> PathBuf {
        self.paths(media_manager).blackhole.join(filename)
    }

    /// Scratch directory for one Seedr folder, named by id so two downloads
    /// can never collide.
    pub fn download_dir(&self, media_manager: MediaManager, seedr_id: i64) -> PathBuf {
        self.paths(media_manager)
            .download
            .join(seedr_id.to_string())
    }

    pub fn watch_dir(&self, media_manager: MediaManager) -> &PathBuf {
        &self.paths(media_manager).watch
    }

    /// All six working directories.
    pub fn directories(&self) -> Vec<&PathBuf> {
        MediaManager::ALL
            .iter()
            .flat_map(|mm| {
                let paths = self.paths(*mm);
                [&paths.blackhole, &paths.download, &paths.watch]
            })
            .collect()
    }
}
