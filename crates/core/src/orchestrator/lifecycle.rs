//! Job bodies for the torrent lifecycle.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::OrchestratorConfig;
use super::types::{
    CleanupReport, DiscoverReport, DownloadOutcome, OrchestratorError, StatusCounts,
    TransferOutcome, UploadReport,
};
use crate::reconciler::Reconciler;
use crate::relocator::Relocator;
use crate::seedr::{unpack_download, DownloadSummary, SeedrApi, SeedrError, UploadOutcome};
use crate::torrent::{
    MediaManager, Torrent, TorrentStatus, TorrentStore, TorrentType, UploadedTorrent,
};

/// Drives torrent records from blackhole descriptor to watch folder.
///
/// Each job body is safe to call on its own; `JobScheduler` only decides
/// when. Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn TorrentStore>,
    seedr: Arc<dyn SeedrApi>,
    relocator: Relocator,
    reconciler: Reconciler,
    /// Records whose relocation is running in this process.
    relocating: Arc<Mutex<HashSet<i64>>>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn TorrentStore>,
        seedr: Arc<dyn SeedrApi>,
    ) -> Self {
        let reconciler = Reconciler::new(config.min_match_score);
        Self {
            config,
            store,
            seedr,
            relocator: Relocator::new(),
            reconciler,
            relocating: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TorrentStore> {
        &self.store
    }

    /// Record counts per lifecycle state.
    pub fn status_counts(&self) -> Result<StatusCounts, OrchestratorError> {
        Ok(StatusCounts {
            new: self.store.count_by_status(TorrentStatus::New)?,
            uploaded: self.store.count_by_status(TorrentStatus::Uploaded)?,
            downloading: self.store.count_by_status(TorrentStatus::Downloading)?,
            downloaded: self.store.count_by_status(TorrentStatus::Downloaded)?,
            completed: self.store.count_by_status(TorrentStatus::Completed)?,
        })
    }

    /// Register descriptors found in the blackhole folders.
    ///
    /// A folder that cannot be read is logged and skipped; the other media
    /// manager is still scanned. Descriptors already on record are left
    /// untouched.
    pub async fn discover(&self) -> Result<DiscoverReport, OrchestratorError> {
        let mut found = Vec::new();

        for media_manager in MediaManager::ALL {
            let blackhole = &self.config.paths(media_manager).blackhole;
            match self
                .relocator
                .list_descriptors(blackhole, media_manager)
                .await
            {
                Ok(descriptors) => found.extend(descriptors),
                Err(e) => {
                    warn!(media_manager = %media_manager, error = %e, "Failed to scan blackhole");
                }
            }
        }

        let created = self.store.create_if_absent_many(&found)?;
        if created > 0 {
            info!(created, seen = found.len(), "Discovered new torrents");
        }

        Ok(DiscoverReport {
            seen: found.len(),
            created,
        })
    }

    /// Send every `New` record to Seedr.
    ///
    /// Uploads run concurrently. Accepted uploads are committed together;
    /// rejected or failed ones stay `New` and are retried next run.
    pub async fn upload(&self) -> Result<UploadReport, OrchestratorError> {
        let pending = self.store.list_by_status(TorrentStatus::New)?;
        if pending.is_empty() {
            return Ok(UploadReport::default());
        }

        let results = join_all(pending.iter().map(|torrent| self.upload_one(torrent))).await;

        let mut report = UploadReport {
            attempted: pending.len(),
            ..Default::default()
        };
        let mut accepted = Vec::new();

        for (torrent, result) in pending.iter().zip(results) {
            match result {
                Ok(UploadOutcome::Accepted { title, .. }) => {
                    info!(torrent = %torrent.key(), name = %title, "Uploaded to Seedr");
                    accepted.push(UploadedTorrent {
                        key: torrent.key(),
                        torrent_name: title,
                    });
                }
                Ok(UploadOutcome::Rejected { reason }) => {
                    warn!(torrent = %torrent.key(), reason = %reason, "Seedr rejected upload");
                    report.rejected += 1;
                }
                Err(e) => {
                    warn!(torrent = %torrent.key(), error = %e, "Upload failed");
                    report.failed += 1;
                }
            }
        }

        if !accepted.is_empty() {
            self.store.mark_uploaded(&accepted)?;
            report.uploaded = accepted.len();
        }

        Ok(report)
    }

    async fn upload_one(&self, torrent: &Torrent) -> Result<UploadOutcome, OrchestratorError> {
        let path = self
            .config
            .blackhole_path(torrent.media_manager, &torrent.filename);

        let response = match torrent.torrent_type {
            TorrentType::Magnet => {
                let magnet = tokio::fs::read_to_string(&path).await?;
                self.seedr.add_magnet(magnet.trim()).await?
            }
            TorrentType::Torrent => self.seedr.add_torrent_file(&path).await?,
        };

        Ok(response.outcome())
    }

    /// Reconcile uploads with Seedr folders and start at most one transfer.
    ///
    /// Downloaded records whose relocation is outstanding are retried
    /// first. If a record is already `Downloading` nothing else happens.
    /// Otherwise the first `Uploaded` record with a Seedr folder is marked
    /// `Downloading` and its transfer is spawned; the returned handle
    /// resolves when the transfer and its continuation are done.
    pub async fn download(&self) -> Result<DownloadOutcome, OrchestratorError> {
        self.retry_relocations().await?;

        if self.store.count_by_status(TorrentStatus::Downloading)? > 0 {
            debug!("A download is already in flight");
            return Ok(DownloadOutcome::Busy);
        }

        let uploaded = self.store.list_by_status(TorrentStatus::Uploaded)?;
        if uploaded.is_empty() {
            return Ok(DownloadOutcome::Idle);
        }

        if uploaded.iter().any(|t| t.seedr_id.is_none()) {
            self.reconcile(&uploaded).await?;
        }

        let next = self
            .store
            .list_by_status(TorrentStatus::Uploaded)?
            .into_iter()
            .find(|t| t.seedr_id.is_some());
        let Some(torrent) = next else {
            return Ok(DownloadOutcome::Idle);
        };
        let seedr_id = torrent
            .seedr_id
            .ok_or_else(|| OrchestratorError::MissingData(torrent.key().to_string()))?;

        let dir = self.config.download_dir(torrent.media_manager, seedr_id);
        self.relocator.ensure_dir(&dir).await?;
        let torrent = self
            .store
            .update_status_by_seedr_id(seedr_id, TorrentStatus::Downloading)?;

        info!(torrent = %torrent.key(), seedr_id, "Starting download");

        let handle = self.spawn_transfer(torrent, seedr_id, dir);
        Ok(DownloadOutcome::Started { seedr_id, handle })
    }

    /// Match named uploads to Seedr folders. A failed listing is treated as
    /// an empty one.
    async fn reconcile(&self, uploaded: &[Torrent]) -> Result<(), OrchestratorError> {
        let folders = match self.seedr.list_root_folders().await {
            Ok(folders) => folders,
            Err(e) => {
                warn!(error = %e, "Failed to list Seedr folders");
                return Ok(());
            }
        };
        if folders.is_empty() {
            return Ok(());
        }

        let claimed: HashSet<i64> = self
            .store
            .list_all()?
            .iter()
            .filter_map(|t| t.seedr_id)
            .collect();

        let assignments = self.reconciler.reconcile(uploaded, &folders, &claimed);
        if !assignments.is_empty() {
            let updated = self.store.assign_seedr_ids(&assignments)?;
            info!(updated, "Matched Seedr folders");
        }

        Ok(())
    }

    fn spawn_transfer(
        &self,
        torrent: Torrent,
        seedr_id: i64,
        dir: PathBuf,
    ) -> JoinHandle<TransferOutcome> {
        let this = self.clone();

        tokio::spawn(async move {
            match this.transfer(seedr_id, &dir).await {
                Ok(summary) => {
                    info!(
                        torrent = %torrent.key(),
                        seedr_id,
                        files = summary.files,
                        bytes = summary.bytes,
                        "Download finished"
                    );
                    this.finish_download(seedr_id).await
                }
                Err(e) => {
                    warn!(torrent = %torrent.key(), seedr_id, error = %e, "Download failed");
                    this.roll_back(seedr_id, &dir, e.to_string()).await
                }
            }
        })
    }

    /// Fetch the folder archive into `dir` and unpack it there.
    ///
    /// Only the fetch is bounded by the download timeout. Unpacking always
    /// runs to the end, so nothing writes into `dir` once this returns.
    async fn transfer(&self, seedr_id: i64, dir: &Path) -> Result<DownloadSummary, SeedrError> {
        let archive = dir.join(format!(".seedarr-{}.zip", seedr_id));
        let fetch = self.seedr.download_archive(seedr_id, &archive);
        let bytes = match self.config.download_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| SeedrError::Timeout)??,
            None => fetch.await?,
        };

        let files = unpack_download(&archive, dir).await?;
        Ok(DownloadSummary { bytes, files })
    }

    async fn finish_download(&self, seedr_id: i64) -> TransferOutcome {
        match self
            .store
            .update_status_by_seedr_id(seedr_id, TorrentStatus::Downloaded)
        {
            Ok(torrent) => self.relocate(&torrent).await,
            Err(e) => {
                error!(seedr_id, error = %e, "Failed to record finished download");
                TransferOutcome::ContinuationFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn roll_back(&self, seedr_id: i64, dir: &Path, reason: String) -> TransferOutcome {
        if let Err(e) = self
            .store
            .update_status_by_seedr_id(seedr_id, TorrentStatus::Uploaded)
        {
            error!(seedr_id, error = %e, "Failed to roll back download");
            return TransferOutcome::ContinuationFailed {
                reason: e.to_string(),
            };
        }

        if let Err(e) = self.relocator.remove_path(dir).await {
            warn!(path = %dir.display(), error = %e, "Failed to remove partial download");
        }

        TransferOutcome::RolledBack { reason }
    }

    /// Move a downloaded folder into the watch folder and complete the record.
    ///
    /// Does nothing if the same record is already being relocated.
    async fn relocate(&self, torrent: &Torrent) -> TransferOutcome {
        let Some(seedr_id) = torrent.seedr_id else {
            return TransferOutcome::ContinuationFailed {
                reason: format!("{} has no seedr_id", torrent.key()),
            };
        };

        let claimed = self.relocating.lock().unwrap().insert(torrent.id);
        if !claimed {
            debug!(torrent = %torrent.key(), "Relocation already running");
            return TransferOutcome::PartiallyRelocated { failed: 0 };
        }

        let outcome = self.relocate_inner(torrent, seedr_id).await;
        self.relocating.lock().unwrap().remove(&torrent.id);
        outcome
    }

    async fn relocate_inner(&self, torrent: &Torrent, seedr_id: i64) -> TransferOutcome {
        let from = self.config.download_dir(torrent.media_manager, seedr_id);
        let to = self.config.watch_dir(torrent.media_manager);

        let result = match self.relocator.relocate_all(&from, to).await {
            Ok(result) => result,
            Err(e) => {
                warn!(torrent = %torrent.key(), error = %e, "Relocation failed");
                return TransferOutcome::PartiallyRelocated { failed: 1 };
            }
        };

        if !result.is_complete() {
            warn!(
                torrent = %torrent.key(),
                moved = result.moved.len(),
                failed = result.failed.len(),
                "Relocation incomplete, will retry"
            );
            return TransferOutcome::PartiallyRelocated {
                failed: result.failed.len(),
            };
        }

        match self
            .store
            .update_status(&torrent.key(), TorrentStatus::Completed)
        {
            Ok(_) => {
                info!(
                    torrent = %torrent.key(),
                    files = result.moved.len(),
                    "Moved to watch folder"
                );
                TransferOutcome::Completed {
                    files_moved: result.moved.len(),
                }
            }
            Err(e) => {
                error!(torrent = %torrent.key(), error = %e, "Failed to complete torrent");
                TransferOutcome::ContinuationFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Retry relocation for records left `Downloaded` by an earlier run.
    async fn retry_relocations(&self) -> Result<(), OrchestratorError> {
        let stuck = self.store.list_by_status(TorrentStatus::Downloaded)?;
        for torrent in stuck {
            let busy = self.relocating.lock().unwrap().contains(&torrent.id);
            if busy {
                continue;
            }
            debug!(torrent = %torrent.key(), "Retrying relocation");
            self.relocate(&torrent).await;
        }
        Ok(())
    }

    /// Delete `Completed` records together with their download folder and
    /// blackhole descriptor.
    ///
    /// A record is only deleted once both artifacts are gone, so a failed
    /// removal is retried next run.
    pub async fn cleanup(&self) -> Result<CleanupReport, OrchestratorError> {
        let completed = self.store.list_by_status(TorrentStatus::Completed)?;
        if completed.is_empty() {
            return Ok(CleanupReport::default());
        }

        let mut report = CleanupReport::default();
        let mut removable = Vec::new();

        for torrent in &completed {
            let mut paths = vec![self
                .config
                .blackhole_path(torrent.media_manager, &torrent.filename)];
            if let Some(seedr_id) = torrent.seedr_id {
                paths.push(self.config.download_dir(torrent.media_manager, seedr_id));
            }

            let mut clean = true;
            for path in &paths {
                if let Err(e) = self.relocator.remove_path(path).await {
                    warn!(torrent = %torrent.key(), error = %e, "Cleanup failed");
                    clean = false;
                }
            }

            if clean {
                removable.push(torrent.key());
            } else {
                report.failed += 1;
            }
        }

        if !removable.is_empty() {
            report.removed = self.store.delete_many(&removable)?;
            info!(removed = report.removed, "Cleaned up completed torrents");
        }

        Ok(report)
    }

    /// Roll back records left `Downloading` by a previous process.
    ///
    /// No transfer survives a restart, so each such record goes back to
    /// `Uploaded` and its partial folder is removed.
    pub async fn recover(&self) -> Result<usize, OrchestratorError> {
        let stale = self.store.list_by_status(TorrentStatus::Downloading)?;

        for torrent in &stale {
            self.store
                .update_status(&torrent.key(), TorrentStatus::Uploaded)?;
            if let Some(seedr_id) = torrent.seedr_id {
                let dir = self.config.download_dir(torrent.media_manager, seedr_id);
                if let Err(e) = self.relocator.remove_path(&dir).await {
                    warn!(path = %dir.display(), error = %e, "Failed to remove partial download");
                }
            }
            info!(torrent = %torrent.key(), "Recovered interrupted download");
        }

        Ok(stale.len())
    }
}
