//! Torrent lifecycle integration tests.
//!
//! These tests drive records through the job bodies against temp folders,
//! an on-disk store and a mock Seedr:
//! new -> uploaded -> downloading -> downloaded -> completed -> deleted

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use seedarr_core::{
    testing::{fixtures, MockDownload, MockSeedrClient, RecordedCall},
    DownloadOutcome, MediaManager, Orchestrator, OrchestratorConfig, SeedrIdAssignment,
    SqliteTorrentStore, Torrent, TorrentKey, TorrentStatus, TorrentStore, TransferOutcome,
};

/// Test helper holding all dependencies of an orchestrator.
struct TestHarness {
    store: Arc<SqliteTorrentStore>,
    seedr: Arc<MockSeedrClient>,
    config: OrchestratorConfig,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteTorrentStore::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create store"),
        );
        let config = fixtures::orchestrator_config(temp_dir.path());

        Self {
            store,
            seedr: Arc::new(MockSeedrClient::new()),
            config,
            _temp_dir: temp_dir,
        }
    }

    fn with_timeout(timeout: Duration) -> Self {
        let mut harness = Self::new();
        harness.config.download_timeout = Some(timeout);
        harness
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.config.clone(), self.store.clone(), self.seedr.clone())
    }

    fn drop_descriptor(&self, media_manager: MediaManager, filename: &str, contents: &str) -> PathBuf {
        let blackhole = &self.config.paths(media_manager).blackhole;
        std::fs::create_dir_all(blackhole).unwrap();
        let path = blackhole.join(filename);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn get(&self, media_manager: MediaManager, filename: &str) -> Option<Torrent> {
        self.store
            .get(&TorrentKey::new(filename, media_manager))
            .unwrap()
    }

    /// Take a descriptor through discovery and an accepted upload.
    async fn uploaded(&self, media_manager: MediaManager, filename: &str, title: &str) {
        self.drop_descriptor(media_manager, filename, "d8:announce");
        self.seedr.accept_upload(filename, title).await;
        let orchestrator = self.orchestrator();
        orchestrator.discover().await.unwrap();
        orchestrator.upload().await.unwrap();
    }

    fn download_dir(&self, media_manager: MediaManager, seedr_id: i64) -> PathBuf {
        self.config.download_dir(media_manager, seedr_id)
    }

    fn watch_dir(&self, media_manager: MediaManager) -> PathBuf {
        self.config.watch_dir(media_manager).clone()
    }
}

fn movie_files() -> Vec<(String, Vec<u8>)> {
    vec![
        ("Movie 2024 1080p/movie.mkv".to_string(), b"video".to_vec()),
        ("Movie 2024 1080p/movie.srt".to_string(), b"subs".to_vec()),
    ]
}

#[tokio::test]
async fn test_movie_torrent_full_lifecycle() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let descriptor = harness.drop_descriptor(MediaManager::Radarr, "movie.torrent", "d8:announce");

    // Discover
    let report = orchestrator.discover().await.unwrap();
    assert_eq!(report.created, 1);
    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::New);

    // Upload
    harness
        .seedr
        .accept_upload("movie.torrent", "Movie 2024 1080p")
        .await;
    let report = orchestrator.upload().await.unwrap();
    assert_eq!(report.uploaded, 1);
    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Uploaded);
    assert_eq!(torrent.torrent_name.as_deref(), Some("Movie 2024 1080p"));
    assert_eq!(torrent.seedr_id, None);

    // Download
    harness.seedr.add_folder(7, "Movie.2024.1080p").await;
    harness
        .seedr
        .set_download(7, MockDownload::Files(movie_files()))
        .await;

    let DownloadOutcome::Started { seedr_id, handle } = orchestrator.download().await.unwrap()
    else {
        panic!("expected a download to start");
    };
    assert_eq!(seedr_id, 7);
    assert_eq!(
        handle.await.unwrap(),
        TransferOutcome::Completed { files_moved: 1 }
    );

    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Completed);
    assert_eq!(torrent.seedr_id, Some(7));

    let watched = harness.watch_dir(MediaManager::Radarr).join("Movie 2024 1080p");
    assert_eq!(std::fs::read(watched.join("movie.mkv")).unwrap(), b"video");
    assert!(watched.join("movie.srt").exists());

    // Cleanup
    let report = orchestrator.cleanup().await.unwrap();
    assert_eq!(report.removed, 1);
    assert!(!descriptor.exists());
    assert!(!harness.download_dir(MediaManager::Radarr, 7).exists());
    assert!(harness.get(MediaManager::Radarr, "movie.torrent").is_none());
    assert!(watched.join("movie.mkv").exists());
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness.drop_descriptor(MediaManager::Sonarr, "show.torrent", "d8:announce");
    harness.drop_descriptor(MediaManager::Radarr, "show.torrent", "d8:announce");

    let first = orchestrator.discover().await.unwrap();
    assert_eq!(first.seen, 2);
    assert_eq!(first.created, 2);

    let second = orchestrator.discover().await.unwrap();
    assert_eq!(second.seen, 2);
    assert_eq!(second.created, 0);
    assert_eq!(harness.store.list_all().unwrap().len(), 2);
}

#[tokio::test]
async fn test_discovery_keeps_existing_status() {
    let harness = TestHarness::new();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;

    harness.orchestrator().discover().await.unwrap();

    let torrent = harness.get(MediaManager::Sonarr, "show.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Uploaded);
}

#[tokio::test]
async fn test_magnet_upload_sends_trimmed_uri() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness.drop_descriptor(
        MediaManager::Sonarr,
        "show.magnet",
        "  magnet:?xt=urn:btih:abc\n",
    );
    harness
        .seedr
        .accept_upload("magnet:?xt=urn:btih:abc", "Show S01E01")
        .await;

    orchestrator.discover().await.unwrap();
    let report = orchestrator.upload().await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert!(harness
        .seedr
        .calls()
        .await
        .contains(&RecordedCall::AddMagnet("magnet:?xt=urn:btih:abc".to_string())));
}

#[tokio::test]
async fn test_rejected_upload_stays_new_and_is_retried() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness.drop_descriptor(MediaManager::Radarr, "movie.torrent", "d8:announce");
    harness
        .seedr
        .reject_upload("movie.torrent", "not enough space")
        .await;

    orchestrator.discover().await.unwrap();
    let report = orchestrator.upload().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.uploaded, 0);

    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::New);
    assert_eq!(torrent.torrent_name, None);

    harness
        .seedr
        .accept_upload("movie.torrent", "Movie 2024")
        .await;
    let report = orchestrator.upload().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(harness.seedr.upload_count().await, 2);
}

#[tokio::test]
async fn test_failed_upload_does_not_block_others() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness.drop_descriptor(MediaManager::Radarr, "a.torrent", "d8:announce");
    harness.drop_descriptor(MediaManager::Radarr, "b.torrent", "d8:announce");
    // "a.torrent" has no configured response and fails
    harness.seedr.accept_upload("b.torrent", "Bravo").await;

    orchestrator.discover().await.unwrap();
    let report = orchestrator.upload().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.uploaded, 1);
    assert_eq!(
        harness.get(MediaManager::Radarr, "a.torrent").unwrap().status,
        TorrentStatus::New
    );
    assert_eq!(
        harness.get(MediaManager::Radarr, "b.torrent").unwrap().status,
        TorrentStatus::Uploaded
    );
}

#[tokio::test]
async fn test_single_download_in_flight() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Radarr, "a.torrent", "Alpha Movie 2020")
        .await;
    harness
        .uploaded(MediaManager::Radarr, "b.torrent", "Bravo Film 2021")
        .await;
    harness.seedr.add_folder(1, "Alpha Movie 2020").await;
    harness.seedr.add_folder(2, "Bravo Film 2021").await;
    for id in [1, 2] {
        harness
            .seedr
            .set_download(
                id,
                MockDownload::Gated(vec![(format!("file{}.mkv", id), b"x".to_vec())]),
            )
            .await;
    }

    let DownloadOutcome::Started { seedr_id, handle } = orchestrator.download().await.unwrap()
    else {
        panic!("expected a download to start");
    };
    assert_eq!(seedr_id, 1);

    // Both folders were matched, but only one transfer runs
    assert_eq!(
        harness.get(MediaManager::Radarr, "b.torrent").unwrap().seedr_id,
        Some(2)
    );
    assert!(matches!(
        orchestrator.download().await.unwrap(),
        DownloadOutcome::Busy
    ));
    assert_eq!(harness.store.count_by_status(TorrentStatus::Downloading).unwrap(), 1);

    harness.seedr.release_download();
    assert!(matches!(
        handle.await.unwrap(),
        TransferOutcome::Completed { .. }
    ));

    let DownloadOutcome::Started { seedr_id, handle } = orchestrator.download().await.unwrap()
    else {
        panic!("expected the second download to start");
    };
    assert_eq!(seedr_id, 2);
    harness.seedr.release_download();
    handle.await.unwrap();

    assert_eq!(harness.seedr.download_requests().await, vec![1, 2]);
    assert_eq!(harness.store.count_by_status(TorrentStatus::Completed).unwrap(), 2);
}

#[tokio::test]
async fn test_unmatched_upload_is_idle() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Some Show S02E03")
        .await;
    harness.seedr.add_folder(9, "Completely Different Thing").await;

    let outcome = orchestrator.download().await.unwrap();

    assert!(matches!(outcome, DownloadOutcome::Idle));
    let torrent = harness.get(MediaManager::Sonarr, "show.torrent").unwrap();
    assert_eq!(torrent.seedr_id, None);
    assert_eq!(torrent.status, TorrentStatus::Uploaded);
}

#[tokio::test]
async fn test_folder_listing_failure_is_idle() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;
    harness.seedr.add_folder(3, "Show S01E01").await;
    harness.seedr.set_list_error(Some("offline")).await;

    assert!(matches!(
        orchestrator.download().await.unwrap(),
        DownloadOutcome::Idle
    ));
    assert_eq!(
        harness.get(MediaManager::Sonarr, "show.torrent").unwrap().seedr_id,
        None
    );
}

#[tokio::test]
async fn test_claimed_folder_is_not_reassigned() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Radarr, "first.torrent", "Movie 2024")
        .await;
    harness.seedr.add_folder(5, "Movie 2024").await;
    harness
        .seedr
        .set_download(5, MockDownload::Gated(vec![]))
        .await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };

    // A second upload with the same title must not take folder 5
    harness
        .uploaded(MediaManager::Radarr, "second.torrent", "Movie 2024")
        .await;
    harness.seedr.release_download();
    handle.await.unwrap();
    orchestrator.download().await.unwrap();

    assert_eq!(
        harness.get(MediaManager::Radarr, "first.torrent").unwrap().seedr_id,
        Some(5)
    );
    assert_eq!(
        harness.get(MediaManager::Radarr, "second.torrent").unwrap().seedr_id,
        None
    );
}

#[tokio::test]
async fn test_failed_download_rolls_back() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Radarr, "movie.torrent", "Movie 2024 1080p")
        .await;
    harness.seedr.add_folder(7, "Movie 2024 1080p").await;
    harness
        .seedr
        .set_download(7, MockDownload::Fail("connection reset".to_string()))
        .await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };
    assert!(matches!(
        handle.await.unwrap(),
        TransferOutcome::RolledBack { .. }
    ));

    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Uploaded);
    assert_eq!(torrent.seedr_id, Some(7));
    assert!(!harness.download_dir(MediaManager::Radarr, 7).exists());

    // The next run retries the same folder
    harness
        .seedr
        .set_download(7, MockDownload::Files(movie_files()))
        .await;
    let DownloadOutcome::Started { seedr_id, handle } = orchestrator.download().await.unwrap()
    else {
        panic!("expected the retry to start");
    };
    assert_eq!(seedr_id, 7);
    assert!(matches!(
        handle.await.unwrap(),
        TransferOutcome::Completed { .. }
    ));
}

#[tokio::test]
async fn test_download_timeout_rolls_back() {
    let harness = TestHarness::with_timeout(Duration::from_millis(50));
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;
    harness.seedr.add_folder(4, "Show S01E01").await;
    harness.seedr.set_download(4, MockDownload::Hang).await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("transfer should time out")
        .unwrap();

    assert!(matches!(outcome, TransferOutcome::RolledBack { .. }));
    assert_eq!(
        harness.get(MediaManager::Sonarr, "show.torrent").unwrap().status,
        TorrentStatus::Uploaded
    );
    assert!(!harness.download_dir(MediaManager::Sonarr, 4).exists());
}

// With the clock paused, time jumps forward whenever the runtime waits on
// the blocking unpack, so any limit still armed at that point would fire.
#[tokio::test(start_paused = true)]
async fn test_download_timeout_does_not_cut_unpacking() {
    let harness = TestHarness::with_timeout(Duration::from_millis(1));
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Radarr, "movie.torrent", "Movie 2024 1080p")
        .await;
    harness.seedr.add_folder(7, "Movie 2024 1080p").await;
    harness
        .seedr
        .set_download(7, MockDownload::Files(movie_files()))
        .await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };

    assert_eq!(
        handle.await.unwrap(),
        TransferOutcome::Completed { files_moved: 1 }
    );
    let watched = harness.watch_dir(MediaManager::Radarr).join("Movie 2024 1080p");
    assert_eq!(std::fs::read(watched.join("movie.mkv")).unwrap(), b"video");
    let leftovers = std::fs::read_dir(harness.download_dir(MediaManager::Radarr, 7)).unwrap();
    assert_eq!(leftovers.count(), 0);
}

#[tokio::test]
async fn test_recover_rolls_back_interrupted_downloads() {
    let harness = TestHarness::new();
    harness
        .uploaded(MediaManager::Radarr, "movie.torrent", "Movie 2024")
        .await;
    harness
        .store
        .assign_seedr_ids(&[SeedrIdAssignment {
            torrent_name: "Movie 2024".to_string(),
            seedr_id: 11,
        }])
        .unwrap();
    harness
        .store
        .update_status_by_seedr_id(11, TorrentStatus::Downloading)
        .unwrap();
    let partial = harness.download_dir(MediaManager::Radarr, 11);
    std::fs::create_dir_all(&partial).unwrap();
    std::fs::write(partial.join("part.mkv"), b"half").unwrap();

    let recovered = harness.orchestrator().recover().await.unwrap();

    assert_eq!(recovered, 1);
    let torrent = harness.get(MediaManager::Radarr, "movie.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Uploaded);
    assert_eq!(torrent.seedr_id, Some(11));
    assert!(!partial.exists());
}

#[tokio::test]
async fn test_stuck_relocation_is_retried() {
    let harness = TestHarness::new();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;
    harness
        .store
        .assign_seedr_ids(&[SeedrIdAssignment {
            torrent_name: "Show S01E01".to_string(),
            seedr_id: 21,
        }])
        .unwrap();
    harness
        .store
        .update_status_by_seedr_id(21, TorrentStatus::Downloading)
        .unwrap();
    harness
        .store
        .update_status_by_seedr_id(21, TorrentStatus::Downloaded)
        .unwrap();
    let downloaded = harness.download_dir(MediaManager::Sonarr, 21);
    std::fs::create_dir_all(&downloaded).unwrap();
    std::fs::write(downloaded.join("episode.mkv"), b"ep").unwrap();

    let outcome = harness.orchestrator().download().await.unwrap();

    assert!(matches!(outcome, DownloadOutcome::Idle));
    assert_eq!(
        harness.get(MediaManager::Sonarr, "show.torrent").unwrap().status,
        TorrentStatus::Completed
    );
    assert!(harness
        .watch_dir(MediaManager::Sonarr)
        .join("episode.mkv")
        .exists());
}

#[tokio::test]
async fn test_failed_relocation_keeps_downloaded_until_retried() {
    let mut harness = TestHarness::new();

    // Nest the watch folder deep enough that a long entry name overflows PATH_MAX
    let mut watch = harness.watch_dir(MediaManager::Sonarr);
    while watch.as_os_str().len() < 3900 {
        watch.push("d".repeat(100));
    }
    std::fs::create_dir_all(&watch).unwrap();
    harness.config.sonarr.watch = watch.clone();
    let long_name = format!("{}.mkv", "x".repeat(240));

    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;
    harness.seedr.add_folder(21, "Show S01E01").await;
    harness
        .seedr
        .set_download(
            21,
            MockDownload::Files(vec![
                ("episode.mkv".to_string(), b"ep".to_vec()),
                (long_name.clone(), b"extra".to_vec()),
            ]),
        )
        .await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };
    assert_eq!(
        handle.await.unwrap(),
        TransferOutcome::PartiallyRelocated { failed: 1 }
    );

    let torrent = harness.get(MediaManager::Sonarr, "show.torrent").unwrap();
    assert_eq!(torrent.status, TorrentStatus::Downloaded);
    assert!(watch.join("episode.mkv").exists());
    let downloaded = harness.download_dir(MediaManager::Sonarr, 21);
    assert!(downloaded.join(&long_name).exists());

    // Once the entry can move, the next run finishes the job
    std::fs::rename(downloaded.join(&long_name), downloaded.join("extra.mkv")).unwrap();
    assert!(matches!(
        orchestrator.download().await.unwrap(),
        DownloadOutcome::Idle
    ));

    assert_eq!(
        harness.get(MediaManager::Sonarr, "show.torrent").unwrap().status,
        TorrentStatus::Completed
    );
    assert_eq!(std::fs::read(watch.join("extra.mkv")).unwrap(), b"extra");
}

#[tokio::test]
async fn test_cleanup_tolerates_missing_artifacts() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    harness
        .uploaded(MediaManager::Radarr, "movie.torrent", "Movie 2024")
        .await;
    harness.seedr.add_folder(8, "Movie 2024").await;

    let DownloadOutcome::Started { handle, .. } = orchestrator.download().await.unwrap() else {
        panic!("expected a download to start");
    };
    handle.await.unwrap();

    // Someone already removed the descriptor
    std::fs::remove_file(
        harness
            .config
            .blackhole_path(MediaManager::Radarr, "movie.torrent"),
    )
    .unwrap();

    let report = orchestrator.cleanup().await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.failed, 0);
    assert!(harness.store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_cleanup_ignores_unfinished_torrents() {
    let harness = TestHarness::new();
    harness
        .uploaded(MediaManager::Sonarr, "show.torrent", "Show S01E01")
        .await;

    let report = harness.orchestrator().cleanup().await.unwrap();

    assert_eq!(report.removed, 0);
    assert!(harness
        .config
        .blackhole_path(MediaManager::Sonarr, "show.torrent")
        .exists());
}
