//! In-process API tests against a router backed by an in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use seedarr_core::{
    load_config_from_str, testing::fixtures, testing::MockSeedrClient, JobScheduler, MediaManager,
    Orchestrator, SqliteTorrentStore, TorrentStore, UploadedTorrent,
};
use seedarr_server::{api::create_router, state::AppState};

const CONFIG: &str = r#"
[seedr]
email = "user@example.com"
password = "secret"

[sonarr]
blackhole = "/srv/sonarr/blackhole"
download = "/srv/sonarr/download"
watch = "/srv/sonarr/watch"

[radarr]
blackhole = "/srv/radarr/blackhole"
download = "/srv/radarr/download"
watch = "/srv/radarr/watch"
"#;

struct TestFixture {
    router: Router,
    store: Arc<SqliteTorrentStore>,
    _temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = load_config_from_str(CONFIG).expect("Failed to parse config");
        let store = Arc::new(SqliteTorrentStore::in_memory().expect("Failed to create store"));

        let orchestrator = Orchestrator::new(
            fixtures::orchestrator_config(temp_dir.path()),
            store.clone(),
            Arc::new(MockSeedrClient::new()),
        );
        let scheduler = Arc::new(JobScheduler::new(orchestrator, config.scheduler.clone()));
        let state = Arc::new(AppState::new(config, scheduler));

        Self {
            router: create_router(state),
            store,
            _temp_dir: temp_dir,
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn seed(&self) {
        self.store
            .create_if_absent_many(&[
                fixtures::new_torrent("show.magnet", MediaManager::Sonarr),
                fixtures::new_torrent("movie.torrent", MediaManager::Radarr),
                fixtures::new_torrent("other.torrent", MediaManager::Radarr),
            ])
            .unwrap();
        let movie = self
            .store
            .list_all()
            .unwrap()
            .into_iter()
            .find(|t| t.filename == "movie.torrent")
            .unwrap();
        self.store
            .mark_uploaded(&[UploadedTorrent {
                key: movie.key(),
                torrent_name: "Movie 2024".to_string(),
            }])
            .unwrap();
    }
}

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let (status, json) = fixture.get("/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_status_counts_records() {
    let fixture = TestFixture::new();
    fixture.seed();

    let (status, json) = fixture.get("/api/v1/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], false);
    assert_eq!(json["enabled"], true);
    assert_eq!(json["torrents"]["new"], 2);
    assert_eq!(json["torrents"]["uploaded"], 1);
    assert_eq!(json["torrents"]["completed"], 0);
}

#[tokio::test]
async fn test_list_torrents() {
    let fixture = TestFixture::new();
    fixture.seed();

    let (status, json) = fixture.get("/api/v1/torrents").await;

    assert_eq!(status, StatusCode::OK);
    let torrents = json.as_array().unwrap();
    assert_eq!(torrents.len(), 3);
    assert_eq!(torrents[0]["filename"], "show.magnet");
    assert_eq!(torrents[0]["type"], "magnet");
}

#[tokio::test]
async fn test_list_torrents_filtered() {
    let fixture = TestFixture::new();
    fixture.seed();

    let (_, json) = fixture.get("/api/v1/torrents?status=uploaded").await;
    let torrents = json.as_array().unwrap();
    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0]["torrent_name"], "Movie 2024");

    let (_, json) = fixture
        .get("/api/v1/torrents?status=new&media_manager=radarr")
        .await;
    let torrents = json.as_array().unwrap();
    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0]["filename"], "other.torrent");
}

#[tokio::test]
async fn test_list_torrents_rejects_unknown_status() {
    let fixture = TestFixture::new();

    let (status, json) = fixture.get("/api/v1/torrents?status=bogus").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("bogus"));
}
