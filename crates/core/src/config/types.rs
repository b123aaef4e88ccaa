use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::torrent::MediaManager;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub seedr: SeedrConfig,
    pub sonarr: MediaManagerPaths,
    pub radarr: MediaManagerPaths,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Directory layout for a media manager.
    pub fn paths(&self, media_manager: MediaManager) -> &MediaManagerPaths {
        match media_manager {
            MediaManager::Sonarr => &self.sonarr,
            MediaManager::Radarr => &self.radarr,
        }
    }
}

/// Seedr account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedrConfig {
    pub email: String,
    pub password: String,
    /// REST API base URL (default: "https://www.seedr.cc/rest")
    #[serde(default = "default_seedr_url")]
    pub url: String,
    /// Timeout for non-streaming requests in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u32,
}

fn default_seedr_url() -> String {
    "https://www.seedr.cc/rest".to_string()
}

fn default_request_timeout() -> u32 {
    30
}

/// The three folders owned by one media manager.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MediaManagerPaths {
    /// Drop folder watched for new .torrent / .magnet files
    pub blackhole: PathBuf,
    /// Scratch folder Seedr downloads are unpacked into
    pub download: PathBuf,
    /// Folder the media manager imports completed files from
    pub watch: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("seedarr.db")
}

/// Job cadence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Master switch for the periodic jobs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_discover_interval")]
    pub discover_interval_ms: u64,
    #[serde(default = "default_upload_interval")]
    pub upload_interval_ms: u64,
    #[serde(default = "default_download_interval")]
    pub download_interval_ms: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_discover_interval() -> u64 {
    2_000
}

fn default_upload_interval() -> u64 {
    5_000
}

fn default_download_interval() -> u64 {
    30_000
}

fn default_cleanup_interval() -> u64 {
    45_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            discover_interval_ms: default_discover_interval(),
            upload_interval_ms: default_upload_interval(),
            download_interval_ms: default_download_interval(),
            cleanup_interval_ms: default_cleanup_interval(),
        }
    }
}

/// Transfer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Abort a Seedr transfer after this many seconds (None = wait forever).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Fuzzy reconciliation tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// Minimum similarity (0.0-1.0) for a remote folder to be accepted.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_min_score() -> f32 {
    0.6
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info,tower_http=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
