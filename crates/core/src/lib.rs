pub mod config;
pub mod orchestrator;
pub mod reconciler;
pub mod relocator;
pub mod seedr;
pub mod testing;
pub mod torrent;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, MediaManagerPaths,
    SchedulerConfig,
};
pub use orchestrator::{
    CleanupReport, DiscoverReport, DownloadOutcome, JobScheduler, Orchestrator,
    OrchestratorConfig, OrchestratorError, SchedulerStatus, StatusCounts, TransferOutcome,
    UploadReport,
};
pub use reconciler::Reconciler;
pub use relocator::{RelocationResult, Relocator, RelocatorError};
pub use seedr::{SeedrApi, SeedrClient, SeedrError, SeedrFolder};
pub use torrent::{
    MediaManager, NewTorrent, SeedrIdAssignment, SqliteTorrentStore, Torrent, TorrentError,
    TorrentKey, TorrentStatus, TorrentStore, TorrentType, UploadedTorrent,
};
