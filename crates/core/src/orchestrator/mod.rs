//! Torrent lifecycle orchestrator.
//!
//! Four jobs move every torrent through its lifecycle:
//! - **Discover**: registers new descriptors found in the blackhole folders
//! - **Upload**: sends `New` torrents to Seedr (concurrently)
//! - **Download**: matches Seedr folders and transfers one at a time
//! - **Cleanup**: removes artifacts and records of completed torrents
//!
//! `Orchestrator` holds the job bodies; `JobScheduler` runs them on timers.

mod config;
mod lifecycle;
mod scheduler;
mod types;

pub use config::OrchestratorConfig;
pub use lifecycle::Orchestrator;
pub use scheduler::JobScheduler;
pub use types::{
    CleanupReport, DiscoverReport, DownloadOutcome, OrchestratorError, SchedulerStatus,
    StatusCounts, TransferOutcome, UploadReport,
};
