use std::sync::Arc;
use seedarr_core::{Config, JobScheduler, TorrentStore};

/// Shared application state
pub struct AppState {
    config: Config,
    scheduler: Arc<JobScheduler>,
}

impl AppState {
    pub fn new(config: Config, scheduler: Arc<JobScheduler>) -> Self {
        Self { config, scheduler }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<dyn TorrentStore> {
        self.scheduler.orchestrator().store()
    }
}
