//! Periodic job loops.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::lifecycle::Orchestrator;
use super::types::{DownloadOutcome, SchedulerStatus};
use crate::config::SchedulerConfig;

/// Runs the four lifecycle jobs on independent intervals.
///
/// Each job has its own loop, so a slow upload never delays discovery.
/// Within one loop, runs never overlap: the next sleep starts after the
/// previous run returned.
pub struct JobScheduler {
    orchestrator: Orchestrator,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobScheduler {
    pub fn new(orchestrator: Orchestrator, config: SchedulerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            orchestrator,
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the job loops.
    ///
    /// Downloads interrupted by a previous shutdown are rolled back first.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!("Starting job scheduler");

        match self.orchestrator.recover().await {
            Ok(0) => {}
            Ok(count) => info!(count, "Rolled back interrupted downloads"),
            Err(e) => error!(error = %e, "Failed to recover interrupted downloads"),
        }

        self.spawn_job("discover", self.config.discover_interval_ms, |o| async move {
            match o.discover().await {
                Ok(report) => debug!(seen = report.seen, created = report.created, "Discover run"),
                Err(e) => warn!(error = %e, "Discover job failed"),
            }
        });

        self.spawn_job("upload", self.config.upload_interval_ms, |o| async move {
            match o.upload().await {
                Ok(report) if report.attempted > 0 => info!(
                    attempted = report.attempted,
                    uploaded = report.uploaded,
                    rejected = report.rejected,
                    failed = report.failed,
                    "Upload run"
                ),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Upload job failed"),
            }
        });

        self.spawn_job("download", self.config.download_interval_ms, |o| async move {
            match o.download().await {
                // The transfer finishes on its own task.
                Ok(DownloadOutcome::Started { seedr_id, .. }) => {
                    debug!(seedr_id, "Download dispatched")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Download job failed"),
            }
        });

        self.spawn_job("cleanup", self.config.cleanup_interval_ms, |o| async move {
            match o.cleanup().await {
                Ok(report) if report.removed > 0 || report.failed > 0 => {
                    debug!(removed = report.removed, failed = report.failed, "Cleanup run")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Cleanup job failed"),
            }
        });

        info!("Job scheduler started");
    }

    /// Stop the job loops. Transfers already spawned keep running.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping job scheduler");

        let _ = self.shutdown_tx.send(());

        // Give loops a moment to observe the signal
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Job scheduler stopped");
    }

    pub fn status(&self) -> SchedulerStatus {
        let torrents = self.orchestrator.status_counts().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count torrents");
            Default::default()
        });

        SchedulerStatus {
            running: self.is_running(),
            torrents,
        }
    }

    fn spawn_job<F, Fut>(&self, name: &'static str, interval_ms: u64, job: F)
    where
        F: Fn(Orchestrator) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        let orchestrator = self.orchestrator.clone();
        let interval = Duration::from_millis(interval_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(job = name, "Job loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(job = name, "Job loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        job(orchestrator.clone()).await;
                    }
                }
            }
            info!(job = name, "Job loop stopped");
        });
    }
}
