use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Seedr credentials are present
/// - Every configured folder is distinct
/// - Job intervals and server port are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.seedr.email.trim().is_empty() || config.seedr.password.is_empty() {
        return Err(ConfigError::ValidationError(
            "seedr.email and seedr.password are required".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let folders = [
        ("sonarr.blackhole", &config.sonarr.blackhole),
        ("sonarr.download", &config.sonarr.download),
        ("sonarr.watch", &config.sonarr.watch),
        ("radarr.blackhole", &config.radarr.blackhole),
        ("radarr.download", &config.radarr.download),
        ("radarr.watch", &config.radarr.watch),
    ];
    let mut seen = HashSet::new();
    for (name, path) in folders {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                name
            )));
        }
        if !seen.insert(path) {
            return Err(ConfigError::ValidationError(format!(
                "{} ({}) is used for more than one folder",
                name,
                path.display()
            )));
        }
    }

    let scheduler = &config.scheduler;
    if scheduler.discover_interval_ms == 0
        || scheduler.upload_interval_ms == 0
        || scheduler.download_interval_ms == 0
        || scheduler.cleanup_interval_ms == 0
    {
        return Err(ConfigError::ValidationError(
            "scheduler intervals must be greater than 0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.reconciler.min_score) {
        return Err(ConfigError::ValidationError(
            "reconciler.min_score must be between 0.0 and 1.0".to_string(),
        ));
    }

    Ok(())
}
