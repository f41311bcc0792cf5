use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE: &str = "staytracker.log";
const LOG_FILTER_ENV: &str = "STAYTRACKER_LOG";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Installs a JSON-lines subscriber appending to `logs_dir/staytracker.log`.
/// The terminal belongs to the UI, so nothing is written to stdout or stderr.
pub fn init_logging(logs_dir: &Path) -> Result<PathBuf, InfraError> {
    let path = logs_dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|error| InfraError::InvalidConfig(format!("logging already initialized: {error}")))?;

    tracing::info!(log_file = %path.display(), "logging initialized");
    Ok(path)
}
