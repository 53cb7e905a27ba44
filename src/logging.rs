//! File-based tracing.
//!
//! The interactive flows own the terminal, so log records never go to
//! stdout or stderr. They are appended to `~/.config/snap/snap.log` when
//! `SNAP_LOG` is set (as an `EnvFilter` directive) or `--verbose` is passed.

use crate::config::ensure_config_dir;
use crate::error::{Result, SnapError};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `SNAP_LOG=debug`.
pub const LOG_ENV: &str = "SNAP_LOG";

const LOG_FILENAME: &str = "snap.log";

/// Filter to install, or `None` when logging stays off.
fn log_filter(verbose: bool) -> Option<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Some(filter),
        Err(_) if verbose => Some(EnvFilter::new("snap=debug")),
        Err(_) => None,
    }
}

/// Install the global subscriber if logging was requested.
///
/// Returns the log file path when logging is active.
pub fn init_logging(verbose: bool) -> Result<Option<PathBuf>> {
    let Some(filter) = log_filter(verbose) else {
        return Ok(None);
    };

    let (dir, _) = ensure_config_dir()?;
    let path = dir.join(LOG_FILENAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| SnapError::Config(format!("failed to initialise logging: {}", e)))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "snap started");
    Ok(Some(path))
}
