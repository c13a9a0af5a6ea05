// src/log.rs
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;

use crate::config::consts::DEFAULT_LOG_FILTER;
use crate::error::ConfigError;

/// Filter from `RUST_LOG`, or the crate default.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "pop_scrape=debug" } else { DEFAULT_LOG_FILTER })
    })
}

/// Install the global subscriber. Appends to `log_file` when given, stderr otherwise.
/// A second call is a no-op.
pub fn init(log_file: Option<&Path>, verbose: bool) -> Result<(), ConfigError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
    Ok(())
}
