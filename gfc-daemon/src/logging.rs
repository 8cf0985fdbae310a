//! Logging setup
//!
//! Logs go to the systemd journal when its socket is present, to stdout
//! otherwise. The level is `info` (`debug` with `--verbose`) unless the
//! `GFC_LOG` environment variable provides a filter.

use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";

/// Log destination actually in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    Stdout,
}

impl LogTarget {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Journald => "systemd journal",
            Self::Stdout => "stdout",
        }
    }
}

/// Filter directive for the requested verbosity
pub fn filter_directive(verbose: bool, env_override: Option<String>) -> String {
    match env_override {
        Some(filter) if !filter.trim().is_empty() => filter,
        _ if verbose => "debug".to_string(),
        _ => "info".to_string(),
    }
}

/// Install the global subscriber
pub fn init(verbose: bool) -> LogTarget {
    let directive = filter_directive(verbose, std::env::var("GFC_LOG").ok());

    if Path::new(JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(EnvFilter::new(&directive))
                    .init();
                return LogTarget::Journald;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::new(&directive))
        .init();
    LogTarget::Stdout
}
