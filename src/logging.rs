//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so its logs go to `rsf.log` (in `RSF_LOG_DIR`, or the
//! working directory). The one-shot commands log to stderr. `RUST_LOG` overrides
//! the default `info` filter in both cases.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt};

use crate::error::AppError;

const LOG_DIR_ENV: &str = "RSF_LOG_DIR";
const LOG_FILE: &str = "rsf.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

pub fn init(target: LogTarget) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match target {
        LogTarget::Stderr => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogTarget::File => {
            let dir = std::env::var(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."));
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(appender)
                .try_init()
        }
    };

    result.map_err(|e| AppError::io(format!("Failed to initialize logging: {e}")))
}
