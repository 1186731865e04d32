//! Logging initialisation via tracing-subscriber.
//!
//! The terminal is owned by the UI, so log lines go to a file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// `$XDG_CACHE_HOME/kefu/kefu.log` or the platform equivalent
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("kefu").join("kefu.log"))
}

/// Build the level filter. `RUST_LOG` wins when set, `level` is the fallback.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log level '{level}': {e}"))
}

/// Install the global subscriber, appending to `log_file`.
pub fn init(level: &str, log_file: &Path) -> Result<()> {
    let filter = build_filter(level)?;

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory '{}'", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file '{}'", log_file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to set subscriber: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_levels_are_accepted() {
        for level in ["error", "warn", "info", "debug", "trace", "kefu=debug"] {
            assert!(EnvFilter::try_new(level).is_ok(), "expected '{level}' to be valid");
        }
    }

    #[test]
    fn init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("kefu.log");

        // Another test may have installed a subscriber first; both outcomes are fine.
        match init("info", &path) {
            Ok(()) => {}
            Err(e) if e.to_string().contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert!(path.exists());
    }
}
