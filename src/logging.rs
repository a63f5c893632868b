use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::Level;

/// Routes `tracing` output to an append-only file. The terminal is owned by the
/// UI, so nothing is written to stdout or stderr.
pub fn init(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create log directory {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Unable to open log file {}", log_file.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(Level::INFO)
        .try_init()
        .map_err(|err| anyhow!("Unable to install log subscriber: {err}"))
}

/// Like [`init`], but a log file that cannot be set up only costs the log: the
/// reason goes to stderr before the UI takes over the terminal.
pub fn init_or_warn(log_file: &Path) -> bool {
    match init(log_file) {
        Ok(()) => true,
        Err(err) => {
            eprintln!("warning: {err:#}; continuing without a log file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unwritable_log_location_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let log_file = blocker.join("logs/app-organizer.log");

        let err = init(&log_file).unwrap_err();
        assert!(err.to_string().contains("Unable to create log directory"));
        assert!(!init_or_warn(&log_file));
    }
}
