//! Worker event log under `.worker/events.log`.
//!
//! Product artifact, always appended regardless of `RUST_LOG`; this is what
//! `coordinator status` tails to show recent worker activity. Appends are
//! best-effort and never fail the task that produced them.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

/// Append-only activity log for one workspace.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(".worker").join("events.log"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line; failures are logged and swallowed.
    pub fn record(&self, message: &str) {
        if let Err(err) = self.try_record(message) {
            warn!(err = %err, "failed to append event log");
        }
    }

    fn try_record(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let stamp = Utc::now().to_rfc3339();
        writeln!(file, "[{stamp}] {message}")
            .with_context(|| format!("append {}", self.path.display()))?;
        Ok(())
    }

    /// Last `limit` lines, oldest first. Missing log yields an empty list.
    pub fn tail(&self, limit: usize) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let start = lines.len().saturating_sub(limit);
        Ok(lines[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_tail_returns_recent_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = EventLog::new(temp.path());
        log.record("task started: A");
        log.record("task completed: A");
        log.record("task started: B");

        let tail = log.tail(2).expect("tail");
        assert_eq!(tail.len(), 2);
        assert!(tail[0].contains("task completed: A"));
        assert!(tail[1].contains("task started: B"));
    }

    #[test]
    fn tail_of_missing_log_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = EventLog::new(temp.path());
        assert!(log.tail(10).expect("tail").is_empty());
    }
}
