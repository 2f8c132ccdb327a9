//! Worker configuration stored under `<workspace>/.worker/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Worker configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Model name passed to the model service.
    pub model: String,

    /// Token cap per model response.
    pub max_tokens: u32,

    /// Maximum model round trips per task before forced failure.
    pub max_iterations: u32,

    /// Seconds between task-list polls when idle.
    pub poll_interval_secs: u64,

    /// Per-shell-command timeout in seconds.
    pub shell_timeout_secs: u64,

    /// Truncate captured tool output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Push after each successfully completed task.
    pub push_on_complete: bool,

    /// Workspace name used to match plan records, when a store is configured.
    pub workspace_name: Option<String>,

    /// Record store directory; plan status updates are skipped when unset.
    pub state_dir: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            max_iterations: 50,
            poll_interval_secs: 10,
            shell_timeout_secs: 300,
            output_limit_bytes: 100_000,
            push_on_complete: true,
            workspace_name: None,
            state_dir: None,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.shell_timeout_secs == 0 {
            return Err(anyhow!("shell_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Path of the config file inside a workspace.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(".worker").join("config.toml")
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WorkerConfig::default()`.
pub fn load_config(path: &Path) -> Result<WorkerConfig> {
    if !path.exists() {
        let cfg = WorkerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WorkerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WorkerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, WorkerConfig::default());
        assert_eq!(cfg.max_iterations, 50);
        assert_eq!(cfg.shell_timeout_secs, 300);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = config_path(temp.path());
        let cfg = WorkerConfig {
            max_iterations: 5,
            push_on_complete: false,
            workspace_name: Some("demo".to_string()),
            ..WorkerConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn zero_iteration_budget_is_rejected() {
        let cfg = WorkerConfig {
            max_iterations: 0,
            ..WorkerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
