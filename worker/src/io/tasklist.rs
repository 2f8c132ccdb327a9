//! The `tasks.md` checklist document: load, append, and the completion marker.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::task::{Task, mark_line_done, parse_tasks};

pub const TASKS_FILE: &str = "tasks.md";

/// Handle on a workspace's task document.
#[derive(Debug, Clone)]
pub struct TaskList {
    path: PathBuf,
}

impl TaskList {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(TASKS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pending tasks in document order. A missing document yields an empty list.
    pub fn load(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        Ok(parse_tasks(&contents))
    }

    /// Append a new pending item, creating the document if needed.
    pub fn append(&self, text: &str) -> Result<()> {
        let mut contents = if self.path.exists() {
            fs::read_to_string(&self.path)
                .with_context(|| format!("read {}", self.path.display()))?
        } else {
            String::new()
        };
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&format!("- [ ] {text}\n"));
        fs::write(&self.path, contents).with_context(|| format!("write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "appended pending task");
        Ok(())
    }

    /// Durably flip the task's line from pending to done.
    ///
    /// Best-effort: any I/O failure or missing line is logged and swallowed so
    /// a finished task is still reported as completed upstream.
    pub fn mark_complete(&self, task: &Task) {
        if let Err(err) = self.try_mark_complete(task) {
            warn!(err = %err, task = %task.text, "failed to mark task complete");
        }
    }

    fn try_mark_complete(&self, task: &Task) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        match mark_line_done(&contents, task) {
            Some(updated) => {
                fs::write(&self.path, updated)
                    .with_context(|| format!("write {}", self.path.display()))?;
                info!(task = %task.text, "marked task complete");
                Ok(())
            }
            None => {
                warn!(task = %task.text, "task line not found, leaving document unchanged");
                Ok(())
            }
        }
    }
}
