//! Polling daemon: watch the task document, run tasks, record outcomes.

use std::path::Path;
use std::thread;

use anyhow::Result;
use tracing::{error, info, instrument, warn};

use crate::core::task::Task;
use crate::core::workspace::WorkspaceProfile;
use crate::execute::execute_task;
use crate::io::config::WorkerConfig;
use crate::io::events::EventLog;
use crate::io::git::Git;
use crate::io::model::ModelClient;
use crate::io::prompt::render_system_prompt;
use crate::io::store::{PlanStatus, StateStore};
use crate::io::tasklist::TaskList;
use crate::io::tools::ToolExecutor;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No pending tasks.
    Idle,
    Completed { task: String },
    Failed { task: String, error: String },
}

/// Run one poll cycle: take the first pending task, if any, and execute it.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_cycle(root: &Path, config: &WorkerConfig, model: &dyn ModelClient) -> Result<CycleOutcome> {
    let tasklist = TaskList::new(root);
    let tasks = tasklist.load()?;
    let Some(task) = tasks.into_iter().next() else {
        return Ok(CycleOutcome::Idle);
    };

    let profile = WorkspaceProfile::detect(root);
    let system = render_system_prompt(root, &profile)?;
    let executor = ToolExecutor::new(
        root,
        profile.kind,
        config.shell_timeout(),
        config.output_limit_bytes,
    );
    let events = EventLog::new(root);

    info!(task = %task.text, kind = profile.kind.as_str(), "starting task");
    events.record(&format!("task started: {}", task.text));

    let plan = load_plan_record(root, config, &task);
    if let Some((store, plan_id)) = &plan {
        update_plan(store, plan_id, PlanStatus::Running, None);
    }

    let outcome = execute_task(
        model,
        &executor,
        &tasklist,
        &task,
        &system,
        config.max_iterations,
    );

    if outcome.stop.success() {
        if config.push_on_complete {
            push_current_branch(root);
        }
        if let Some((store, plan_id)) = &plan {
            update_plan(store, plan_id, PlanStatus::Completed, None);
        }
        let note = outcome
            .summary
            .unwrap_or_else(|| "no summary provided".to_string());
        events.record(&format!("task completed: {} ({note})", task.text));
        info!(task = %task.text, iterations = outcome.iterations, "task completed");
        Ok(CycleOutcome::Completed { task: task.text })
    } else {
        let error = outcome
            .stop
            .failure_message()
            .unwrap_or_else(|| "unknown failure".to_string());
        if let Some((store, plan_id)) = &plan {
            update_plan(store, plan_id, PlanStatus::Failed, Some(error.clone()));
        }
        events.record(&format!("task failed: {} ({error})", task.text));
        warn!(task = %task.text, error = %error, "task failed");
        Ok(CycleOutcome::Failed {
            task: task.text,
            error,
        })
    }
}

/// Poll forever, sleeping between cycles when idle or after an error.
pub fn run_daemon(root: &Path, config: &WorkerConfig, model: &dyn ModelClient) -> Result<()> {
    info!(
        poll_interval_secs = config.poll_interval_secs,
        "worker daemon started"
    );
    loop {
        match run_cycle(root, config, model) {
            // A finished task may have unblocked the next one; poll again
            // immediately.
            Ok(CycleOutcome::Completed { .. }) => continue,
            Ok(CycleOutcome::Idle) | Ok(CycleOutcome::Failed { .. }) => {}
            Err(err) => error!(err = %err, "poll cycle failed"),
        }
        thread::sleep(config.poll_interval());
    }
}

/// Locate the plan record backing a task, when a store is configured.
fn load_plan_record(
    root: &Path,
    config: &WorkerConfig,
    task: &Task,
) -> Option<(StateStore, String)> {
    let state_dir = config.state_dir.as_ref()?;
    let workspace_name = config.workspace_name.as_deref()?;
    let store = match StateStore::open(state_dir) {
        Ok(store) => store,
        Err(err) => {
            warn!(err = %err, root = %root.display(), "record store unavailable");
            return None;
        }
    };
    match store.find_active_plan(workspace_name, &task.text) {
        Ok(Some(plan)) => Some((store, plan.id)),
        Ok(None) => {
            // Tasks added by hand have no plan record; that is fine.
            None
        }
        Err(err) => {
            warn!(err = %err, "plan lookup failed");
            None
        }
    }
}

/// Record a plan status transition; failures are logged and swallowed so a
/// broken store never starves the task itself.
fn update_plan(store: &StateStore, plan_id: &str, status: PlanStatus, error: Option<String>) {
    if let Err(err) = store.update_plan_status(plan_id, status, error) {
        warn!(err = %err, plan_id, "failed to record plan status");
    }
}

fn push_current_branch(root: &Path) {
    let git = Git::new(root);
    match git.push(None) {
        Ok(_) => info!("pushed completed work"),
        Err(err) => warn!(err = %err, "push failed, leaving commits local"),
    }
}
