//! Coordinator CLI: register workspaces, submit plans, and inspect progress.
//!
//! The coordinator shares the worker's record store and git adapter. It never
//! executes tasks itself: submitting a plan appends a pending line to the
//! workspace's `tasks.md` and queues a plan record; the worker daemon picks
//! the line up and reports completion back through the record's status.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing::info;

use worker::io::events::EventLog;
use worker::io::git::Git;
use worker::io::store::{
    PlanRecord, PlanStatus, StateStore, WorkspaceRecord, WorkspaceStatus, now_iso,
};
use worker::io::tasklist::TaskList;
use worker::logging;

const STATE_DIR_VAR: &str = "TASKBRIDGE_STATE_DIR";

#[derive(Parser)]
#[command(
    name = "coordinator",
    version,
    about = "Registers workspaces and dispatches plans to workspace workers"
)]
struct Cli {
    /// Record store directory (defaults to $TASKBRIDGE_STATE_DIR, then ~/.taskbridge).
    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a workspace so plans can be submitted against it.
    Register {
        /// Unique workspace name.
        #[arg(long)]
        name: String,
        /// Workspace root on the machine running the worker.
        #[arg(long)]
        root: PathBuf,
        /// Git remote URL the workspace tracks.
        #[arg(long)]
        git_remote: String,
        /// Base branch.
        #[arg(long, default_value = "main")]
        branch: String,
        /// Identifier of the VM hosting the workspace, if any.
        #[arg(long)]
        vm_id: Option<String>,
    },
    /// Queue a plan: create a work branch and append the task line.
    Submit {
        /// Target workspace name.
        #[arg(long)]
        workspace: String,
        /// Natural-language plan text; becomes one checklist line.
        #[arg(long)]
        plan: String,
        /// Work branch name (defaults to agent/<random hex>).
        #[arg(long)]
        branch_name: Option<String>,
    },
    /// Show a plan's status, recent commits, and worker activity.
    Status {
        /// Plan id printed by `submit`.
        plan_id: String,
    },
    /// Summarize a workspace: work branches, commits, and dirty files.
    Sync {
        /// Workspace name.
        workspace: String,
    },
    /// List registered workspaces.
    Workspaces,
    /// List plans, optionally for one workspace.
    Plans {
        #[arg(long)]
        workspace: Option<String>,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = StateStore::open(&resolve_state_dir(cli.state_dir)?)?;

    match cli.command {
        Command::Register {
            name,
            root,
            git_remote,
            branch,
            vm_id,
        } => cmd_register(&store, name, root, git_remote, branch, vm_id),
        Command::Submit {
            workspace,
            plan,
            branch_name,
        } => cmd_submit(&store, &workspace, &plan, branch_name),
        Command::Status { plan_id } => cmd_status(&store, &plan_id),
        Command::Sync { workspace } => cmd_sync(&store, &workspace),
        Command::Workspaces => cmd_workspaces(&store),
        Command::Plans { workspace } => cmd_plans(&store, workspace.as_deref()),
    }
}

fn cmd_register(
    store: &StateStore,
    name: String,
    root: PathBuf,
    git_remote: String,
    branch: String,
    vm_id: Option<String>,
) -> Result<()> {
    if store.get_workspace(&name)?.is_some() {
        return Err(anyhow!("workspace '{name}' is already registered"));
    }
    let record = WorkspaceRecord {
        id: new_id(12),
        name: name.clone(),
        root,
        git_remote,
        branch,
        vm_id,
        status: WorkspaceStatus::Ready,
        created_at: now_iso(),
    };
    store.save_workspace(&record)?;
    info!(name = %name, id = %record.id, "workspace registered");
    println!("registered workspace '{name}' ({})", record.id);
    Ok(())
}

fn cmd_submit(
    store: &StateStore,
    workspace: &str,
    plan: &str,
    branch_name: Option<String>,
) -> Result<()> {
    let plan = plan.trim();
    if plan.is_empty() {
        return Err(anyhow!("plan text must not be empty"));
    }
    let record = store
        .get_workspace(workspace)?
        .ok_or_else(|| anyhow!("unknown workspace '{workspace}'"))?;
    if record.status != WorkspaceStatus::Ready {
        return Err(anyhow!(
            "workspace '{workspace}' is not ready (status: {:?})",
            record.status
        ));
    }
    if store.find_active_plan(workspace, plan)?.is_some() {
        return Err(anyhow!("an identical plan is already queued or running"));
    }

    let plan_id = new_id(12);
    let branch = branch_name.unwrap_or_else(|| format!("agent/{}", new_id(8)));
    Git::new(&record.root)
        .checkout_new_branch(&branch)
        .with_context(|| format!("create work branch in {}", record.root.display()))?;
    TaskList::new(&record.root).append(plan)?;

    store.save_plan(&PlanRecord {
        id: plan_id.clone(),
        workspace_id: record.id,
        workspace_name: record.name,
        plan: plan.to_string(),
        branch,
        status: PlanStatus::Queued,
        error: None,
        created_at: now_iso(),
    })?;
    info!(plan_id = %plan_id, workspace, "plan queued");
    println!("{plan_id}");
    Ok(())
}

fn cmd_status(store: &StateStore, plan_id: &str) -> Result<()> {
    let plan = store
        .get_plan(plan_id)?
        .ok_or_else(|| anyhow!("unknown plan '{plan_id}'"))?;
    println!("plan:      {}", plan.plan);
    println!("workspace: {}", plan.workspace_name);
    println!("branch:    {}", plan.branch);
    println!("status:    {}", plan.status.as_str());
    if let Some(error) = &plan.error {
        println!("error:     {error}");
    }

    let Some(workspace) = store.get_workspace(&plan.workspace_name)? else {
        return Ok(());
    };
    match Git::new(&workspace.root).recent_commits(&plan.branch, 5) {
        Ok(commits) if !commits.is_empty() => {
            println!("recent commits:");
            for line in commits {
                println!("  {line}");
            }
        }
        Ok(_) => {}
        Err(err) => println!("recent commits unavailable: {err:#}"),
    }
    let events = EventLog::new(&workspace.root).tail(10)?;
    if !events.is_empty() {
        println!("worker activity:");
        for line in events {
            println!("  {line}");
        }
    }
    Ok(())
}

fn cmd_sync(store: &StateStore, workspace: &str) -> Result<()> {
    let record = store
        .get_workspace(workspace)?
        .ok_or_else(|| anyhow!("unknown workspace '{workspace}'"))?;
    let git = Git::new(&record.root);
    if let Err(err) = git.fetch() {
        println!("fetch failed, showing local state only: {err:#}");
    }

    let branches = git.branches_with_prefix("agent/")?;
    if branches.is_empty() {
        println!("no work branches");
    }
    for branch in branches {
        println!("{branch}:");
        for line in git.recent_commits(&branch, 5)? {
            println!("  {line}");
        }
    }

    let dirty = git.status_porcelain()?;
    if dirty.is_empty() {
        println!("working tree clean");
    } else {
        println!("{} dirty file(s):", dirty.len());
        for entry in dirty {
            println!("  {} {}", entry.code, entry.path);
        }
    }
    Ok(())
}

fn cmd_workspaces(store: &StateStore) -> Result<()> {
    for ws in store.list_workspaces()? {
        println!(
            "{}  {}  {}  {}",
            ws.name,
            ws.status.as_str(),
            ws.root.display(),
            ws.git_remote
        );
    }
    Ok(())
}

fn cmd_plans(store: &StateStore, workspace: Option<&str>) -> Result<()> {
    for plan in store.list_plans(workspace)? {
        println!(
            "{}  {}  {}  {}",
            plan.id,
            plan.status.as_str(),
            plan.workspace_name,
            plan.plan
        );
    }
    Ok(())
}

/// Store directory: explicit flag, then env override, then `~/.taskbridge`.
fn resolve_state_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = env::var_os(STATE_DIR_VAR) {
        return Ok(PathBuf::from(dir));
    }
    let home = env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(home).join(".taskbridge"))
}

/// Random lowercase hex identifier.
fn new_id(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len).map(|_| HEX[rng.gen_range(0..HEX.len())] as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_hex_of_requested_length() {
        let id = new_id(12);
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_id(12), new_id(12));
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        cmd_register(
            &store,
            "demo".to_string(),
            PathBuf::from("/tmp/demo"),
            "https://example.com/demo.git".to_string(),
            "main".to_string(),
            None,
        )
        .expect("register");

        let err = cmd_register(
            &store,
            "demo".to_string(),
            PathBuf::from("/tmp/elsewhere"),
            "https://example.com/other.git".to_string(),
            "main".to_string(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn submit_requires_a_known_ready_workspace() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        let err = cmd_submit(&store, "ghost", "do something", None).unwrap_err();
        assert!(err.to_string().contains("unknown workspace"));

        let mut ws = WorkspaceRecord {
            id: "w1".to_string(),
            name: "demo".to_string(),
            root: temp.path().join("ws"),
            git_remote: "https://example.com/demo.git".to_string(),
            branch: "main".to_string(),
            vm_id: None,
            status: WorkspaceStatus::Error,
            created_at: now_iso(),
        };
        store.save_workspace(&ws).expect("save");
        let err = cmd_submit(&store, "demo", "do something", None).unwrap_err();
        assert!(err.to_string().contains("not ready"));

        ws.status = WorkspaceStatus::Ready;
        store.save_workspace(&ws).expect("save");
        let err = cmd_submit(&store, "demo", "   ", None).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn parse_submit() {
        let cli = Cli::parse_from([
            "coordinator",
            "submit",
            "--workspace",
            "demo",
            "--plan",
            "add a README",
        ]);
        assert!(matches!(cli.command, Command::Submit { .. }));
    }
}
