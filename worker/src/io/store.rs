//! Durable records for workspaces and plans.
//!
//! JSON-file persistence behind an explicitly constructed store handle; tests
//! and callers supply their own state directory instead of sharing process
//! globals. The plan record's `status` field is the single authoritative
//! completion record: the worker updates it as tasks run, and status queries
//! read it back without re-deriving anything from document text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle of a registered workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceStatus {
    Bootstrapping,
    Ready,
    Error,
}

impl WorkspaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceStatus::Bootstrapping => "bootstrapping",
            WorkspaceStatus::Ready => "ready",
            WorkspaceStatus::Error => "error",
        }
    }
}

/// Lifecycle of a submitted plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Queued => "queued",
            PlanStatus::Running => "running",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        }
    }
}

/// A registered workspace (git repo plus the VM it lives on), keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub id: String,
    pub name: String,
    /// Workspace root on the machine running the worker.
    pub root: PathBuf,
    pub git_remote: String,
    pub branch: String,
    pub vm_id: Option<String>,
    pub status: WorkspaceStatus,
    pub created_at: String,
}

/// A submitted plan, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub workspace_id: String,
    pub workspace_name: String,
    /// Natural-language plan text; also the task line appended to `tasks.md`.
    pub plan: String,
    pub branch: String,
    pub status: PlanStatus,
    pub error: Option<String>,
    pub created_at: String,
}

/// UTC timestamp for record creation.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// JSON-file record store rooted at an explicit state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    workspaces_path: PathBuf,
    plans_path: PathBuf,
}

impl StateStore {
    /// Open (creating if needed) a store under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create state dir {}", dir.display()))?;
        Ok(Self {
            workspaces_path: dir.join("workspaces.json"),
            plans_path: dir.join("plans.json"),
        })
    }

    // Workspace operations

    pub fn save_workspace(&self, workspace: &WorkspaceRecord) -> Result<()> {
        let mut records: BTreeMap<String, WorkspaceRecord> = read_map(&self.workspaces_path)?;
        records.insert(workspace.name.clone(), workspace.clone());
        write_map(&self.workspaces_path, &records)
    }

    pub fn get_workspace(&self, name: &str) -> Result<Option<WorkspaceRecord>> {
        let records: BTreeMap<String, WorkspaceRecord> = read_map(&self.workspaces_path)?;
        Ok(records.get(name).cloned())
    }

    pub fn list_workspaces(&self) -> Result<Vec<WorkspaceRecord>> {
        let records: BTreeMap<String, WorkspaceRecord> = read_map(&self.workspaces_path)?;
        Ok(records.into_values().collect())
    }

    pub fn update_workspace_status(&self, name: &str, status: WorkspaceStatus) -> Result<bool> {
        let mut records: BTreeMap<String, WorkspaceRecord> = read_map(&self.workspaces_path)?;
        let Some(record) = records.get_mut(name) else {
            return Ok(false);
        };
        record.status = status;
        write_map(&self.workspaces_path, &records)?;
        Ok(true)
    }

    pub fn delete_workspace(&self, name: &str) -> Result<bool> {
        let mut records: BTreeMap<String, WorkspaceRecord> = read_map(&self.workspaces_path)?;
        if records.remove(name).is_none() {
            return Ok(false);
        }
        write_map(&self.workspaces_path, &records)?;
        Ok(true)
    }

    // Plan operations

    pub fn save_plan(&self, plan: &PlanRecord) -> Result<()> {
        let mut records: BTreeMap<String, PlanRecord> = read_map(&self.plans_path)?;
        records.insert(plan.id.clone(), plan.clone());
        write_map(&self.plans_path, &records)
    }

    pub fn get_plan(&self, plan_id: &str) -> Result<Option<PlanRecord>> {
        let records: BTreeMap<String, PlanRecord> = read_map(&self.plans_path)?;
        Ok(records.get(plan_id).cloned())
    }

    pub fn update_plan_status(
        &self,
        plan_id: &str,
        status: PlanStatus,
        error: Option<String>,
    ) -> Result<bool> {
        let mut records: BTreeMap<String, PlanRecord> = read_map(&self.plans_path)?;
        let Some(record) = records.get_mut(plan_id) else {
            return Ok(false);
        };
        debug!(plan_id, ?status, "updating plan status");
        record.status = status;
        if error.is_some() {
            record.error = error;
        }
        write_map(&self.plans_path, &records)?;
        Ok(true)
    }

    /// All plans, optionally filtered by workspace name, in creation order.
    pub fn list_plans(&self, workspace_name: Option<&str>) -> Result<Vec<PlanRecord>> {
        let records: BTreeMap<String, PlanRecord> = read_map(&self.plans_path)?;
        let mut plans: Vec<PlanRecord> = records
            .into_values()
            .filter(|p| workspace_name.is_none_or(|name| p.workspace_name == name))
            .collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(plans)
    }

    /// The queued or running plan whose text matches a task exactly, if any.
    pub fn find_active_plan(
        &self,
        workspace_name: &str,
        task_text: &str,
    ) -> Result<Option<PlanRecord>> {
        let plans = self.list_plans(Some(workspace_name))?;
        Ok(plans.into_iter().find(|p| {
            matches!(p.status, PlanStatus::Queued | PlanStatus::Running) && p.plan == task_text
        }))
    }
}

fn read_map<T: serde::de::DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn write_map<T: Serialize>(path: &Path, records: &BTreeMap<String, T>) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(records).context("serialize records")?;
    payload.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload).with_context(|| format!("write temp {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(name: &str) -> WorkspaceRecord {
        WorkspaceRecord {
            id: format!("{name}-id"),
            name: name.to_string(),
            root: PathBuf::from("/tmp/ws"),
            git_remote: "https://example.com/repo.git".to_string(),
            branch: "main".to_string(),
            vm_id: None,
            status: WorkspaceStatus::Ready,
            created_at: now_iso(),
        }
    }

    fn plan(id: &str, workspace: &str, text: &str) -> PlanRecord {
        PlanRecord {
            id: id.to_string(),
            workspace_id: format!("{workspace}-id"),
            workspace_name: workspace.to_string(),
            plan: text.to_string(),
            branch: format!("agent/{id}"),
            status: PlanStatus::Queued,
            error: None,
            created_at: now_iso(),
        }
    }

    #[test]
    fn workspace_save_get_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        let ws = workspace("demo");
        store.save_workspace(&ws).expect("save");
        assert_eq!(store.get_workspace("demo").expect("get"), Some(ws));
        assert_eq!(store.get_workspace("other").expect("get"), None);
    }

    #[test]
    fn plan_status_update_is_persisted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        store.save_plan(&plan("p1", "demo", "do X")).expect("save");

        let updated = store
            .update_plan_status("p1", PlanStatus::Failed, Some("budget exhausted".to_string()))
            .expect("update");
        assert!(updated);

        let loaded = store.get_plan("p1").expect("get").expect("plan");
        assert_eq!(loaded.status, PlanStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("budget exhausted"));
    }

    #[test]
    fn find_active_plan_matches_exact_text_and_live_status() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        store.save_plan(&plan("p1", "demo", "do X")).expect("save");
        let mut done = plan("p2", "demo", "do Y");
        done.status = PlanStatus::Completed;
        store.save_plan(&done).expect("save");

        let found = store.find_active_plan("demo", "do X").expect("find");
        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));
        assert!(store.find_active_plan("demo", "do Y").expect("find").is_none());
        assert!(store.find_active_plan("demo", "do X ").expect("find").is_none());
    }

    #[test]
    fn list_plans_filters_by_workspace() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        store.save_plan(&plan("p1", "a", "x")).expect("save");
        store.save_plan(&plan("p2", "b", "y")).expect("save");

        assert_eq!(store.list_plans(None).expect("list").len(), 2);
        let only_a = store.list_plans(Some("a")).expect("list");
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].id, "p1");
    }

    #[test]
    fn missing_workspace_update_reports_false() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(temp.path()).expect("open");
        assert!(!store
            .update_workspace_status("nope", WorkspaceStatus::Error)
            .expect("update"));
    }
}
