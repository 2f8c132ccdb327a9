//! Workspace kind detection and per-kind command resolution.
//!
//! Classification is a pure function of which marker files exist, checked in
//! priority order. Detection runs once per worker process; the profile is
//! immutable for the duration of a task.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Detected workspace kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceKind {
    Nodejs,
    Python,
    Obsidian,
    Generic,
}

impl WorkspaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceKind::Nodejs => "nodejs",
            WorkspaceKind::Python => "python",
            WorkspaceKind::Obsidian => "obsidian",
            WorkspaceKind::Generic => "generic",
        }
    }
}

/// Which marker files are present in a workspace root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    pub package_json: bool,
    pub pyproject: bool,
    pub requirements: bool,
    pub obsidian: bool,
}

impl Markers {
    /// Check which marker files exist under `root`.
    pub fn probe(root: &Path) -> Self {
        Self {
            package_json: root.join("package.json").exists(),
            pyproject: root.join("pyproject.toml").exists(),
            requirements: root.join("requirements.txt").exists(),
            obsidian: root.join(".obsidian").exists(),
        }
    }
}

/// Classify a workspace from its markers.
///
/// Priority order: node manifest > python project file > python requirements
/// file > obsidian vault marker > generic.
pub fn classify(markers: &Markers) -> WorkspaceKind {
    if markers.package_json {
        WorkspaceKind::Nodejs
    } else if markers.pyproject || markers.requirements {
        WorkspaceKind::Python
    } else if markers.obsidian {
        WorkspaceKind::Obsidian
    } else {
        WorkspaceKind::Generic
    }
}

/// Immutable workspace description embedded into the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceProfile {
    pub kind: WorkspaceKind,
    /// Marker files that drove classification.
    pub detected_files: Vec<String>,
    /// Named commands advertised to the model, name -> description.
    pub commands: BTreeMap<String, String>,
}

impl WorkspaceProfile {
    /// Detect the profile for a workspace root.
    pub fn detect(root: &Path) -> Self {
        Self::from_markers(&Markers::probe(root))
    }

    /// Build a profile from already-probed markers (pure).
    pub fn from_markers(markers: &Markers) -> Self {
        let kind = classify(markers);
        let mut detected_files = Vec::new();
        let mut commands = BTreeMap::new();

        match kind {
            WorkspaceKind::Nodejs => {
                detected_files.push("package.json".to_string());
                commands.insert("npm_install".to_string(), "npm install".to_string());
                commands.insert("npm_test".to_string(), "npm test".to_string());
                commands.insert("npm_build".to_string(), "npm run build".to_string());
                commands.insert("npm_lint".to_string(), "npm run lint".to_string());
            }
            WorkspaceKind::Python => {
                if markers.pyproject {
                    detected_files.push("pyproject.toml".to_string());
                    commands.insert("pip_install".to_string(), "pip install -e .".to_string());
                    commands.insert("ruff_check".to_string(), "ruff check .".to_string());
                    commands.insert("ruff_format".to_string(), "ruff format .".to_string());
                } else {
                    detected_files.push("requirements.txt".to_string());
                    commands.insert(
                        "pip_install".to_string(),
                        "pip install -r requirements.txt".to_string(),
                    );
                }
                commands.insert("pytest".to_string(), "pytest".to_string());
            }
            WorkspaceKind::Obsidian => {
                detected_files.push(".obsidian/".to_string());
                commands.insert(
                    "obsidian_search".to_string(),
                    "grep -r in markdown files".to_string(),
                );
            }
            WorkspaceKind::Generic => {
                commands.insert("ls".to_string(), "list files".to_string());
                commands.insert("cat".to_string(), "read files".to_string());
                commands.insert("git_status".to_string(), "git status".to_string());
            }
        }

        Self {
            kind,
            detected_files,
            commands,
        }
    }
}

/// Kind-specific checks the model can request without naming a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckAction {
    Tests,
    Build,
    Lint,
}

impl CheckAction {
    pub fn label(&self) -> &'static str {
        match self {
            CheckAction::Tests => "test framework",
            CheckAction::Build => "build system",
            CheckAction::Lint => "linter",
        }
    }
}

/// Resolve a check action to concrete argument vectors for the workspace kind.
///
/// Returns `None` when the kind has no known command for the action; callers
/// report that as a non-fatal unsupported result.
pub fn check_commands(kind: WorkspaceKind, action: CheckAction) -> Option<Vec<Vec<String>>> {
    let argvs: &[&[&str]] = match (kind, action) {
        (WorkspaceKind::Nodejs, CheckAction::Tests) => &[&["npm", "test"]],
        (WorkspaceKind::Nodejs, CheckAction::Build) => &[&["npm", "run", "build"]],
        (WorkspaceKind::Nodejs, CheckAction::Lint) => &[&["npm", "run", "lint"]],
        (WorkspaceKind::Python, CheckAction::Tests) => &[&["pytest", "-v"]],
        (WorkspaceKind::Python, CheckAction::Build) => &[&["pip", "install", "-e", "."]],
        (WorkspaceKind::Python, CheckAction::Lint) => {
            &[&["ruff", "check", "."], &["ruff", "format", "--check", "."]]
        }
        _ => return None,
    };
    Some(
        argvs
            .iter()
            .map(|argv| argv.iter().map(|s| s.to_string()).collect())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_manifest_wins_over_python_project_file() {
        let markers = Markers {
            package_json: true,
            pyproject: true,
            ..Markers::default()
        };
        assert_eq!(classify(&markers), WorkspaceKind::Nodejs);
    }

    #[test]
    fn pyproject_wins_over_requirements_and_obsidian() {
        let markers = Markers {
            pyproject: true,
            requirements: true,
            obsidian: true,
            ..Markers::default()
        };
        let profile = WorkspaceProfile::from_markers(&markers);
        assert_eq!(profile.kind, WorkspaceKind::Python);
        assert_eq!(profile.detected_files, vec!["pyproject.toml"]);
    }

    #[test]
    fn no_markers_defaults_to_generic() {
        let profile = WorkspaceProfile::from_markers(&Markers::default());
        assert_eq!(profile.kind, WorkspaceKind::Generic);
        assert!(profile.detected_files.is_empty());
        assert!(profile.commands.contains_key("git_status"));
    }

    #[test]
    fn detect_probes_the_filesystem() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("requirements.txt"), "anyhow\n").expect("write");
        let profile = WorkspaceProfile::detect(temp.path());
        assert_eq!(profile.kind, WorkspaceKind::Python);
        assert_eq!(profile.detected_files, vec!["requirements.txt"]);
    }

    #[test]
    fn check_commands_unknown_for_generic_kind() {
        assert!(check_commands(WorkspaceKind::Generic, CheckAction::Tests).is_none());
        assert!(check_commands(WorkspaceKind::Obsidian, CheckAction::Lint).is_none());
    }

    #[test]
    fn python_lint_runs_check_then_format() {
        let cmds = check_commands(WorkspaceKind::Python, CheckAction::Lint).expect("commands");
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0][0], "ruff");
    }
}
