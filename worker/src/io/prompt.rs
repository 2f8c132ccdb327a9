//! System prompt rendering for the task loop.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::workspace::WorkspaceProfile;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Render the system prompt for one workspace.
///
/// The profile is immutable per task, so the prompt is rendered once when the
/// task starts and reused for every iteration.
pub fn render_system_prompt(root: &Path, profile: &WorkspaceProfile) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .context("system template should be valid")?;
    let template = env.get_template("system")?;
    let rendered = template.render(context! {
        kind => profile.kind.as_str(),
        root => root.display().to_string(),
        detected_files => profile.detected_files,
        commands => profile.commands,
    })?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Markers;

    #[test]
    fn prompt_names_kind_and_commands() {
        let profile = WorkspaceProfile::from_markers(&Markers {
            package_json: true,
            ..Markers::default()
        });
        let prompt = render_system_prompt(Path::new("/work/app"), &profile).expect("render");

        assert!(prompt.contains("Kind: nodejs"));
        assert!(prompt.contains("Root: /work/app"));
        assert!(prompt.contains("package.json"));
        assert!(prompt.contains("npm_test: npm test"));
        assert!(prompt.contains("complete_task"));
    }

    #[test]
    fn generic_prompt_omits_detected_files() {
        let profile = WorkspaceProfile::from_markers(&Markers::default());
        let prompt = render_system_prompt(Path::new("/work/app"), &profile).expect("render");

        assert!(prompt.contains("Kind: generic"));
        assert!(!prompt.contains("Detected files"));
    }
}
