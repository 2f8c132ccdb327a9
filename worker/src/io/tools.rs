//! Dispatch of decoded tool calls against a workspace.
//!
//! Every failure is a structured [`ToolError`] surfaced to the model; nothing
//! here raises out of the tool layer. Shell commands run under a fixed
//! timeout and bounded output capture.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::tool::{ToolCall, ToolError, ToolErrorKind, ToolPayload, ToolResult};
use crate::core::workspace::{CheckAction, WorkspaceKind, check_commands};
use crate::io::git::Git;
use crate::io::process::{CommandOutput, run_argv, run_shell};

/// Executes tool calls in a workspace root.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    root: PathBuf,
    kind: WorkspaceKind,
    shell_timeout: Duration,
    output_limit_bytes: usize,
}

impl ToolExecutor {
    pub fn new(
        root: &Path,
        kind: WorkspaceKind,
        shell_timeout: Duration,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            kind,
            shell_timeout,
            output_limit_bytes,
        }
    }

    /// Execute one decoded tool call.
    #[instrument(skip_all, fields(tool = call.name()))]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        debug!("executing tool");
        match call {
            ToolCall::Bash { command } => self.bash(command),
            ToolCall::ReadFile { path } => self.read_file(path),
            ToolCall::WriteFile { path, content } => self.write_file(path, content),
            ToolCall::ListFiles { directory } => self.list_files(directory),
            ToolCall::SearchFiles {
                pattern,
                file_pattern,
            } => self.search_files(pattern, file_pattern),
            ToolCall::GitCommit { message } => self.git_commit(message),
            ToolCall::GitPush { branch } => self.git_push(branch.as_deref()),
            ToolCall::RunTests => self.run_check(CheckAction::Tests),
            ToolCall::RunBuild => self.run_check(CheckAction::Build),
            ToolCall::RunLint => self.run_check(CheckAction::Lint),
            // The loop intercepts completion before dispatch; acknowledging
            // here keeps execution total.
            ToolCall::CompleteTask { summary } => Ok(ToolPayload::Completed {
                summary: summary.clone(),
            }),
        }
    }

    /// Interpret a model-supplied path relative to the workspace root.
    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    fn bash(&self, command: &str) -> ToolResult {
        let output = run_shell(command, &self.root, self.shell_timeout, self.output_limit_bytes)
            .map_err(io_error)?;
        Ok(command_payload(output, self.shell_timeout))
    }

    fn read_file(&self, path: &str) -> ToolResult {
        let resolved = self.resolve(path);
        let content = fs::read_to_string(&resolved)
            .map_err(|err| io_error(format!("read {}: {err}", resolved.display())))?;
        Ok(ToolPayload::FileContent { content })
    }

    fn write_file(&self, path: &str, content: &str) -> ToolResult {
        let resolved = self.resolve(path);
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| io_error(format!("create {}: {err}", parent.display())))?;
        }
        fs::write(&resolved, content)
            .map_err(|err| io_error(format!("write {}: {err}", resolved.display())))?;
        Ok(ToolPayload::FileWritten {
            path: resolved.display().to_string(),
        })
    }

    fn list_files(&self, directory: &str) -> ToolResult {
        let resolved = self.resolve(directory);
        let entries = fs::read_dir(&resolved)
            .map_err(|err| io_error(format!("list {}: {err}", resolved.display())))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| io_error(format!("list {}: {err}", resolved.display())))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                files.push(format!("{name}/"));
            } else {
                files.push(name);
            }
        }
        files.sort();
        Ok(ToolPayload::Listing { files })
    }

    fn search_files(&self, pattern: &str, file_pattern: &str) -> ToolResult {
        let argv: Vec<String> = vec![
            "grep".to_string(),
            "-r".to_string(),
            "-n".to_string(),
            "-e".to_string(),
            pattern.to_string(),
            format!("--include={file_pattern}"),
            ".".to_string(),
        ];
        let output = run_argv(&argv, &self.root, self.shell_timeout, self.output_limit_bytes)
            .map_err(io_error)?;
        Ok(command_payload(output, self.shell_timeout))
    }

    fn git_commit(&self, message: &str) -> ToolResult {
        let git = Git::new(&self.root);
        git.add_all().map_err(git_error)?;
        let committed = git.commit_staged(message).map_err(git_error)?;
        let message = if committed {
            "committed staged changes"
        } else {
            "nothing to commit"
        };
        Ok(ToolPayload::Message {
            message: message.to_string(),
        })
    }

    fn git_push(&self, branch: Option<&str>) -> ToolResult {
        let git = Git::new(&self.root);
        let notice = git.push(branch).map_err(git_error)?;
        let message = if notice.is_empty() {
            "pushed".to_string()
        } else {
            notice
        };
        Ok(ToolPayload::Message { message })
    }

    fn run_check(&self, action: CheckAction) -> ToolResult {
        let Some(argvs) = check_commands(self.kind, action) else {
            return Err(ToolError::new(
                ToolErrorKind::Unsupported,
                format!(
                    "no {} detected for {} workspace",
                    action.label(),
                    self.kind.as_str()
                ),
            ));
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut last = CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            truncated_bytes: 0,
            timed_out: false,
        };
        for argv in &argvs {
            let output = run_argv(argv, &self.root, self.shell_timeout, self.output_limit_bytes)
                .map_err(io_error)?;
            stdout.push_str(&output.stdout);
            stderr.push_str(&output.stderr);
            let failed = !output.success();
            last = output;
            if failed {
                break;
            }
        }
        Ok(command_payload(
            CommandOutput {
                stdout,
                stderr,
                ..last
            },
            self.shell_timeout,
        ))
    }
}

fn command_payload(output: CommandOutput, timeout: Duration) -> ToolPayload {
    let stderr = if output.timed_out {
        format!("command timed out after {} seconds", timeout.as_secs())
    } else {
        output.stderr
    };
    ToolPayload::Command {
        stdout: output.stdout,
        stderr,
        exit_code: if output.timed_out { -1 } else { output.exit_code },
        timed_out: output.timed_out,
    }
}

fn io_error(err: impl ToString) -> ToolError {
    ToolError::new(ToolErrorKind::Io, err.to_string())
}

fn git_error(err: impl ToString) -> ToolError {
    ToolError::new(ToolErrorKind::Git, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(root: &Path, kind: WorkspaceKind) -> ToolExecutor {
        ToolExecutor::new(root, kind, Duration::from_secs(5), 100_000)
    }

    #[test]
    fn write_creates_parents_and_read_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exec = executor(temp.path(), WorkspaceKind::Generic);

        let result = exec
            .execute(&ToolCall::WriteFile {
                path: "nested/dir/note.txt".to_string(),
                content: "hello".to_string(),
            })
            .expect("write");
        assert!(matches!(result, ToolPayload::FileWritten { .. }));

        let result = exec
            .execute(&ToolCall::ReadFile {
                path: "nested/dir/note.txt".to_string(),
            })
            .expect("read");
        assert_eq!(
            result,
            ToolPayload::FileContent {
                content: "hello".to_string()
            }
        );
    }

    #[test]
    fn read_missing_file_is_an_io_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exec = executor(temp.path(), WorkspaceKind::Generic);
        let err = exec
            .execute(&ToolCall::ReadFile {
                path: "missing.txt".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Io);
    }

    #[test]
    fn listing_marks_directories_and_sorts() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");
        fs::write(temp.path().join("a.txt"), "").expect("write");
        let exec = executor(temp.path(), WorkspaceKind::Generic);

        let result = exec
            .execute(&ToolCall::ListFiles {
                directory: ".".to_string(),
            })
            .expect("list");
        assert_eq!(
            result,
            ToolPayload::Listing {
                files: vec!["a.txt".to_string(), "sub/".to_string()]
            }
        );
    }

    #[test]
    fn bash_captures_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exec = executor(temp.path(), WorkspaceKind::Generic);
        let result = exec
            .execute(&ToolCall::Bash {
                command: "echo out; exit 3".to_string(),
            })
            .expect("bash");
        match result {
            ToolPayload::Command {
                stdout, exit_code, ..
            } => {
                assert_eq!(stdout.trim(), "out");
                assert_eq!(exit_code, 3);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn bash_timeout_yields_structured_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exec = ToolExecutor::new(
            temp.path(),
            WorkspaceKind::Generic,
            Duration::from_millis(200),
            100_000,
        );
        let result = exec
            .execute(&ToolCall::Bash {
                command: "sleep 5".to_string(),
            })
            .expect("bash");
        match result {
            ToolPayload::Command {
                stderr, timed_out, ..
            } => {
                assert!(timed_out);
                assert!(stderr.contains("timed out"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn checks_are_unsupported_for_generic_workspaces() {
        let temp = tempfile::tempdir().expect("tempdir");
        let exec = executor(temp.path(), WorkspaceKind::Generic);
        let err = exec.execute(&ToolCall::RunTests).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::Unsupported);
        assert!(err.message.contains("test framework"));
    }

    #[test]
    fn search_reports_matches_with_line_numbers() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("notes.md"), "alpha\nbeta\n").expect("write");
        let exec = executor(temp.path(), WorkspaceKind::Generic);
        let result = exec
            .execute(&ToolCall::SearchFiles {
                pattern: "beta".to_string(),
                file_pattern: "*.md".to_string(),
            })
            .expect("search");
        match result {
            ToolPayload::Command { stdout, exit_code, .. } => {
                assert_eq!(exit_code, 0);
                assert!(stdout.contains("notes.md:2:beta"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
