//! Closed tool catalogue: names, argument schemas, and result shapes.
//!
//! The model service requests tools by name with JSON arguments. Arguments
//! are validated once at this boundary (schema check, then typed decode) into
//! a closed [`ToolCall`] sum type so dispatch is exhaustive and the executor
//! never sees malformed input. Failures are structured [`ToolError`] values
//! fed back to the model, never raised errors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde::Deserialize;
use serde_json::{Value, json};

/// Name of the explicit completion tool; the loop intercepts it.
pub const COMPLETE_TOOL: &str = "complete_task";

/// One entry of the tool catalogue published to the model service.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// A decoded, validated tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Bash { command: String },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    ListFiles { directory: String },
    SearchFiles { pattern: String, file_pattern: String },
    GitCommit { message: String },
    GitPush { branch: Option<String> },
    RunTests,
    RunBuild,
    RunLint,
    CompleteTask { summary: String },
}

/// Why a tool invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The model named a tool that is not in the catalogue.
    UnknownTool,
    /// Arguments did not match the tool's schema.
    BadArguments,
    /// Filesystem operation failed.
    Io,
    /// Git operation failed.
    Git,
    /// The workspace kind has no known command for the requested action.
    Unsupported,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::BadArguments => "bad_arguments",
            ToolErrorKind::Io => "io",
            ToolErrorKind::Git => "git",
            ToolErrorKind::Unsupported => "unsupported",
        }
    }
}

/// Structured tool failure, surfaced to the model as a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Successful tool output, grouped by tool family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPayload {
    /// Shell-shaped tools: captured process output.
    Command {
        stdout: String,
        stderr: String,
        exit_code: i32,
        timed_out: bool,
    },
    /// `read_file`.
    FileContent { content: String },
    /// `write_file`.
    FileWritten { path: String },
    /// `list_files`.
    Listing { files: Vec<String> },
    /// Git and other side-effecting tools that report a short notice.
    Message { message: String },
    /// `complete_task` acknowledgement.
    Completed { summary: String },
}

pub type ToolResult = Result<ToolPayload, ToolError>;

/// Serialize a tool result for the model service.
///
/// Every result carries a boolean `success` plus either the payload fields or
/// an `error` string, uniformly across tool families.
pub fn render_result(result: &ToolResult) -> String {
    let value = match result {
        Ok(ToolPayload::Command {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }) => json!({
            "success": *exit_code == 0 && !timed_out,
            "stdout": stdout,
            "stderr": stderr,
            "return_code": exit_code,
            "timed_out": timed_out,
        }),
        Ok(ToolPayload::FileContent { content }) => json!({
            "success": true,
            "content": content,
        }),
        Ok(ToolPayload::FileWritten { path }) => json!({
            "success": true,
            "path": path,
        }),
        Ok(ToolPayload::Listing { files }) => json!({
            "success": true,
            "files": files,
        }),
        Ok(ToolPayload::Message { message }) => json!({
            "success": true,
            "message": message,
        }),
        Ok(ToolPayload::Completed { summary }) => json!({
            "success": true,
            "message": "Task marked as complete",
            "summary": summary,
        }),
        Err(err) => json!({
            "success": false,
            "kind": err.kind.as_str(),
            "error": err.message,
        }),
    };
    value.to_string()
}

/// The full tool catalogue, in the order it is published to the model.
pub fn tool_specs() -> &'static [ToolSpec] {
    &SPECS
}

static SPECS: LazyLock<Vec<ToolSpec>> = LazyLock::new(|| {
    vec![
        ToolSpec {
            name: "bash",
            description: "Run a bash command in the workspace. Use this for any shell \
                          operations, file manipulation, or system commands.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The bash command to execute"
                    }
                },
                "required": ["command"]
            }),
        },
        ToolSpec {
            name: "read_file",
            description: "Read the contents of a file. Paths are relative to the workspace root.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the file (relative to workspace)"
                    }
                },
                "required": ["path"]
            }),
        },
        ToolSpec {
            name: "write_file",
            description: "Write content to a file. Creates parent directories if needed. \
                          Paths are relative to the workspace root.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to the file (relative to workspace)"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write to the file"
                    }
                },
                "required": ["path", "content"]
            }),
        },
        ToolSpec {
            name: "list_files",
            description: "List files and directories. Directories are marked with a \
                          trailing slash.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory to list (relative to workspace, default: '.')"
                    }
                }
            }),
        },
        ToolSpec {
            name: "search_files",
            description: "Search for a pattern in files using grep.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Pattern to search for"
                    },
                    "file_pattern": {
                        "type": "string",
                        "description": "File pattern to search in (e.g., '*.py', '*.md')"
                    }
                },
                "required": ["pattern"]
            }),
        },
        ToolSpec {
            name: "git_commit",
            description: "Stage all changes and create a git commit with the given message.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Commit message"
                    }
                },
                "required": ["message"]
            }),
        },
        ToolSpec {
            name: "git_push",
            description: "Push commits to the remote repository.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch": {
                        "type": "string",
                        "description": "Branch to push (optional, uses current branch if not specified)"
                    }
                }
            }),
        },
        ToolSpec {
            name: "run_tests",
            description: "Run the project's test suite (auto-detects framework: npm test, \
                          pytest, etc.)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "run_build",
            description: "Build the project (auto-detects: npm run build, pip install, etc.)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "run_lint",
            description: "Run linter/formatter (auto-detects: npm run lint, ruff, etc.)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: COMPLETE_TOOL,
            description: "Mark the current task as complete. Call this when you have \
                          finished the task.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Summary of what was accomplished"
                    }
                },
                "required": ["summary"]
            }),
        },
    ]
});

static VALIDATORS: LazyLock<BTreeMap<&'static str, Validator>> = LazyLock::new(|| {
    SPECS
        .iter()
        .map(|spec| {
            let validator = jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&spec.input_schema)
                .expect("tool schemas are valid");
            (spec.name, validator)
        })
        .collect()
});

#[derive(Deserialize)]
struct BashArgs {
    command: String,
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default = "default_directory")]
    directory: String,
}

fn default_directory() -> String {
    ".".to_string()
}

#[derive(Deserialize)]
struct SearchArgs {
    pattern: String,
    #[serde(default = "default_file_pattern")]
    file_pattern: String,
}

fn default_file_pattern() -> String {
    "*".to_string()
}

#[derive(Deserialize)]
struct CommitArgs {
    message: String,
}

#[derive(Deserialize)]
struct PushArgs {
    #[serde(default)]
    branch: Option<String>,
}

#[derive(Deserialize)]
struct CompleteArgs {
    summary: String,
}

impl ToolCall {
    /// Catalogue name for this call.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Bash { .. } => "bash",
            ToolCall::ReadFile { .. } => "read_file",
            ToolCall::WriteFile { .. } => "write_file",
            ToolCall::ListFiles { .. } => "list_files",
            ToolCall::SearchFiles { .. } => "search_files",
            ToolCall::GitCommit { .. } => "git_commit",
            ToolCall::GitPush { .. } => "git_push",
            ToolCall::RunTests => "run_tests",
            ToolCall::RunBuild => "run_build",
            ToolCall::RunLint => "run_lint",
            ToolCall::CompleteTask { .. } => COMPLETE_TOOL,
        }
    }

    /// Decode a model-requested invocation into a typed call.
    ///
    /// Unknown names and schema violations yield structured errors so the
    /// model can self-correct.
    pub fn parse(name: &str, arguments: &Value) -> Result<ToolCall, ToolError> {
        let validator = VALIDATORS
            .get(name)
            .ok_or_else(|| ToolError::new(ToolErrorKind::UnknownTool, format!("Unknown tool: {name}")))?;

        let violations: Vec<String> = validator
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(ToolError::new(
                ToolErrorKind::BadArguments,
                format!("invalid arguments for {name}: {}", violations.join("; ")),
            ));
        }

        let call = match name {
            "bash" => {
                let args: BashArgs = decode(name, arguments)?;
                ToolCall::Bash {
                    command: args.command,
                }
            }
            "read_file" => {
                let args: PathArgs = decode(name, arguments)?;
                ToolCall::ReadFile { path: args.path }
            }
            "write_file" => {
                let args: WriteArgs = decode(name, arguments)?;
                ToolCall::WriteFile {
                    path: args.path,
                    content: args.content,
                }
            }
            "list_files" => {
                let args: ListArgs = decode(name, arguments)?;
                ToolCall::ListFiles {
                    directory: args.directory,
                }
            }
            "search_files" => {
                let args: SearchArgs = decode(name, arguments)?;
                ToolCall::SearchFiles {
                    pattern: args.pattern,
                    file_pattern: args.file_pattern,
                }
            }
            "git_commit" => {
                let args: CommitArgs = decode(name, arguments)?;
                ToolCall::GitCommit {
                    message: args.message,
                }
            }
            "git_push" => {
                let args: PushArgs = decode(name, arguments)?;
                ToolCall::GitPush {
                    branch: args.branch,
                }
            }
            "run_tests" => ToolCall::RunTests,
            "run_build" => ToolCall::RunBuild,
            "run_lint" => ToolCall::RunLint,
            COMPLETE_TOOL => {
                let args: CompleteArgs = decode(name, arguments)?;
                ToolCall::CompleteTask {
                    summary: args.summary,
                }
            }
            // VALIDATORS and SPECS share keys, so this is unreachable.
            other => {
                return Err(ToolError::new(
                    ToolErrorKind::UnknownTool,
                    format!("Unknown tool: {other}"),
                ));
            }
        };
        Ok(call)
    }
}

fn decode<T: serde::de::DeserializeOwned>(name: &str, arguments: &Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|err| {
        ToolError::new(
            ToolErrorKind::BadArguments,
            format!("invalid arguments for {name}: {err}"),
        )
    })
}
