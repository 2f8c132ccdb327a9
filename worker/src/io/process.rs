//! Helpers for running child processes with timeouts and bounded output.
//!
//! Commands are built from argument vectors, never interpolated into shell
//! strings; the only shell entry point is [`run_shell`], which passes the
//! model-supplied command line to `sh -c` verbatim.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was killed or had no code.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Bytes discarded beyond the output limit (stdout + stderr).
    pub truncated_bytes: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Run an argument vector with a timeout, capturing bounded stdout/stderr.
#[instrument(skip_all, fields(program = argv.first().map(String::as_str).unwrap_or(""), timeout_secs = timeout.as_secs()))]
pub fn run_argv(
    argv: &[String],
    cwd: &Path,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let program = argv
        .first()
        .ok_or_else(|| anyhow!("empty argument vector"))?;
    let mut cmd = Command::new(program);
    cmd.args(&argv[1..]).current_dir(cwd);
    run_command(cmd, timeout, output_limit_bytes)
}

/// Run a command line through `sh -c` with a timeout and bounded output.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs()))]
pub fn run_shell(
    command: &str,
    cwd: &Path,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(cwd);
    run_command(cmd, timeout, output_limit_bytes)
}

fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Drain both pipes concurrently while waiting; reading after wait can
    // deadlock once a pipe buffer fills.
    let stdout_handle = thread::spawn(move || read_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_reader(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_reader(stderr_handle).context("join stderr")?;
    let truncated_bytes = stdout_truncated + stderr_truncated;
    if truncated_bytes > 0 {
        warn!(truncated_bytes, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        truncated_bytes,
        timed_out,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n - keep;
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
