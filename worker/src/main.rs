//! Checklist-driven workspace worker daemon.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use worker::core::workspace::WorkspaceProfile;
use worker::daemon::{CycleOutcome, run_cycle, run_daemon};
use worker::io::config::{config_path, load_config};
use worker::io::model::AnthropicClient;
use worker::io::tasklist::TaskList;
use worker::logging;

#[derive(Parser)]
#[command(
    name = "worker",
    version,
    about = "Polls a workspace task list and drives tasks through a model tool-use loop"
)]
struct Cli {
    /// Workspace root (defaults to the current directory).
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the task list forever, executing pending tasks as they appear.
    Run,
    /// Execute at most one pending task, then exit.
    Once,
    /// Print the detected workspace profile as JSON.
    Detect,
    /// List pending tasks.
    Tasks,
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
    let root = cli.workspace.canonicalize().unwrap_or(cli.workspace);

    match cli.command {
        Command::Run => {
            let config = load_config(&config_path(&root))?;
            let model = AnthropicClient::from_env(&config.model, config.max_tokens)?;
            run_daemon(&root, &config, &model)
        }
        Command::Once => {
            let config = load_config(&config_path(&root))?;
            let model = AnthropicClient::from_env(&config.model, config.max_tokens)?;
            match run_cycle(&root, &config, &model)? {
                CycleOutcome::Idle => println!("no pending tasks"),
                CycleOutcome::Completed { task } => println!("completed: {task}"),
                CycleOutcome::Failed { task, error } => println!("failed: {task} ({error})"),
            }
            Ok(())
        }
        Command::Detect => {
            let profile = WorkspaceProfile::detect(&root);
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Command::Tasks => {
            for task in TaskList::new(&root).load()? {
                println!("{}", task.text);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let cli = Cli::parse_from(["worker", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.workspace, PathBuf::from("."));
    }

    #[test]
    fn parse_once_with_workspace() {
        let cli = Cli::parse_from(["worker", "--workspace", "/tmp/ws", "once"]);
        assert!(matches!(cli.command, Command::Once));
        assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
    }
}
