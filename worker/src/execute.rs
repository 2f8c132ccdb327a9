//! The bounded tool-use loop that drives one task to completion.
//!
//! Each iteration is one model round trip. The model either requests tools
//! (each request gets exactly one correlated result before the next call) or
//! ends its turn. A task ends one of four ways: the model stops requesting
//! tools, the model calls `complete_task`, the model service errors, or the
//! iteration budget runs out.

use tracing::{debug, info, instrument, warn};

use crate::core::chat::{ModelTurn, ToolResultMsg, Turn};
use crate::core::task::Task;
use crate::core::tool::{ToolCall, ToolPayload, render_result, tool_specs};
use crate::io::model::ModelClient;
use crate::io::tasklist::TaskList;
use crate::io::tools::ToolExecutor;

/// How a task execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStop {
    /// The model ended its turn without requesting tools.
    NaturalEnd,
    /// The model called `complete_task`.
    ExplicitComplete,
    /// The model service failed; the task is abandoned for this cycle.
    ApiError(String),
    /// The iteration budget ran out before the model finished.
    BudgetExhausted,
}

impl TaskStop {
    /// Whether the task counts as completed.
    pub fn success(&self) -> bool {
        matches!(self, TaskStop::NaturalEnd | TaskStop::ExplicitComplete)
    }

    /// The failure message for record keeping, when not a success.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            TaskStop::NaturalEnd | TaskStop::ExplicitComplete => None,
            TaskStop::ApiError(detail) => Some(format!("model service error: {detail}")),
            TaskStop::BudgetExhausted => Some("iteration budget exhausted".to_string()),
        }
    }
}

/// Result of one task execution.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub stop: TaskStop,
    /// Model round trips consumed.
    pub iterations: u32,
    /// Model-supplied summary, when completion was explicit.
    pub summary: Option<String>,
}

/// Run one task through the tool-use loop.
///
/// On success the task line is flipped to done before returning; explicit
/// completion flips it as soon as `complete_task` is seen, so a crash later
/// in the same turn cannot lose the completion.
#[instrument(skip_all, fields(task = %task.text))]
pub fn execute_task(
    model: &dyn ModelClient,
    executor: &ToolExecutor,
    tasklist: &TaskList,
    task: &Task,
    system: &str,
    max_iterations: u32,
) -> TaskOutcome {
    let mut turns = vec![Turn::User(format!("Complete this task: {}", task.text))];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        debug!(iteration = iterations, "model round trip");

        let turn = match model.complete(system, tool_specs(), &turns) {
            Ok(turn) => turn,
            Err(err) => {
                warn!(err = %err, "model call failed, abandoning task");
                return TaskOutcome {
                    stop: TaskStop::ApiError(err.to_string()),
                    iterations,
                    summary: None,
                };
            }
        };

        if turn.requests.is_empty() {
            info!(iterations, "task ended naturally");
            tasklist.mark_complete(task);
            return TaskOutcome {
                stop: TaskStop::NaturalEnd,
                iterations,
                summary: turn.text,
            };
        }

        let (results, completion) = run_requests(&turn, executor, tasklist, task);
        turns.push(Turn::Assistant(turn));
        turns.push(Turn::ToolResults(results));

        if let Some(summary) = completion {
            info!(iterations, "task completed explicitly");
            return TaskOutcome {
                stop: TaskStop::ExplicitComplete,
                iterations,
                summary: Some(summary),
            };
        }
    }

    warn!(max_iterations, "iteration budget exhausted");
    TaskOutcome {
        stop: TaskStop::BudgetExhausted,
        iterations,
        summary: None,
    }
}

/// Execute every request in a model turn, in order.
///
/// `complete_task` is intercepted: the task line is flipped immediately and a
/// synthetic acknowledgement is recorded, but remaining requests in the same
/// turn still run so every request keeps its correlated result.
fn run_requests(
    turn: &ModelTurn,
    executor: &ToolExecutor,
    tasklist: &TaskList,
    task: &Task,
) -> (Vec<ToolResultMsg>, Option<String>) {
    let mut results = Vec::with_capacity(turn.requests.len());
    let mut completion = None;

    for request in &turn.requests {
        let result = match ToolCall::parse(&request.name, &request.arguments) {
            Ok(ToolCall::CompleteTask { summary }) => {
                if completion.is_none() {
                    tasklist.mark_complete(task);
                    completion = Some(summary.clone());
                }
                Ok(ToolPayload::Completed { summary })
            }
            Ok(call) => executor.execute(&call),
            Err(err) => {
                debug!(tool = %request.name, kind = err.kind.as_str(), "rejected tool request");
                Err(err)
            }
        };
        results.push(ToolResultMsg {
            call_id: request.id.clone(),
            content: render_result(&result),
        });
    }

    (results, completion)
}
