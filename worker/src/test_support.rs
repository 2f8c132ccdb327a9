//! Test-only helpers for scripting model behavior.

use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::chat::{ModelTurn, ToolRequest, Turn};
use crate::core::tool::ToolSpec;
use crate::io::model::ModelClient;

/// A model client that replays a fixed sequence of turns.
///
/// Once the script is exhausted, further calls return a turn with no tool
/// requests, which the loop treats as a natural end.
pub struct ScriptedModel {
    turns: Mutex<Vec<ModelTurn>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        let mut turns = turns;
        turns.reverse();
        Self {
            turns: Mutex::new(turns),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of completed model calls, with the tool-result count each call saw.
    pub fn observed_result_counts(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn complete(&self, _system: &str, _tools: &[ToolSpec], turns: &[Turn]) -> Result<ModelTurn> {
        let results_seen = turns
            .iter()
            .filter_map(|turn| match turn {
                Turn::ToolResults(results) => Some(results.len()),
                _ => None,
            })
            .last()
            .unwrap_or(0);
        self.calls.lock().unwrap().push(results_seen);
        Ok(self.turns.lock().unwrap().pop().unwrap_or_default())
    }
}

/// A model client whose every call fails, for service-error paths.
pub struct FailingModel;

impl ModelClient for FailingModel {
    fn complete(&self, _system: &str, _tools: &[ToolSpec], _turns: &[Turn]) -> Result<ModelTurn> {
        Err(anyhow!("model service returned 500: overloaded"))
    }
}

/// A turn that requests one tool.
pub fn tool_turn(id: &str, name: &str, arguments: Value) -> ModelTurn {
    ModelTurn {
        text: None,
        requests: vec![ToolRequest {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }],
    }
}

/// A turn with free text and no tool requests.
pub fn text_turn(text: &str) -> ModelTurn {
    ModelTurn {
        text: Some(text.to_string()),
        requests: Vec::new(),
    }
}
