//! Conversation history types for one tool-use loop invocation.
//!
//! History is owned by a single task execution and never persisted. The
//! contract with the model service: every tool request in an assistant turn
//! receives exactly one correlated result before the next model call.

use serde_json::Value;

/// One tool invocation requested by the model, still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Opaque correlation token assigned by the model service.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One model turn: optional free text plus zero or more tool requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub requests: Vec<ToolRequest>,
}

/// A tool result paired with its originating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResultMsg {
    pub call_id: String,
    /// Serialized structured result (see `core::tool::render_result`).
    pub content: String,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    User(String),
    Assistant(ModelTurn),
    ToolResults(Vec<ToolResultMsg>),
}
