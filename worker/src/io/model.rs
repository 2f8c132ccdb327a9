//! Model service client.
//!
//! [`ModelClient`] is the seam the task loop depends on; tests substitute
//! scripted implementations. [`AnthropicClient`] talks to the Anthropic
//! Messages API over blocking HTTP. Request assembly and response parsing are
//! pure functions so the wire format is testable without a network.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::core::chat::{ModelTurn, ToolRequest, Turn};
use crate::core::tool::ToolSpec;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// One round trip to the model service.
pub trait ModelClient {
    fn complete(&self, system: &str, tools: &[ToolSpec], turns: &[Turn]) -> Result<ModelTurn>;
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Build a client, reading the API key from `ANTHROPIC_API_KEY`.
    pub fn from_env(model: &str, max_tokens: u32) -> Result<Self> {
        let api_key = env::var(API_KEY_VAR)
            .with_context(|| format!("{API_KEY_VAR} environment variable is not set"))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            max_tokens,
        })
    }
}

impl ModelClient for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model, turns = turns.len()))]
    fn complete(&self, system: &str, tools: &[ToolSpec], turns: &[Turn]) -> Result<ModelTurn> {
        let body = build_request(&self.model, self.max_tokens, system, tools, turns);
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .context("send model request")?;

        let status = response.status();
        let payload: Value = response.json().context("decode model response")?;
        if !status.is_success() {
            let detail = payload["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(anyhow!("model service returned {status}: {detail}"));
        }
        let turn = parse_response(&payload)?;
        debug!(requests = turn.requests.len(), "model turn received");
        Ok(turn)
    }
}

/// Assemble a Messages API request body (pure).
fn build_request(
    model: &str,
    max_tokens: u32,
    system: &str,
    tools: &[ToolSpec],
    turns: &[Turn],
) -> Value {
    let tools: Vec<Value> = tools
        .iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "input_schema": spec.input_schema,
            })
        })
        .collect();

    let messages: Vec<Value> = turns.iter().map(turn_to_message).collect();

    json!({
        "model": model,
        "max_tokens": max_tokens,
        "system": system,
        "tools": tools,
        "messages": messages,
    })
}

fn turn_to_message(turn: &Turn) -> Value {
    match turn {
        Turn::User(text) => json!({ "role": "user", "content": text }),
        Turn::Assistant(model_turn) => {
            let mut blocks = Vec::new();
            if let Some(text) = &model_turn.text {
                blocks.push(json!({ "type": "text", "text": text }));
            }
            for request in &model_turn.requests {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": request.id,
                    "name": request.name,
                    "input": request.arguments,
                }));
            }
            json!({ "role": "assistant", "content": blocks })
        }
        Turn::ToolResults(results) => {
            let blocks: Vec<Value> = results
                .iter()
                .map(|result| {
                    json!({
                        "type": "tool_result",
                        "tool_use_id": result.call_id,
                        "content": result.content,
                    })
                })
                .collect();
            json!({ "role": "user", "content": blocks })
        }
    }
}

/// Parse a Messages API response body into a model turn (pure).
fn parse_response(payload: &Value) -> Result<ModelTurn> {
    let content = payload["content"]
        .as_array()
        .ok_or_else(|| anyhow!("model response missing content array"))?;

    let mut text_parts = Vec::new();
    let mut requests = Vec::new();
    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(text) = block["text"].as_str() {
                    text_parts.push(text.to_string());
                }
            }
            Some("tool_use") => {
                let id = block["id"]
                    .as_str()
                    .ok_or_else(|| anyhow!("tool_use block missing id"))?;
                let name = block["name"]
                    .as_str()
                    .ok_or_else(|| anyhow!("tool_use block missing name"))?;
                requests.push(ToolRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: block["input"].clone(),
                });
            }
            other => {
                debug!(block_type = ?other, "ignoring unrecognized content block");
            }
        }
    }

    let text = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };
    Ok(ModelTurn { text, requests })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::ToolResultMsg;
    use crate::core::tool::tool_specs;

    #[test]
    fn request_carries_system_tools_and_messages() {
        let turns = vec![
            Turn::User("do the task".to_string()),
            Turn::Assistant(ModelTurn {
                text: Some("on it".to_string()),
                requests: vec![ToolRequest {
                    id: "toolu_1".to_string(),
                    name: "bash".to_string(),
                    arguments: json!({ "command": "ls" }),
                }],
            }),
            Turn::ToolResults(vec![ToolResultMsg {
                call_id: "toolu_1".to_string(),
                content: "{\"success\":true}".to_string(),
            }]),
        ];
        let body = build_request("claude-sonnet-4-20250514", 4096, "system text", tool_specs(), &turns);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["system"], "system text");
        assert_eq!(body["tools"].as_array().map(Vec::len), Some(11));
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[1]["content"][1]["id"], "toolu_1");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let payload = json!({
            "content": [
                { "type": "text", "text": "I'll read the file first." },
                {
                    "type": "tool_use",
                    "id": "toolu_42",
                    "name": "read_file",
                    "input": { "path": "README.md" }
                }
            ],
            "stop_reason": "tool_use"
        });
        let turn = parse_response(&payload).expect("parse");
        assert_eq!(turn.text.as_deref(), Some("I'll read the file first."));
        assert_eq!(turn.requests.len(), 1);
        assert_eq!(turn.requests[0].name, "read_file");
        assert_eq!(turn.requests[0].arguments["path"], "README.md");
    }

    #[test]
    fn text_only_response_has_no_requests() {
        let payload = json!({
            "content": [{ "type": "text", "text": "All done." }],
            "stop_reason": "end_turn"
        });
        let turn = parse_response(&payload).expect("parse");
        assert_eq!(turn.text.as_deref(), Some("All done."));
        assert!(turn.requests.is_empty());
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(parse_response(&json!({ "error": "nope" })).is_err());
    }
}
