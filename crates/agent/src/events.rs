//! The typed record the Agent Loop emits to whatever is driving it — a
//! CLI render loop today, potentially a richer UI later.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A pending confirmable write, surfaced to the UI before the tool
/// blocks on a verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfirmation {
    pub path: String,
    pub proposed_content: String,
    pub original_content: Option<String>,
    pub diff: String,
}

/// Counter snapshot emitted right after an `observation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool_name: String,
    pub calls_made: u32,
    pub calls_limit: u32,
    pub total_calls: u32,
    pub total_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    Thinking,
    Streaming { content: String },
    ToolCall { name: String, tool_args: String },
    Observation { content: String, success: bool },
    ToolUsage(ToolUsage),
    Answer { content: String },
    Error { content: String },
    ConfirmationRequired(FileConfirmation),
}

impl AgentEvent {
    pub fn streaming(content: impl Into<String>) -> Self {
        AgentEvent::Streaming { content: content.into() }
    }

    pub fn tool_call(name: impl Into<String>, args: &Value) -> Self {
        AgentEvent::ToolCall { name: name.into(), tool_args: args.to_string() }
    }

    pub fn observation(content: impl Into<String>, success: bool) -> Self {
        AgentEvent::Observation { content: content.into(), success }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        AgentEvent::Answer { content: content.into() }
    }

    pub fn error(content: impl Into<String>) -> Self {
        AgentEvent::Error { content: content.into() }
    }
}
