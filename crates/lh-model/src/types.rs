// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Role of a message in the conversation history.
///
/// `DisplayOnlyData` never reaches the provider — see
/// [`Message::is_serializable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    DisplayOnlyData,
}

/// A tool call requested by the assistant.
///
/// `arguments` is the raw JSON-encoded argument object as the model emitted
/// it — tools parse it themselves rather than the engine pre-validating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "tool_call_type")]
    pub call_type: String,
    pub name: String,
    pub arguments: String,
}

fn tool_call_type() -> String {
    "function".into()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self { id: id.into(), call_type: tool_call_type(), name: name.into(), arguments: arguments.into() }
    }
}

/// An embedded permission-request, attached transiently to a synthetic
/// system message for rendering only — never serialized to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionRequestView {
    pub tool_call_id: String,
    pub tool_name: String,
    pub preview: Option<String>,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Model's reasoning trace, when `enable_thinking` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Tool calls produced by this (assistant) message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present iff `role == Tool`: correlates to the originating tool call id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Rendering-only permission request; cleared once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_request: Option<PermissionRequestView>,
    pub timestamp_ms: u64,
}

impl Message {
    pub fn system(content: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            thinking: None,
            tool_calls: None,
            tool_call_id: None,
            permission_request: None,
            timestamp_ms,
        }
    }

    pub fn user(content: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            thinking: None,
            tool_calls: None,
            tool_call_id: None,
            permission_request: None,
            timestamp_ms,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            thinking: None,
            tool_calls: None,
            tool_call_id: None,
            permission_request: None,
            timestamp_ms,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            thinking: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            permission_request: None,
            timestamp_ms,
        }
    }

    /// `display_only_data` messages are never serialized to the provider.
    pub fn is_serializable(&self) -> bool {
        self.role != Role::DisplayOnlyData
    }

    /// Approximate token count, 4-chars-per-token heuristic, used for
    /// context management. Matches the provider-agnostic estimate the
    /// master loop uses before a provider reports real usage.
    pub fn approx_tokens(&self) -> usize {
        let mut chars = self.content.len();
        if let Some(t) = &self.thinking {
            chars += t.len();
        }
        if let Some(calls) = &self.tool_calls {
            chars += calls.iter().map(|c| c.name.len() + c.arguments.len()).sum::<usize>();
        }
        (chars / 4).max(1)
    }
}

/// A tool schema advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    pub think: bool,
    pub keep_alive: Option<String>,
    pub num_ctx: Option<u32>,
    pub num_predict: Option<u32>,
    pub temperature: Option<f32>,
    pub repeat_penalty: Option<f32>,
}

/// A single streamed event from the model.
///
/// Chunk callback ordering: deltas arrive in arrival order;
/// `Done` is delivered exactly once after the last payload, including
/// after an `Error` (errors are also reported out-of-band via the
/// `complete()` return value, but the stream itself always runs to `Done`).
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEvent {
    TextDelta(String),
    ThinkingDelta(String),
    /// Fully consolidated tool calls for this turn. LM-Studio reassembles
    /// per-index deltas before emitting this; Ollama's tool calls already
    /// arrive whole and are wrapped directly.
    ToolCalls(Vec<ToolCall>),
    Usage(Usage),
    Done,
    Error(String),
}

/// Token usage from one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Lightweight per-turn audit trail, distinct from the full `Message` list,
/// used for the session summary shown on quit.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub role: Role,
    pub content_len: usize,
    pub tool_call_count: usize,
    pub timestamp_ms: u64,
}
