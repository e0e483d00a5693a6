// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scope::{RiskLevel, Scope};

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim)
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments
    pub args: Value,
}

/// Closed set of failure categories a tool can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    ValidationFailed,
    ParseError,
    NotFound,
    IoError,
    PermissionDenied,
    InternalError,
}

/// The result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    /// Machine-readable payload, serialized into the `tool` role message.
    pub data: Option<Value>,
    pub error_kind: Option<ToolErrorKind>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    /// Human-readable transcript rendered into the `system` display message.
    pub display_content: String,
    pub thinking: Option<String>,
}

impl ToolResult {
    pub fn ok(data: impl Into<Value>, display_content: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error_kind: None,
            error_message: None,
            duration_ms,
            display_content: display_content.into(),
            thinking: None,
        }
    }

    pub fn err(kind: ToolErrorKind, message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            error_kind: Some(kind),
            error_message: Some(message.clone()),
            duration_ms,
            display_content: message,
            thinking: None,
        }
    }

    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        self.thinking = Some(thinking.into());
        self
    }
}

/// Describes the shape of a tool's text output for context-aware truncation.
///
/// When a tool result exceeds the configured token cap, `lh-core` uses this
/// category to pick the right extraction strategy. Each tool declares its
/// own category; `lh-core` never hard-codes tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputCategory {
    /// Terminal / process output: keep the first 60 + last 40 lines so both
    /// the command preamble and the final result are visible.
    /// Suitable for: shell, run_terminal_command.
    HeadTail,
    /// Ordered match list: keep the leading matches so the model sees the
    /// highest-relevance results first.
    /// Suitable for: grep_search.
    MatchList,
    /// File content: keep a head and tail window with a separator so the
    /// model sees both the top of the file (imports, declarations) and the
    /// end (recent changes).
    /// Suitable for: read_file.
    FileContent,
    /// Generic text: hard-truncate at the character boundary.
    /// Used for all tools that do not fit the categories above.
    #[default]
    Generic,
}

/// Trait that every built-in tool must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;
    /// Permission scope this tool requires.
    fn scope(&self) -> Scope;
    /// Risk level used to decide whether a permission prompt shows a preview.
    fn risk_level(&self) -> RiskLevel;
    /// Describes the shape of this tool's output for context-aware truncation.
    ///
    /// Override this when your tool produces output whose leading or trailing
    /// portion is more useful than a hard cut. The default is
    /// [`OutputCategory::Generic`] (hard truncation).
    fn output_category(&self) -> OutputCategory {
        OutputCategory::Generic
    }
    /// Execute the tool against an already-parsed call.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
