// SPDX-License-Identifier: Apache-2.0
//! Events streamed out of the master loop so a front end can render a turn
//! as it happens without owning any of the engine's state.

use lh_model::ToolCall;
use lh_tools::{PermissionEvaluation, TodoItem};

/// One event emitted while the master loop resolves a single user prompt.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A content delta streamed from the model.
    TextDelta(String),
    /// A thinking/reasoning delta streamed from the model.
    ThinkingDelta(String),
    /// The current streaming turn finished accumulating text; the thinking
    /// block should auto-collapse in the UI.
    TurnTextComplete { content: String, thinking: Option<String> },
    /// The model requested a tool call.
    ToolCallStarted(ToolCall),
    /// A tool call finished executing.
    ToolCallFinished { call_id: String, tool_name: String, display_content: String, success: bool },
    /// A permission prompt is pending; the driver must resolve it before the
    /// executor can continue.
    PermissionRequested { tool_call: ToolCall, evaluation: PermissionEvaluation },
    /// The todo list was updated by the `todo_write` tool.
    TodoUpdate(Vec<TodoItem>),
    /// A system notice was appended (depth/iteration ceiling, compaction, …).
    SystemNotice(String),
    /// One queued file is awaiting a secondary-loop disposition choice.
    SecondaryLoopFileReady { path: String, preview: String },
    /// The secondary loop has disposed of every queued file.
    SecondaryLoopComplete,
    /// The whole user-prompt resolution finished with no pending tool calls.
    Done,
    /// A recoverable error occurred; the turn ends but the session continues.
    Error(String),
    /// A thinking/content/tool-call/iteration update from a running
    /// sub-agent (`run_agent` dispatch or the file curator), so the driver
    /// can show curation and nested-agent progress in real time instead of
    /// it being swallowed by the sub-agent's own drain loop.
    SubAgentProgress { agent_name: String, event: SubAgentProgress },
}

/// Progress callback events forwarded out of a sub-agent run.
#[derive(Debug, Clone)]
pub enum SubAgentProgress {
    Thinking(String),
    Content(String),
    ToolCall(ToolCall),
    Iteration(usize),
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_event_is_cloneable() {
        let e = AgentEvent::TextDelta("hi".into());
        let _ = e.clone();
    }

    #[test]
    fn subagent_progress_variants_are_distinct() {
        let a = SubAgentProgress::Iteration(1);
        let b = SubAgentProgress::Iteration(2);
        match (a, b) {
            (SubAgentProgress::Iteration(x), SubAgentProgress::Iteration(y)) => assert_ne!(x, y),
            _ => unreachable!(),
        }
    }
}
