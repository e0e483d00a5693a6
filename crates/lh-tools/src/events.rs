// SPDX-License-Identifier: MIT
//! Events emitted by tools that mutate shared application state. `Tool::execute`
//! takes `&self`, so state-mutating tools (e.g. `todo_write`) emit an event
//! over a channel rather than mutating state directly; the master loop applies
//! the event to its own state.

use serde::{Deserialize, Serialize};

/// Closed set of todo-item lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// A structured todo item managed by the `todo_write`/`todo_read` tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
}

/// Events emitted by tools to communicate state changes back to the agent loop.
#[derive(Debug)]
pub enum ToolEvent {
    TodoUpdate(Vec<TodoItem>),
}
