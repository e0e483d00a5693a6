// SPDX-License-Identifier: MIT
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::events::TodoItem;
use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolResult};

pub struct TodoReadTool {
    todos: Arc<Mutex<Vec<TodoItem>>>,
}

impl TodoReadTool {
    pub fn new(todos: Arc<Mutex<Vec<TodoItem>>>) -> Self {
        Self { todos }
    }
}

#[async_trait]
impl Tool for TodoReadTool {
    fn name(&self) -> &str {
        "todo_read"
    }

    fn description(&self) -> &str {
        "Reads the current structured task list for this session. Use this to \
         check progress before deciding what to work on next, especially \
         after a compaction or at the start of a long task."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {}, "additionalProperties": false })
    }

    fn scope(&self) -> Scope {
        Scope::TodoManagement
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    async fn execute(&self, _call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let items = self.todos.lock().await.clone();
        let display = if items.is_empty() {
            "No todos.".to_string()
        } else {
            items
                .iter()
                .map(|t| format!("[{}] {:?}: {}", t.id, t.status, t.content))
                .collect::<Vec<_>>()
                .join("\n")
        };
        ToolResult::ok(json!({ "todos": items }), display, t0.elapsed().as_millis() as u64)
    }
}
