// SPDX-License-Identifier: MIT
//! `run_agent`: dispatches a task to a named sub-agent.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatch::AgentDispatcher;
use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

pub struct RunAgentTool {
    dispatcher: Arc<dyn AgentDispatcher>,
}

impl RunAgentTool {
    pub fn new(dispatcher: Arc<dyn AgentDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for RunAgentTool {
    fn name(&self) -> &str {
        "run_agent"
    }

    fn description(&self) -> &str {
        "Delegate a task to a named sub-agent, running an isolated agentic loop \
         against its own tool allow-list. Use `list_agents` to see what's available."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_name": { "type": "string", "description": "name of the sub-agent to run" },
                "task": { "type": "string", "description": "the task to hand the sub-agent" }
            },
            "required": ["agent_name", "task"]
        })
    }

    fn scope(&self) -> Scope {
        Scope::TaskManagement
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let agent_name = match call.args.get("agent_name").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => return ToolResult::err(ToolErrorKind::ValidationFailed, "missing required parameter `agent_name`", t0.elapsed().as_millis() as u64),
        };
        let task = match call.args.get("task").and_then(Value::as_str) {
            Some(s) => s.to_string(),
            None => return ToolResult::err(ToolErrorKind::ValidationFailed, "missing required parameter `task`", t0.elapsed().as_millis() as u64),
        };

        let outcome = self.dispatcher.run_agent(&agent_name, &task).await;
        let elapsed = t0.elapsed().as_millis() as u64;

        if !outcome.success {
            return ToolResult::err(ToolErrorKind::InternalError, outcome.error.unwrap_or_else(|| "sub-agent run failed".to_string()), elapsed);
        }

        let display = format!("Agent `{agent_name}` finished:\n{}", outcome.content);
        ToolResult::ok(json!({"agent_name": agent_name, "content": outcome.content}), display, elapsed)
    }
}
