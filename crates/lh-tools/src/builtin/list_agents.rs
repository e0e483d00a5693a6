// SPDX-License-Identifier: MIT
//! `list_agents`: enumerates the agents `run_agent` can dispatch to.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatch::AgentDispatcher;
use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolResult};

pub struct ListAgentsTool {
    dispatcher: Arc<dyn AgentDispatcher>,
}

impl ListAgentsTool {
    pub fn new(dispatcher: Arc<dyn AgentDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for ListAgentsTool {
    fn name(&self) -> &str {
        "list_agents"
    }

    fn description(&self) -> &str {
        "List the sub-agents available to `run_agent`, with their names and descriptions."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn scope(&self) -> Scope {
        Scope::TaskManagement
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    async fn execute(&self, _call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let agents = self.dispatcher.list_agents();
        let display = if agents.is_empty() {
            "No agents registered.".to_string()
        } else {
            agents.iter().map(|a| format!("- {}: {}", a.name, a.description)).collect::<Vec<_>>().join("\n")
        };
        ToolResult::ok(json!({"agents": agents}), display, t0.elapsed().as_millis() as u64)
    }
}
