// SPDX-License-Identifier: MIT
//! `git_branch`: create or switch to a git branch.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

#[derive(Default)]
pub struct GitBranchTool;

#[async_trait]
impl Tool for GitBranchTool {
    fn name(&self) -> &str {
        "git_branch"
    }

    fn description(&self) -> &str {
        "Create a new git branch and switch to it (git checkout -b), or \
         switch to an existing branch if `create` is false."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "branch name" },
                "create": { "type": "boolean", "description": "create the branch if it doesn't exist (default true)" },
                "workdir": { "type": "string", "description": "repository directory (optional, defaults to cwd)" }
            },
            "required": ["name"],
            "additionalProperties": false
        })
    }

    fn scope(&self) -> Scope {
        Scope::ExecuteCommands
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let name = match call.args.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `name`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let create = call.args.get("create").and_then(|v| v.as_bool()).unwrap_or(true);
        let workdir = call.args.get("workdir").and_then(|v| v.as_str());

        let mut cmd = Command::new("git");
        cmd.arg("checkout");
        if create {
            cmd.arg("-b");
        }
        cmd.arg(&name);
        if let Some(wd) = workdir {
            cmd.current_dir(wd);
        }

        let duration_ms = t0.elapsed().as_millis() as u64;
        match cmd.output().await {
            Ok(output) if output.status.success() => {
                ToolResult::ok(json!({"branch": name}), format!("switched to branch '{name}'"), duration_ms)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                ToolResult::err(ToolErrorKind::InternalError, format!("git checkout failed: {stderr}"), duration_ms)
            }
            Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("spawn error: {e}"), duration_ms),
        }
    }
}
