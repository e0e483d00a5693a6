// SPDX-License-Identifier: MIT
//! `git_commit`: stage and commit changes.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

#[derive(Default)]
pub struct GitCommitTool;

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Stage all tracked changes (git add -A) and commit them with the \
         given message. Fails if there is nothing to commit."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "commit message" },
                "workdir": { "type": "string", "description": "repository directory (optional, defaults to cwd)" }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    fn scope(&self) -> Scope {
        Scope::ExecuteCommands
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let message = match call.args.get("message").and_then(|v| v.as_str()) {
            Some(m) => m.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `message`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };

        let workdir = call.args.get("workdir").and_then(|v| v.as_str());

        let mut add_cmd = Command::new("git");
        add_cmd.args(["add", "-A"]);
        if let Some(wd) = workdir {
            add_cmd.current_dir(wd);
        }
        if let Err(e) = add_cmd.output().await {
            return ToolResult::err(ToolErrorKind::IoError, format!("git add failed: {e}"), t0.elapsed().as_millis() as u64);
        }

        let mut commit_cmd = Command::new("git");
        commit_cmd.args(["commit", "-m", &message]);
        if let Some(wd) = workdir {
            commit_cmd.current_dir(wd);
        }

        let duration_ms = t0.elapsed().as_millis() as u64;
        match commit_cmd.output().await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                ToolResult::ok(json!({"message": message}), stdout, duration_ms)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                ToolResult::err(ToolErrorKind::InternalError, format!("git commit failed: {stderr}"), duration_ms)
            }
            Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("spawn error: {e}"), duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).output().unwrap();
        std::process::Command::new("git")
            .args(["config", "user.email", "a@b.c"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        std::process::Command::new("git")
            .args(["config", "user.name", "tester"])
            .current_dir(dir.path())
            .output()
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn commits_staged_changes() {
        let dir = init_repo();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();

        let tool = GitCommitTool;
        let call = ToolCall {
            id: "1".into(),
            name: "git_commit".into(),
            args: json!({"message": "first commit", "workdir": dir.path().to_str().unwrap()}),
        };
        let res = tool.execute(&call).await;
        assert!(res.success, "{}", res.display_content);
    }

    #[tokio::test]
    async fn missing_message_errors() {
        let tool = GitCommitTool;
        let call = ToolCall { id: "1".into(), name: "git_commit".into(), args: json!({}) };
        let res = tool.execute(&call).await;
        assert!(!res.success);
        assert_eq!(res.error_kind, Some(ToolErrorKind::ValidationFailed));
    }
}
