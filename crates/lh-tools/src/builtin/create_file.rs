// SPDX-License-Identifier: MIT
//! `create_file`: like `write_file` but refuses to overwrite an existing file.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

#[derive(Default)]
pub struct CreateFileTool;

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Creates a new file with the given content. Fails if a file already \
         exists at the path; use write_file or edit_file to modify an \
         existing file. Creates parent directories automatically."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"]
        })
    }

    fn scope(&self) -> Scope {
        Scope::WriteFiles
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let t0 = Instant::now();
        let path = match call.args.get("path").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `path`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let content = match call.args.get("content").and_then(|v| v.as_str()) {
            Some(c) => c.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `content`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };

        if tokio::fs::metadata(&path).await.is_ok() {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("{path} already exists; use write_file or edit_file instead"),
                t0.elapsed().as_millis() as u64,
            );
        }

        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return ToolResult::err(
                        ToolErrorKind::IoError,
                        format!("cannot create parent directories for {path}: {e}"),
                        t0.elapsed().as_millis() as u64,
                    );
                }
            }
        }

        match tokio::fs::write(&path, &content).await {
            Ok(_) => ToolResult::ok(
                json!({"path": path, "bytes": content.len()}),
                format!("created {path} ({} bytes)", content.len()),
                t0.elapsed().as_millis() as u64,
            ),
            Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("write error: {e}"), t0.elapsed().as_millis() as u64),
        }
    }
}
