// SPDX-License-Identifier: MIT
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes a file to the local filesystem. This tool will overwrite the existing file if \
         one exists at the provided path. Prefer editing existing files with edit_file. \
         Never write new files unless explicitly required. \
         Creates parent directories automatically. \
         Set append=true to add to the end of an existing file instead of overwriting."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "relative path to the file" },
                "content": { "type": "string", "description": "content to write to the file" },
                "append": {
                    "type": "boolean",
                    "description": "if true, append to existing content instead of overwriting (default false)"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn scope(&self) -> Scope {
        Scope::WriteFiles
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::High
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
        let should_append = call.args.get("append").and_then(|v| v.as_bool()).unwrap_or(false);

        debug!(path = %path, append = should_append, "write_file");

        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
        }

        if should_append {
            use tokio::io::AsyncWriteExt;
            match tokio::fs::OpenOptions::new().append(true).create(true).open(&path).await {
                Ok(mut f) => {
                    let result = f.write_all(content.as_bytes()).await;
                    // File close is async-on-drop in tokio; flush+shutdown explicitly so
                    // bytes reach the OS before the handle goes away.
                    let _ = f.flush().await;
                    let _ = f.shutdown().await;
                    match result {
                        Ok(_) => ToolResult::ok(
                            json!({"path": path, "bytes": content.len()}),
                            format!("appended {} bytes to {path}", content.len()),
                            t0.elapsed().as_millis() as u64,
                        ),
                        Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("write error: {e}"), t0.elapsed().as_millis() as u64),
                    }
                }
                Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("open error: {e}"), t0.elapsed().as_millis() as u64),
            }
        } else {
            match tokio::fs::write(&path, &content).await {
                Ok(_) => ToolResult::ok(
                    json!({"path": path, "bytes": content.len()}),
                    format!("wrote {} bytes to {path}", content.len()),
                    t0.elapsed().as_millis() as u64,
                ),
                Err(e) => ToolResult::err(ToolErrorKind::IoError, format!("write error: {e}"), t0.elapsed().as_millis() as u64),
            }
        }
    }
}
