// SPDX-License-Identifier: MIT
//! `get_file_tree`: a deterministic recursive listing of a directory's
//! structure, independent of any external `find`/`tree` binary.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

static EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules", ".svn", "__pycache__", ".mypy_cache"];

#[derive(Default)]
pub struct GetFileTreeTool;

#[async_trait]
impl Tool for GetFileTreeTool {
    fn name(&self) -> &str {
        "get_file_tree"
    }

    fn description(&self) -> &str {
        "Recursively lists the directory structure under a path as an \
         indented tree, excluding .git/ target/ node_modules/ and similar \
         build artifacts. max_depth defaults to 4 entries: 1000 by default."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "root path to walk" },
                "max_depth": { "type": "integer", "description": "maximum recursion depth (default 4)" },
                "limit": { "type": "integer", "description": "maximum number of entries to return (default 1000)" }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    fn scope(&self) -> Scope {
        Scope::ReadFiles
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
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
        let max_depth = call.args.get("max_depth").and_then(|v| v.as_u64()).unwrap_or(4) as usize;
        let limit = call.args.get("limit").and_then(|v| v.as_u64()).unwrap_or(1000) as usize;

        debug!(path = %path, max_depth, limit, "get_file_tree");

        if tokio::fs::metadata(&path).await.is_err() {
            return ToolResult::err(
                ToolErrorKind::IoError,
                format!("cannot access {path}"),
                t0.elapsed().as_millis() as u64,
            );
        }

        let root = path.clone();
        let (lines, truncated) = tokio::task::spawn_blocking(move || walk(&root, max_depth, limit))
            .await
            .unwrap_or_else(|_| (Vec::new(), false));

        let duration_ms = t0.elapsed().as_millis() as u64;
        if lines.is_empty() {
            return ToolResult::ok(json!({"entries": 0}), "(empty directory)", duration_ms);
        }

        let mut output = lines.join("\n");
        if truncated {
            output.push_str(&format!("\n...[output truncated at {limit} entries]"));
        }
        ToolResult::ok(json!({"entries": lines.len()}), output, duration_ms)
    }
}

fn walk(root: &str, max_depth: usize, limit: usize) -> (Vec<String>, bool) {
    let mut lines = Vec::new();
    let mut truncated = false;

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !EXCLUDED_DIRS.contains(&e.file_name().to_string_lossy().as_ref())
        });

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if entry.depth() == 0 {
            continue;
        }
        if lines.len() >= limit {
            truncated = true;
            break;
        }
        let indent = "  ".repeat(entry.depth() - 1);
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            lines.push(format!("{indent}{name}/"));
        } else {
            lines.push(format!("{indent}{name}"));
        }
    }

    (lines, truncated)
}
