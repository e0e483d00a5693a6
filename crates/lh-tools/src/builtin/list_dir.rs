// SPDX-License-Identifier: MIT
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List directory contents. depth: default 2, max 5. limit: 100 entries by default.\n\
         Excludes .git/ target/ node_modules/. Directories have trailing /.\n\
         For file pattern search use get_file_tree; for content search use grep_search."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "path to the directory" },
                "depth": { "type": "integer", "description": "maximum recursion depth (default 2, max 5)" },
                "limit": { "type": "integer", "description": "maximum number of entries to return (default 100)" }
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
        let depth = call.args.get("depth").and_then(|v| v.as_u64()).unwrap_or(2).min(5) as usize;
        let limit = call.args.get("limit").and_then(|v| v.as_u64()).unwrap_or(100) as usize;

        debug!(path = %path, depth, limit, "list_directory");

        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_dir() => {}
            Ok(_) => {
                return ToolResult::err(ToolErrorKind::ValidationFailed, format!("not a directory: {path}"), t0.elapsed().as_millis() as u64)
            }
            Err(e) => {
                return ToolResult::err(ToolErrorKind::IoError, format!("cannot access {path}: {e}"), t0.elapsed().as_millis() as u64)
            }
        }

        let mut entries: Vec<String> = Vec::new();
        let mut truncated = false;

        collect_entries(&path, &path, 0, depth, limit, &mut entries, &mut truncated).await;

        let duration_ms = t0.elapsed().as_millis() as u64;
        if entries.is_empty() {
            return ToolResult::ok(json!({"entries": 0}), "(empty directory)", duration_ms);
        }

        let mut output = entries.join("\n");
        if truncated {
            output.push_str(&format!("\n...[output truncated at {} entries]", limit));
        }

        ToolResult::ok(json!({"entries": entries.len()}), output, duration_ms)
    }
}

static EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules", ".svn", "__pycache__", ".mypy_cache"];

fn is_excluded(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

fn relative_path(base: &str, full: &str) -> String {
    if let Some(stripped) = full.strip_prefix(base) {
        stripped.trim_start_matches('/').to_string()
    } else {
        full.to_string()
    }
}

#[async_recursion::async_recursion]
async fn collect_entries(
    base: &str,
    dir: &str,
    current_depth: usize,
    max_depth: usize,
    limit: usize,
    entries: &mut Vec<String>,
    truncated: &mut bool,
) {
    if entries.len() >= limit {
        *truncated = true;
        return;
    }

    let mut rd = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(_) => return,
    };

    let mut children: Vec<(String, bool)> = Vec::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        children.push((name, is_dir));
    }
    children.sort_by(|(a, a_dir), (b, b_dir)| b_dir.cmp(a_dir).then(a.cmp(b)));

    for (name, is_dir) in children {
        if entries.len() >= limit {
            *truncated = true;
            return;
        }
        let full_path = format!("{}/{}", dir.trim_end_matches('/'), name);
        let rel = relative_path(base, &full_path);
        if is_dir {
            entries.push(format!("{}/", rel));
            if current_depth < max_depth && !is_excluded(&name) {
                collect_entries(base, &full_path, current_depth + 1, max_depth, limit, entries, truncated).await;
            }
        } else {
            entries.push(rel);
        }
    }
}
