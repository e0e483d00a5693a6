// SPDX-License-Identifier: MIT
//! `read_lines`: read an explicit, caller-chosen line range without going
//! through the curation pipeline.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::scope::{RiskLevel, Scope};
use crate::tool::{OutputCategory, Tool, ToolCall, ToolErrorKind, ToolResult};

fn reject_path(path: &str) -> Result<(), String> {
    let p = std::path::Path::new(path);
    if p.is_absolute() {
        return Err(format!("absolute paths are not allowed: {path}"));
    }
    if p.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(format!("path escapes the working directory: {path}"));
    }
    Ok(())
}

#[derive(Default)]
pub struct ReadLinesTool;

#[async_trait]
impl Tool for ReadLinesTool {
    fn name(&self) -> &str {
        "read_lines"
    }

    fn description(&self) -> &str {
        "Read a specific 1-indexed, inclusive line range from a file. \
         Use this when you already know which lines you need and want to \
         bypass the curation pipeline used by `read_file` for large files."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "start": { "type": "integer", "minimum": 1 },
                "end": { "type": "integer", "minimum": 1 }
            },
            "required": ["path", "start", "end"]
        })
    }

    fn scope(&self) -> Scope {
        Scope::WriteFiles
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn output_category(&self) -> OutputCategory {
        OutputCategory::FileContent
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let start_time = Instant::now();
        let path = match call.args.get("path").and_then(Value::as_str) {
            Some(p) => p.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `path`",
                    start_time.elapsed().as_millis() as u64,
                )
            }
        };
        let start_line = match call.args.get("start").and_then(Value::as_u64) {
            Some(s) => s as usize,
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `start`",
                    start_time.elapsed().as_millis() as u64,
                )
            }
        };
        let end_line = match call.args.get("end").and_then(Value::as_u64) {
            Some(e) => e as usize,
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `end`",
                    start_time.elapsed().as_millis() as u64,
                )
            }
        };

        if let Err(msg) = reject_path(&path) {
            return ToolResult::err(ToolErrorKind::ValidationFailed, msg, start_time.elapsed().as_millis() as u64);
        }
        if start_line == 0 || end_line < start_line {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("invalid range {start_line}..{end_line}"),
                start_time.elapsed().as_millis() as u64,
            );
        }

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(b) => b,
            Err(e) => {
                return ToolResult::err(
                    ToolErrorKind::IoError,
                    format!("cannot read {path}: {e}"),
                    start_time.elapsed().as_millis() as u64,
                )
            }
        };

        let lines: Vec<&str> = body.lines().collect();
        let end = end_line.min(lines.len());
        if start_line > lines.len() {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("start line {start_line} is past end of file ({} lines)", lines.len()),
                start_time.elapsed().as_millis() as u64,
            );
        }

        let rendered: String = lines[start_line - 1..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>5}\t{}", start_line + i, line))
            .collect::<Vec<_>>()
            .join("\n");

        let display = format!("```\n{rendered}\n```");
        ToolResult::ok(
            json!({ "path": path, "start": start_line, "end": end }),
            display,
            start_time.elapsed().as_millis() as u64,
        )
    }
}
