// SPDX-License-Identifier: MIT
//! `replace_lines`: overwrite a 1-indexed, inclusive line range with new
//! content. A coarser-grained sibling of `edit_file`'s unified
//! hunk format, useful when the caller already knows the exact range.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::scope::{RiskLevel, Scope};
use crate::tool::{Tool, ToolCall, ToolErrorKind, ToolResult};

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
pub struct ReplaceLinesTool;

#[async_trait]
impl Tool for ReplaceLinesTool {
    fn name(&self) -> &str {
        "replace_lines"
    }

    fn description(&self) -> &str {
        "Replace a 1-indexed, inclusive line range in a file with new content. \
         The new content may contain a different number of lines than the \
         range it replaces. Prefer `edit_file`'s unified-diff hunks for \
         surgical, context-anchored edits; use this when you already know \
         the exact line numbers to overwrite."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "start": { "type": "integer", "minimum": 1 },
                "end": { "type": "integer", "minimum": 1 },
                "content": { "type": "string" }
            },
            "required": ["path", "start", "end", "content"]
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
        let path = match call.args.get("path").and_then(Value::as_str) {
            Some(p) => p.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `path`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let start_line = match call.args.get("start").and_then(Value::as_u64) {
            Some(s) => s as usize,
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `start`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let end_line = match call.args.get("end").and_then(Value::as_u64) {
            Some(e) => e as usize,
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `end`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let content = match call.args.get("content").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `content`",
                    t0.elapsed().as_millis() as u64,
                )
            }
        };

        if let Err(msg) = reject_path(&path) {
            return ToolResult::err(ToolErrorKind::ValidationFailed, msg, t0.elapsed().as_millis() as u64);
        }
        if start_line == 0 || end_line < start_line {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("invalid range {start_line}..{end_line}"),
                t0.elapsed().as_millis() as u64,
            );
        }

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(b) => b,
            Err(e) => {
                return ToolResult::err(
                    ToolErrorKind::IoError,
                    format!("cannot read {path}: {e}"),
                    t0.elapsed().as_millis() as u64,
                )
            }
        };
        let mut lines: Vec<&str> = body.lines().collect();
        if start_line > lines.len() + 1 {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("start line {start_line} is past end of file ({} lines)", lines.len()),
                t0.elapsed().as_millis() as u64,
            );
        }
        let end = end_line.min(lines.len());

        let replacement: Vec<&str> = content.lines().collect();
        let tail: Vec<&str> = lines.split_off(end.min(lines.len()));
        lines.truncate(start_line.saturating_sub(1));
        lines.extend(replacement);
        lines.extend(tail);

        let new_body = lines.join("\n") + "\n";
        if let Err(e) = tokio::fs::write(&path, &new_body).await {
            return ToolResult::err(
                ToolErrorKind::IoError,
                format!("cannot write {path}: {e}"),
                t0.elapsed().as_millis() as u64,
            );
        }

        let display = format!("Replaced lines {start_line}-{end} of {path}");
        ToolResult::ok(json!({ "path": path, "start": start_line, "end": end }), display, t0.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replaces_middle_range_with_fewer_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "a\nb\nc\nd\ne\n").await.unwrap();

        let tool = ReplaceLinesTool;
        let call = ToolCall {
            id: "1".into(),
            name: "replace_lines".into(),
            args: json!({"path": path.to_str().unwrap(), "start": 2, "end": 4, "content": "X"}),
        };
        let res = tool.execute(&call).await;
        assert!(res.success);
        let out = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(out, "a\nX\ne\n");
    }

    #[tokio::test]
    async fn replacement_can_grow_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        tokio::fs::write(&path, "a\nb\nc\n").await.unwrap();

        let tool = ReplaceLinesTool;
        let call = ToolCall {
            id: "1".into(),
            name: "replace_lines".into(),
            args: json!({"path": path.to_str().unwrap(), "start": 2, "end": 2, "content": "x\ny\nz"}),
        };
        let res = tool.execute(&call).await;
        assert!(res.success);
        let out = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(out, "a\nx\ny\nz\nc\n");
    }

    #[tokio::test]
    async fn invalid_range_rejected() {
        let tool = ReplaceLinesTool;
        let call = ToolCall {
            id: "1".into(),
            name: "replace_lines".into(),
            args: json!({"path": "f.txt", "start": 0, "end": 1, "content": "x"}),
        };
        let res = tool.execute(&call).await;
        assert!(!res.success);
    }

    #[tokio::test]
    async fn absolute_path_rejected() {
        let tool = ReplaceLinesTool;
        let call = ToolCall {
            id: "1".into(),
            name: "replace_lines".into(),
            args: json!({"path": "/etc/passwd", "start": 1, "end": 1, "content": "x"}),
        };
        let res = tool.execute(&call).await;
        assert!(!res.success);
        assert_eq!(res.error_kind, Some(ToolErrorKind::ValidationFailed));
    }
}
