// SPDX-License-Identifier: MIT
//! `read_file`: size-threshold dispatch to the `file_curator` sub-agent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::curator::{CurationMode, FileCurator, IndexingTask};
use crate::scope::{RiskLevel, Scope};
use crate::tool::{OutputCategory, Tool, ToolCall, ToolErrorKind, ToolResult};

const HARD_CAP_BYTES: u64 = 10 * 1024 * 1024;

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

fn number_lines(body: &str) -> String {
    body.lines()
        .enumerate()
        .map(|(i, line)| format!("{:>5}\t{}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_ranges(body: &str, ranges: &[crate::curator::LineRange]) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut out = String::new();
    for r in ranges {
        let start = r.start.max(1) as usize;
        let end = (r.end as usize).min(lines.len());
        if let Some(ann) = &r.annotation {
            out.push_str(&format!("# {ann}\n"));
        }
        for (i, line) in lines.iter().enumerate().take(end).skip(start - 1) {
            out.push_str(&format!("{:>5}\t{}\n", i + 1, line));
        }
        out.push('\n');
    }
    out
}

/// Reads a file, dispatching to the `file_curator` sub-agent when the file
/// is too large to show in full.
pub struct ReadFileTool {
    pub small_threshold: usize,
    pub large_threshold: usize,
    pub graph_rag_enabled: bool,
    pub curator: Option<Arc<dyn FileCurator>>,
    pub read_files: Arc<Mutex<HashSet<String>>>,
    pub indexing_tx: Option<mpsc::UnboundedSender<IndexingTask>>,
    pub recent_context: Arc<Mutex<String>>,
}

impl ReadFileTool {
    pub fn new(
        small_threshold: usize,
        large_threshold: usize,
        graph_rag_enabled: bool,
        curator: Option<Arc<dyn FileCurator>>,
        read_files: Arc<Mutex<HashSet<String>>>,
        indexing_tx: Option<mpsc::UnboundedSender<IndexingTask>>,
        recent_context: Arc<Mutex<String>>,
    ) -> Self {
        Self {
            small_threshold,
            large_threshold,
            graph_rag_enabled,
            curator,
            read_files,
            indexing_tx,
            recent_context,
        }
    }

    async fn curate_or_fallback(&self, mode: CurationMode, path: &str, body: &str) -> String {
        let Some(curator) = &self.curator else {
            return number_lines(body);
        };
        let context = self.recent_context.lock().await.clone();
        match curator.curate(mode, path, body, &context).await {
            Ok(output) if !output.ranges.is_empty() => render_ranges(body, &output.ranges),
            _ => number_lines(body),
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's contents. Files under the small-file threshold are shown \
         in full with 1-indexed line numbers. Larger files are curated by a \
         sub-agent that selects the most relevant line ranges, or summarized \
         to their structural skeleton (imports, type declarations, function \
         signatures) for very large files. Use `read_lines` to request a \
         specific range directly instead."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "relative path to the file" }
            },
            "required": ["path"]
        })
    }

    fn scope(&self) -> Scope {
        Scope::ReadFiles
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn output_category(&self) -> OutputCategory {
        OutputCategory::FileContent
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let path = match call.args.get("path").and_then(Value::as_str) {
            Some(p) => p.to_string(),
            None => {
                return ToolResult::err(
                    ToolErrorKind::ValidationFailed,
                    "missing required parameter `path`",
                    start.elapsed().as_millis() as u64,
                )
            }
        };

        if let Err(msg) = reject_path(&path) {
            return ToolResult::err(ToolErrorKind::ValidationFailed, msg, start.elapsed().as_millis() as u64);
        }

        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                return ToolResult::err(
                    ToolErrorKind::IoError,
                    format!("cannot stat {path}: {e}"),
                    start.elapsed().as_millis() as u64,
                )
            }
        };
        if meta.len() > HARD_CAP_BYTES {
            return ToolResult::err(
                ToolErrorKind::ValidationFailed,
                format!("{path} exceeds the 10 MiB read cap"),
                start.elapsed().as_millis() as u64,
            );
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) => {
                return ToolResult::err(
                    ToolErrorKind::IoError,
                    format!("cannot read {path}: {e}"),
                    start.elapsed().as_millis() as u64,
                )
            }
        };
        let body = String::from_utf8_lossy(&bytes).into_owned();
        // An empty file still counts as one (empty) line, matching what a
        // line-oriented editor would report, even though there are no
        // content lines to number below.
        let line_count = if body.is_empty() { 1 } else { body.lines().count() };

        let formatted = if line_count < self.small_threshold {
            number_lines(&body)
        } else if line_count <= self.large_threshold {
            self.curate_or_fallback(CurationMode::Curated, &path, &body).await
        } else {
            self.curate_or_fallback(CurationMode::Structure, &path, &body).await
        };

        if self.graph_rag_enabled {
            let mut seen = self.read_files.lock().await;
            if !seen.contains(&path) {
                if let Some(tx) = &self.indexing_tx {
                    // Indexing always sees the full file regardless of what
                    // curation chose to show the model.
                    let full_numbered = number_lines(&body);
                    let _ = tx.send(IndexingTask { path: path.clone(), content: full_numbered });
                }
            }
        }
        self.read_files.lock().await.insert(path.clone());

        let display = format!("```\n{formatted}\n```");
        // `content` carries the same formatted text shown to the user: this is
        // the model-visible payload the secondary loop retroactively rewrites
        // to save context window space after an indexing disposition.
        ToolResult::ok(json!({ "path": path, "lines": line_count, "content": formatted }), display, start.elapsed().as_millis() as u64)
    }
}
