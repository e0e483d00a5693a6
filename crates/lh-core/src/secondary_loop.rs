// SPDX-License-Identifier: Apache-2.0
//! Secondary loop: disposes of files queued for indexing once the primary
//! tool-call stream between model and user goes quiet.
//!
//! Driven by the same `tick`-style shape as [`crate::executor::ToolExecutor`]
//! so the master loop can compose both uniformly: call `tick`, react to the
//! outcome, and when it asks for a disposition choice call `resolve` with the
//! user's answer before ticking again.

use std::collections::{HashSet, VecDeque};

use lh_model::{Message, Role};
use lh_tools::IndexingTask;

const PREVIEW_LINES: usize = 12;

/// How the user (or a default policy) chose to dispose of one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the full file content in history and mark it indexed.
    FullIndexing,
    /// Keep only lines `start..=end` (1-indexed, inclusive), matching the
    /// numbering the original `read_file` call used.
    CustomLines { start: u32, end: u32 },
    /// Drop the body entirely; leave a one-line receipt behind.
    MetadataOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryLoopState {
    Idle,
    AwaitingChoice,
    AwaitingLineRange,
}

/// Result of one [`SecondaryLoop::tick`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryLoopTick {
    /// Nothing pending; the queue is empty and no file is mid-disposition.
    Idle,
    /// A file is ready for the user to choose a disposition for.
    FileReady { path: String, preview: String },
    /// The queue just drained for good (the last file's disposition
    /// resolved and nothing else is queued).
    Complete,
}

/// Small explicit state machine disposing of the GraphRAG indexing queue one
/// file at a time, interleaved with the main conversation.
#[derive(Debug)]
pub struct SecondaryLoop {
    queue: VecDeque<IndexingTask>,
    current: Option<IndexingTask>,
    state: SecondaryLoopState,
    indexed_files: HashSet<String>,
}

impl SecondaryLoop {
    pub fn new() -> Self {
        Self { queue: VecDeque::new(), current: None, state: SecondaryLoopState::Idle, indexed_files: HashSet::new() }
    }

    pub fn state(&self) -> SecondaryLoopState {
        self.state
    }

    pub fn enqueue(&mut self, task: IndexingTask) {
        if self.indexed_files.contains(&task.path) {
            return;
        }
        self.queue.push_back(task);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.current.is_none()
    }

    pub fn is_indexed(&self, path: &str) -> bool {
        self.indexed_files.contains(path)
    }

    /// Advance the state machine. Returns `FileReady` at most once per queued
    /// file; the caller must call [`Self::resolve`] before the next `tick`
    /// will hand out a new one.
    pub fn tick(&mut self) -> SecondaryLoopTick {
        if self.current.is_some() {
            return SecondaryLoopTick::Idle;
        }
        match self.queue.pop_front() {
            Some(task) => {
                let preview = preview_of(&task.content);
                let path = task.path.clone();
                self.current = Some(task);
                self.state = SecondaryLoopState::AwaitingChoice;
                SecondaryLoopTick::FileReady { path, preview }
            }
            None => {
                self.state = SecondaryLoopState::Idle;
                SecondaryLoopTick::Idle
            }
        }
    }

    /// User picked `custom_lines` without specifying a range yet; caller
    /// should prompt for one and then call `resolve`.
    pub fn await_line_range(&mut self) {
        if self.current.is_some() {
            self.state = SecondaryLoopState::AwaitingLineRange;
        }
    }

    /// Apply the user's disposition choice to the pending file, retroactively
    /// rewriting its `read_file` tool message in `messages`. Returns the
    /// resolved path, or `None` if nothing was pending.
    pub fn resolve(&mut self, disposition: Disposition, messages: &mut [Message]) -> Option<String> {
        let task = self.current.take()?;
        self.state = SecondaryLoopState::Idle;

        match disposition {
            Disposition::FullIndexing => {
                self.indexed_files.insert(task.path.clone());
            }
            Disposition::CustomLines { start, end } => {
                let trimmed = extract_numbered_range(&task.content, start, end);
                rewrite_tool_message(messages, &task.path, &trimmed);
            }
            Disposition::MetadataOnly => {
                let summary = format!("Tool: read_file; File: {}; Status: Read successfully (content not saved)", task.path);
                rewrite_tool_message(messages, &task.path, &summary);
            }
        }
        Some(task.path)
    }

    /// True once the disposing file was the last one queued. Call right
    /// after `resolve` to decide whether to emit a completion notice.
    pub fn just_drained(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }
}

impl Default for SecondaryLoop {
    fn default() -> Self {
        Self::new()
    }
}

fn preview_of(numbered_content: &str) -> String {
    numbered_content.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n")
}

fn extract_numbered_range(numbered_content: &str, start: u32, end: u32) -> String {
    numbered_content
        .lines()
        .filter(|line| {
            line.split('\t')
                .next()
                .and_then(|n| n.trim().parse::<u32>().ok())
                .map(|n| n >= start && n <= end)
                .unwrap_or(false)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Find the most recent `read_file` tool message for `path` and replace its
/// content in place, preserving its `tool_call_id`.
fn rewrite_tool_message(messages: &mut [Message], path: &str, new_content: &str) -> bool {
    for m in messages.iter_mut().rev() {
        if m.role != Role::Tool {
            continue;
        }
        let matches_path = serde_json::from_str::<serde_json::Value>(&m.content)
            .ok()
            .and_then(|v| v.get("path").and_then(|p| p.as_str()).map(|p| p == path))
            .unwrap_or(false);
        if matches_path {
            m.content = new_content.to_string();
            return true;
        }
    }
    false
}
