// SPDX-License-Identifier: MIT
//! Dependency-inversion seam for the file-read curation pipeline.
//!
//! `read_file` needs to hand a large file to a sub-agent and get back the
//! line ranges worth showing, but sub-agent dispatch is an `lh-core` concern
//! and `Tool::execute` takes only `&self` and a `ToolCall`. `FileCurator` is
//! defined here and implemented in `lh-core`, then injected into
//! `ReadFileTool` at registry-build time — the same pattern `TodoWriteTool`
//! uses to reach back into shared application state via a channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which curation prompt to run, chosen by `ReadFileTool` from file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationMode {
    /// File is between the small and large thresholds: ask for the ranges
    /// worth showing in full.
    Curated,
    /// File is above the large threshold: ask for a structural skeleton
    /// (signatures, headers) rather than full line ranges.
    Structure,
}

/// One line range the curator picked out, with an optional note on why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Parsed shape of the curator agent's JSON reply: `{"ranges": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuratorOutput {
    pub ranges: Vec<LineRange>,
}

/// A file queued for the GraphRAG-style secondary indexing pass.
#[derive(Debug, Clone)]
pub struct IndexingTask {
    pub path: String,
    pub content: String,
}

/// Runs the native `file_curator` sub-agent over a file body and returns the
/// ranges worth surfacing to the main conversation. Implemented by `lh-core`,
/// which owns sub-agent dispatch.
#[async_trait]
pub trait FileCurator: Send + Sync {
    async fn curate(
        &self,
        mode: CurationMode,
        path: &str,
        file_body: &str,
        recent_context: &str,
    ) -> anyhow::Result<CuratorOutput>;
}
