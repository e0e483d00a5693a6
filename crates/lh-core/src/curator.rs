// SPDX-License-Identifier: Apache-2.0
//! Implements `lh_tools::FileCurator` on top of the sub-agent executor,
//! so `ReadFileTool` can hand large files to the native
//! `file_curator` agent without depending on sub-agent dispatch itself.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use lh_model::ModelProvider;
use lh_tools::{CurationMode, CuratorOutput, FileCurator, ToolRegistry};

use crate::agents::file_curator_definition;
use crate::events::AgentEvent;
use crate::subagent::SubAgentExecutor;

const CURATOR_AGENT_NAME: &str = "file_curator";

/// `FileCurator` backed by [`SubAgentExecutor`] running the native
/// `file_curator` agent definition. The curator never calls tools itself
/// (`allowed_tool_names` is empty), so its recursion counter is private and
/// never shared with the main `run_agent` depth counter.
pub struct SubAgentFileCurator {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    executor: SubAgentExecutor,
    /// Long-lived, session-scoped sender for the thinking/content trace the
    /// curator streams while it runs, so the user sees curation happen in
    /// real time (spec'd behavior for `file_curator`, independent of
    /// whichever per-turn `AgentEvent` channel is live when `curate` runs).
    events: mpsc::Sender<AgentEvent>,
}

impl SubAgentFileCurator {
    pub fn new(provider: Arc<dyn ModelProvider>, registry: Arc<ToolRegistry>, events: mpsc::Sender<AgentEvent>) -> Self {
        Self { provider, registry, executor: SubAgentExecutor::new(Arc::new(AtomicUsize::new(0)), 1), events }
    }
}

fn build_task(mode: CurationMode, path: &str, file_body: &str, recent_context: &str) -> String {
    let instructions = match mode {
        CurationMode::Curated => "Select the line ranges of this file most relevant to the ongoing conversation.",
        CurationMode::Structure => "Return only the structural skeleton of this file: imports, type declarations, and function signatures, as line ranges.",
    };
    format!(
        "{instructions}\n\nFile: {path}\n\nRecent conversation context:\n{recent_context}\n\n\
         File content (1-indexed lines):\n```\n{file_body}\n```"
    )
}

#[async_trait]
impl FileCurator for SubAgentFileCurator {
    async fn curate(&self, mode: CurationMode, path: &str, file_body: &str, recent_context: &str) -> anyhow::Result<CuratorOutput> {
        let task = build_task(mode, path, file_body, recent_context);
        let def = file_curator_definition();

        let (tx, mut rx) = mpsc::channel(128);
        let events = self.events.clone();
        let forward = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                debug!(?ev, "curator progress");
                let _ = events.send(AgentEvent::SubAgentProgress { agent_name: CURATOR_AGENT_NAME.to_string(), event: ev }).await;
            }
        });

        let result = self.executor.run(&def, &task, self.provider.as_ref(), &self.registry, tx).await;
        forward.abort();

        if !result.success {
            anyhow::bail!(result.error.unwrap_or_else(|| "file curator run failed".to_string()));
        }

        let json_text = result.content.trim();
        let parsed: CuratorOutput = serde_json::from_str(json_text)?;
        Ok(parsed)
    }
}
