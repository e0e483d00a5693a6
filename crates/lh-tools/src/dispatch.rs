// SPDX-License-Identifier: MIT
//! Seam crossed by the `run_agent`/`list_agents` tools:
//! `lh-tools` cannot depend on the sub-agent executor (it lives in
//! `lh-core`, which depends on `lh-tools`), so the tools are built against
//! this trait instead and the concrete dispatcher is injected at
//! registry-build time, the same way `read_file` is built against
//! [`crate::curator::FileCurator`].

use async_trait::async_trait;

/// One entry of `list_agents`'s output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
}

/// Outcome of one `run_agent` dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait AgentDispatcher: Send + Sync {
    async fn run_agent(&self, agent_name: &str, task: &str) -> DispatchOutcome;
    fn list_agents(&self) -> Vec<AgentSummary>;
}
