// SPDX-License-Identifier: Apache-2.0
//! Implements `lh_tools::AgentDispatcher` on top of [`AgentRegistry`] and
//! [`SubAgentExecutor`], the seam `run_agent`/`list_agents` are built
//! against.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use lh_model::ModelProvider;
use lh_tools::{AgentDispatcher, AgentSummary, DispatchOutcome, ToolRegistry};

use crate::agents::AgentRegistry;
use crate::events::AgentEvent;
use crate::subagent::SubAgentExecutor;

/// `AgentRegistry` is protected by a plain `std::sync::Mutex` rather than an
/// async one: both `reload` and the registry lookups it serializes are
/// synchronous (`std::fs` calls, `HashMap` reads), so there is never a need
/// to hold the lock across an `.await`.
pub struct SubAgentDispatcher {
    agents: Arc<Mutex<AgentRegistry>>,
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    executor: SubAgentExecutor,
    /// Long-lived, session-scoped sender the dispatched agent's thinking/
    /// content/tool-call trace is forwarded onto as it runs.
    events: mpsc::Sender<AgentEvent>,
}

impl SubAgentDispatcher {
    pub fn new(
        agents: Arc<Mutex<AgentRegistry>>,
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        executor: SubAgentExecutor,
        events: mpsc::Sender<AgentEvent>,
    ) -> Self {
        Self { agents, provider, tools, executor, events }
    }
}

#[async_trait]
impl AgentDispatcher for SubAgentDispatcher {
    async fn run_agent(&self, agent_name: &str, task: &str) -> DispatchOutcome {
        let def = { self.agents.lock().unwrap().get(agent_name).cloned() };
        let Some(def) = def else {
            return DispatchOutcome { success: false, content: String::new(), error: Some(format!("unknown agent: {agent_name}")) };
        };

        let (tx, mut rx) = mpsc::channel(128);
        let events = self.events.clone();
        let agent_name = agent_name.to_string();
        let forward = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let _ = events.send(AgentEvent::SubAgentProgress { agent_name: agent_name.clone(), event: ev }).await;
            }
        });
        let result = self.executor.run(&def, task, self.provider.as_ref(), &self.tools, tx).await;
        forward.abort();

        DispatchOutcome { success: result.success, content: result.content, error: result.error }
    }

    fn list_agents(&self) -> Vec<AgentSummary> {
        let guard = self.agents.lock().unwrap();
        guard.names().into_iter().filter_map(|name| guard.get(&name).map(|def| AgentSummary { name: def.name.clone(), description: def.description.clone() })).collect()
    }
}
