// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agents;
mod compact;
mod curator;
mod dispatch;
mod events;
mod executor;
mod master;
mod prompts;
mod secondary_loop;
mod session;
mod streaming;
mod subagent;

pub use agents::{to_markdown as agent_to_markdown, AgentCapabilities, AgentDefinition, AgentRegistry};
pub use compact::{emergency_compact, rewrite_for_compaction, smart_truncate};
pub use curator::SubAgentFileCurator;
pub use dispatch::SubAgentDispatcher;
pub use events::{AgentEvent, SubAgentProgress};
pub use executor::{ExecutorState, TickOutcome, ToolExecutor};
pub use master::{AppState, MasterLoop, PermissionPrompter, SecondaryLoopPrompter};
pub use prompts::{system_prompt, PromptContext};
pub use secondary_loop::{Disposition, SecondaryLoop, SecondaryLoopState, SecondaryLoopTick};
pub use session::Session;
pub use streaming::{build_request, run_turn, StreamOutcome};
pub use subagent::{AgentResult, AgentStats, SubAgentExecutor};
