// SPDX-License-Identifier: Apache-2.0
//! Master loop: owns the session, resolves one user prompt end to end by
//! alternating streaming turns with tool execution, then hands queued files
//! to the secondary loop once the model stops calling tools.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use lh_config::Config;
use lh_model::{Message, ModelProvider, Role, ToolCall as ModelToolCall};
use lh_tools::{IndexingTask, PermissionEngine, PermissionEvaluation, TodoItem, ToolRegistry, UserChoice};

use crate::events::AgentEvent;
use crate::executor::{TickOutcome, ToolExecutor};
use crate::secondary_loop::{Disposition, SecondaryLoop, SecondaryLoopTick};
use crate::session::Session;
use crate::streaming::{build_request, run_turn};

/// Snapshot of the session-ephemeral fields grouped together as `AppState`.
/// The rest of the ownership (messages, config, provider, permission
/// manager, tool registry, indexing queue) lives directly on [`MasterLoop`];
/// this is the subset worth exposing to a driver as one value, e.g. for a
/// session summary on quit.
#[derive(Debug, Clone)]
pub struct AppState {
    pub tasks: Vec<TodoItem>,
    pub iteration_count: usize,
    pub read_files: HashSet<String>,
    pub indexed_files: HashSet<String>,
    pub session_start: u64,
}

/// Resolves a pending permission prompt. Implemented by the terminal driver;
/// a fixed-answer stub is used in tests.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    async fn ask(&self, tool_call: &ModelToolCall, evaluation: &PermissionEvaluation) -> UserChoice;
}

/// Resolves a pending secondary-loop disposition choice for one file.
#[async_trait]
pub trait SecondaryLoopPrompter: Send + Sync {
    async fn ask_disposition(&self, path: &str, preview: &str) -> Disposition;
}

const RECENT_CONTEXT_MESSAGES: usize = 8;
const RECENT_CONTEXT_MAX_CHARS: usize = 300;

/// The last few user/assistant/system messages, each independently truncated
/// to 300 chars, handed to the file curator as "recent conversation
/// context" so its ranges reflect what the user is actually working on.
fn recent_context_snapshot(session: &Session) -> String {
    let mut recent: Vec<&Message> = session
        .messages
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant | Role::System))
        .rev()
        .take(RECENT_CONTEXT_MESSAGES)
        .collect();
    recent.reverse();
    recent
        .into_iter()
        .map(|m| {
            let mut content = m.content.clone();
            if content.len() > RECENT_CONTEXT_MAX_CHARS {
                content.truncate(RECENT_CONTEXT_MAX_CHARS);
            }
            format!("{:?}: {}", m.role, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Owns one conversation end to end: the message history, the provider, the
/// permission engine, the tool registry, and the GraphRAG indexing queue.
/// Sub-agent dispatch reaches back into the tool registry through
/// `run_agent`/`list_agents`, so it needs no separate field here.
pub struct MasterLoop {
    pub session: Session,
    cfg: Config,
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    permissions: PermissionEngine,
    secondary: SecondaryLoop,
    indexing_rx: mpsc::UnboundedReceiver<IndexingTask>,
    tasks: Arc<Mutex<Vec<TodoItem>>>,
    read_files: Arc<Mutex<HashSet<String>>>,
    recent_context: Arc<Mutex<String>>,
    indexed_files: HashSet<String>,
    iteration_count: usize,
    session_start: u64,
}

impl MasterLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Config,
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        permissions: PermissionEngine,
        indexing_rx: mpsc::UnboundedReceiver<IndexingTask>,
        tasks: Arc<Mutex<Vec<TodoItem>>>,
        read_files: Arc<Mutex<HashSet<String>>>,
        recent_context: Arc<Mutex<String>>,
        session_start: u64,
    ) -> Self {
        let num_ctx = cfg.num_ctx as usize;
        Self {
            session: Session::new(num_ctx),
            cfg,
            provider,
            tools,
            permissions,
            secondary: SecondaryLoop::new(),
            indexing_rx,
            tasks,
            read_files,
            recent_context,
            indexed_files: HashSet::new(),
            iteration_count: 0,
            session_start,
        }
    }

    /// The policy store as it stands right now, for persisting at shutdown
    /// after any `always_allow`/`deny` decisions made during the session.
    pub fn policies(&self) -> &lh_tools::PolicyStore {
        &self.permissions.policies
    }

    pub async fn app_state(&self) -> AppState {
        AppState {
            tasks: self.tasks.lock().await.clone(),
            iteration_count: self.iteration_count,
            read_files: self.read_files.lock().await.clone(),
            indexed_files: self.indexed_files.clone(),
            session_start: self.session_start,
        }
    }

    /// Resolve one user prompt: push it, run streaming turns interleaved
    /// with tool execution until the model stops calling tools or a ceiling
    /// is hit, then drain any indexing queue through the secondary loop.
    pub async fn resolve_prompt(
        &mut self,
        input: String,
        now_ms: u64,
        events: &mpsc::Sender<AgentEvent>,
        permission_prompter: &dyn PermissionPrompter,
        secondary_prompter: &dyn SecondaryLoopPrompter,
    ) -> anyhow::Result<()> {
        self.session.push(Message::user(input, now_ms));
        let mut depth = 0usize;

        loop {
            self.iteration_count += 1;
            if self.iteration_count > self.cfg.max_iterations {
                self.session.push(Message::system("Maximum iterations reached", now_ms));
                let _ = events.send(AgentEvent::SystemNotice("Maximum iterations reached".into())).await;
                break;
            }

            *self.recent_context.lock().await = recent_context_snapshot(&self.session);

            let tools = self.tools.schemas();
            let req = build_request(&self.session, &self.cfg, tools, self.provider.as_ref());
            let outcome = run_turn(self.provider.as_ref(), req, events).await?;

            if let Some(err) = &outcome.errored {
                let _ = events.send(AgentEvent::Error(err.clone())).await;
            }

            let mut assistant_msg = Message::assistant(outcome.content.clone(), now_ms);
            assistant_msg.thinking = outcome.thinking.clone();
            if outcome.had_tool_calls() {
                assistant_msg.tool_calls = Some(outcome.tool_calls.clone());
            }
            self.session.push(assistant_msg);

            if !outcome.had_tool_calls() {
                break;
            }

            depth += 1;
            if depth > self.cfg.max_tool_depth {
                self.session.push(Message::system("Maximum tool call depth reached", now_ms));
                let _ = events.send(AgentEvent::SystemNotice("Maximum tool call depth reached".into())).await;
                break;
            }

            let mut executor = ToolExecutor::new(outcome.tool_calls, depth, self.cfg.max_tool_depth);
            loop {
                match executor.tick(&self.tools, &mut self.permissions, now_ms).await {
                    TickOutcome::Continue => continue,
                    TickOutcome::RenderRequested { display_message, tool_message } => {
                        self.session.push(display_message);
                        self.session.push(tool_message);
                    }
                    TickOutcome::ShowPermissionPrompt { tool_call, evaluation } => {
                        let _ = events
                            .send(AgentEvent::PermissionRequested { tool_call: tool_call.clone(), evaluation: evaluation.clone() })
                            .await;
                        let choice = permission_prompter.ask(&tool_call, &evaluation).await;
                        if let Some((display_message, tool_message)) =
                            executor.submit_permission_response(&self.tools, &mut self.permissions, choice, now_ms).await
                        {
                            self.session.push(display_message);
                            self.session.push(tool_message);
                        }
                    }
                    TickOutcome::IterationComplete | TickOutcome::IterationLimitReached => break,
                }
            }
        }

        self.drain_indexing_queue();
        self.run_secondary_loop(now_ms, events, secondary_prompter).await;
        let _ = events.send(AgentEvent::Done).await;
        Ok(())
    }

    fn drain_indexing_queue(&mut self) {
        while let Ok(task) = self.indexing_rx.try_recv() {
            self.secondary.enqueue(task);
        }
    }

    async fn run_secondary_loop(&mut self, now_ms: u64, events: &mpsc::Sender<AgentEvent>, prompter: &dyn SecondaryLoopPrompter) {
        loop {
            match self.secondary.tick() {
                SecondaryLoopTick::Idle => break,
                SecondaryLoopTick::Complete => {
                    let _ = events.send(AgentEvent::SecondaryLoopComplete).await;
                    break;
                }
                SecondaryLoopTick::FileReady { path, preview } => {
                    let _ = events.send(AgentEvent::SecondaryLoopFileReady { path: path.clone(), preview: preview.clone() }).await;
                    let disposition = prompter.ask_disposition(&path, &preview).await;
                    let indexed = matches!(disposition, Disposition::FullIndexing);
                    if let Some(resolved) = self.secondary.resolve(disposition, &mut self.session.messages) {
                        if indexed {
                            self.indexed_files.insert(resolved);
                        }
                        self.session.recalculate_tokens();
                    }
                    if self.secondary.just_drained() {
                        self.session.push(Message::system("Secondary loop complete: all queued files disposed of.", now_ms));
                        let _ = events.send(AgentEvent::SecondaryLoopComplete).await;
                    }
                }
            }
        }
    }
}
