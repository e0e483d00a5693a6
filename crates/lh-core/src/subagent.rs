// SPDX-License-Identifier: Apache-2.0
//! Sub-agent executor: runs an isolated agentic loop against a
//! private history, bypassing the permission engine but still honoring the
//! agent's own tool allow-list. Recursion is bounded by a shared atomic
//! depth counter rather than a per-call-stack check, so it stays correct
//! even when sub-agents dispatch concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use lh_model::{CompletionRequest, Message, ModelProvider, ToolSchema as ModelToolSchema};
use lh_tools::{Tool, ToolCall as ExecToolCall, ToolErrorKind, ToolRegistry, ToolResult};

use crate::agents::AgentDefinition;
use crate::events::{AgentEvent, SubAgentProgress};
use crate::session::Session;
use crate::streaming;

/// Per-run counters reported back to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentStats {
    pub iterations: u32,
    pub tool_calls: u32,
}

/// Outcome of one sub-agent run.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub success: bool,
    pub content: String,
    pub thinking: Option<String>,
    pub stats: AgentStats,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn ok(content: impl Into<String>, stats: AgentStats, thinking: Option<String>) -> Self {
        Self { success: true, content: content.into(), thinking, stats, error: None }
    }

    pub fn err(message: impl Into<String>, stats: AgentStats) -> Self {
        Self { success: false, content: String::new(), thinking: None, stats, error: Some(message.into()) }
    }
}

fn to_model_schema(s: &lh_tools::ToolSchema) -> ModelToolSchema {
    ModelToolSchema { name: s.name.clone(), description: s.description.clone(), parameters: s.parameters.clone() }
}

fn filtered_schemas(registry: &ToolRegistry, allowed: &[String]) -> Vec<ModelToolSchema> {
    registry.schemas().iter().filter(|s| allowed.iter().any(|a| a == &s.name)).map(to_model_schema).collect()
}

fn build_request(session: &Session, def: &AgentDefinition, provider: &dyn ModelProvider, tools: Vec<ModelToolSchema>) -> CompletionRequest {
    let caps = provider.capabilities();
    CompletionRequest {
        model: def.capabilities.model_override.clone().unwrap_or_else(|| provider.model_name().to_string()),
        messages: session.serialize_for_provider(),
        tools: if caps.supports_tools { tools } else { Vec::new() },
        think: caps.supports_thinking && def.capabilities.enable_thinking,
        keep_alive: None,
        num_ctx: if caps.supports_context_api { Some(def.capabilities.num_ctx) } else { None },
        num_predict: Some(def.capabilities.num_predict),
        temperature: Some(def.capabilities.temperature),
        repeat_penalty: None,
    }
}

/// Bounds the nesting depth of `run_agent` tool calls. Shared across every
/// sub-agent spawned within one process so depth is tracked globally, not
/// per-call-site.
pub struct SubAgentExecutor {
    depth: Arc<AtomicUsize>,
    max_depth: usize,
}

impl SubAgentExecutor {
    pub fn new(depth: Arc<AtomicUsize>, max_depth: usize) -> Self {
        Self { depth, max_depth }
    }

    /// Run `def` against `task`, executing any tool calls it produces itself
    ///. `progress` receives thinking/content/tool-call/
    /// iteration/complete notifications as they happen.
    pub async fn run(
        &self,
        def: &AgentDefinition,
        task: &str,
        provider: &dyn ModelProvider,
        registry: &ToolRegistry,
        progress: mpsc::Sender<SubAgentProgress>,
    ) -> AgentResult {
        let depth_before = self.depth.fetch_add(1, Ordering::SeqCst);
        struct DepthGuard<'a>(&'a AtomicUsize);
        impl Drop for DepthGuard<'_> {
            fn drop(&mut self) {
                self.0.fetch_sub(1, Ordering::SeqCst);
            }
        }
        let _guard = DepthGuard(&self.depth);

        if depth_before >= self.max_depth {
            return AgentResult::err("maximum sub-agent recursion depth reached", AgentStats::default());
        }

        let mut session = Session::new(def.capabilities.num_ctx as usize);
        session.push(Message::system(def.system_prompt.clone(), 0));
        session.push(Message::user(task.to_string(), 0));

        let mut stats = AgentStats::default();

        for iteration in 0..def.capabilities.max_iterations {
            stats.iterations += 1;
            let _ = progress.send(SubAgentProgress::Iteration(iteration + 1)).await;

            let tools = filtered_schemas(registry, &def.allowed_tool_names);
            let req = build_request(&session, def, provider, tools);

            let (inner_tx, mut inner_rx) = mpsc::channel::<AgentEvent>(128);
            let progress_clone = progress.clone();
            let relay = tokio::spawn(async move {
                while let Some(ev) = inner_rx.recv().await {
                    match ev {
                        AgentEvent::ThinkingDelta(d) => {
                            let _ = progress_clone.send(SubAgentProgress::Thinking(d)).await;
                        }
                        AgentEvent::TextDelta(d) => {
                            let _ = progress_clone.send(SubAgentProgress::Content(d)).await;
                        }
                        AgentEvent::ToolCallStarted(tc) => {
                            let _ = progress_clone.send(SubAgentProgress::ToolCall(tc)).await;
                        }
                        _ => {}
                    }
                }
            });

            let outcome = match streaming::run_turn(provider, req, &inner_tx).await {
                Ok(o) => o,
                Err(e) => {
                    drop(inner_tx);
                    let _ = relay.await;
                    return AgentResult::err(format!("provider error: {e}"), stats);
                }
            };
            drop(inner_tx);
            let _ = relay.await;

            if !outcome.content.is_empty() || outcome.had_tool_calls() {
                let mut msg = Message::assistant(outcome.content.clone(), 0);
                if outcome.had_tool_calls() {
                    msg.tool_calls = Some(outcome.tool_calls.clone());
                }
                session.push(msg);
            }

            if !outcome.had_tool_calls() {
                let _ = progress.send(SubAgentProgress::Complete).await;
                return AgentResult::ok(outcome.content, stats, outcome.thinking);
            }

            stats.tool_calls += outcome.tool_calls.len() as u32;
            for call in &outcome.tool_calls {
                let result = if !def.allowed_tool_names.iter().any(|a| a == &call.name) {
                    ToolResult::err(ToolErrorKind::PermissionDenied, format!("tool '{}' is not in this agent's allow-list", call.name), 0)
                } else {
                    match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                        Ok(args) => dispatch(registry, &call.name, &call.id, args).await,
                        Err(e) => ToolResult::err(ToolErrorKind::ParseError, format!("malformed tool arguments: {e}"), 0),
                    }
                };
                let payload = if result.success {
                    result.data.unwrap_or(serde_json::Value::Null)
                } else {
                    serde_json::json!({"success": false, "error_kind": result.error_kind, "error_message": result.error_message})
                };
                session.push(Message::tool_result(call.id.clone(), payload.to_string(), 0));
            }
        }

        AgentResult::err("max iterations reached", stats)
    }
}

async fn dispatch(registry: &ToolRegistry, name: &str, id: &str, args: serde_json::Value) -> ToolResult {
    let Some(tool) = registry.get(name) else {
        return ToolResult::err(ToolErrorKind::NotFound, format!("unknown tool: {name}"), 0);
    };
    let call = ExecToolCall { id: id.to_string(), name: name.to_string(), args };
    tool.execute(&call).await
}
