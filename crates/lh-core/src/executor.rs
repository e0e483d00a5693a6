// SPDX-License-Identifier: Apache-2.0
//! Tool-executor state machine: sequences permission prompts and
//! tool invocations produced by one assistant turn.

use std::time::Instant;

use lh_model::{Message, ToolCall as ModelToolCall};
use lh_tools::{
    PermissionEngine, PermissionEvaluation, RiskLevel, Scope, ToolCall as ExecToolCall, ToolErrorKind, ToolRegistry,
    ToolResult, UserChoice,
};

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    AwaitingPermission,
    IterationComplete,
    IterationLimitReached,
}

/// Result of a single [`ToolExecutor::tick`] call.
#[derive(Debug)]
pub enum TickOutcome {
    /// No user-observable change yet; call `tick` again.
    Continue,
    /// Caller must render a permission prompt and later call
    /// [`ToolExecutor::submit_permission_response`].
    ShowPermissionPrompt { tool_call: ModelToolCall, evaluation: PermissionEvaluation },
    /// A new `(display_message, tool_message)` pair was appended; caller may
    /// re-render.
    RenderRequested { display_message: Message, tool_message: Message },
    /// The call list is exhausted; caller may start the next streaming turn.
    IterationComplete,
    /// The tool-call depth ceiling was hit
    /// before this list could be processed.
    IterationLimitReached,
}

/// Extract the argument most relevant to permission-policy path matching.
/// Tools disagree on the name of their primary argument, so this tries the
/// common ones in priority order and falls back to the empty string (which
/// still participates correctly in glob matching for non-file scopes).
fn primary_arg(args: &serde_json::Value) -> String {
    for key in ["path", "cmd", "command", "pattern", "directory", "agent_name"] {
        if let Some(v) = args.get(key).and_then(serde_json::Value::as_str) {
            return v.to_string();
        }
    }
    String::new()
}

/// Sequences one assistant message's tool calls through permission
/// evaluation and dispatch.
pub struct ToolExecutor {
    calls: Vec<ModelToolCall>,
    cursor: usize,
    state: ExecutorState,
    pending: Option<(ModelToolCall, Scope, RiskLevel, String)>,
}

impl ToolExecutor {
    /// `depth` is the number of contiguous tool-producing turns since the
    /// last user message, counting this one; `max_depth` is the configured
    /// ceiling (default 15).
    pub fn new(calls: Vec<ModelToolCall>, depth: usize, max_depth: usize) -> Self {
        let state = if depth > max_depth { ExecutorState::IterationLimitReached } else { ExecutorState::Idle };
        Self { calls, cursor: 0, state, pending: None }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Advance the state machine by one step.
    pub async fn tick(&mut self, registry: &ToolRegistry, permissions: &mut PermissionEngine, now_ms: u64) -> TickOutcome {
        if self.state == ExecutorState::IterationLimitReached {
            return TickOutcome::IterationLimitReached;
        }
        if self.state == ExecutorState::AwaitingPermission {
            // Caller must resolve the pending prompt first; nothing to do.
            return TickOutcome::Continue;
        }
        if self.cursor >= self.calls.len() {
            self.state = ExecutorState::IterationComplete;
            return TickOutcome::IterationComplete;
        }

        let call = self.calls[self.cursor].clone();
        let Some(tool) = registry.get(&call.name) else {
            self.cursor += 1;
            let result = ToolResult::err(ToolErrorKind::NotFound, format!("unknown tool: {}", call.name), 0);
            return TickOutcome::RenderRequested { display_message: display_message(&call, &result, now_ms), tool_message: tool_message(&call, &result, now_ms) };
        };

        let args: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => {
                self.cursor += 1;
                permissions.record_validation_failure(&call.name, &call.arguments, format!("malformed arguments: {e}"));
                let result = ToolResult::err(ToolErrorKind::ParseError, format!("malformed tool arguments: {e}"), 0);
                return TickOutcome::RenderRequested { display_message: display_message(&call, &result, now_ms), tool_message: tool_message(&call, &result, now_ms) };
            }
        };

        let scope = tool.scope();
        let risk = tool.risk_level();
        let path = primary_arg(&args);
        let evaluation = permissions.evaluate(&call.name, &args.to_string(), scope, &path, risk);

        match evaluation {
            PermissionEvaluation::AutoApprove => {
                self.cursor += 1;
                let result = self.dispatch(registry, &call, args).await;
                TickOutcome::RenderRequested { display_message: display_message(&call, &result, now_ms), tool_message: tool_message(&call, &result, now_ms) }
            }
            PermissionEvaluation::Deny => {
                self.cursor += 1;
                let result = ToolResult::err(ToolErrorKind::PermissionDenied, "denied by policy", 0);
                TickOutcome::RenderRequested { display_message: display_message(&call, &result, now_ms), tool_message: tool_message(&call, &result, now_ms) }
            }
            PermissionEvaluation::AskUser { .. } => {
                self.state = ExecutorState::AwaitingPermission;
                self.pending = Some((call.clone(), scope, risk, path));
                TickOutcome::ShowPermissionPrompt { tool_call: call, evaluation }
            }
        }
    }

    /// Resolve a pending `ask_user` prompt.
    /// Extraneous responses (no prompt pending) are ignored.
    pub async fn submit_permission_response(
        &mut self,
        registry: &ToolRegistry,
        permissions: &mut PermissionEngine,
        choice: UserChoice,
        now_ms: u64,
    ) -> Option<(Message, Message)> {
        let (call, scope, _risk, _path) = self.pending.take()?;
        if self.state != ExecutorState::AwaitingPermission {
            return None;
        }
        self.state = ExecutorState::Idle;
        self.cursor += 1;

        let approved = permissions.resolve_user_choice(&call.name, &call.arguments, scope, choice);
        let result = if approved {
            let args: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or(serde_json::json!({}));
            self.dispatch(registry, &call, args).await
        } else {
            ToolResult::err(ToolErrorKind::PermissionDenied, "denied by user", 0)
        };
        Some((display_message(&call, &result, now_ms), tool_message(&call, &result, now_ms)))
    }

    async fn dispatch(&self, registry: &ToolRegistry, call: &ModelToolCall, args: serde_json::Value) -> ToolResult {
        let start = Instant::now();
        let exec_call = ExecToolCall { id: call.id.clone(), name: call.name.clone(), args };
        let mut result = registry.execute(&exec_call).await;
        if result.duration_ms == 0 {
            result.duration_ms = start.elapsed().as_millis() as u64;
        }
        result
    }

    /// True once every call in this list has produced a message pair.
    pub fn is_complete(&self) -> bool {
        self.state == ExecutorState::IterationComplete
    }
}

fn display_message(call: &ModelToolCall, result: &ToolResult, now_ms: u64) -> Message {
    let header = format!("Tool: {} ({})", call.name, call.arguments);
    let body = if result.success { result.display_content.clone() } else { format!("Error: {}", result.display_content) };
    Message::system(format!("{header}\n{body}"), now_ms)
}

fn tool_message(call: &ModelToolCall, result: &ToolResult, now_ms: u64) -> Message {
    let payload = if result.success {
        result.data.clone().unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::json!({
            "success": false,
            "error_kind": result.error_kind,
            "error_message": result.error_message,
        })
    };
    Message::tool_result(call.id.clone(), payload.to_string(), now_ms)
}
