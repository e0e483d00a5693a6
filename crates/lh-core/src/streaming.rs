// SPDX-License-Identifier: Apache-2.0
//! Streaming chat loop: assembles a completion request from the
//! session, drives one provider turn to completion, and reports deltas
//! through the event channel as they arrive.

use futures::StreamExt;
use tokio::sync::mpsc;

use lh_config::Config;
use lh_model::{CompletionRequest, ModelProvider, ResponseEvent, ToolCall as ModelToolCall, ToolSchema, Usage};

use crate::events::AgentEvent;
use crate::session::Session;

/// Everything a completed streaming turn produced.
#[derive(Debug, Default, Clone)]
pub struct StreamOutcome {
    pub content: String,
    pub thinking: Option<String>,
    pub tool_calls: Vec<ModelToolCall>,
    pub usage: Option<Usage>,
    /// Set when the provider reported an `Error` event mid-stream; `Done`
    /// still arrives and the partial content/thinking accumulated so far is
    /// preserved so the caller can commit it rather than discard the turn.
    pub errored: Option<String>,
}

impl StreamOutcome {
    pub fn had_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Assemble the provider request for the next turn: serialize history
/// and drop parameters the active provider does not
/// support.
pub fn build_request(session: &Session, cfg: &Config, tools: Vec<ToolSchema>, provider: &dyn ModelProvider) -> CompletionRequest {
    let caps = provider.capabilities();
    CompletionRequest {
        model: provider.model_name().to_string(),
        messages: session.serialize_for_provider(),
        tools: if caps.supports_tools { tools } else { Vec::new() },
        think: caps.supports_thinking && cfg.enable_thinking,
        keep_alive: if caps.supports_keep_alive { Some(cfg.model_keep_alive.clone()) } else { None },
        num_ctx: if caps.supports_context_api { Some(cfg.num_ctx) } else { None },
        num_predict: Some(cfg.num_predict),
        temperature: None,
        repeat_penalty: None,
    }
}

/// Drive one provider turn to completion, forwarding every delta through
/// `tx` as it arrives. A background task owns the provider stream and
/// forwards parsed events across an internal channel so the caller never
/// blocks the streaming task with its own event-handling work.
///
/// Returns `Ok` even when the provider reported a stream-level error: the
/// error text is attached to `StreamOutcome::errored` and any text streamed
/// before the error is preserved, matching the "done is delivered exactly
/// once, including after an error" contract in 
pub async fn run_turn(provider: &dyn ModelProvider, request: CompletionRequest, tx: &mpsc::Sender<AgentEvent>) -> anyhow::Result<StreamOutcome> {
    let mut stream = provider.chat_stream(request).await?;

    let (inner_tx, mut inner_rx) = mpsc::unbounded_channel::<anyhow::Result<ResponseEvent>>();
    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            if inner_tx.send(event).is_err() {
                break;
            }
        }
    });

    let mut outcome = StreamOutcome::default();
    let mut thinking_buf = String::new();

    while let Some(event) = inner_rx.recv().await {
        match event {
            Ok(ResponseEvent::TextDelta(delta)) => {
                outcome.content.push_str(&delta);
                let _ = tx.send(AgentEvent::TextDelta(delta)).await;
            }
            Ok(ResponseEvent::ThinkingDelta(delta)) => {
                thinking_buf.push_str(&delta);
                let _ = tx.send(AgentEvent::ThinkingDelta(delta)).await;
            }
            Ok(ResponseEvent::ToolCalls(calls)) => {
                for call in &calls {
                    let _ = tx.send(AgentEvent::ToolCallStarted(call.clone())).await;
                }
                outcome.tool_calls = calls;
            }
            Ok(ResponseEvent::Usage(usage)) => {
                outcome.usage = Some(usage);
            }
            Ok(ResponseEvent::Done) => break,
            Ok(ResponseEvent::Error(msg)) => {
                outcome.errored = Some(msg);
            }
            Err(e) => {
                outcome.errored = Some(e.to_string());
            }
        }
    }

    if !thinking_buf.is_empty() {
        outcome.thinking = Some(thinking_buf);
    }
    // Auto-collapse: announce turn completion once so a front end can fold
    // the thinking block regardless of whether it streamed any content.
    let _ = tx.send(AgentEvent::TurnTextComplete { content: outcome.content.clone(), thinking: outcome.thinking.clone() }).await;

    Ok(outcome)
}
