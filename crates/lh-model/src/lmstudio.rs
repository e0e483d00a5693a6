// SPDX-License-Identifier: Apache-2.0
//! LM-Studio adapter: OpenAI-compatible `/v1/chat/completions`
//! over SSE with chunked transfer encoding. `reqwest`/hyper decode the HTTP
//! chunked transport transparently, so no manual chunk-size/CRLF parsing is
//! needed on top of `bytes_stream()` — only the SSE `data: ` line framing
//! and the delta-encoded tool-call reassembly below are this module's job.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

use crate::error::ProviderError;
use crate::provider::{ModelProvider, ProviderCapabilities, ResponseStream};
use crate::{CompletionRequest, Role, ToolCall, Usage};
use crate::ResponseEvent;

pub struct LmStudioProvider {
    host: String,
    model: String,
    client: reqwest::Client,
}

impl LmStudioProvider {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self { host: host.into(), model: model.into(), client: reqwest::Client::new() }
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.host.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/v1/embeddings", self.host.trim_end_matches('/'))
    }

    fn is_stale_connection_error(e: &reqwest::Error) -> bool {
        let s = e.to_string();
        s.contains("EndOfStream") || s.contains("connection reset") || s.contains("ConnectionReset")
    }
}

fn role_str(r: &Role) -> &'static str {
    match r {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
        Role::DisplayOnlyData => "system",
    }
}

fn build_messages(messages: &[crate::Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| m.is_serializable())
        .map(|m| {
            if let Some(calls) = &m.tool_calls {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|c| json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    }))
                    .collect();
                return json!({ "role": "assistant", "tool_calls": tool_calls });
            }
            let mut obj = json!({ "role": role_str(&m.role), "content": m.content });
            if let Some(id) = &m.tool_call_id {
                obj["role"] = json!("tool");
                obj["tool_call_id"] = json!(id);
            }
            obj
        })
        .collect()
}

/// Internal, pre-reassembly events parsed from a single SSE `data:` line.
#[derive(Debug, Clone)]
enum RawEvent {
    Text(String),
    Thinking(String),
    ToolCallFragment { index: u32, id: Option<String>, name: Option<String>, args_fragment: String },
    FinishToolCalls,
    Usage(Usage),
    Done,
}

fn parse_sse_data_line(line: &str) -> Option<anyhow::Result<RawEvent>> {
    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?.trim();
    if data.is_empty() || data.starts_with(':') {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(RawEvent::Done));
    }
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(ProviderError::ParseError(e.to_string()).into())),
    };
    Some(Ok(parse_sse_chunk(&v)))
}

fn parse_sse_chunk(v: &Value) -> RawEvent {
    if let Some(usage) = v.get("usage").filter(|u| !u.is_null()) {
        let prompt_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = usage["completion_tokens"].as_u64().unwrap_or(0) as u32;
        return RawEvent::Usage(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: usage["total_tokens"].as_u64().unwrap_or((prompt_tokens + completion_tokens) as u64) as u32,
        });
    }

    let choice = &v["choices"][0];
    if choice["finish_reason"].as_str() == Some("tool_calls") {
        return RawEvent::FinishToolCalls;
    }

    let delta = &choice["delta"];
    if let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
        if let Some(tc) = tool_calls.first() {
            let index = tc["index"].as_u64().unwrap_or(0) as u32;
            let id = tc["id"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
            let name = tc["function"]["name"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
            let args_fragment = tc["function"]["arguments"].as_str().unwrap_or("").to_string();
            return RawEvent::ToolCallFragment { index, id, name, args_fragment };
        }
    }

    if let Some(thinking) = delta.get("reasoning_content").and_then(|c| c.as_str())
        .or_else(|| delta.get("reasoning").and_then(|c| c.as_str()))
    {
        if !thinking.is_empty() {
            return RawEvent::Thinking(thinking.to_string());
        }
    }

    let text = delta.get("content").and_then(|c| c.as_str()).unwrap_or("");
    RawEvent::Text(text.to_string())
}

fn drain_complete_sse_lines(buf: &mut String) -> Vec<anyhow::Result<RawEvent>> {
    let mut events = Vec::new();
    while let Some(nl_pos) = buf.find('\n') {
        let line = buf[..nl_pos].trim_end_matches('\r').to_string();
        *buf = buf[nl_pos + 1..].to_string();
        if let Some(ev) = parse_sse_data_line(&line) {
            events.push(ev);
        }
    }
    events
}

/// Per-index delta accumulator, keyed by the `index` field OpenAI-compatible
/// servers attach to each parallel tool-call fragment.
#[derive(Default)]
struct ToolCallAccumulator {
    fragments: HashMap<u32, (Option<String>, Option<String>, String)>,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, index: u32, id: Option<String>, name: Option<String>, args_fragment: &str) {
        let entry = self.fragments.entry(index).or_default();
        if let Some(i) = id {
            entry.0 = Some(i);
        }
        if let Some(n) = name {
            entry.1 = Some(n);
        }
        entry.2.push_str(args_fragment);
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Concatenate all fragments by index into the consolidated tool-call
    /// list, synthesizing an id when the provider omitted one.
    fn flush(&mut self) -> Vec<ToolCall> {
        let mut indices: Vec<u32> = self.fragments.keys().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|idx| {
                let (id, name, args) = self.fragments.remove(&idx).unwrap();
                ToolCall::new(id.unwrap_or_else(|| format!("call_{idx}")), name.unwrap_or_default(), args)
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_thinking: false,
            supports_keep_alive: false,
            supports_tools: true,
            supports_json_mode: true,
            supports_streaming: true,
            supports_embeddings: true,
            supports_context_api: true,
            name: "lmstudio",
            default_port: 1234,
        }
    }

    async fn chat_stream(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        // think / keep_alive / num_ctx / repeat_penalty are silently dropped —
        // the OpenAI-compatible wire format has no place for them.
        let mut body = json!({
            "model": req.model,
            "messages": build_messages(&req.messages),
            "stream": true,
            "stream_options": { "include_usage": true },
        });
        if let Some(t) = req.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(n) = req.num_predict {
            body["max_tokens"] = json!(n);
        }
        if !req.tools.is_empty() {
            body["tools"] = json!(req
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": { "name": t.name, "description": t.description, "parameters": t.parameters },
                }))
                .collect::<Vec<_>>());
        }

        let resp = self.send_with_retry(&body).await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus { provider: "lmstudio", status, body: text }.into());
        }

        let byte_stream = resp.bytes_stream();
        let event_stream = byte_stream
            .scan((String::new(), ToolCallAccumulator::default()), |(buf, acc), chunk| {
                let mut out: Vec<anyhow::Result<ResponseEvent>> = Vec::new();
                let raw_events = match chunk {
                    Ok(b) => {
                        buf.push_str(&String::from_utf8_lossy(&b));
                        drain_complete_sse_lines(buf)
                    }
                    Err(e) => vec![Err(ProviderError::StreamInterrupted(e.to_string()).into())],
                };
                for raw in raw_events {
                    match raw {
                        Ok(RawEvent::Text(t)) => {
                            if !t.is_empty() {
                                out.push(Ok(ResponseEvent::TextDelta(t)));
                            }
                        }
                        Ok(RawEvent::Thinking(t)) => out.push(Ok(ResponseEvent::ThinkingDelta(t))),
                        Ok(RawEvent::ToolCallFragment { index, id, name, args_fragment }) => {
                            acc.absorb(index, id, name, &args_fragment);
                        }
                        Ok(RawEvent::FinishToolCalls) => {
                            out.push(Ok(ResponseEvent::ToolCalls(acc.flush())));
                        }
                        Ok(RawEvent::Usage(u)) => out.push(Ok(ResponseEvent::Usage(u))),
                        Ok(RawEvent::Done) => {
                            if !acc.is_empty() {
                                out.push(Ok(ResponseEvent::ToolCalls(acc.flush())));
                            }
                            out.push(Ok(ResponseEvent::Done));
                        }
                        Err(e) => out.push(Err(e)),
                    }
                }
                std::future::ready(Some(out))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }

    async fn embed(&self, model: &str, text: &str) -> anyhow::Result<Vec<f32>> {
        let resp = self
            .client
            .post(self.models_url())
            .json(&json!({ "model": model, "input": text }))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::EmbeddingApiError(format!("status {status}: {text}")).into());
        }
        let body: Value = resp.json().await.map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let vec = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| ProviderError::ParseError("missing data[0].embedding".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        Ok(vec)
    }
}

impl LmStudioProvider {
    /// Send the chat request, recreating the client and retrying once on a
    /// stale-connection error.
    async fn send_with_retry(&self, body: &Value) -> anyhow::Result<reqwest::Response> {
        match self.client.post(self.chat_url()).json(body).send().await {
            Ok(r) => Ok(r),
            Err(e) if Self::is_stale_connection_error(&e) => {
                sleep(Duration::from_millis(100)).await;
                let fresh = reqwest::Client::new();
                fresh
                    .post(self.chat_url())
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| ProviderError::ConnectFailed(e.to_string()).into())
            }
            Err(e) => Err(ProviderError::ConnectFailed(e.to_string()).into()),
        }
    }
}
