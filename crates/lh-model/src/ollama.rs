// SPDX-License-Identifier: Apache-2.0
//! Ollama chat/embedding adapter.
//!
//! Wire format: NDJSON POST to `/api/chat`, one JSON object per line,
//! terminated by an object carrying `"done": true`. Tool-call arguments
//! arrive whole (no delta reassembly needed, unlike LM-Studio).

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::provider::{ModelProvider, ProviderCapabilities, ResponseStream};
use crate::{CompletionRequest, ResponseEvent, Role, ToolCall, Usage};

pub struct OllamaProvider {
    host: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.endpoint)
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
            let mut obj = json!({ "role": role_str(&m.role), "content": m.content });
            if let Some(calls) = &m.tool_calls {
                obj["tool_calls"] = json!(calls
                    .iter()
                    .map(|c| json!({
                        "function": {
                            "name": c.name,
                            "arguments": serde_json::from_str::<Value>(&c.arguments)
                                .unwrap_or_else(|_| json!(c.arguments)),
                        }
                    }))
                    .collect::<Vec<_>>());
            }
            if let Some(id) = &m.tool_call_id {
                obj["tool_call_id"] = json!(id);
            }
            obj
        })
        .collect()
}

/// Parse one complete NDJSON line into a batch of events (normally exactly
/// one `ResponseEvent`, plus a trailing `Done` when `"done": true`).
fn parse_ndjson_line(line: &str) -> Option<Vec<anyhow::Result<ResponseEvent>>> {
    if line.trim().is_empty() {
        return None;
    }
    let v: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(vec![Err(ProviderError::ParseError(e.to_string()).into())]),
    };

    let mut events = Vec::new();
    let message = &v["message"];

    if let Some(thinking) = message["thinking"].as_str() {
        if !thinking.is_empty() {
            events.push(Ok(ResponseEvent::ThinkingDelta(thinking.to_string())));
        }
    }
    if let Some(content) = message["content"].as_str() {
        if !content.is_empty() {
            events.push(Ok(ResponseEvent::TextDelta(content.to_string())));
        }
    }
    if let Some(calls) = message["tool_calls"].as_array() {
        if !calls.is_empty() {
            let tool_calls: Vec<ToolCall> = calls
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let name = c["function"]["name"].as_str().unwrap_or_default().to_string();
                    let args_val = &c["function"]["arguments"];
                    let arguments = if let Some(s) = args_val.as_str() {
                        s.to_string()
                    } else {
                        args_val.to_string()
                    };
                    ToolCall::new(format!("call_{i}"), name, arguments)
                })
                .collect();
            events.push(Ok(ResponseEvent::ToolCalls(tool_calls)));
        }
    }

    if v["done"].as_bool() == Some(true) {
        let prompt_tokens = v["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = v["eval_count"].as_u64().unwrap_or(0) as u32;
        if prompt_tokens > 0 || completion_tokens > 0 {
            events.push(Ok(ResponseEvent::Usage(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            })));
        }
        events.push(Ok(ResponseEvent::Done));
    }

    Some(events)
}

fn drain_complete_ndjson_lines(buf: &mut String) -> Vec<anyhow::Result<ResponseEvent>> {
    let mut events = Vec::new();
    while let Some(nl_pos) = buf.find('\n') {
        let line = buf[..nl_pos].trim_end_matches('\r').to_string();
        *buf = buf[nl_pos + 1..].to_string();
        if let Some(mut evs) = parse_ndjson_line(&line) {
            events.append(&mut evs);
        }
    }
    events
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_thinking: true,
            supports_keep_alive: true,
            supports_tools: true,
            supports_json_mode: true,
            supports_streaming: true,
            supports_embeddings: true,
            supports_context_api: false,
            name: "ollama",
            default_port: 11434,
        }
    }

    async fn chat_stream(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let mut options = json!({});
        if let Some(v) = req.num_ctx {
            options["num_ctx"] = json!(v);
        }
        if let Some(v) = req.num_predict {
            options["num_predict"] = json!(v);
        }
        if let Some(v) = req.temperature {
            options["temperature"] = json!(v);
        }
        if let Some(v) = req.repeat_penalty {
            options["repeat_penalty"] = json!(v);
        }

        let mut body = json!({
            "model": req.model,
            "messages": build_messages(&req.messages),
            "stream": true,
            "think": req.think,
            "options": options,
        });
        if let Some(ka) = &req.keep_alive {
            body["keep_alive"] = json!(ka);
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

        let resp = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::BadStatus { provider: "ollama", status, body: text }.into());
        }

        let byte_stream = resp.bytes_stream();
        let event_stream = byte_stream
            .scan(String::new(), |buf, chunk| {
                let events = match chunk {
                    Ok(b) => {
                        buf.push_str(&String::from_utf8_lossy(&b));
                        drain_complete_ndjson_lines(buf)
                    }
                    Err(e) => vec![Err(ProviderError::StreamInterrupted(e.to_string()).into())],
                };
                std::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }

    async fn embed(&self, model: &str, text: &str) -> anyhow::Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.host.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
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
        let vec = body["embeddings"][0]
            .as_array()
            .ok_or_else(|| ProviderError::ParseError("missing embeddings[0]".into()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ndjson_text_delta() {
        let line = r#"{"message":{"content":"hi"},"done":false}"#;
        let events = parse_ndjson_line(line).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(ResponseEvent::TextDelta(t)) if t == "hi"));
    }

    #[test]
    fn parse_ndjson_thinking_then_done_emits_usage_and_done() {
        let line = r#"{"message":{"thinking":"pondering"},"done":true,"prompt_eval_count":10,"eval_count":5}"#;
        let events = parse_ndjson_line(line).unwrap();
        assert!(matches!(&events[0], Ok(ResponseEvent::ThinkingDelta(t)) if t == "pondering"));
        assert!(matches!(&events[1], Ok(ResponseEvent::Usage(u)) if u.prompt_tokens == 10 && u.completion_tokens == 5));
        assert!(matches!(&events[2], Ok(ResponseEvent::Done)));
    }

    #[test]
    fn parse_ndjson_tool_calls_whole_object_arguments() {
        let line = r#"{"message":{"tool_calls":[{"function":{"name":"read_file","arguments":{"path":"a.rs"}}}]},"done":false}"#;
        let events = parse_ndjson_line(line).unwrap();
        match &events[0] {
            Ok(ResponseEvent::ToolCalls(calls)) => {
                assert_eq!(calls[0].name, "read_file");
                assert!(calls[0].arguments.contains("a.rs"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn drain_handles_line_split_across_chunks() {
        let full = r#"{"message":{"content":"partial chunk"},"done":false}"#;
        let mid = full.len() / 2;
        let mut buf = String::new();
        buf.push_str(&full[..mid]);
        assert!(drain_complete_ndjson_lines(&mut buf).is_empty());
        buf.push_str(&full[mid..]);
        buf.push('\n');
        let events = drain_complete_ndjson_lines(&mut buf);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn done_without_counts_emits_only_done() {
        let line = r#"{"message":{},"done":true}"#;
        let events = parse_ndjson_line(line).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(ResponseEvent::Done)));
    }
}
