// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::{CompletionRequest, ResponseEvent};

pub type ResponseStream = Pin<Box<dyn Stream<Item = anyhow::Result<ResponseEvent>> + Send>>;

/// Capability descriptor, used by the caller to suppress unsupported
/// parameters before they are sent to a given backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub supports_thinking: bool,
    pub supports_keep_alive: bool,
    pub supports_tools: bool,
    pub supports_json_mode: bool,
    pub supports_streaming: bool,
    pub supports_embeddings: bool,
    pub supports_context_api: bool,
    pub name: &'static str,
    pub default_port: u16,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as configured.
    fn model_name(&self) -> &str;

    /// Capability descriptor for this backend.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send a completion request and return a streaming response.
    async fn chat_stream(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream>;

    /// Embed a single piece of text as a dense float32 vector.
    async fn embed(&self, model: &str, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embed a batch of texts.
    ///
    /// Default implementation embeds one at a time; providers whose API
    /// supports true batching should override this.
    async fn embed_batch(&self, model: &str, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(model, t).await?);
        }
        Ok(out)
    }

    /// Query the live API for the actual context window in use.
    ///
    /// Default implementation returns `None` (no live probe available).
    async fn probe_context_window(&self) -> Option<u32> {
        None
    }
}
