// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Error taxonomy propagated upward from provider adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to connect to {0}")]
    ConnectFailed(String),
    #[error("{provider} returned status {status}: {body}")]
    BadStatus { provider: &'static str, status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("embedding API error: {0}")]
    EmbeddingApiError(String),
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
}
