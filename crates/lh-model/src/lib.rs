// SPDX-License-Identifier: Apache-2.0
mod error;
mod lmstudio;
mod ollama;
mod provider;
mod types;

pub use error::ProviderError;
pub use lmstudio::LmStudioProvider;
pub use ollama::OllamaProvider;
pub use provider::{ModelProvider, ProviderCapabilities, ResponseStream};
pub use types::*;

use lh_config::{Config, Provider};

/// Construct a boxed [`ModelProvider`] from configuration, selecting the
/// backend named by `cfg.provider`.
pub fn from_config(cfg: &Config) -> Box<dyn ModelProvider> {
    match cfg.provider {
        Provider::Ollama => Box::new(OllamaProvider::new(&cfg.ollama_host, &cfg.ollama_endpoint, &cfg.model)),
        Provider::Lmstudio => Box::new(LmStudioProvider::new(&cfg.lmstudio_host, &cfg.model)),
    }
}
