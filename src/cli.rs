// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Command-line surface: flags override config values which override the
//! built-in defaults (CLI > config > defaults, per the priority
//! documented for the interactive front end).

use std::path::PathBuf;

use clap::Parser;
use lh_config::Provider;

/// Local Harness: an interactive terminal front end that drives a local
/// LLM backend (Ollama or LM-Studio) through agentic coding sessions.
#[derive(Parser, Debug)]
#[command(name = "localharness", version, about, long_about = None)]
pub struct Cli {
    /// Override the model configured in config.json.
    #[arg(long)]
    pub model: Option<String>,

    /// Override the backend provider ("ollama" or "lmstudio").
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Override the Ollama base URL.
    #[arg(long)]
    pub ollama_host: Option<String>,

    /// Override the LM-Studio base URL.
    #[arg(long)]
    pub lmstudio_host: Option<String>,

    /// Path to an explicit config.json, bypassing the default XDG location.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Apply CLI overrides onto a loaded config. CLI flags win over whatever the
/// config file set; fields the user didn't pass through stay as loaded.
pub fn apply_overrides(mut cfg: lh_config::Config, cli: &Cli) -> lh_config::Config {
    if let Some(model) = &cli.model {
        cfg.model = model.clone();
    }
    if let Some(provider) = cli.provider {
        cfg.provider = provider;
    }
    if let Some(host) = &cli.ollama_host {
        cfg.ollama_host = host.clone();
    }
    if let Some(host) = &cli.lmstudio_host {
        cfg.lmstudio_host = host.clone();
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_apply_fields_the_user_passed() {
        let cfg = lh_config::Config::default();
        let cli = Cli { model: Some("qwen2.5-coder".into()), provider: None, ollama_host: None, lmstudio_host: None, config: None };
        let out = apply_overrides(cfg.clone(), &cli);
        assert_eq!(out.model, "qwen2.5-coder");
        assert_eq!(out.provider, cfg.provider);
    }

    #[test]
    fn provider_override_switches_backend() {
        let cfg = lh_config::Config::default();
        let cli = Cli { model: None, provider: Some(Provider::Lmstudio), ollama_host: None, lmstudio_host: None, config: None };
        let out = apply_overrides(cfg, &cli);
        assert_eq!(out.provider, Provider::Lmstudio);
    }
}
