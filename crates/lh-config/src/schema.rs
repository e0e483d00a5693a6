// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Backend driving the chat/embedding API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    Lmstudio,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Ollama => write!(f, "ollama"),
            Provider::Lmstudio => write!(f, "lmstudio"),
        }
    }
}

fn default_ollama_host() -> String {
    "http://127.0.0.1:11434".into()
}
fn default_ollama_endpoint() -> String {
    "/api/chat".into()
}
fn default_lmstudio_host() -> String {
    "http://127.0.0.1:1234".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_model_keep_alive() -> String {
    "5m".into()
}
fn default_num_ctx() -> u32 {
    8192
}
fn default_num_predict() -> u32 {
    2048
}
fn default_indexing_model() -> String {
    "llama3.2".into()
}
fn default_indexing_temperature() -> f32 {
    0.2
}
fn default_indexing_num_predict() -> u32 {
    1024
}
fn default_indexing_repeat_penalty() -> f32 {
    1.1
}
fn default_indexing_max_iterations() -> u32 {
    2
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_max_chunks_in_history() -> usize {
    20
}
fn default_small_threshold() -> usize {
    200
}
fn default_large_threshold() -> usize {
    500
}
fn default_scroll_lines() -> usize {
    3
}
fn default_max_tool_depth() -> usize {
    15
}
fn default_max_iterations() -> usize {
    10
}

/// Recognized keys of `<config_dir>/config.json`. Unknown keys are ignored
/// by `serde` (no `deny_unknown_fields`); every field is optional via a
/// `#[serde(default)]` so a partial or absent config file falls back to the
/// documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,
    #[serde(default = "default_lmstudio_host")]
    pub lmstudio_host: String,

    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_model_keep_alive")]
    pub model_keep_alive: String,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    #[serde(default = "default_indexing_model")]
    pub indexing_model: String,
    #[serde(default = "default_indexing_temperature")]
    pub indexing_temperature: f32,
    #[serde(default = "default_indexing_num_predict")]
    pub indexing_num_predict: u32,
    #[serde(default = "default_indexing_repeat_penalty")]
    pub indexing_repeat_penalty: f32,
    #[serde(default = "default_indexing_max_iterations")]
    pub indexing_max_iterations: u32,
    #[serde(default)]
    pub indexing_enable_thinking: bool,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub graph_rag_enabled: bool,
    #[serde(default)]
    pub zvdb_path: Option<String>,
    #[serde(default = "default_max_chunks_in_history")]
    pub max_chunks_in_history: usize,

    #[serde(default = "default_small_threshold")]
    pub file_read_small_threshold: usize,
    #[serde(default = "default_large_threshold")]
    pub file_read_large_threshold: usize,

    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default)]
    pub show_tool_json: bool,
    #[serde(default = "default_scroll_lines")]
    pub scroll_lines: usize,

    /// `color_*` ANSI overrides, collected under one map rather than one
    /// field per key so new color keys never require a schema change.
    #[serde(default, flatten)]
    pub colors: ColorOverrides,

    /// Tool-call depth and master-loop iteration ceilings.
    /// Not part of the original key table but exposed here as the natural
    /// place to override the engine's soft-cancellation defaults.
    #[serde(default = "default_max_tool_depth")]
    pub max_tool_depth: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            ollama_host: default_ollama_host(),
            ollama_endpoint: default_ollama_endpoint(),
            lmstudio_host: default_lmstudio_host(),
            model: default_model(),
            model_keep_alive: default_model_keep_alive(),
            num_ctx: default_num_ctx(),
            num_predict: default_num_predict(),
            indexing_model: default_indexing_model(),
            indexing_temperature: default_indexing_temperature(),
            indexing_num_predict: default_indexing_num_predict(),
            indexing_repeat_penalty: default_indexing_repeat_penalty(),
            indexing_max_iterations: default_indexing_max_iterations(),
            indexing_enable_thinking: false,
            embedding_model: default_embedding_model(),
            graph_rag_enabled: false,
            zvdb_path: None,
            max_chunks_in_history: default_max_chunks_in_history(),
            file_read_small_threshold: default_small_threshold(),
            file_read_large_threshold: default_large_threshold(),
            enable_thinking: false,
            show_tool_json: false,
            scroll_lines: default_scroll_lines(),
            colors: ColorOverrides::default(),
            max_tool_depth: default_max_tool_depth(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Catch-all for `color_*` keys: ANSI escape-sequence strings keyed by name
/// (e.g. `color_user`, `color_assistant`, `color_error`). Kept as a map so
/// the set of recognized color names can grow without a schema migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorOverrides {
    #[serde(flatten)]
    pub entries: std::collections::BTreeMap<String, String>,
}
