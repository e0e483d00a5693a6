// SPDX-License-Identifier: Apache-2.0
//! Agent discovery.
//!
//! Agents are either native (built at startup, e.g. `file_curator`) or
//! markdown-sourced: a `*.md` file under `<config_dir>/agents/` with YAML
//! frontmatter + a body that becomes the system prompt, parsed with a
//! hand-rolled `---\n...\n---` splitter feeding `serde_yaml`, not a generic
//! frontmatter crate.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Per-agent overrides to the default model-call parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCapabilities {
    pub max_iterations: u32,
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_predict: u32,
    pub enable_thinking: bool,
    pub model_override: Option<String>,
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self { max_iterations: 5, temperature: 0.7, num_ctx: 8192, num_predict: 2048, enable_thinking: false, model_override: None }
    }
}

/// `{name, description, system_prompt, allowed_tool_names[], capabilities}`
///. Native agents are constructed in Rust; markdown-sourced ones
/// are parsed from `<config_dir>/agents/*.md`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub allowed_tool_names: Vec<String>,
    pub capabilities: AgentCapabilities,
}

/// Name must be lowercase and match `[a-z0-9_-]+`.
pub fn is_valid_agent_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// The `file_curator` sub-agent used by the read-file pipeline:
/// no tools, low temperature, large context, short iteration budget.
pub fn file_curator_definition() -> AgentDefinition {
    AgentDefinition {
        name: "file_curator".to_string(),
        description: "Selects the line ranges of a file worth showing in full".to_string(),
        system_prompt: "You curate source files for an agentic coding assistant. Given a file's \
             full content and optional recent conversation context, respond with JSON describing \
             the line ranges most relevant to the current task: \
             {\"ranges\":[{\"start\":N,\"end\":M,\"annotation\":\"optional note\"}]}. \
             Line numbers are 1-indexed and inclusive. Do not include any other text."
            .to_string(),
        allowed_tool_names: Vec::new(),
        capabilities: AgentCapabilities { max_iterations: 2, temperature: 0.3, num_ctx: 16384, num_predict: 2000, enable_thinking: false, model_override: None },
    }
}

#[derive(Debug, Deserialize, Default)]
struct AgentFrontmatter {
    name: Option<String>,
    #[serde(default)]
    description: String,
    /// CSV list of allowed tool names, e.g. `"read_file,grep_search"`.
    #[serde(default)]
    tools: String,
}

/// Parse one markdown agent file. `stem` is the filename without extension,
/// used as the name when frontmatter omits `name`.
fn parse_agent_markdown(raw: &str, stem: &str, path: &Path) -> Option<AgentDefinition> {
    let rest = raw.trim_start_matches('\n');
    let Some(after_open) = rest.strip_prefix("---") else {
        warn!(path = %path.display(), "agent file has no frontmatter — skipping");
        return None;
    };
    let Some(close) = after_open.find("\n---") else {
        warn!(path = %path.display(), "agent frontmatter is not terminated — skipping");
        return None;
    };
    let yaml_block = &after_open[..close];
    let body = after_open[close + 4..].trim_start_matches('\n').trim_end().to_string();

    let fm: AgentFrontmatter = match serde_yaml::from_str(yaml_block) {
        Ok(fm) => fm,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse agent frontmatter — skipping");
            return None;
        }
    };

    let name = fm.name.unwrap_or_else(|| stem.to_string());
    if !is_valid_agent_name(&name) {
        warn!(path = %path.display(), name, "agent name is not [a-z0-9_-]+ — skipping");
        return None;
    }

    let allowed_tool_names = fm.tools.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();

    Some(AgentDefinition {
        name,
        description: fm.description,
        system_prompt: body,
        allowed_tool_names,
        capabilities: AgentCapabilities::default(),
    })
}

/// Render an [`AgentDefinition`] back to the markdown-with-frontmatter form
/// [`parse_agent_markdown`] reads, for the config round-trip the policies
/// and config loaders both support.
pub fn to_markdown(def: &AgentDefinition) -> String {
    format!(
        "---\nname: {}\ndescription: {}\ntools: {}\n---\n\n{}\n",
        def.name,
        def.description,
        def.allowed_tool_names.join(", "),
        def.system_prompt,
    )
}

/// Enumerate and parse every `*.md` file directly under `dir`. Unreadable or
/// malformed files are skipped with a warning rather than aborting discovery.
fn load_from_dir(dir: &Path) -> Vec<AgentDefinition> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return out,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_string();
        let raw = match fs::read_to_string(&path) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read agent file — skipping");
                continue;
            }
        };
        if let Some(def) = parse_agent_markdown(&raw, &stem, &path) {
            out.push(def);
        }
    }
    out
}

/// Holds every known agent, keyed by name. Built-ins are always present;
/// [`AgentRegistry::reload`] atomically replaces the markdown-sourced set.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentDefinition>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        let mut reg = Self::default();
        reg.register(file_curator_definition());
        reg
    }

    pub fn register(&mut self, def: AgentDefinition) {
        self.agents.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// Clear and rebuild the markdown-sourced portion of the registry from
    /// `agents_dir`, keeping native agents.
    pub fn reload(&mut self, agents_dir: &Path) {
        let mut rebuilt = HashMap::new();
        rebuilt.insert(file_curator_definition().name.clone(), file_curator_definition());
        for def in load_from_dir(agents_dir) {
            if rebuilt.contains_key(&def.name) {
                warn!(name = %def.name, "duplicate agent name — later definition wins");
            }
            rebuilt.insert(def.name.clone(), def);
        }
        self.agents = rebuilt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn valid_names_accept_lowercase_digits_dash_underscore() {
        assert!(is_valid_agent_name("security-auditor_2"));
        assert!(!is_valid_agent_name("Security-Auditor"));
        assert!(!is_valid_agent_name(""));
        assert!(!is_valid_agent_name("has space"));
    }

    #[test]
    fn new_registry_contains_file_curator() {
        let reg = AgentRegistry::new();
        assert!(reg.get("file_curator").is_some());
        assert_eq!(reg.get("file_curator").unwrap().capabilities.max_iterations, 2);
    }

    #[test]
    fn parses_markdown_with_frontmatter() {
        let raw = "---\nname: reviewer\ndescription: reviews diffs\ntools: read_file, grep_search\n---\n\nYou review code.\n";
        let def = parse_agent_markdown(raw, "reviewer", Path::new("reviewer.md")).unwrap();
        assert_eq!(def.name, "reviewer");
        assert_eq!(def.allowed_tool_names, vec!["read_file", "grep_search"]);
        assert_eq!(def.system_prompt, "You review code.");
    }

    #[test]
    fn missing_name_falls_back_to_file_stem() {
        let raw = "---\ndescription: x\n---\nBody text\n";
        let def = parse_agent_markdown(raw, "my_agent", Path::new("my_agent.md")).unwrap();
        assert_eq!(def.name, "my_agent");
    }

    #[test]
    fn invalid_name_is_rejected() {
        let raw = "---\nname: Not Valid\n---\nBody\n";
        assert!(parse_agent_markdown(raw, "stem", Path::new("x.md")).is_none());
    }

    #[test]
    fn missing_frontmatter_is_rejected() {
        let raw = "Just a plain body with no frontmatter.\n";
        assert!(parse_agent_markdown(raw, "stem", Path::new("x.md")).is_none());
    }

    #[test]
    fn reload_discovers_files_on_disk_and_keeps_file_curator() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("helper.md"), "---\nname: helper\ndescription: helps\n---\nHelp the user.\n").unwrap();
        let mut reg = AgentRegistry::new();
        reg.reload(dir.path());
        assert!(reg.get("helper").is_some());
        assert!(reg.get("file_curator").is_some());
    }

    #[test]
    fn markdown_round_trip_is_stable() {
        let raw = "---\nname: reviewer\ndescription: reviews diffs\ntools: read_file, grep_search\n---\n\nYou review code.\n";
        let first = parse_agent_markdown(raw, "reviewer", Path::new("reviewer.md")).unwrap();
        let rendered = to_markdown(&first);
        let second = parse_agent_markdown(&rendered, "reviewer", Path::new("reviewer.md")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reload_replaces_previous_markdown_agents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "---\nname: a\n---\nBody\n").unwrap();
        let mut reg = AgentRegistry::new();
        reg.reload(dir.path());
        assert!(reg.get("a").is_some());
        fs::remove_file(dir.path().join("a.md")).unwrap();
        fs::write(dir.path().join("b.md"), "---\nname: b\n---\nBody\n").unwrap();
        reg.reload(dir.path());
        assert!(reg.get("a").is_none());
        assert!(reg.get("b").is_some());
    }
}
