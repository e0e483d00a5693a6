// SPDX-License-Identifier: Apache-2.0
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::Config;

/// `<XDG_CONFIG_HOME or $HOME/.config>/localharness/config.json`.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// `<config_dir>/policies.json`.
pub fn default_policies_path() -> PathBuf {
    config_dir().join("policies.json")
}

/// `<config_dir>/agents/`.
pub fn default_agents_dir() -> PathBuf {
    config_dir().join("agents")
}

fn config_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("localharness")
}

/// Load the JSON config at `path` (or the default location when `path` is
/// `None`), creating the containing directory and writing out the default
/// document on first run. A malformed file does not abort startup: the
/// parse error is logged as a warning and defaults are used instead, so a
/// typo in the config never blocks the interactive session from starting.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !path.is_file() {
        debug!(path = %path.display(), "no config file found, writing defaults");
        write_defaults(&path)?;
        return Ok(Config::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    match serde_json::from_str::<Config>(&text) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file failed to parse, falling back to defaults");
            Ok(Config::default())
        }
    }
}

fn write_defaults(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let text = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_missing_path_writes_and_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.is_file());
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": "qwen2.5-coder", "provider": "lmstudio"}"#).unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.model, "qwen2.5-coder");
        assert_eq!(cfg.provider, crate::Provider::Lmstudio);
    }

    #[test]
    fn load_malformed_file_falls_back_to_defaults_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn default_config_path_ends_in_localharness_config_json() {
        let p = default_config_path();
        assert!(p.ends_with("localharness/config.json"));
    }

    #[test]
    fn default_policies_path_ends_in_policies_json() {
        let p = default_policies_path();
        assert!(p.ends_with("localharness/policies.json"));
    }

    #[test]
    fn default_agents_dir_ends_in_agents() {
        let p = default_agents_dir();
        assert!(p.ends_with("localharness/agents"));
    }
}
