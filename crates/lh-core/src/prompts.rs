// SPDX-License-Identifier: Apache-2.0
//! System-prompt assembly for the main agent loop.

use std::path::Path;

use lh_config::Config;

/// Optional contextual blocks folded into the system prompt.
#[derive(Debug, Default)]
pub struct PromptContext<'a> {
    /// Absolute path to the project root (from `.git` detection).
    pub project_root: Option<&'a Path>,
    /// Names of tools available this turn, used to remind the model what
    /// scopes require permission.
    pub tool_names: &'a [String],
    /// Text appended verbatim after the default guidelines.
    pub append: Option<&'a str>,
}

/// Build the system prompt for the main agent loop, grounded on the
/// project's current configuration (thresholds, thinking mode) so the model
/// understands the file-read and permission behavior it will observe.
pub fn system_prompt(cfg: &Config, ctx: &PromptContext<'_>) -> String {
    let mut s = String::new();
    s.push_str(
        "You are Local Harness, an agentic coding assistant driving a local model through \
         file reads, edits, shell commands, and git operations. Work iteratively: call tools \
         to gather information and make changes, then report back once the task is complete.\n\n",
    );

    s.push_str("## Guidelines\n");
    s.push_str("- Prefer reading a file before editing it.\n");
    s.push_str(&format!(
        "- Files under {} lines are shown in full; files between {} and {} lines are curated \
         by a sub-agent; larger files are summarized to their structural skeleton. Use \
         `read_lines` to request an exact range directly.\n",
        cfg.file_read_small_threshold, cfg.file_read_small_threshold, cfg.file_read_large_threshold
    ));
    s.push_str("- Tool calls that touch the filesystem, shell, or network may require the user's permission; expect a call to be denied and react accordingly rather than retrying blindly.\n");
    s.push_str("- Track multi-step work with `todo_write`/`todo_read` so progress survives across turns.\n");
    s.push_str("- Use `run_agent` to delegate an isolated sub-task to a named sub-agent when that keeps the main conversation focused.\n");

    if let Some(root) = ctx.project_root {
        s.push_str(&format!("\n## Project root\n{}\n", root.display()));
    }

    if !ctx.tool_names.is_empty() {
        s.push_str("\n## Available tools\n");
        for name in ctx.tool_names {
            s.push_str(&format!("- {name}\n"));
        }
    }

    if let Some(extra) = ctx.append {
        s.push_str("\n## Additional instructions\n");
        s.push_str(extra);
        s.push('\n');
    }

    s
}
