// SPDX-License-Identifier: MIT
pub mod create_file;
pub mod edit_file;
pub mod get_file_tree;
pub mod git_branch;
pub mod git_commit;
pub mod grep;
pub mod list_agents;
pub mod list_dir;
pub mod read_file;
pub mod read_lines;
pub mod replace_lines;
pub mod run_agent;
pub mod run_shell_command;
pub mod todo_read;
pub mod todo_write;
pub mod write_file;

// ─── OutputCategory contract tests ───────────────────────────────────────────
//
// Each builtin tool that overrides `output_category()` is verified here so
// that renames or copy-paste errors are caught at compile time with a clear
// failure message. Tools that intentionally use the default (Generic) are
// also listed so that adding an override never silently goes un-reviewed.
#[cfg(test)]
mod output_category_tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use crate::tool::OutputCategory;
    use crate::Tool;

    // ── HeadTail tools (terminal / process output) ────────────────────────────

    #[test]
    fn run_shell_command_is_headtail() {
        let t = super::run_shell_command::RunShellCommandTool { timeout_secs: 30 };
        assert_eq!(t.output_category(), OutputCategory::HeadTail);
    }

    // ── MatchList tools (ordered result sets) ────────────────────────────────

    #[test]
    fn grep_search_is_matchlist() {
        let t = super::grep::GrepSearchTool;
        assert_eq!(t.output_category(), OutputCategory::MatchList);
    }

    // ── FileContent tools (file reads) ────────────────────────────────────────

    #[test]
    fn read_file_is_filecontent() {
        let t = super::read_file::ReadFileTool::new(
            200,
            500,
            false,
            None,
            Arc::new(Mutex::new(HashSet::new())),
            None,
            Arc::new(Mutex::new(String::new())),
        );
        assert_eq!(t.output_category(), OutputCategory::FileContent);
    }

    // ── Generic tools (no override — hard truncation) ─────────────────────────

    #[test]
    fn write_file_is_generic() {
        let t = super::write_file::WriteFileTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn create_file_is_generic() {
        let t = super::create_file::CreateFileTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn list_directory_is_generic() {
        let t = super::list_dir::ListDirectoryTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn edit_file_is_generic() {
        let t = super::edit_file::EditFileTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn replace_lines_is_generic() {
        let t = super::replace_lines::ReplaceLinesTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn read_lines_is_generic() {
        let t = super::read_lines::ReadLinesTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn get_file_tree_is_generic() {
        let t = super::get_file_tree::GetFileTreeTool;
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }

    #[test]
    fn run_agent_is_generic() {
        struct NoopDispatcher;
        #[async_trait::async_trait]
        impl crate::dispatch::AgentDispatcher for NoopDispatcher {
            async fn run_agent(&self, _agent_name: &str, _task: &str) -> crate::dispatch::DispatchOutcome {
                crate::dispatch::DispatchOutcome::default()
            }
            fn list_agents(&self) -> Vec<crate::dispatch::AgentSummary> {
                vec![]
            }
        }
        let t = super::run_agent::RunAgentTool::new(Arc::new(NoopDispatcher));
        assert_eq!(t.output_category(), OutputCategory::Generic);
    }
}
