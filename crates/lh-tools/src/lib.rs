// SPDX-License-Identifier: MIT
pub mod builtin;
pub mod curator;
pub mod dispatch;
pub mod events;
pub mod permission;
pub mod registry;
pub mod scope;
pub mod tool;

pub use curator::{CurationMode, CuratorOutput, FileCurator, IndexingTask, LineRange};
pub use dispatch::{AgentDispatcher, AgentSummary, DispatchOutcome};
pub use events::{TodoItem, TodoStatus, ToolEvent};
pub use permission::{
    reject_unsafe_path, AuditEvent, AuditLog, AuditOutcome, PermissionEngine, PermissionEvaluation,
    Policy, PolicyMode, PolicyStore, SessionGrants, UserChoice,
};
pub use registry::{ToolRegistry, ToolSchema};
pub use scope::{RiskLevel, Scope};
pub use tool::{OutputCategory, Tool, ToolCall, ToolErrorKind, ToolResult};

pub use builtin::create_file::CreateFileTool;
pub use builtin::edit_file::EditFileTool;
pub use builtin::get_file_tree::GetFileTreeTool;
pub use builtin::git_branch::GitBranchTool;
pub use builtin::git_commit::GitCommitTool;
pub use builtin::grep::GrepSearchTool;
pub use builtin::list_dir::ListDirectoryTool;
pub use builtin::list_agents::ListAgentsTool;
pub use builtin::read_file::ReadFileTool;
pub use builtin::read_lines::ReadLinesTool;
pub use builtin::replace_lines::ReplaceLinesTool;
pub use builtin::run_agent::RunAgentTool;
pub use builtin::run_shell_command::RunShellCommandTool;
pub use builtin::todo_read::TodoReadTool;
pub use builtin::todo_write::TodoWriteTool;
pub use builtin::write_file::WriteFileTool;
