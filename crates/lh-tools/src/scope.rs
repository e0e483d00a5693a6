// SPDX-License-Identifier: MIT
//! Permission scopes and risk levels a tool declares about itself.

use serde::{Deserialize, Serialize};

/// The category of access a tool needs. Closed set per the tool contract,
/// plus `TaskManagement` for sub-agent dispatch (`run_agent`/`list_agents`),
/// which the wire vocabulary calls "task_management" without formally adding
/// it to the scope enumeration — added here so it has a concrete variant
/// instead of being misfiled under an unrelated scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    ReadFiles,
    WriteFiles,
    ExecuteCommands,
    NetworkAccess,
    SystemInfo,
    TodoManagement,
    TaskManagement,
    /// Any scope name a future build introduced that this one doesn't
    /// recognize yet. Never produced by a tool, only read back from a
    /// `policies.json` written by a newer version, so a persisted record
    /// using it can be skipped at load instead of failing the whole file.
    #[serde(other)]
    Unknown,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::ReadFiles => "read_files",
            Scope::WriteFiles => "write_files",
            Scope::ExecuteCommands => "execute_commands",
            Scope::NetworkAccess => "network_access",
            Scope::SystemInfo => "system_info",
            Scope::TodoManagement => "todo_management",
            Scope::TaskManagement => "task_management",
            Scope::Unknown => "unknown",
        }
    }

    /// File-scoped scopes get `*` path policies on "always allow"; others get
    /// an empty pattern.
    pub fn is_file_scoped(&self) -> bool {
        matches!(self, Scope::ReadFiles | Scope::WriteFiles)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level a tool declares for its own invocations. Drives the
/// `show_preview` decision in the permission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_round_trips_through_json() {
        let s = Scope::ExecuteCommands;
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"execute_commands\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn task_management_scope_serializes_as_documented_wire_name() {
        assert_eq!(Scope::TaskManagement.as_str(), "task_management");
    }

    #[test]
    fn risk_level_orders_low_below_high() {
        assert!(RiskLevel::Low < RiskLevel::High);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn file_scoped_detection() {
        assert!(Scope::ReadFiles.is_file_scoped());
        assert!(Scope::WriteFiles.is_file_scoped());
        assert!(!Scope::ExecuteCommands.is_file_scoped());
    }

    #[test]
    fn unrecognized_scope_name_deserializes_to_unknown() {
        let s: Scope = serde_json::from_str("\"some_future_scope\"").unwrap();
        assert_eq!(s, Scope::Unknown);
        assert!(!s.is_file_scoped());
    }
}
