// SPDX-License-Identifier: MIT
//! Permission engine: policy store, session grants, and audit log.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scope::{RiskLevel, Scope};

/// Whether a stored policy always allows or always denies matching calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    AlwaysAllow,
    Deny,
    /// Any mode name a future build introduced that this one doesn't
    /// recognize yet. See [`Scope::Unknown`](crate::scope::Scope::Unknown).
    #[serde(other)]
    Unknown,
}

/// One persisted policy record: "for this scope, paths matching this glob
/// are always-allowed or always-denied".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub scope: Scope,
    pub pattern: String,
    pub mode: PolicyMode,
}

/// Ordered list of [`Policy`] records, persisted as JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PolicyStore {
    policies: Vec<Policy>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted policies file permissively: a single record with an
    /// unrecognized `scope`/`mode` (written by a newer build) is skipped with
    /// a warning instead of failing the whole file, so one forward-looking
    /// entry never nukes every policy a user has already granted.
    pub fn load_from_str(text: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct RawStore {
            #[serde(default)]
            policies: Vec<serde_json::Value>,
        }
        let raw: RawStore = serde_json::from_str(text)?;

        let mut policies = Vec::with_capacity(raw.policies.len());
        for (index, entry) in raw.policies.into_iter().enumerate() {
            match serde_json::from_value::<Policy>(entry) {
                Ok(policy) if policy.scope == Scope::Unknown || policy.mode == PolicyMode::Unknown => {
                    tracing::warn!(index, scope = ?policy.scope, mode = ?policy.mode, "skipping policy entry with unrecognized scope or mode");
                }
                Ok(policy) => policies.push(policy),
                Err(error) => tracing::warn!(index, %error, "skipping malformed policy entry"),
            }
        }
        Ok(Self { policies })
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Persist a policy, e.g. from an `always_allow` user choice.
    pub fn add(&mut self, policy: Policy) {
        self.policies.push(policy);
    }

    /// Evaluate policies for `(scope, path)`, deny patterns first so a deny
    /// always wins over an always-allow for the same scope. Returns `None`
    /// when no policy matches (caller falls through to `ask_user`).
    pub fn evaluate(&self, scope: Scope, path: &str) -> Option<PolicyMode> {
        let matches = |pattern: &str| glob_to_regex(pattern).map(|re| re.is_match(path)).unwrap_or(false);

        for p in self.policies.iter().filter(|p| p.scope == scope && p.mode == PolicyMode::Deny) {
            if matches(&p.pattern) {
                return Some(PolicyMode::Deny);
            }
        }
        for p in self.policies.iter().filter(|p| p.scope == scope && p.mode == PolicyMode::AlwaysAllow) {
            if matches(&p.pattern) {
                return Some(PolicyMode::AlwaysAllow);
            }
        }
        None
    }
}

/// Convert a simple shell glob pattern to a [`Regex`]. Only `*` (match
/// anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => {
                for esc in regex::escape(&c.to_string()).chars() {
                    re.push(esc);
                }
            }
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// In-memory set of `(tool_name, scope)` grants for the current process,
/// never persisted.
#[derive(Debug, Default)]
pub struct SessionGrants {
    granted: HashSet<(String, Scope)>,
}

impl SessionGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, tool_name: impl Into<String>, scope: Scope) {
        self.granted.insert((tool_name.into(), scope));
    }

    pub fn has(&self, tool_name: &str, scope: Scope) -> bool {
        self.granted.contains(&(tool_name.to_string(), scope))
    }
}

/// Outcome of a single audited permission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    AutoApproved,
    DeniedByPolicy,
    UserApproved,
    DeniedByUser,
    FailedValidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub tool: String,
    pub args: String,
    pub outcome: AuditOutcome,
    pub reason: Option<String>,
    pub recorded_policy: Option<Policy>,
}

/// Append-only, in-memory record of every permission decision.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }
}

/// What the engine decided a tool call should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionEvaluation {
    AutoApprove,
    Deny,
    AskUser { show_preview: bool },
}

/// A user's answer to an `ask_user` prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserChoice {
    AllowOnce,
    AskEachTime,
    AlwaysAllow,
    Deny,
}

/// Ties the policy store, session grants, and audit log together behind one
/// evaluation entry point.
pub struct PermissionEngine {
    pub policies: PolicyStore,
    pub grants: SessionGrants,
    pub audit: AuditLog,
}

impl PermissionEngine {
    pub fn new(policies: PolicyStore) -> Self {
        Self { policies, grants: SessionGrants::new(), audit: AuditLog::new() }
    }

    /// Evaluate a tool call: `path` is the primary argument path for
    /// file-scoped tools, or empty for non-file scopes.
    pub fn evaluate(
        &mut self,
        tool_name: &str,
        args_display: &str,
        primary_scope: Scope,
        path: &str,
        risk_level: RiskLevel,
    ) -> PermissionEvaluation {
        if self.grants.has(tool_name, primary_scope) {
            self.audit.record(AuditEvent {
                tool: tool_name.to_string(),
                args: args_display.to_string(),
                outcome: AuditOutcome::AutoApproved,
                reason: Some("session grant".to_string()),
                recorded_policy: None,
            });
            return PermissionEvaluation::AutoApprove;
        }

        match self.policies.evaluate(primary_scope, path) {
            Some(PolicyMode::Deny) => {
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::DeniedByPolicy,
                    reason: Some(format!("deny policy matched for scope {primary_scope}")),
                    recorded_policy: None,
                });
                PermissionEvaluation::Deny
            }
            Some(PolicyMode::AlwaysAllow) => {
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::AutoApproved,
                    reason: Some(format!("always_allow policy matched for scope {primary_scope}")),
                    recorded_policy: None,
                });
                PermissionEvaluation::AutoApprove
            }
            None => PermissionEvaluation::AskUser { show_preview: risk_level >= RiskLevel::High },
        }
    }

    /// Apply a user's answer to a pending `ask_user` evaluation.
    pub fn resolve_user_choice(
        &mut self,
        tool_name: &str,
        args_display: &str,
        scope: Scope,
        choice: UserChoice,
    ) -> bool {
        match choice {
            UserChoice::AllowOnce => {
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::UserApproved,
                    reason: Some("allow_once".to_string()),
                    recorded_policy: None,
                });
                true
            }
            UserChoice::AskEachTime => {
                self.grants.grant(tool_name, scope);
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::UserApproved,
                    reason: Some("ask_each_time: session grant added".to_string()),
                    recorded_policy: None,
                });
                true
            }
            UserChoice::AlwaysAllow => {
                let pattern = if scope.is_file_scoped() { "*".to_string() } else { String::new() };
                let policy = Policy { scope, pattern, mode: PolicyMode::AlwaysAllow };
                self.policies.add(policy.clone());
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::UserApproved,
                    reason: Some("always_allow: policy persisted".to_string()),
                    recorded_policy: Some(policy),
                });
                true
            }
            UserChoice::Deny => {
                self.audit.record(AuditEvent {
                    tool: tool_name.to_string(),
                    args: args_display.to_string(),
                    outcome: AuditOutcome::DeniedByUser,
                    reason: Some("deny (one-shot)".to_string()),
                    recorded_policy: None,
                });
                false
            }
        }
    }

    /// Record a pre-dispatch validation failure: no prompt is shown.
    pub fn record_validation_failure(&mut self, tool_name: &str, args_display: &str, reason: impl Into<String>) {
        self.audit.record(AuditEvent {
            tool: tool_name.to_string(),
            args: args_display.to_string(),
            outcome: AuditOutcome::FailedValidation,
            reason: Some(reason.into()),
            recorded_policy: None,
        });
    }
}

/// Reject absolute paths and `..` traversal segments (used by validators
/// ahead of file-scoped tool dispatch,  step 2).
pub fn reject_unsafe_path(path: &str) -> anyhow::Result<()> {
    let p = Path::new(path);
    if p.is_absolute() {
        anyhow::bail!("absolute paths are not allowed: {path}");
    }
    if p.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        anyhow::bail!("path traversal is not allowed: {path}");
    }
    Ok(())
}
