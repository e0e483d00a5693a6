// SPDX-License-Identifier: Apache-2.0
//! In-memory conversation history.

use lh_model::{Message, Role, TurnRecord};
use uuid::Uuid;

/// Owns the message list for one conversation. The master loop is the sole
/// mutator; the tool executor and sub-agent executor only borrow it.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// Approximate total token count for the current message list.
    pub token_count: usize,
    /// Maximum context tokens, used to decide when history compression
    /// should run.
    pub max_tokens: usize,
    /// Lightweight per-turn audit trail, distinct from `messages`, used for
    /// the session summary printed on quit.
    pub turns: Vec<TurnRecord>,
}

impl Session {
    pub fn new(max_tokens: usize) -> Self {
        Self { id: Uuid::new_v4().to_string(), messages: Vec::new(), token_count: 0, max_tokens, turns: Vec::new() }
    }

    pub fn push(&mut self, msg: Message) {
        self.token_count += msg.approx_tokens();
        self.messages.push(msg);
    }

    pub fn push_many(&mut self, msgs: impl IntoIterator<Item = Message>) {
        for m in msgs {
            self.push(m);
        }
    }

    pub fn record_turn(&mut self, role: Role, content_len: usize, tool_call_count: usize, timestamp_ms: u64) {
        self.turns.push(TurnRecord { role, content_len, tool_call_count, timestamp_ms });
    }

    /// Fraction of the context window consumed (0.0-1.0).
    pub fn context_fraction(&self) -> f32 {
        if self.max_tokens == 0 {
            return 0.0;
        }
        (self.token_count as f32) / (self.max_tokens as f32)
    }

    pub fn is_near_limit(&self, threshold: f32) -> bool {
        self.context_fraction() >= threshold
    }

    /// Recalculate token count from scratch (call after history compression
    /// or a retroactive secondary-loop rewrite).
    pub fn recalculate_tokens(&mut self) {
        self.token_count = self.messages.iter().map(|m| m.approx_tokens()).sum();
    }

    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.recalculate_tokens();
    }

    /// Serialize history for the provider per  step 1:
    /// drop `display_only_data`, keep at most one `system` message at
    /// position 0, copy `tool_call_id`/`tool_calls` through faithfully.
    pub fn serialize_for_provider(&self) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::with_capacity(self.messages.len());
        let mut seen_system = false;
        for m in &self.messages {
            if !m.is_serializable() {
                continue;
            }
            if m.role == Role::System {
                if seen_system {
                    continue;
                }
                seen_system = true;
            }
            out.push(m.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_unique_id() {
        let a = Session::new(1000);
        let b = Session::new(1000);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn new_session_starts_empty() {
        let s = Session::new(1000);
        assert!(s.messages.is_empty());
        assert_eq!(s.token_count, 0);
    }

    #[test]
    fn push_increments_token_count() {
        let mut s = Session::new(1000);
        s.push(Message::user("12345678", 0));
        assert_eq!(s.token_count, 2);
    }

    #[test]
    fn recalculate_tokens_matches_push_sum() {
        let mut s = Session::new(1000);
        s.push(Message::user("hello world", 0));
        let after_push = s.token_count;
        s.recalculate_tokens();
        assert_eq!(s.token_count, after_push);
    }

    #[test]
    fn context_fraction_zero_max_does_not_panic() {
        let s = Session::new(0);
        assert_eq!(s.context_fraction(), 0.0);
    }

    #[test]
    fn is_near_limit_true_when_over_threshold() {
        let mut s = Session::new(4);
        s.push(Message::user("1234567890123", 0));
        s.push(Message::user("abcd", 0));
        assert!(s.is_near_limit(0.8));
    }

    // ── Invariant 1: message-history model compatibility ──────────

    #[test]
    fn serialize_drops_display_only_data() {
        let mut s = Session::new(1000);
        s.push(Message::user("hi", 0));
        s.push(Message { role: Role::DisplayOnlyData, content: "rendered only".into(), ..blank() });
        let out = s.serialize_for_provider();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "hi");
    }

    #[test]
    fn serialize_keeps_only_first_system_message() {
        let mut s = Session::new(1000);
        s.push(Message::system("first", 0));
        s.push(Message::user("hi", 1));
        s.push(Message::system("second", 2));
        let out = s.serialize_for_provider();
        assert_eq!(out.iter().filter(|m| m.role == Role::System).count(), 1);
        assert_eq!(out[0].content, "first");
    }

    #[test]
    fn serialize_preserves_tool_call_id() {
        let mut s = Session::new(1000);
        s.push(Message::tool_result("call_1", "result", 0));
        let out = s.serialize_for_provider();
        assert_eq!(out[0].tool_call_id.as_deref(), Some("call_1"));
    }

    fn blank() -> Message {
        Message::user("", 0)
    }
}
