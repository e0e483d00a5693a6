// SPDX-License-Identifier: Apache-2.0
//! History compression and tool-result truncation.
//!
//! History compression is treated as an external retrieval step that the
//! engine only consumes: the engine itself never calls the model directly.
//! `rewrite_for_compaction` realizes the one deterministic half of that it
//! owns: turning the current history into a single summarization request.
//! Producing the actual summary (running that request through the model and
//! splicing the result back in) is done by the master loop, which already
//! has a provider handle.
//!
//! `smart_truncate` is the safety net `lh_tools::OutputCategory` exists for:
//! every tool already self-truncates at dispatch time, but this is the
//! second line of defense applied uniformly when a tool result is appended
//! to the session, so no single oversized result can blow the context
//! budget regardless of which tool produced it.

use lh_model::{Message, Role};
use lh_tools::OutputCategory;

const SUMMARIZE_PROMPT: &str = "You are a context compaction assistant. Summarise the following \
     conversation history in a concise, information-dense way. Preserve all technical details, \
     decisions, file names, code snippets, and tool outputs that may be relevant to future work. \
     The summary will replace the original history to free up context space.";

/// Rewrite `messages` into a single summarization request, returning the
/// number of messages that were collapsed. The caller is responsible for
/// running the request through the model and pushing the resulting summary
/// back as the new first user message.
pub fn rewrite_for_compaction(messages: &mut Vec<Message>, system_msg: Option<Message>) -> usize {
    let before = messages.len();
    let history_text = serialize_history(messages);
    let summary_request = Message::user(format!("{SUMMARIZE_PROMPT}\n\n---\n\n{history_text}"), 0);
    messages.clear();
    if let Some(sys) = system_msg {
        messages.push(sys);
    }
    messages.push(summary_request);
    before
}

/// Deterministic fallback when the session is too large to fit even a
/// compaction prompt: drop all but the last `keep_n` non-system messages.
pub fn emergency_compact(messages: &mut Vec<Message>, system_msg: Option<Message>, keep_n: usize) -> usize {
    let before = messages.len();
    let non_system: Vec<Message> = messages.iter().filter(|m| m.role != Role::System).cloned().collect();
    let keep = keep_n.min(non_system.len());
    let preserved: Vec<Message> = non_system[non_system.len() - keep..].to_vec();
    let notice = Message::assistant(
        "[Context emergency-compacted: earlier history was dropped to prevent a context-window \
         overflow. Proceed carefully and ask the user to re-provide any missing requirements.]",
        0,
    );
    messages.clear();
    if let Some(sys) = system_msg {
        messages.push(sys);
    }
    messages.push(notice);
    messages.extend(preserved);
    before
}

/// Category-aware truncation of a tool result before it enters history.
/// Returns `content` unchanged when it already fits within `cap_tokens`.
pub fn smart_truncate(content: &str, category: OutputCategory, cap_tokens: usize) -> String {
    if cap_tokens == 0 {
        return content.to_string();
    }
    let cap_chars = cap_tokens * 4;
    if content.len() <= cap_chars {
        return content.to_string();
    }
    let omitted_bytes = content.len().saturating_sub(cap_chars);
    match category {
        OutputCategory::HeadTail => {
            head_tail_lines(content, cap_chars, 60, 40, &format!("[... {{lines}} lines / {omitted_bytes} bytes omitted ...]"))
        }
        OutputCategory::MatchList => head_lines(
            content,
            cap_chars,
            &format!("[... {{lines}} more matches omitted ({omitted_bytes} bytes); use a more specific pattern to see them ...]"),
        ),
        OutputCategory::FileContent => head_tail_lines(
            content,
            cap_chars,
            usize::MAX,
            usize::MAX,
            &format!("[... {{lines}} lines omitted ({omitted_bytes} bytes); use read_lines to see more ...]"),
        ),
        OutputCategory::Generic => {
            let cut = content[..cap_chars].rfind('\n').map(|p| p + 1).unwrap_or(cap_chars);
            format!("{}\n[... {omitted_bytes} bytes omitted; content truncated to fit context budget ...]", &content[..cut])
        }
    }
}

fn serialize_history(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::Tool => "Tool",
                Role::System => "System",
                Role::DisplayOnlyData => "Display",
            };
            format!("{role}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn head_lines(content: &str, cap_chars: usize, notice_template: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut kept = String::with_capacity(cap_chars);
    let mut kept_count = 0usize;
    for line in &lines {
        let needed = if kept.is_empty() { line.len() } else { line.len() + 1 };
        if kept.len() + needed > cap_chars {
            break;
        }
        if !kept.is_empty() {
            kept.push('\n');
        }
        kept.push_str(line);
        kept_count += 1;
    }
    let omitted = lines.len().saturating_sub(kept_count);
    if omitted == 0 {
        return content[..cap_chars.min(content.len())].to_string();
    }
    let notice = notice_template.replace("{lines}", &omitted.to_string());
    format!("{kept}\n{notice}")
}

fn head_tail_lines(content: &str, cap_chars: usize, max_head: usize, max_tail: usize, notice_template: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let half_cap = cap_chars / 2;

    let mut head = String::with_capacity(half_cap);
    let mut head_count = 0usize;
    for line in lines.iter().take(max_head) {
        let needed = if head.is_empty() { line.len() } else { line.len() + 1 };
        if head.len() + needed > half_cap {
            break;
        }
        if !head.is_empty() {
            head.push('\n');
        }
        head.push_str(line);
        head_count += 1;
    }

    let mut tail_lines: Vec<&str> = Vec::new();
    let mut tail_chars = 0usize;
    for line in lines.iter().rev().take(max_tail) {
        let needed = if tail_lines.is_empty() { line.len() } else { line.len() + 1 };
        if tail_chars + needed > half_cap {
            break;
        }
        tail_chars += needed;
        tail_lines.push(line);
    }
    tail_lines.reverse();
    let tail_count = tail_lines.len();
    let tail = tail_lines.join("\n");

    let omitted = lines.len().saturating_sub(head_count + tail_count);
    if omitted == 0 {
        return content[..cap_chars.min(content.len())].to_string();
    }
    let notice = notice_template.replace("{lines}", &omitted.to_string());
    format!("{head}\n{notice}\n{tail}")
}
