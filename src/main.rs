// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::collections::HashSet;
use std::io::Write as _;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::Cli;
use lh_core::{
    AgentEvent, AgentRegistry, Disposition, MasterLoop, PermissionPrompter, PromptContext, SecondaryLoopPrompter,
    SubAgentDispatcher, SubAgentExecutor, SubAgentFileCurator, SubAgentProgress,
};
use lh_model::ToolCall as ModelToolCall;
use lh_tools::{
    AgentDispatcher, CreateFileTool, EditFileTool, FileCurator, GetFileTreeTool, GitBranchTool, GitCommitTool,
    GrepSearchTool, ListAgentsTool, ListDirectoryTool, PermissionEngine, PermissionEvaluation, PolicyStore,
    ReadFileTool, ReadLinesTool, ReplaceLinesTool, RunAgentTool, RunShellCommandTool, TodoItem, TodoReadTool,
    TodoWriteTool, ToolEvent, ToolRegistry, UserChoice, WriteFileTool,
};

/// Maximum nesting depth for `run_agent` dispatch, shared across every
/// sub-agent spawned within this process.
const MAX_SUBAGENT_DEPTH: usize = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = lh_config::load(cli.config.as_deref()).context("loading configuration")?;
    let cfg = cli::apply_overrides(loaded, &cli);

    let policies_path = lh_config::default_policies_path();
    let permissions = PermissionEngine::new(load_policies(&policies_path));

    let agents_dir = lh_config::default_agents_dir();
    let mut agent_registry = AgentRegistry::new();
    agent_registry.reload(&agents_dir);
    let agents = Arc::new(StdMutex::new(agent_registry));

    let provider: Arc<dyn lh_model::ModelProvider> = Arc::from(lh_model::from_config(&cfg));
    println!("Local Harness — {} / {}", provider.name(), cfg.model);
    println!("Type your task, or /quit to exit.\n");

    let tasks: Arc<Mutex<Vec<TodoItem>>> = Arc::new(Mutex::new(Vec::new()));
    let read_files: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let recent_context: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
    let (indexing_tx, indexing_rx) = mpsc::unbounded_channel();
    let (tool_event_tx, mut tool_event_rx) = mpsc::channel::<ToolEvent>(64);

    let subagent_depth = Arc::new(AtomicUsize::new(0));
    let base_registry = Arc::new(base_tool_registry());
    let (subagent_event_tx, mut subagent_event_rx) = mpsc::channel::<AgentEvent>(256);

    let curator: Arc<dyn FileCurator> =
        Arc::new(SubAgentFileCurator::new(provider.clone(), base_registry.clone(), subagent_event_tx.clone()));
    let dispatcher: Arc<dyn AgentDispatcher> = Arc::new(SubAgentDispatcher::new(
        agents,
        provider.clone(),
        base_registry.clone(),
        SubAgentExecutor::new(subagent_depth, MAX_SUBAGENT_DEPTH),
        subagent_event_tx,
    ));

    let mut registry = base_tool_registry();
    registry.register(ReadFileTool::new(
        cfg.file_read_small_threshold,
        cfg.file_read_large_threshold,
        cfg.graph_rag_enabled,
        Some(curator),
        read_files.clone(),
        Some(indexing_tx),
        recent_context.clone(),
    ));
    registry.register(RunAgentTool::new(dispatcher.clone()));
    registry.register(ListAgentsTool::new(dispatcher));
    registry.register(TodoWriteTool::new(tasks.clone(), tool_event_tx));
    registry.register(TodoReadTool::new(tasks.clone()));
    let tool_names = registry.names();
    let tools = Arc::new(registry);

    let project_root = find_project_root(&std::env::current_dir()?);
    let system_prompt = lh_core::system_prompt(
        &cfg,
        &PromptContext { project_root: project_root.as_deref(), tool_names: &tool_names, append: None },
    );

    let mut master = MasterLoop::new(
        cfg,
        provider,
        tools,
        permissions,
        indexing_rx,
        tasks,
        read_files,
        recent_context,
        now_ms(),
    );
    master.session.push(lh_model::Message::system(system_prompt, now_ms()));

    // Surface todo_write events on their own task for the lifetime of the
    // session; the main loop never blocks on them.
    let todo_printer = tokio::spawn(async move {
        while let Some(ToolEvent::TodoUpdate(items)) = tool_event_rx.recv().await {
            print_todo_update(&items);
        }
    });

    // Surface sub-agent (file curator, run_agent dispatch) progress on its
    // own task too: these runs can outlive, and are driven independently of,
    // whichever per-turn event channel `resolve_prompt` currently owns.
    let subagent_printer = tokio::spawn(async move {
        while let Some(ev) = subagent_event_rx.recv().await {
            print_event(&ev);
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = match stdin.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                eprintln!("input error: {e}");
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }

        let (tx, mut rx) = mpsc::channel::<AgentEvent>(256);
        let printer = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                print_event(&ev);
            }
        });

        if let Err(e) = master
            .resolve_prompt(input.to_string(), now_ms(), &tx, &StdinPermissionPrompter, &StdinSecondaryPrompter)
            .await
        {
            eprintln!("turn failed: {e}");
        }
        drop(tx);
        let _ = printer.await;
        println!();
    }

    drop(todo_printer);
    drop(subagent_printer);
    save_policies(&policies_path, master.policies());
    println!("Goodbye.");
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

fn init_logging() {
    let verbose =
        ["DEBUG_GRAPHRAG", "DEBUG_TOOLS", "DEBUG_LMSTUDIO", "DEBUG_EMBEDDINGS"].iter().any(|k| std::env::var_os(k).is_some());
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };
    let _ = tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).try_init();
}

fn load_policies(path: &std::path::Path) -> PolicyStore {
    match std::fs::read_to_string(path) {
        Ok(text) => PolicyStore::load_from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "policies file failed to parse — starting empty");
            PolicyStore::new()
        }),
        Err(_) => PolicyStore::new(),
    }
}

fn save_policies(path: &std::path::Path, store: &PolicyStore) {
    if let Some(dir) = path.parent() {
        if std::fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    if let Ok(text) = store.to_json_string() {
        let _ = std::fs::write(path, text);
    }
}

/// Walk up from `start` looking for a `.git` directory.
fn find_project_root(start: &std::path::Path) -> Option<std::path::PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Tools with no dependency on the main loop's shared state: built twice,
/// once for the sub-agent-reachable "base" registry and once as the
/// foundation of the full registry the master loop drives. Sub-agents never
/// see `read_file`'s curation pipeline or `run_agent`/`list_agents`
/// themselves, which keeps sub-agent dispatch from needing to recurse
/// through a second copy of the registry it was built against.
fn base_tool_registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register(RunShellCommandTool::default());
    r.register(GitBranchTool);
    r.register(GitCommitTool);
    r.register(GrepSearchTool);
    r.register(GetFileTreeTool);
    r.register(ListDirectoryTool);
    r.register(ReadLinesTool);
    r.register(ReplaceLinesTool);
    r.register(WriteFileTool);
    r.register(CreateFileTool);
    r.register(EditFileTool);
    r
}

fn print_event(ev: &AgentEvent) {
    match ev {
        AgentEvent::TextDelta(d) => {
            print!("{d}");
            std::io::stdout().flush().ok();
        }
        AgentEvent::ThinkingDelta(_) => {}
        AgentEvent::TurnTextComplete { .. } => println!(),
        AgentEvent::ToolCallStarted(call) => println!("\n[tool] {} {}", call.name, call.arguments),
        AgentEvent::ToolCallFinished { tool_name, success, .. } => {
            println!("[tool] {tool_name} {}", if *success { "ok" } else { "failed" });
        }
        AgentEvent::PermissionRequested { .. } => {}
        AgentEvent::TodoUpdate(items) => print_todo_update(items),
        AgentEvent::SystemNotice(msg) => println!("\n[notice] {msg}"),
        AgentEvent::SecondaryLoopFileReady { .. } => {}
        AgentEvent::SecondaryLoopComplete => println!("\n[index] secondary loop complete"),
        AgentEvent::Done => {}
        AgentEvent::Error(e) => println!("\n[error] {e}"),
        AgentEvent::SubAgentProgress { agent_name, event } => print_subagent_progress(agent_name, event),
    }
}

fn print_subagent_progress(agent_name: &str, event: &SubAgentProgress) {
    match event {
        SubAgentProgress::Thinking(_) => {}
        SubAgentProgress::Content(d) => print!("{d}"),
        SubAgentProgress::ToolCall(call) => println!("\n[{agent_name}] tool: {} {}", call.name, call.arguments),
        SubAgentProgress::Iteration(n) => println!("\n[{agent_name}] iteration {n}"),
        SubAgentProgress::Complete => println!("\n[{agent_name}] done"),
    }
}

fn print_todo_update(items: &[TodoItem]) {
    println!("\n[todo] {} item(s)", items.len());
    for item in items {
        println!("  - {:?}: {}", item.status, item.content);
    }
}

/// Reads the user's answer to a permission prompt from stdin. Runs on a
/// blocking thread so the runtime stays responsive; nothing else is
/// concurrently pending while a prompt is up, since the tool executor that
/// raised it is paused until this resolves.
struct StdinPermissionPrompter;

#[async_trait]
impl PermissionPrompter for StdinPermissionPrompter {
    async fn ask(&self, tool_call: &ModelToolCall, evaluation: &PermissionEvaluation) -> UserChoice {
        let show_preview = matches!(evaluation, PermissionEvaluation::AskUser { show_preview: true });
        let name = tool_call.name.clone();
        let args = tool_call.arguments.clone();
        tokio::task::spawn_blocking(move || {
            println!("\nPermission requested: {name}");
            if show_preview {
                println!("  args: {args}");
            }
            print!("  [y]es once / [a]lways / [s]ession / [n]o: ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return UserChoice::Deny;
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => UserChoice::AllowOnce,
                "a" | "always" => UserChoice::AlwaysAllow,
                "s" | "session" => UserChoice::AskEachTime,
                _ => UserChoice::Deny,
            }
        })
        .await
        .unwrap_or(UserChoice::Deny)
    }
}

/// Resolves each queued file's secondary-loop disposition from stdin once a
/// turn finishes with no more tool calls to run.
struct StdinSecondaryPrompter;

#[async_trait]
impl SecondaryLoopPrompter for StdinSecondaryPrompter {
    async fn ask_disposition(&self, path: &str, preview: &str) -> Disposition {
        let path = path.to_string();
        let preview = preview.to_string();
        tokio::task::spawn_blocking(move || {
            println!("\n{path} was read this turn. Preview:\n{preview}");
            print!("  [f]ull index / [c]ustom lines (e.g. c 10-25) / [m]etadata only: ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return Disposition::MetadataOnly;
            }
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("c ").or_else(|| line.strip_prefix("custom ")) {
                if let Some((start, end)) = rest.split_once('-') {
                    if let (Ok(start), Ok(end)) = (start.trim().parse(), end.trim().parse()) {
                        return Disposition::CustomLines { start, end };
                    }
                }
                return Disposition::MetadataOnly;
            }
            match line.to_lowercase().as_str() {
                "f" | "full" => Disposition::FullIndexing,
                _ => Disposition::MetadataOnly,
            }
        })
        .await
        .unwrap_or(Disposition::MetadataOnly)
    }
}
