//! `ptc` — Pass-Through Coordination engine CLI.
//!
//! Usage:
//!   ptc --tree tree.json --intent "add gpu monitoring"   → full 8-phase dry run
//!   ptc --intent "..." --live                             → same, actually executes
//!   ptc --node crate:auth --task "fix login"              → direct leaf invocation
//!   ptc show-tree / ptc show-leaves                       → inspect the tree
//!
//! `--node`/`--task` runs a single leaf directly, bypassing routing and
//! decomposition; plain `--intent` runs the full pipeline.

use clap::{Parser, Subcommand};
use ptc::{display, runtime};
use ptc_core::{Config, EventBus, NodeId, Task};
use ptc_tree::Tree;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ptc", about = "PTC — Pass-Through Coordination engine", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the tree document
    #[arg(long, default_value = "tree.json", global = true)]
    tree: PathBuf,

    /// Intent to route and execute through the tree
    #[arg(long)]
    intent: Option<String>,

    /// Target node id — skip routing, decompose from exactly this node
    #[arg(long)]
    target: Option<String>,

    /// Execute directly at a specific leaf node (requires --task)
    #[arg(long)]
    node: Option<String>,

    /// Task description for --node mode
    #[arg(long)]
    task: Option<String>,

    /// Live execution — default is dry run
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Verbose output: per-task output fields, and debug-level logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Emit the raw JSON trace/result instead of a human-readable rendering
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Working directory the executor dispatches shell/native/claude commands from
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Write logs to a file in addition to stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the tree hierarchy and exit
    ShowTree,
    /// Show leaf nodes and their lineage, then exit
    ShowLeaves,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref());

    let tree_path = resolve_tree_path(&cli.tree, &cli.root);
    let tree = Tree::load(&tree_path)?;

    match cli.command {
        Some(Command::ShowTree) => {
            display::show_tree(&tree);
            return Ok(());
        }
        Some(Command::ShowLeaves) => {
            display::show_leaves(&tree);
            return Ok(());
        }
        None => {}
    }

    let config = Config::load(&cli.root);
    let collab = runtime::assemble(&config, &cli.root, &tree.meta.title);
    let events = EventBus::default();

    if let (Some(node_id), Some(task_text)) = (&cli.node, &cli.task) {
        let nid = NodeId::from(node_id.as_str());
        let node = tree.node(&nid).ok_or_else(|| anyhow::anyhow!("node {node_id} not found"))?;
        let task = Task {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            scale: node.scale,
            intent: task_text.clone(),
            lineage: tree.lineage(&node.id).unwrap_or_else(|_| vec![node.id.clone()]),
            files: node.metadata.files.clone(),
            functions: node.metadata.functions.clone(),
            rules: node.rules.clone(),
            escalation: node.escalation.clone(),
            codie_program: None,
            blueprint_id: None,
            task_id: None,
            acceptance: None,
            depends_on: vec![],
        };

        let executor = runtime::build_executor(&collab, config, &cli.root, events);
        let result = executor.execute(&task).await;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("[{:?}] {}: {}", result.status, result.node_name, result.intent);
            if !result.output.is_null() {
                println!("{}", serde_json::to_string_pretty(&result.output)?);
            }
            if let Some(err) = &result.error {
                println!("Error: {err}");
            }
        }
        return Ok(());
    }

    let Some(intent) = cli.intent.clone() else {
        eprintln!("Error: --intent is required (or use --node/--task, show-tree, show-leaves)");
        std::process::exit(1);
    };

    let target = cli.target.as_deref().map(NodeId::from);
    let engine = runtime::build_engine(tree, &collab, config, &cli.root, events);
    let cancel = CancellationToken::new();
    let trace = engine.run(&intent, target, !cli.live, &cancel).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&trace)?);
    } else {
        display::display_trace(&trace, cli.verbose);
    }

    // Exit code reflects input errors only (spec.md §6) — a run that
    // completed the pipeline, even with blocked/failed tasks, is success
    // from the CLI's point of view; the trace carries the detail.
    Ok(())
}

fn init_tracing(verbose: bool, log_file: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if verbose { "ptc=debug" } else { "ptc=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("ptc.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
            None
        }
    }
}

/// Falls back to `<root>/<tree>` when `tree` isn't found relative to the
/// current directory — mirrors the original's `CAGE_ROOT` fallback.
fn resolve_tree_path(tree: &std::path::Path, root: &std::path::Path) -> PathBuf {
    if tree.exists() {
        return tree.to_path_buf();
    }
    root.join(tree)
}
