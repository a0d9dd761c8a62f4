use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use nmc::diag::{DiagnosticSink, TracingSink};
use nmc::graph::Graph;
use nmc::id::{CompileContext, GraphId};
use nmc::pass::{descriptor, PassId};
use nmc::pipeline::{run_pipeline, CompileOptions, PassReport};
use nmc::tree::AuthoredTree;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Ordered instruction records as JSON
    Elements,
    /// Internal graph listing
    Graph,
    /// Graphviz DOT
    Dot,
    /// Per-pass node and edge counts
    Summary,
}

#[derive(Parser, Debug)]
#[command(
    name = "nmc",
    version,
    about = "Node Material Compiler: authored node-material trees to shader instruction records"
)]
struct Cli {
    /// Authored node tree (JSON)
    source: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cache identity for the tree (defaults to its content fingerprint)
    #[arg(long)]
    graph_id: Option<String>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Elements)]
    emit: EmitStage,

    /// Stop after this pass
    #[arg(long)]
    stop_after: Option<PassId>,

    /// Print compiler passes and timing
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("NMC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "nmc starting");

    // ── Read and decode the authored tree ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("nmc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };
    let tree = match AuthoredTree::from_json(&source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("nmc: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let id = match &cli.graph_id {
        Some(id) => GraphId::new(id.clone()),
        None => GraphId::fingerprint(&tree),
    };
    tracing::debug!(graph = %id, nodes = tree.nodes.len(), "decoded node tree");

    // ── Compile ──
    let options = CompileOptions {
        stop_after: cli.stop_after,
        verbose: cli.verbose,
    };
    let mut reports = Vec::new();
    let graph = if options.stop_after.is_none() && cli.emit != EmitStage::Summary {
        nmc::cache::compile_graph(&id, &tree, &mut TracingSink).ok()
    } else {
        compile_uncached(&tree, &options, &mut reports)
    };
    let Some(graph) = graph else {
        std::process::exit(1);
    };

    // ── Emit ──
    let text = match cli.emit {
        EmitStage::Elements => match nmc::compose::compose_node_elements(&graph) {
            Ok(elements) => match serde_json::to_string_pretty(&elements) {
                Ok(json) => json + "\n",
                Err(e) => {
                    eprintln!("nmc: error: {e}");
                    std::process::exit(1);
                }
            },
            Err(violation) => {
                TracingSink.emit(&violation.to_diagnostic());
                std::process::exit(1);
            }
        },
        EmitStage::Graph => graph.to_string(),
        EmitStage::Dot => nmc::dot::emit_dot(&graph),
        EmitStage::Summary => summary(&reports, &graph),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("nmc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
        }
        None => print!("{text}"),
    }
}

/// Run the pipeline outside the cache, collecting per-pass reports.
fn compile_uncached(
    tree: &AuthoredTree,
    options: &CompileOptions,
    reports: &mut Vec<PassReport>,
) -> Option<Arc<Graph>> {
    let mut ctx = CompileContext::new();
    let result = run_pipeline(tree, &mut ctx, options, |r| reports.push(*r));
    let mut sink = TracingSink;
    for diagnostic in &ctx.diagnostics {
        sink.emit(diagnostic);
    }
    match result {
        Ok(graph) => Some(Arc::new(graph)),
        Err(e) => {
            sink.emit(&e.error.to_diagnostic());
            eprintln!("nmc: pass '{}' failed", e.failing_pass);
            None
        }
    }
}

fn summary(reports: &[PassReport], graph: &Graph) -> String {
    let mut out = String::new();
    for r in reports {
        out.push_str(&format!(
            "{:<18} {:>5} nodes {:>5} edges {:>5} changed {:>8.3}ms\n",
            descriptor(r.pass).name,
            r.nodes,
            r.edges,
            r.changed,
            r.elapsed.as_secs_f64() * 1000.0
        ));
    }
    out.push_str(&format!(
        "result: {} nodes, {} edges\n",
        graph.node_count(),
        graph.edge_count()
    ));
    out
}
