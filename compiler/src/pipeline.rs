// pipeline.rs — Pass orchestration for one compile
//
// Runs the minimal set of passes for the requested terminal pass over a
// single authored tree, timing each and reporting through a callback.
//
// Preconditions: `ctx` is fresh for this compile.
// Postconditions: on success the returned graph has passed every pass in
//                 `required_passes(terminal)`.
// Failure modes: the first pass returning a `CompileError` stops the run;
//                the error is returned together with the failing pass.
// Side effects: calls `on_pass_complete` after each pass; logs via `tracing`.

use std::time::{Duration, Instant};

use crate::builder::build_graph;
use crate::channels::optimize_channels;
use crate::error::CompileError;
use crate::graph::Graph;
use crate::id::CompileContext;
use crate::merge::merge_nodes;
use crate::pass::{descriptor, required_passes, PassId};
use crate::prune::{complete_edges, find_output, fix_links, prune};
use crate::rewrite::rewrite;
use crate::tree::AuthoredTree;
use crate::validate::validate;

// ── Options and reports ─────────────────────────────────────────────────────

/// Knobs for a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Stop after this pass (the full pipeline when `None`).
    pub stop_after: Option<PassId>,
    /// Log per-pass timing at `info` instead of `debug`.
    pub verbose: bool,
}

impl CompileOptions {
    pub fn terminal(&self) -> PassId {
        self.stop_after.unwrap_or(PassId::Validate)
    }
}

/// What a pass did, handed to `on_pass_complete`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub pass: PassId,
    pub elapsed: Duration,
    pub nodes: usize,
    pub edges: usize,
    /// Pass-specific count: edges added, nodes dropped, rewritten or merged.
    pub changed: usize,
}

// ── Error type ─────────────────────────────────────────────────────────────

/// A pass failed; the graph is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    pub failing_pass: PassId,
    pub error: CompileError,
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the passes needed for `options.terminal()` over `tree`.
pub fn run_pipeline(
    tree: &AuthoredTree,
    ctx: &mut CompileContext,
    options: &CompileOptions,
    mut on_pass_complete: impl FnMut(&PassReport),
) -> Result<Graph, PipelineError> {
    let mut graph = Graph::new();

    for pass in required_passes(options.terminal()) {
        let t = Instant::now();
        let changed = run_pass(pass, tree, &mut graph, ctx).map_err(|error| PipelineError {
            failing_pass: pass,
            error,
        })?;
        let report = PassReport {
            pass,
            elapsed: t.elapsed(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            changed,
        };
        finish_pass(&report, options.verbose);
        on_pass_complete(&report);
    }

    Ok(graph)
}

fn run_pass(
    pass: PassId,
    tree: &AuthoredTree,
    graph: &mut Graph,
    ctx: &mut CompileContext,
) -> Result<usize, CompileError> {
    match pass {
        PassId::Build => {
            *graph = build_graph(tree, ctx)?;
            Ok(graph.node_count())
        }
        PassId::CompleteEdges => Ok(complete_edges(graph)),
        PassId::Prune => {
            let output = find_output(tree, graph)?;
            graph.set_output(output);
            prune(graph)
        }
        PassId::Rewrite => rewrite(graph, ctx),
        PassId::FixLinks => {
            fix_links(graph);
            Ok(0)
        }
        PassId::Merge => Ok(merge_nodes(graph)),
        PassId::OptimizeChannels => Ok(optimize_channels(graph)),
        PassId::Validate => {
            validate(graph)?;
            Ok(0)
        }
    }
}

fn finish_pass(report: &PassReport, verbose: bool) {
    let name = descriptor(report.pass).name;
    let ms = report.elapsed.as_secs_f64() * 1000.0;
    if verbose {
        tracing::info!(
            pass = name,
            nodes = report.nodes,
            edges = report.edges,
            changed = report.changed,
            "complete, {ms:.1}ms"
        );
    } else {
        tracing::debug!(
            pass = name,
            nodes = report.nodes,
            edges = report.edges,
            changed = report.changed,
            "complete, {ms:.1}ms"
        );
    }
}

/// Full compile of `tree` with default options.
pub fn compile_tree(tree: &AuthoredTree, ctx: &mut CompileContext) -> Result<Graph, CompileError> {
    run_pipeline(tree, ctx, &CompileOptions::default(), |_| {}).map_err(|e| e.error)
}
