// cache.rs — Compiled-graph memoization
//
// Maps a graph identity to its finished graph or to the error that aborted
// it. Each identity is compiled at most once: the lock is held across the
// check, the compile and the insert, and released before the caller's sink
// sees any diagnostic.
//
// Preconditions: none.
// Postconditions: after `compile(id, ..)` returns, `id` has a cache entry.
// Failure modes: returns the compile's `CompileError`, fresh or replayed.
// Side effects: diagnostics to the caller's sink on a fresh compile only;
//               `tracing` events for compiles and cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::diag::{codes, Diagnostic, DiagnosticSink};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::id::{CompileContext, GraphId};
use crate::pipeline::compile_tree;
use crate::tree::AuthoredTree;

/// A memoized compile outcome. Failures are permanent until `cleanup`.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Compiled(Arc<Graph>),
    Failed(CompileError),
}

impl CacheEntry {
    fn to_result(&self) -> Result<Arc<Graph>, CompileError> {
        match self {
            CacheEntry::Compiled(graph) => Ok(Arc::clone(graph)),
            CacheEntry::Failed(error) => Err(error.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<GraphId, CacheEntry>,
    /// Number of pipeline runs since creation.
    builds: usize,
    /// Identifiers allocated by all pipeline runs since creation.
    idents_issued: u64,
}

#[derive(Debug, Default)]
pub struct GraphCache {
    inner: Mutex<Inner>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled graph for `id`, compiling `tree` on first request.
    ///
    /// A fresh compile forwards its non-fatal diagnostics to `sink`, followed
    /// by one error diagnostic on failure or one info diagnostic on success.
    /// Cached outcomes are returned without touching `sink`.
    pub fn compile(
        &self,
        id: &GraphId,
        tree: &AuthoredTree,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Arc<Graph>, CompileError> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get(id) {
            tracing::trace!(graph = %id, "cache hit");
            return entry.to_result();
        }

        let mut ctx = CompileContext::new();
        let result = compile_tree(tree, &mut ctx);
        inner.builds += 1;
        inner.idents_issued += u64::from(ctx.idents.issued());

        let mut pending = ctx.diagnostics;
        let entry = match result {
            Ok(graph) => {
                tracing::debug!(
                    graph = %id,
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    "compiled node graph"
                );
                pending.push(
                    Diagnostic::info(format!(
                        "graph '{id}' compiled: {} nodes, {} edges",
                        graph.node_count(),
                        graph.edge_count()
                    ))
                    .with_code(codes::I0001),
                );
                CacheEntry::Compiled(Arc::new(graph))
            }
            Err(error) => {
                pending.push(error.to_diagnostic());
                CacheEntry::Failed(error)
            }
        };
        let result = entry.to_result();
        inner.entries.insert(id.clone(), entry);
        drop(inner);

        // Emitted unlocked: a sink may call back into the cache.
        for diagnostic in &pending {
            sink.emit(diagnostic);
        }
        result
    }

    /// The cached outcome for `id`, if any.
    pub fn get(&self, id: &GraphId) -> Option<CacheEntry> {
        self.inner.lock().entries.get(id).cloned()
    }

    pub fn contains(&self, id: &GraphId) -> bool {
        self.inner.lock().entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn builds(&self) -> usize {
        self.inner.lock().builds
    }

    pub fn idents_issued(&self) -> u64 {
        self.inner.lock().idents_issued
    }

    /// Drop every memoized outcome. Safe on an empty cache.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock();
        let cleared = inner.entries.len();
        inner.entries.clear();
        tracing::info!(cleared, "node graph cache cleared");
        cleared
    }
}

// ── Process-wide cache ──────────────────────────────────────────────────────

static GLOBAL: Lazy<GraphCache> = Lazy::new(GraphCache::new);

/// The process-wide cache.
pub fn global() -> &'static GraphCache {
    &GLOBAL
}

/// Compile through the process-wide cache.
pub fn compile_graph(
    id: &GraphId,
    tree: &AuthoredTree,
    sink: &mut dyn DiagnosticSink,
) -> Result<Arc<Graph>, CompileError> {
    GLOBAL.compile(id, tree, sink)
}

/// Clear the process-wide cache.
pub fn cleanup() -> usize {
    GLOBAL.cleanup()
}
