// id.rs — Identifiers for node-material compilation
//
// Graph-local node ids, the shader-identifier allocator, the per-compile
// context that owns it, and the graph identity used as the cache key.
//
// Identifier counters live in `CompileContext`, which is created at the start
// of a compile and dropped at its end. Nothing here is process-global, so
// identifier assignment is deterministic for a given input.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::diag::Diagnostic;
use crate::tree::AuthoredTree;

/// Stable identifier for a node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Allocator for shader-facing identifiers.
///
/// Each name template keeps its own counter: the first request for
/// `param_VALUE_Value` yields `param_VALUE_Value0`, the next `...1`.
/// Spaces and slashes are replaced by underscores.
#[derive(Debug, Default, Clone)]
pub struct IdentAllocator {
    counters: HashMap<String, u32>,
    issued: u32,
}

impl IdentAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ident(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        let name = format!("{base}{counter}").replace([' ', '/'], "_");
        *counter += 1;
        self.issued += 1;
        name
    }

    /// Total identifiers handed out since creation.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}

/// Mutable state owned by a single compile.
#[derive(Debug, Default)]
pub struct CompileContext {
    pub idents: IdentAllocator,
    /// Non-fatal diagnostics raised by passes; forwarded to the sink once the
    /// compile finishes.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Identity of an authored graph, used as the compiled-graph cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub String);

impl GraphId {
    pub fn new(id: impl Into<String>) -> Self {
        GraphId(id.into())
    }

    /// Content fingerprint: hex SHA-256 of the tree's canonical compact JSON.
    /// Identical trees map to the same id.
    pub fn fingerprint(tree: &AuthoredTree) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tree.canonical_json().as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write;
            let _ = write!(hex, "{:02x}", b);
        }
        GraphId(hex)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GraphId {
    fn from(s: &str) -> Self {
        GraphId(s.to_string())
    }
}
