// pass.rs — Pass descriptors and dependency resolution
//
// Declares the graph compiler's passes, their dependency edges and the
// invariants each establishes. The pipeline runner uses `required_passes` to
// run only the prefix needed for `--stop-after`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ── Pass identifiers ───────────────────────────────────────────────────────

/// Identifies each compiler pass. Composition into instruction records is
/// outside the runner; it runs per request on the cached graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Build,
    CompleteEdges,
    Prune,
    Rewrite,
    FixLinks,
    Merge,
    OptimizeChannels,
    Validate,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a compiler pass.
pub struct PassDescriptor {
    /// Name used on the command line and in logs.
    pub name: &'static str,
    /// Passes whose results this pass consumes.
    pub inputs: &'static [PassId],
    /// Postconditions (documentation and verbose output).
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Build => PassDescriptor {
            name: "build",
            inputs: &[],
            invariants: "every node typed; edges address existing sockets",
        },
        PassId::CompleteEdges => PassDescriptor {
            name: "complete-edges",
            inputs: &[PassId::Build],
            invariants: "translucency links drive their parameter socket",
        },
        PassId::Prune => PassDescriptor {
            name: "prune",
            inputs: &[PassId::CompleteEdges],
            invariants: "output located; every node reaches it",
        },
        PassId::Rewrite => PassDescriptor {
            name: "rewrite",
            inputs: &[PassId::Prune],
            invariants: "no selector or passthrough nodes; parallax inlined",
        },
        PassId::FixLinks => PassDescriptor {
            name: "fix-links",
            inputs: &[PassId::Rewrite],
            invariants: "socket linked flags match edges",
        },
        PassId::Merge => PassDescriptor {
            name: "merge",
            inputs: &[PassId::FixLinks],
            invariants: "no duplicate accessors; samplers merged within cap",
        },
        PassId::OptimizeChannels => PassDescriptor {
            name: "optimize-channels",
            inputs: &[PassId::Merge],
            invariants: "splitter-only vertex colour reads collapsed",
        },
        PassId::Validate => PassDescriptor {
            name: "validate",
            inputs: &[PassId::OptimizeChannels],
            invariants: "normal maps have a material",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 8] = [
    PassId::Build,
    PassId::CompleteEdges,
    PassId::Prune,
    PassId::Rewrite,
    PassId::FixLinks,
    PassId::Merge,
    PassId::OptimizeChannels,
    PassId::Validate,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in execution order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(descriptor(*self).name)
    }
}

impl FromStr for PassId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_PASSES
            .iter()
            .copied()
            .find(|p| descriptor(*p).name == s)
            .ok_or_else(|| {
                let names: Vec<_> = ALL_PASSES.iter().map(|p| descriptor(*p).name).collect();
                format!("unknown pass '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
