// validate.rs — Checks on the finished graph
//
// Preconditions: all optimization passes complete.
// Postconditions: a graph passing `validate` is safe to cache.
// Failure modes: normal-map sampler without a material node → `Configuration`
//                (no node attached; the combination is graph-wide).
// Side effects: none.

use crate::error::CompileError;
use crate::graph::Graph;

pub fn validate(graph: &Graph) -> Result<(), CompileError> {
    check_normal_maps(graph)
}

/// Normal-map samplers are resolved in material space, so the graph needs a
/// material node.
fn check_normal_maps(graph: &Graph) -> Result<(), CompileError> {
    let has_normal_map = graph.nodes().any(|n| n.kind.is_normal_map());
    let has_material = graph.nodes().any(|n| n.kind.is_material());
    if has_normal_map && !has_material {
        return Err(CompileError::Configuration {
            node: None,
            message: "Material has normalmap node but no material node".to_string(),
        });
    }
    Ok(())
}
