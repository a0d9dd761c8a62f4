// merge.rs — Common-subexpression merging of accessors and samplers
//
// Two independent passes over the rewritten graph:
//   - geometry accessors of the same facet (and layer, for layer-keyed
//     facets) collapse onto the first-seen instance;
//   - texture samplers bound to the same texture merge into one wider
//     sampler, at most two duplicates per canonical node.
//
// Preconditions: graph pruned and rewritten; `is_linked` repaired.
// Postconditions: no two mergeable nodes share a semantic key (within the
//                 texture cap); socket indices of re-targeted edges address
//                 the canonical node's appended socket ranges.
// Failure modes: none.
// Side effects: none.

use crate::graph::{BoundData, Edge, Graph, Node};
use crate::id::NodeId;
use crate::node_type::NodeType;

/// Duplicates absorbed by one canonical texture sampler.
pub const TEXTURE_MERGE_CAP: usize = 2;

pub fn merge_nodes(graph: &mut Graph) -> usize {
    merge_geometry(graph) + merge_textures(graph)
}

fn data_key(node: &Node) -> Option<&str> {
    node.data.as_ref().map(BoundData::key)
}

// ── Geometry ────────────────────────────────────────────────────────────────

fn geometry_matches(a: &Node, b: &Node) -> bool {
    match (&a.kind, &b.kind) {
        (NodeType::Geometry(ka), NodeType::Geometry(kb)) if ka == kb => {
            !ka.is_layer_keyed() || data_key(a) == data_key(b)
        }
        _ => false,
    }
}

/// Collapse equivalent geometry accessors. Returns the number removed.
pub fn merge_geometry(graph: &mut Graph) -> usize {
    let candidates: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeType::Geometry(_)))
        .map(|n| n.id)
        .collect();

    let mut canonical: Vec<NodeId> = Vec::new();
    let mut removed = 0;
    for id in candidates {
        let target = match graph.node(id) {
            Some(current) => canonical
                .iter()
                .copied()
                .find(|&c| graph.node(c).map_or(false, |cn| geometry_matches(current, cn))),
            None => continue,
        };
        let Some(target) = target else {
            canonical.push(id);
            continue;
        };
        for edge in graph.out_edges(id) {
            graph.add_edge(Edge::new(target, edge.to, edge.from_socket, edge.to_socket));
        }
        graph.remove_node(id);
        removed += 1;
        tracing::trace!(duplicate = %id, canonical = %target, "merged geometry accessor");
    }
    removed
}

// ── Textures ────────────────────────────────────────────────────────────────

struct TextureGroup {
    canonical: NodeId,
    absorbed: usize,
}

/// `candidate` is a single-lane sampler that may join `canonical`'s lanes.
fn texture_matches(candidate: &Node, canonical: &Node) -> bool {
    match (&candidate.kind, &canonical.kind) {
        (NodeType::Texture { kind: ka, lanes: 1 }, NodeType::Texture { kind: kb, .. })
            if ka == kb && ka.is_mergeable() =>
        {
            data_key(candidate).is_some() && data_key(candidate) == data_key(canonical)
        }
        _ => false,
    }
}

/// Merge texture samplers bound to the same texture. Returns the number of
/// samplers absorbed.
///
/// Each absorption is applied to the graph before the next candidate is
/// considered, so the graph a candidate is checked against already carries
/// every earlier merge. A candidate that reaches, or is reached from, a
/// group's merged node would close a loop through it and seeds a new group
/// instead.
pub fn merge_textures(graph: &mut Graph) -> usize {
    let candidates: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeType::Texture { kind, .. } if kind.is_mergeable()))
        .map(|n| n.id)
        .collect();

    let mut groups: Vec<TextureGroup> = Vec::new();
    let mut absorbed_total = 0;
    for id in candidates {
        let Some(current) = graph.node(id) else {
            continue;
        };
        // A full group is skipped; a further duplicate seeds a new group.
        let open: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| {
                group.absorbed < TEXTURE_MERGE_CAP
                    && graph
                        .node(group.canonical)
                        .map_or(false, |c| texture_matches(current, c))
            })
            .map(|(i, _)| i)
            .collect();

        let slot = if open.is_empty() {
            None
        } else {
            let upstream = graph.backward_reachable(id);
            let downstream = graph.forward_reachable(id);
            open.into_iter().find(|&i| {
                let canonical = groups[i].canonical;
                !upstream.contains(&canonical) && !downstream.contains(&canonical)
            })
        };
        let Some(slot) = slot else {
            groups.push(TextureGroup {
                canonical: id,
                absorbed: 0,
            });
            continue;
        };

        absorb(graph, groups[slot].canonical, id);
        groups[slot].absorbed += 1;
        absorbed_total += 1;
    }
    absorbed_total
}

/// Append `id`'s sockets to the canonical node as a new lane and re-target
/// its edges onto the appended ranges. `id` must not be connected to
/// `canonical`.
fn absorb(graph: &mut Graph, canonical: NodeId, id: NodeId) {
    let edges_in = graph.in_edges(id);
    let edges_out = graph.out_edges(id);
    let Some(absorbed) = graph.remove_node(id) else {
        return;
    };
    let Some(node) = graph.node_mut(canonical) else {
        return;
    };
    let NodeType::Texture { lanes, .. } = &mut node.kind else {
        return;
    };
    let lane = *lanes as usize;
    *lanes += 1;
    let n_in = absorbed.inputs.len();
    let n_out = absorbed.outputs.len();

    // Lane suffix: the first lane is tagged when the second one arrives.
    if lane == 1 {
        for socket in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
            socket.identifier.push('1');
        }
    }
    let suffix = (lane + 1).to_string();
    for mut socket in absorbed.inputs {
        socket.identifier.push_str(&suffix);
        node.inputs.push(socket);
    }
    for mut socket in absorbed.outputs {
        socket.identifier.push_str(&suffix);
        node.outputs.push(socket);
    }

    tracing::trace!(
        canonical = %canonical,
        absorbed = %id,
        lanes = lane + 1,
        "merged texture sampler"
    );
    for e in edges_in {
        graph.add_edge(Edge::new(e.from, canonical, e.from_socket, e.to_socket + lane * n_in));
    }
    for e in edges_out {
        graph.add_edge(Edge::new(canonical, e.to, e.from_socket + lane * n_out, e.to_socket));
    }
}
