// rewrite.rs — Structural elimination rules
//
// One-shot, type-indexed rules over a snapshot of node ids taken before any
// edit:
//   - REROUTE: passthrough fan-out elimination.
//   - REPLACE: selector elimination (forward the second input).
//   - PARALLAX: absorb the texture on the second input into the parameter
//     slot and drop that input.
//
// Every rule only re-targets existing edges onto producers that already
// precede the rewritten node, so no rule can introduce a cycle.
//
// Preconditions: output node set; graph pruned.
// Postconditions: no REROUTE/REPLACE nodes remain; PARALLAX nodes have lost
//                 their second input; graph is pruned again.
// Failure modes: PARALLAX second input not fed by a texture → `Configuration`.
// Side effects: pushes `W0100` warnings into `ctx.diagnostics`.

use crate::diag::{codes, Diagnostic};
use crate::error::CompileError;
use crate::graph::{Edge, Graph};
use crate::id::{CompileContext, NodeId};
use crate::node_type::{GroupKind, NodeType};
use crate::prune;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rule {
    Passthrough,
    Selector,
    InlineTexture,
}

fn rule_for(kind: &NodeType) -> Option<Rule> {
    match kind {
        NodeType::Reroute => Some(Rule::Passthrough),
        NodeType::Group(GroupKind::Replace) => Some(Rule::Selector),
        NodeType::Group(GroupKind::Parallax) => Some(Rule::InlineTexture),
        _ => None,
    }
}

/// Apply every elimination rule once. Returns the number of nodes rewritten.
pub fn rewrite(graph: &mut Graph, ctx: &mut CompileContext) -> Result<usize, CompileError> {
    // Passthroughs first so that selectors and parallax nodes see their
    // real producers.
    let mut snapshot: Vec<(Rule, NodeId)> = graph
        .nodes()
        .filter_map(|n| rule_for(&n.kind).map(|rule| (rule, n.id)))
        .collect();
    snapshot.sort_by_key(|(rule, _)| *rule);

    let mut rewritten = 0;
    for (rule, id) in snapshot {
        if !graph.contains(id) {
            continue;
        }
        match rule {
            Rule::Passthrough => eliminate_passthrough(graph, id),
            Rule::Selector => eliminate_selector(graph, id, ctx),
            Rule::InlineTexture => inline_texture(graph, id)?,
        }
        rewritten += 1;
    }

    if rewritten > 0 {
        prune::prune(graph)?;
    }
    Ok(rewritten)
}

/// Re-wire every outbound edge of `id` to its single producer, preserving
/// multiplicity, then remove `id`. Without a producer the outbound edges are
/// dropped.
fn eliminate_passthrough(graph: &mut Graph, id: NodeId) {
    let producer = graph.in_edges(id).first().copied();
    if let Some(input) = producer {
        for out in graph.out_edges(id) {
            graph.add_edge(Edge::new(input.from, out.to, input.from_socket, out.to_socket));
        }
    }
    tracing::trace!(node = %id, forwarded = producer.is_some(), "eliminated passthrough");
    graph.remove_node(id);
}

/// Forward whichever edge targets socket 1 to every consumer of `id`.
fn eliminate_selector(graph: &mut Graph, id: NodeId, ctx: &mut CompileContext) {
    let selected = graph.in_edges(id).into_iter().find(|e| e.to_socket == 1);
    match selected {
        Some(input) => {
            for out in graph.out_edges(id) {
                graph.add_edge(Edge::new(input.from, out.to, input.from_socket, out.to_socket));
            }
            tracing::trace!(node = %id, producer = %input.from, "eliminated selector");
        }
        None => {
            let name = graph.node(id).map(|n| n.name.clone()).unwrap_or_default();
            tracing::warn!(
                node = %name,
                "selector has no second input; consumers fall back to defaults"
            );
            ctx.diagnostics.push(
                Diagnostic::warning("selector has no second input")
                    .with_code(codes::W0100)
                    .with_node(name),
            );
        }
    }
    graph.remove_node(id);
}

/// Move the texture feeding socket 1 into the node's first param slot and
/// drop socket 1 from the input list.
fn inline_texture(graph: &mut Graph, id: NodeId) -> Result<(), CompileError> {
    let in_edges = graph.in_edges(id);

    if let Some(feed) = in_edges.iter().find(|e| e.to_socket == 1).copied() {
        let texture = graph
            .node(feed.from)
            .filter(|n| matches!(n.kind, NodeType::Texture { .. }))
            .map(|n| (n.data.clone(), n.params.first().cloned()));
        let Some((data, param)) = texture else {
            let name = graph.node(id).map(|n| n.name.clone()).unwrap_or_default();
            return Err(CompileError::configuration(
                &name,
                "parallax height input must be a texture",
            ));
        };

        if let Some(node) = graph.node_mut(id) {
            node.data = data;
            if let (Some(slot), Some(param)) = (node.params.first_mut(), param) {
                *slot = param;
            }
        }

        for edge in in_edges.iter().filter(|e| e.from == feed.from && e.to_socket == 1) {
            graph.remove_edge(edge);
        }
        if graph.out_edges(feed.from).is_empty() {
            graph.remove_node(feed.from);
        }
        tracing::trace!(node = %id, texture = %feed.from, "inlined texture");
    }

    // The second input is gone regardless of whether it was fed; later
    // sockets move down one index.
    let Some(node) = graph.node_mut(id) else {
        return Ok(());
    };
    if node.inputs.len() < 2 {
        return Ok(());
    }
    node.inputs.remove(1);
    for edge in graph.in_edges(id) {
        if edge.to_socket >= 1 {
            graph.remove_edge(&edge);
        }
        if edge.to_socket > 1 {
            graph.add_edge(Edge::new(edge.from, edge.to, edge.from_socket, edge.to_socket - 1));
        }
    }
    Ok(())
}
