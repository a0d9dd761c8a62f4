// prune.rs — Edge completion, output lookup, reachability pruning
//
// Preconditions: graph produced by `builder::build_graph` for the same tree.
// Postconditions: after `prune`, every node lies on a path to the output;
//                 after `fix_links`, every socket's `is_linked` matches the
//                 edges that actually touch it.
// Failure modes: no OUTPUT node → `CompileError::MissingOutput`.
// Side effects: none.

use crate::error::CompileError;
use crate::graph::{Edge, Graph};
use crate::id::NodeId;
use crate::node_type::{GroupKind, NodeType};
use crate::tree::AuthoredTree;

/// Add the synthetic edges required when one authored link drives two
/// internal sockets. A translucency group's `Translucency` output also feeds
/// its parameter bundle into the next socket of the same consumer.
pub fn complete_edges(graph: &mut Graph) -> usize {
    let mut appended = Vec::new();
    for node in graph.nodes() {
        if node.kind != NodeType::Group(GroupKind::Translucency) {
            continue;
        }
        for edge in graph.out_edges(node.id) {
            let drives_params = node
                .outputs
                .get(edge.from_socket)
                .map_or(false, |s| s.name == "Translucency");
            if drives_params {
                appended.push(Edge::new(
                    edge.from,
                    edge.to,
                    edge.from_socket + 1,
                    edge.to_socket + 1,
                ));
            }
        }
    }
    let count = appended.len();
    for edge in appended {
        graph.add_edge(edge);
    }
    count
}

/// Locate the output node: the last OUTPUT node declared in the authored
/// tree, first internal node carrying its name.
pub fn find_output(tree: &AuthoredTree, graph: &Graph) -> Result<NodeId, CompileError> {
    let authored = tree
        .nodes
        .iter()
        .rev()
        .find(|n| n.kind == "OUTPUT")
        .ok_or(CompileError::MissingOutput)?;
    graph
        .ids_named(&authored.name)
        .first()
        .copied()
        .ok_or(CompileError::MissingOutput)
}

/// Keep only the subgraph backward-reachable from the output node.
/// Returns the number of nodes dropped.
pub fn prune(graph: &mut Graph) -> Result<usize, CompileError> {
    let output = graph.output().ok_or(CompileError::MissingOutput)?;
    let live = graph.backward_reachable(output);
    let dropped = graph.retain_nodes(&live);
    if dropped > 0 {
        tracing::debug!(dropped, "pruned unreachable nodes");
    }
    Ok(dropped)
}

/// Recompute every socket's `is_linked` from the edges present.
pub fn fix_links(graph: &mut Graph) {
    for id in graph.node_ids() {
        let out_edges = graph.out_edges(id);
        let in_edges = graph.in_edges(id);
        let Some(node) = graph.node_mut(id) else {
            continue;
        };
        for (i, socket) in node.inputs.iter_mut().enumerate() {
            socket.is_linked = in_edges.iter().any(|e| e.to_socket == i);
        }
        for (i, socket) in node.outputs.iter_mut().enumerate() {
            socket.is_linked = out_edges.iter().any(|e| e.from_socket == i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use crate::id::CompileContext;
    use crate::tree::{AuthoredNode, MaterialBinding};

    fn value(name: &str) -> AuthoredNode {
        AuthoredNode::new(name, "VALUE").with_output("Value", 0.5)
    }

    fn output(name: &str) -> AuthoredNode {
        AuthoredNode::new(name, "OUTPUT").with_input("Color", [0.0; 4])
    }

    #[test]
    fn last_output_wins() {
        let tree = AuthoredTree::new()
            .with_node(output("First"))
            .with_node(output("Second"));
        let g = build_graph(&tree, &mut CompileContext::new()).unwrap();
        assert_eq!(find_output(&tree, &g), Ok(NodeId(1)));
    }

    #[test]
    fn missing_output() {
        let tree = AuthoredTree::new().with_node(value("V"));
        let g = build_graph(&tree, &mut CompileContext::new()).unwrap();
        assert_eq!(find_output(&tree, &g), Err(CompileError::MissingOutput));
    }

    #[test]
    fn prune_drops_dead_branch_and_fix_links_clears_flags() {
        let tree = AuthoredTree::new()
            .with_node(value("Live"))
            .with_node(value("Dead"))
            .with_node(
                AuthoredNode::new("Sink", "MATH")
                    .with_operation("ADD")
                    .with_input("Value", 0.0),
            )
            .with_node(output("Output"))
            .with_link("Live", "Value", "Output", "Color")
            .with_link("Dead", "Value", "Sink", "Value");
        let mut g = build_graph(&tree, &mut CompileContext::new()).unwrap();
        let out = find_output(&tree, &g).unwrap();
        g.set_output(out);
        assert_eq!(prune(&mut g), Ok(2));
        assert_eq!(g.node_count(), 2);

        // Authored flag survives pruning until repaired.
        g.node_mut(NodeId(0)).unwrap().outputs[0].is_linked = false;
        fix_links(&mut g);
        assert!(g.node(NodeId(0)).unwrap().outputs[0].is_linked);
        assert!(g.node(out).unwrap().inputs[0].is_linked);
    }

    #[test]
    fn translucency_link_drives_params_socket() {
        let material = AuthoredNode::new("Material", "MATERIAL_EXT")
            .with_material(MaterialBinding::new("Skin"))
            .with_input("Color", [0.0; 4])
            .with_input("Spec", [0.0; 4])
            .with_input("Normal", [0.0; 3])
            .with_input("Translucency", 0.0)
            .with_output("Color", [0.0; 4])
            .with_output("Alpha", 1.0)
            .with_output("Normal", [0.0; 3])
            .with_output("Diffuse", [0.0; 4])
            .with_output("Spec", [0.0; 4]);
        let group = AuthoredNode::new("Translucency", "GROUP")
            .with_group("TRANSLUCENCY")
            .with_output("Translucency", 0.0);
        let tree = AuthoredTree::new()
            .with_node(group)
            .with_node(material)
            .with_link("Translucency", "Translucency", "Material", "Translucency");
        let mut g = build_graph(&tree, &mut CompileContext::new()).unwrap();
        assert_eq!(g.edges(), vec![Edge::new(NodeId(0), NodeId(1), 0, 5)]);
        assert_eq!(complete_edges(&mut g), 1);
        assert_eq!(
            g.edges(),
            vec![
                Edge::new(NodeId(0), NodeId(1), 0, 5),
                Edge::new(NodeId(0), NodeId(1), 1, 6)
            ]
        );
    }
}
