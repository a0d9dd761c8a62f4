// channels.rs — Vertex-colour channel collapsing
//
// A vertex-colour accessor read only through SEPRGB splitters is replaced by
// one accessor exposing just the channels actually read, in R, G, B order.
//
// Preconditions: geometry accessors merged.
// Postconditions: collapsed accessors are typed `VertexColorChannels(n)` and
//                 their splitters are gone.
// Failure modes: none.
// Side effects: none.

use std::collections::BTreeSet;

use crate::graph::{Edge, Graph, Socket};
use crate::id::NodeId;
use crate::node_type::{GeometryKind, NodeType};

const CHANNELS: [&str; 3] = ["R", "G", "B"];

/// Collapse every qualifying vertex-colour accessor. Returns how many were
/// collapsed.
pub fn optimize_channels(graph: &mut Graph) -> usize {
    let accessors: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.kind == NodeType::Geometry(GeometryKind::VertexColor))
        .map(|n| n.id)
        .collect();
    accessors
        .into_iter()
        .filter(|&id| collapse(graph, id))
        .count()
}

fn collapse(graph: &mut Graph, accessor: NodeId) -> bool {
    let consumers: BTreeSet<NodeId> = graph.out_edges(accessor).iter().map(|e| e.to).collect();
    let only_splitters = !consumers.is_empty()
        && consumers
            .iter()
            .all(|&c| graph.node(c).map_or(false, |n| n.kind == NodeType::SepRgb));
    if !only_splitters {
        return false;
    }

    // Channel reads: (channel, consumer, to_socket) per splitter out-edge.
    let reads: Vec<(usize, Edge)> = consumers
        .iter()
        .flat_map(|&s| graph.out_edges(s))
        .filter(|e| e.from_socket < CHANNELS.len())
        .map(|e| (e.from_socket, e))
        .collect();
    let used: BTreeSet<usize> = reads.iter().map(|(ch, _)| *ch).collect();
    if used.is_empty() {
        return false;
    }

    for &splitter in &consumers {
        graph.remove_node(splitter);
    }

    // Presence index: position of the channel among those retained.
    let index_of = |channel: usize| used.iter().position(|&c| c == channel).unwrap_or(0);
    for (channel, edge) in &reads {
        graph.add_edge(Edge::new(accessor, edge.to, index_of(*channel), edge.to_socket));
    }

    if let Some(node) = graph.node_mut(accessor) {
        node.outputs = used
            .iter()
            .map(|&ch| {
                let mut socket = Socket::new(CHANNELS[ch], CHANNELS[ch], 0.0);
                socket.is_linked = true;
                socket
            })
            .collect();
        node.kind = NodeType::VertexColorChannels(used.len() as u8);
    }
    tracing::trace!(node = %accessor, channels = used.len(), "collapsed vertex colour splitters");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    fn vc(g: &mut Graph) -> NodeId {
        let mut n = Node::new(NodeType::Geometry(GeometryKind::VertexColor), "Geometry");
        n.outputs.push(Socket::new("Vertex Color", "Vertex Color", [0.0; 3]));
        g.add_node(n)
    }

    fn seprgb(g: &mut Graph) -> NodeId {
        let mut n = Node::new(NodeType::SepRgb, "Separate");
        n.inputs.push(Socket::new("Image", "Image", [0.0; 3]));
        for c in CHANNELS {
            n.outputs.push(Socket::new(c, c, 0.0));
        }
        g.add_node(n)
    }

    fn output(g: &mut Graph, inputs: usize) -> NodeId {
        let mut n = Node::new(NodeType::Output, "Output");
        for i in 0..inputs {
            n.inputs.push(Socket::new("In", &format!("In{i}"), 0.0));
        }
        let id = g.add_node(n);
        g.set_output(id);
        id
    }

    #[test]
    fn red_and_blue_collapse_to_two_outputs() {
        let mut g = Graph::new();
        let geom = vc(&mut g);
        let s1 = seprgb(&mut g);
        let s2 = seprgb(&mut g);
        let out = output(&mut g, 2);
        g.add_edge(Edge::new(geom, s1, 0, 0));
        g.add_edge(Edge::new(geom, s2, 0, 0));
        g.add_edge(Edge::new(s1, out, 0, 0));
        g.add_edge(Edge::new(s2, out, 2, 1));

        assert_eq!(optimize_channels(&mut g), 1);
        let node = g.node(geom).unwrap();
        assert_eq!(node.kind.to_string(), "GEOMETRY_VC2");
        let idents: Vec<_> = node.outputs.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(idents, vec!["R", "B"]);
        assert_eq!(
            g.edges(),
            vec![Edge::new(geom, out, 0, 0), Edge::new(geom, out, 1, 1)]
        );
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn other_consumer_disqualifies() {
        let mut g = Graph::new();
        let geom = vc(&mut g);
        let s = seprgb(&mut g);
        let out = output(&mut g, 2);
        g.add_edge(Edge::new(geom, s, 0, 0));
        g.add_edge(Edge::new(geom, out, 0, 1));
        g.add_edge(Edge::new(s, out, 1, 0));

        assert_eq!(optimize_channels(&mut g), 0);
        assert_eq!(g.node_count(), 3);
        assert_eq!(
            g.node(geom).unwrap().kind,
            NodeType::Geometry(GeometryKind::VertexColor)
        );
    }

    #[test]
    fn shared_channel_keeps_all_readers() {
        let mut g = Graph::new();
        let geom = vc(&mut g);
        let s = seprgb(&mut g);
        let out = output(&mut g, 2);
        g.add_edge(Edge::new(geom, s, 0, 0));
        g.add_edge(Edge::new(s, out, 1, 0));
        g.add_edge(Edge::new(s, out, 1, 1));

        assert_eq!(optimize_channels(&mut g), 1);
        assert_eq!(g.node(geom).unwrap().kind.to_string(), "GEOMETRY_VC1");
        assert_eq!(g.out_edges(geom).len(), 2);
        assert!(g.out_edges(geom).iter().all(|e| e.from_socket == 0));
    }
}
