// dot.rs — Graphviz DOT output for compiled node graphs
//
// Renders a `Graph` as DOT for `dot` or another Graphviz layout engine.
//
// Preconditions: none; any stage of the pipeline may be rendered.
// Postconditions: returns a DOT string with one edge line per edge occurrence.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::graph::{Graph, Node};
use crate::node_type::NodeType;

/// Emit the graph as a Graphviz DOT string.
pub fn emit_dot(graph: &Graph) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph nmc {{").unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    if graph.node_count() > 0 {
        writeln!(buf).unwrap();
    }
    for node in graph.nodes() {
        let attrs = node_attrs(node, graph.output() == Some(node.id));
        writeln!(buf, "    {} [{attrs}];", node.id).unwrap();
    }

    let edges = graph.edges();
    if !edges.is_empty() {
        writeln!(buf).unwrap();
    }
    for edge in &edges {
        writeln!(
            buf,
            "    {} -> {} [label=\"{}\u{2192}{}\"];",
            edge.from, edge.to, edge.from_socket, edge.to_socket
        )
        .unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

/// Escape a label for a double-quoted DOT string.
fn escape(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn node_label(node: &Node) -> String {
    format!("{}\\n{}", node.kind, escape(&node.name))
}

/// Return DOT attributes string for a node.
fn node_attrs(node: &Node, is_output: bool) -> String {
    let (shape, color) = if is_output {
        ("doubleoctagon", "gold")
    } else {
        match &node.kind {
            NodeType::Texture { .. } => ("box3d", "lightsalmon"),
            NodeType::Geometry(_) | NodeType::VertexColorChannels(_) | NodeType::Camera => {
                ("ellipse", "lightgreen")
            }
            NodeType::Material | NodeType::MaterialExt => ("component", "plum"),
            NodeType::Value | NodeType::Rgb | NodeType::Normal => ("note", "lightyellow"),
            NodeType::Output => ("doubleoctagon", "gray80"),
            _ => ("box", "lightblue"),
        }
    };
    let label = node_label(node);
    format!("shape={shape}, style=filled, fillcolor={color}, label=\"{label}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Socket};
    use crate::node_type::{MathOp, TextureKind};

    fn sample() -> Graph {
        let mut g = Graph::new();
        let mut tex = Node::new(
            NodeType::Texture {
                kind: TextureKind::Color,
                lanes: 1,
            },
            "Image \"A\"",
        );
        tex.outputs.push(Socket::new("Color", "Color", [0.0; 4]));
        let tex = g.add_node(tex);
        let mut math = Node::new(NodeType::Math(MathOp::Add), "Math");
        math.inputs.push(Socket::new("Value", "Value", 0.0));
        math.inputs.push(Socket::new("Value", "Value_001", 0.0));
        let math = g.add_node(math);
        g.add_edge(Edge::new(tex, math, 0, 0));
        g.add_edge(Edge::new(tex, math, 0, 1));
        g.add_edge(Edge::new(tex, math, 0, 1));
        g.set_output(math);
        g
    }

    #[test]
    fn valid_dot_structure() {
        let dot = emit_dot(&sample());
        assert!(dot.starts_with("digraph nmc {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("rankdir=LR;"));
    }

    #[test]
    fn duplicate_edges_drawn_per_occurrence() {
        let dot = emit_dot(&sample());
        let count = dot.matches("n0 -> n1 [label=\"0\u{2192}1\"]").count();
        assert_eq!(count, 2);
        assert_eq!(dot.matches(" -> ").count(), 3);
    }

    #[test]
    fn labels_carry_tag_and_escaped_name() {
        let dot = emit_dot(&sample());
        assert!(dot.contains("label=\"TEXTURE_COLOR\\nImage _A_\""), "dot:\n{dot}");
        assert!(dot.contains("shape=box3d"));
        assert!(dot.contains("shape=doubleoctagon, style=filled, fillcolor=gold"));
    }

    #[test]
    fn empty_graph_is_bare_header() {
        insta::assert_snapshot!(emit_dot(&Graph::new()), @r#"
        digraph nmc {
            rankdir=LR;
            node [fontname="Helvetica", fontsize=10];
            edge [fontname="Helvetica", fontsize=9];
        }
        "#);
    }
}
