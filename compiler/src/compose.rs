// compose.rs — Ordered instruction records for shader generation
//
// Orders the finished graph topologically and binds a shader identifier to
// every socket: unwired sockets get a fresh name at once, wired outputs on
// their first outgoing edge, and every consumer of that output reuses it.
//
// Preconditions: graph taken from the compiled-graph cache (finished).
// Postconditions: one `NodeElement` per node, in an order consistent with all
//                 edges; identifiers unique within the returned sequence.
// Failure modes: cycle or out-of-range socket → `InvariantViolation`.
// Side effects: none. Counters are fresh per call, so repeated calls on the
//               same graph produce identical records.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::InvariantViolation;
use crate::glsl::glsl_value;
use crate::graph::{Graph, Node};
use crate::id::{IdentAllocator, NodeId};

/// One instruction record: a node with all its names resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeElement {
    /// Type tag selecting the generator's template.
    #[serde(rename = "id")]
    pub type_tag: String,
    /// `None` only transiently; every wired input receives its producer's name.
    pub inputs: Vec<Option<String>>,
    /// Literal for unwired inputs, `None` for wired ones.
    pub input_values: Vec<Option<String>>,
    pub outputs: Vec<Option<String>>,
    pub params: Vec<String>,
    pub param_values: Vec<Option<String>>,
    pub vparams: Vec<String>,
}

impl NodeElement {
    fn init(node: &Node, idents: &mut IdentAllocator) -> Self {
        let tag = node.kind.to_string();

        let mut inputs = Vec::with_capacity(node.inputs.len());
        let mut input_values = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            if input.is_linked {
                inputs.push(None);
                input_values.push(None);
            } else {
                inputs.push(Some(idents.ident(&format!("in_{tag}_{}", input.identifier))));
                input_values.push(Some(glsl_value(&input.default_value, 0)));
            }
        }

        let outputs = node
            .outputs
            .iter()
            .map(|output| {
                (!output.is_linked)
                    .then(|| idents.ident(&format!("out_{tag}_{}", output.identifier)))
            })
            .collect();

        NodeElement {
            type_tag: tag,
            inputs,
            input_values,
            outputs,
            params: node.params.iter().map(|p| p.name.clone()).collect(),
            param_values: node.params.iter().map(|p| p.value.clone()).collect(),
            vparams: node.vparams.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

/// Produce the ordered instruction records for `graph`.
pub fn compose_node_elements(graph: &Graph) -> Result<Vec<NodeElement>, InvariantViolation> {
    let order = graph
        .topological_order()
        .map_err(|remaining| InvariantViolation::Cycle {
            remaining: remaining.len(),
        })?;

    let mut idents = IdentAllocator::new();
    let mut elements = Vec::with_capacity(order.len());
    let mut position: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
    for &id in &order {
        if let Some(node) = graph.node(id) {
            position.insert(id, elements.len());
            elements.push(NodeElement::init(node, &mut idents));
        }
    }

    for &id in &order {
        for edge in graph.out_edges(id) {
            let dangling = || InvariantViolation::DanglingEdge {
                edge: edge.to_string(),
            };
            let (Some(&src), Some(&dst)) = (position.get(&edge.from), position.get(&edge.to))
            else {
                return Err(dangling());
            };
            let identifier = graph
                .node(edge.from)
                .and_then(|n| n.outputs.get(edge.from_socket))
                .map(|s| s.identifier.clone())
                .ok_or_else(dangling)?;
            if edge.to_socket >= elements[dst].inputs.len() {
                return Err(dangling());
            }

            let name = match elements[src].outputs.get(edge.from_socket) {
                Some(Some(existing)) => existing.clone(),
                _ => idents.ident(&format!("out_{}_{identifier}", elements[src].type_tag)),
            };
            elements[src].outputs[edge.from_socket] = Some(name.clone());
            elements[dst].inputs[edge.to_socket] = Some(name);
        }
    }

    Ok(elements)
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for NodeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.type_tag)?;
        for (i, (name, value)) in self.inputs.iter().zip(&self.input_values).enumerate() {
            let name = name.as_deref().unwrap_or("-");
            match value {
                Some(v) => writeln!(f, "  in[{i}] {name} = {v}")?,
                None => writeln!(f, "  in[{i}] {name}")?,
            }
        }
        for (i, name) in self.outputs.iter().enumerate() {
            writeln!(f, "  out[{i}] {}", name.as_deref().unwrap_or("-"))?;
        }
        for (name, value) in self.params.iter().zip(&self.param_values) {
            match value {
                Some(v) => writeln!(f, "  param {name} = {v}")?,
                None => writeln!(f, "  param {name}")?,
            }
        }
        for name in &self.vparams {
            writeln!(f, "  vparam {name}")?;
        }
        Ok(())
    }
}

/// Concatenated `Display` of a record sequence.
pub fn render(elements: &[NodeElement]) -> String {
    elements.iter().map(|e| e.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Param, Socket};
    use crate::node_type::{MathOp, NodeType};

    fn value(g: &mut Graph, v: f64) -> NodeId {
        let mut n = Node::new(NodeType::Value, "Value");
        let mut out = Socket::new("Value", "Value", v);
        out.is_linked = true;
        n.outputs.push(out);
        n.params.push(Param::literal(format!("param_VALUE_Value{}", g.node_count()), "0.5".into()));
        g.add_node(n)
    }

    fn add_node(g: &mut Graph) -> NodeId {
        let mut n = Node::new(NodeType::Math(MathOp::Add), "Math");
        n.inputs.push(Socket::new("Value", "Value", 0.5));
        n.inputs.push(Socket::new("Value", "Value_001", 0.25));
        n.outputs.push(Socket::new("Value", "Value", 0.0));
        g.add_node(n)
    }

    #[test]
    fn wired_output_shares_one_name() {
        let mut g = Graph::new();
        let v = value(&mut g, 0.5);
        let m = add_node(&mut g);
        g.node_mut(m).unwrap().inputs[0].is_linked = true;
        g.node_mut(m).unwrap().inputs[1].is_linked = true;
        g.add_edge(Edge::new(v, m, 0, 0));
        g.add_edge(Edge::new(v, m, 0, 1));

        let elements = compose_node_elements(&g).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].outputs, vec![Some("out_VALUE_Value0".to_string())]);
        assert_eq!(
            elements[1].inputs,
            vec![
                Some("out_VALUE_Value0".to_string()),
                Some("out_VALUE_Value0".to_string())
            ]
        );
        assert_eq!(elements[1].input_values, vec![None, None]);
        assert_eq!(elements[1].outputs, vec![Some("out_MATH_ADD_Value0".to_string())]);
    }

    #[test]
    fn unwired_inputs_carry_literals() {
        let mut g = Graph::new();
        add_node(&mut g);
        let elements = compose_node_elements(&g).unwrap();
        insta::assert_snapshot!(render(&elements), @r"
        MATH_ADD
          in[0] in_MATH_ADD_Value0 = 0.5
          in[1] in_MATH_ADD_Value_0010 = 0.25
          out[0] out_MATH_ADD_Value0
        ");
    }

    #[test]
    fn order_follows_edges_not_ids() {
        let mut g = Graph::new();
        let m = add_node(&mut g);
        let v = value(&mut g, 0.5);
        g.node_mut(m).unwrap().inputs[0].is_linked = true;
        g.add_edge(Edge::new(v, m, 0, 0));
        let elements = compose_node_elements(&g).unwrap();
        let tags: Vec<_> = elements.iter().map(|e| e.type_tag.as_str()).collect();
        assert_eq!(tags, vec!["VALUE", "MATH_ADD"]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let mut g = Graph::new();
        let v = value(&mut g, 0.5);
        let m = add_node(&mut g);
        g.node_mut(m).unwrap().inputs[0].is_linked = true;
        g.add_edge(Edge::new(v, m, 0, 0));
        assert_eq!(compose_node_elements(&g), compose_node_elements(&g));
    }

    #[test]
    fn cycle_is_an_invariant_violation() {
        let mut g = Graph::new();
        let a = add_node(&mut g);
        let b = add_node(&mut g);
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(b, a, 0, 0));
        assert_eq!(
            compose_node_elements(&g),
            Err(InvariantViolation::Cycle { remaining: 2 })
        );
    }

    #[test]
    fn out_of_range_socket_is_dangling() {
        let mut g = Graph::new();
        let v = value(&mut g, 0.5);
        let m = add_node(&mut g);
        g.add_edge(Edge::new(v, m, 0, 7));
        assert!(matches!(
            compose_node_elements(&g),
            Err(InvariantViolation::DanglingEdge { .. })
        ));
    }

    #[test]
    fn serializes_with_generator_field_names() {
        let mut g = Graph::new();
        value(&mut g, 0.5);
        let elements = compose_node_elements(&g).unwrap();
        let json = serde_json::to_value(&elements[0]).unwrap();
        assert_eq!(json["id"], "VALUE");
        assert_eq!(json["params"][0], "param_VALUE_Value0");
        assert_eq!(json["param_values"][0], "0.5");
    }
}
