// graph.rs — Arena multigraph for node materials
//
// Nodes live in an id-keyed arena; edges are a multiset keyed by
// (from, to, from_socket, to_socket) with an explicit occurrence count, so
// parallel edges produced by fan-out survive every rewrite.
//
// Passes never hold iterators across mutation: they snapshot ids/edges with
// `node_ids()`, `out_edges()`, `in_edges()` first and then edit through the
// id-addressed operations.
//
// Preconditions: none.
// Postconditions: every stored edge references nodes present in the arena
//                 (`remove_node` drops incident edges).
// Failure modes: `topological_order` reports the nodes left on a cycle.
// Side effects: none.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use crate::id::NodeId;
use crate::node_type::NodeType;
use crate::tree::{AuthoredSocket, MaterialBinding, SocketValue, TextureBinding};

// ── Node payload ────────────────────────────────────────────────────────────

/// An input or output socket of an internal node.
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    pub name: String,
    pub identifier: String,
    pub is_linked: bool,
    pub default_value: SocketValue,
}

impl Socket {
    pub fn new(name: &str, identifier: &str, default_value: impl Into<SocketValue>) -> Self {
        Socket {
            name: name.to_string(),
            identifier: identifier.to_string(),
            is_linked: false,
            default_value: default_value.into(),
        }
    }
}

impl From<&AuthoredSocket> for Socket {
    fn from(s: &AuthoredSocket) -> Self {
        Socket {
            name: s.name.clone(),
            identifier: s.identifier.clone(),
            is_linked: s.is_linked,
            default_value: s.default_value.clone(),
        }
    }
}

/// A shader constant. `value == None` means the value comes from elsewhere
/// (a wired input, a texture unit, or a vertex attribute).
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn slot(name: String) -> Self {
        Param { name, value: None }
    }

    pub fn literal(name: String, value: String) -> Self {
        Param {
            name,
            value: Some(value),
        }
    }
}

/// External data bound to a node, with the shader name it is bound under.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundData {
    UvLayer { name: String, layer: String },
    ColorLayer { name: String, layer: String },
    Texture { name: String, texture: TextureBinding },
    Material { name: String, material: MaterialBinding },
}

impl BoundData {
    /// The identifying value two nodes must share to be interchangeable.
    pub fn key(&self) -> &str {
        match self {
            BoundData::UvLayer { layer, .. } | BoundData::ColorLayer { layer, .. } => layer,
            BoundData::Texture { texture, .. } => &texture.name,
            BoundData::Material { material, .. } => &material.name,
        }
    }
}

/// A typed internal node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Assigned by `Graph::add_node`.
    pub id: NodeId,
    pub kind: NodeType,
    /// Authored node name; split nodes share it.
    pub name: String,
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
    pub params: Vec<Param>,
    pub vparams: Vec<Param>,
    pub data: Option<BoundData>,
}

impl Node {
    pub fn new(kind: NodeType, name: &str) -> Self {
        Node {
            id: NodeId(u32::MAX),
            kind,
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            params: Vec::new(),
            vparams: Vec::new(),
            data: None,
        }
    }
}

// ── Edges ───────────────────────────────────────────────────────────────────

/// A directed edge from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub from_socket: usize,
    pub to_socket: usize,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, from_socket: usize, to_socket: usize) -> Self {
        Edge {
            from,
            to,
            from_socket,
            to_socket,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] -> {}[{}]",
            self.from, self.from_socket, self.to, self.to_socket
        )
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<Edge, u32>,
    next_id: u32,
    output: Option<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ───────────────────────────────────────────────────────────

    /// Insert a node under a freshly generated id.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        self.nodes.insert(id, node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.edges.retain(|e, _| e.from != id && e.to != id);
        if self.output == Some(id) {
            self.output = None;
        }
        Some(node)
    }

    /// Snapshot of node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ids of all nodes carrying the given authored name.
    pub fn ids_named(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.name == name)
            .map(|n| n.id)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    pub fn set_output(&mut self, id: NodeId) {
        self.output = Some(id);
    }

    // ── Edges ───────────────────────────────────────────────────────────

    /// Add one occurrence of `edge`.
    pub fn add_edge(&mut self, edge: Edge) {
        debug_assert!(self.contains(edge.from) && self.contains(edge.to));
        *self.edges.entry(edge).or_insert(0) += 1;
    }

    /// Remove one occurrence of `edge`. Returns false if absent.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        match self.edges.get_mut(edge) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.edges.remove(edge);
                true
            }
            None => false,
        }
    }

    /// Remove every occurrence of every edge between `from` and `to`,
    /// returning the removed occurrences.
    pub fn remove_edges_between(&mut self, from: NodeId, to: NodeId) -> Vec<Edge> {
        let removed: Vec<Edge> = self
            .out_edges(from)
            .into_iter()
            .filter(|e| e.to == to)
            .collect();
        for e in &removed {
            self.edges.remove(e);
        }
        removed
    }

    /// How many times `edge` occurs.
    pub fn multiplicity(&self, edge: &Edge) -> u32 {
        self.edges.get(edge).copied().unwrap_or(0)
    }

    /// All edge occurrences, expanded by multiplicity, in key order.
    pub fn edges(&self) -> Vec<Edge> {
        expand(self.edges.iter())
    }

    /// Outgoing edge occurrences of `id`, in key order.
    pub fn out_edges(&self, id: NodeId) -> Vec<Edge> {
        let lo = Edge::new(id, NodeId(0), 0, 0);
        expand(
            self.edges
                .range(lo..)
                .take_while(|(e, _)| e.from == id),
        )
    }

    /// Incoming edge occurrences of `id`, in key order.
    pub fn in_edges(&self, id: NodeId) -> Vec<Edge> {
        expand(self.edges.iter().filter(|(e, _)| e.to == id))
    }

    /// Total edge occurrences.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|c| *c as usize).sum()
    }

    pub fn has_out_edge_at(&self, id: NodeId, socket: usize) -> bool {
        self.out_edges(id).iter().any(|e| e.from_socket == socket)
    }

    pub fn has_in_edge_at(&self, id: NodeId, socket: usize) -> bool {
        self.in_edges(id).iter().any(|e| e.to_socket == socket)
    }

    // ── Whole-graph queries ─────────────────────────────────────────────

    /// Nodes from which `root` can be reached (including `root`).
    pub fn backward_reachable(&self, root: NodeId) -> BTreeSet<NodeId> {
        let mut preds: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for e in self.edges.keys() {
            preds.entry(e.to).or_default().push(e.from);
        }
        let mut live = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !self.contains(id) || !live.insert(id) {
                continue;
            }
            if let Some(ps) = preds.get(&id) {
                queue.extend(ps.iter().copied());
            }
        }
        live
    }

    /// Nodes reachable from `root` (including `root`).
    pub fn forward_reachable(&self, root: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !self.contains(id) || !seen.insert(id) {
                continue;
            }
            let lo = Edge::new(id, NodeId(0), 0, 0);
            queue.extend(
                self.edges
                    .range(lo..)
                    .take_while(|(e, _)| e.from == id)
                    .map(|(e, _)| e.to),
            );
        }
        seen
    }

    /// Drop every node not in `keep`, together with its edges.
    pub fn retain_nodes(&mut self, keep: &BTreeSet<NodeId>) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|id, _| keep.contains(id));
        self.edges
            .retain(|e, _| keep.contains(&e.from) && keep.contains(&e.to));
        if let Some(out) = self.output {
            if !keep.contains(&out) {
                self.output = None;
            }
        }
        before - self.nodes.len()
    }

    /// Kahn's algorithm with deterministic ordering (ready nodes by id).
    ///
    /// On a cycle, returns the ids that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, Vec<NodeId>> {
        let mut in_degree: BTreeMap<NodeId, u32> = self.nodes.keys().map(|&id| (id, 0)).collect();
        let mut adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (e, count) in &self.edges {
            *in_degree.entry(e.to).or_insert(0) += count;
            adj.entry(e.from).or_default().extend((0..*count).map(|_| e.to));
        }

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            if let Some(next) = adj.get(&id) {
                for &to in next {
                    if let Some(deg) = in_degree.get_mut(&to) {
                        *deg -= 1;
                        if *deg == 0 {
                            ready.insert(to);
                        }
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let placed: BTreeSet<NodeId> = order.iter().copied().collect();
            return Err(self
                .nodes
                .keys()
                .filter(|id| !placed.contains(id))
                .copied()
                .collect());
        }
        Ok(order)
    }
}

fn expand<'a>(entries: impl Iterator<Item = (&'a Edge, &'a u32)>) -> Vec<Edge> {
    entries
        .flat_map(|(e, count)| std::iter::repeat(*e).take(*count as usize))
        .collect()
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Graph ({} nodes, {} edges)",
            self.node_count(),
            self.edge_count()
        )?;
        for node in self.nodes.values() {
            let marker = if self.output == Some(node.id) { " [output]" } else { "" };
            writeln!(
                f,
                "  {} {} '{}' in={} out={}{}",
                node.id,
                node.kind,
                node.name,
                node.inputs.len(),
                node.outputs.len(),
                marker
            )?;
        }
        for (edge, count) in &self.edges {
            if *count > 1 {
                writeln!(f, "  {edge} x{count}")?;
            } else {
                writeln!(f, "  {edge}")?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn value_node(g: &mut Graph, name: &str) -> NodeId {
        let mut node = Node::new(NodeType::Value, name);
        node.outputs.push(Socket::new("Value", "Value", 0.0));
        node.inputs.push(Socket::new("Value", "Value", 0.0));
        g.add_node(node)
    }

    #[test]
    fn ids_are_sequential_and_unique() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        g.remove_node(a);
        let c = value_node(&mut g, "c");
        assert_eq!(c, NodeId(2));
        assert_eq!(g.node_ids(), vec![b, c]);
    }

    #[test]
    fn parallel_edges_keep_multiplicity() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let e = Edge::new(a, b, 0, 0);
        g.add_edge(e);
        g.add_edge(e);
        assert_eq!(g.multiplicity(&e), 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.out_edges(a), vec![e, e]);
        assert_eq!(g.in_edges(b), vec![e, e]);

        assert!(g.remove_edge(&e));
        assert_eq!(g.multiplicity(&e), 1);
        assert!(g.remove_edge(&e));
        assert!(!g.remove_edge(&e));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let c = value_node(&mut g, "c");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(b, c, 0, 0));
        g.remove_node(b);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn out_edges_do_not_leak_neighbours() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let c = value_node(&mut g, "c");
        g.add_edge(Edge::new(a, c, 0, 0));
        g.add_edge(Edge::new(b, c, 0, 0));
        assert_eq!(g.out_edges(a), vec![Edge::new(a, c, 0, 0)]);
        assert_eq!(g.out_edges(b), vec![Edge::new(b, c, 0, 0)]);
        assert!(g.out_edges(c).is_empty());
    }

    #[test]
    fn remove_edges_between_takes_all_occurrences() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(a, b, 1, 0));
        let removed = g.remove_edges_between(a, b);
        assert_eq!(removed.len(), 3);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn backward_reachability_and_retain() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let dead = value_node(&mut g, "dead");
        let out = value_node(&mut g, "out");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(b, out, 0, 0));
        g.add_edge(Edge::new(a, dead, 0, 0));
        g.set_output(out);

        let live = g.backward_reachable(out);
        assert_eq!(live.into_iter().collect::<Vec<_>>(), vec![a, b, out]);

        let keep = g.backward_reachable(out);
        assert_eq!(g.retain_nodes(&keep), 1);
        assert!(!g.contains(dead));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.output(), Some(out));
    }

    #[test]
    fn forward_reachable_follows_out_edges() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let c = value_node(&mut g, "c");
        let side = value_node(&mut g, "side");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(b, c, 0, 0));
        g.add_edge(Edge::new(side, c, 0, 0));
        assert_eq!(g.forward_reachable(a).into_iter().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(g.forward_reachable(c).into_iter().collect::<Vec<_>>(), vec![c]);
    }

    #[test]
    fn topological_order_respects_edges() {
        let mut g = Graph::new();
        let out = value_node(&mut g, "out");
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        g.add_edge(Edge::new(b, out, 0, 0));
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(a, b, 0, 0));
        assert_eq!(g.topological_order(), Ok(vec![a, b, out]));
    }

    #[test]
    fn topological_order_reports_cycle() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        let c = value_node(&mut g, "c");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(b, c, 0, 0));
        g.add_edge(Edge::new(c, b, 0, 0));
        assert_eq!(g.topological_order(), Err(vec![b, c]));
    }

    #[test]
    fn bound_data_keys() {
        let uv = BoundData::UvLayer {
            name: "param_GEOMETRY_UV_a0".into(),
            layer: "UVMap".into(),
        };
        assert_eq!(uv.key(), "UVMap");
        let tex = BoundData::Texture {
            name: "param_TEXTURE_texture0".into(),
            texture: TextureBinding::new("stone"),
        };
        assert_eq!(tex.key(), "stone");
    }

    #[test]
    fn display_lists_nodes_and_edges() {
        let mut g = Graph::new();
        let a = value_node(&mut g, "a");
        let b = value_node(&mut g, "b");
        g.add_edge(Edge::new(a, b, 0, 0));
        g.add_edge(Edge::new(a, b, 0, 0));
        g.set_output(b);
        let text = g.to_string();
        assert!(text.starts_with("Graph (2 nodes, 2 edges)"));
        assert!(text.contains("n1 VALUE 'b' in=1 out=1 [output]"));
        assert!(text.contains("n0[0] -> n1[0] x2"));
    }
}
