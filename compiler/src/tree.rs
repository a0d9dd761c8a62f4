// tree.rs — Authored node-tree input model
//
// The node tree as exported by the content-authoring tool: an ordered list of
// authored nodes (kind tag, kind-specific properties, ordered sockets) and an
// ordered list of links addressed by node name and socket identifier.
//
// Preconditions: none (data-only module, deserialized from JSON).
// Postconditions: none.
// Failure modes: malformed JSON → `serde_json::Error` from `AuthoredTree::from_json`.
// Side effects: none.

use serde::{Deserialize, Serialize};

// ── Socket values ───────────────────────────────────────────────────────────

/// Default value carried by an authored socket: a scalar or a short vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Default for SocketValue {
    fn default() -> Self {
        SocketValue::Scalar(0.0)
    }
}

impl SocketValue {
    /// Drop vector components past `len` (vec4 colours become vec3).
    pub fn truncated(&self, len: usize) -> SocketValue {
        match self {
            SocketValue::Vector(v) if v.len() > len => SocketValue::Vector(v[..len].to_vec()),
            other => other.clone(),
        }
    }

    /// Components as a flat slice-like vector (a scalar yields one component).
    pub fn components(&self) -> Vec<f64> {
        match self {
            SocketValue::Scalar(s) => vec![*s],
            SocketValue::Vector(v) => v.clone(),
        }
    }
}

impl From<f64> for SocketValue {
    fn from(v: f64) -> Self {
        SocketValue::Scalar(v)
    }
}

impl From<Vec<f64>> for SocketValue {
    fn from(v: Vec<f64>) -> Self {
        SocketValue::Vector(v)
    }
}

impl<const N: usize> From<[f64; N]> for SocketValue {
    fn from(v: [f64; N]) -> Self {
        SocketValue::Vector(v.to_vec())
    }
}

// ── Sockets ─────────────────────────────────────────────────────────────────

/// An authored input or output socket.
///
/// `is_linked` is the authoring-time flag; the compiler recomputes linkage
/// from actual edges once the graph has been pruned and rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredSocket {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub is_linked: bool,
    #[serde(default)]
    pub default_value: SocketValue,
}

impl AuthoredSocket {
    /// Socket whose display name equals its identifier.
    pub fn new(identifier: &str, default_value: impl Into<SocketValue>) -> Self {
        AuthoredSocket {
            name: identifier.to_string(),
            identifier: identifier.to_string(),
            is_linked: false,
            default_value: default_value.into(),
        }
    }
}

// ── External bindings ───────────────────────────────────────────────────────

/// Opaque texture record referenced by texture and parallax nodes.
/// Two samplers refer to the same texture when their names are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureBinding {
    pub name: String,
    #[serde(rename = "type", default = "default_texture_type")]
    pub texture_type: String,
}

fn default_texture_type() -> String {
    "IMAGE".to_string()
}

impl TextureBinding {
    pub fn new(name: &str) -> Self {
        TextureBinding {
            name: name.to_string(),
            texture_type: default_texture_type(),
        }
    }

    pub fn is_environment_map(&self) -> bool {
        self.texture_type == "ENVIRONMENT_MAP"
    }
}

/// Opaque material record referenced by material nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialBinding {
    pub name: String,
    pub diffuse_shader: String,
    pub specular_shader: String,
    pub roughness: f64,
    pub diffuse_fresnel: f64,
    pub diffuse_fresnel_factor: f64,
    pub specular_intensity: f64,
    pub specular_hardness: f64,
    pub specular_slope: f64,
}

impl Default for MaterialBinding {
    fn default() -> Self {
        MaterialBinding {
            name: String::new(),
            diffuse_shader: "LAMBERT".to_string(),
            specular_shader: "COOKTORR".to_string(),
            roughness: 0.5,
            diffuse_fresnel: 0.1,
            diffuse_fresnel_factor: 0.5,
            specular_intensity: 0.5,
            specular_hardness: 50.0,
            specular_slope: 0.1,
        }
    }
}

impl MaterialBinding {
    pub fn new(name: &str) -> Self {
        MaterialBinding {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

// ── Nodes ───────────────────────────────────────────────────────────────────

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn enabled() -> bool {
    true
}

/// One authored node. Kind-specific properties are optional and only read
/// by the builder for the kinds that use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<AuthoredSocket>,
    #[serde(default)]
    pub outputs: Vec<AuthoredSocket>,

    /// MATH / VECT_MATH operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// MIX_RGB blend mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_type: Option<String>,
    /// GROUP sub-tree name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_tree_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialBinding>,

    // MAPPING
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    #[serde(default)]
    pub use_min: bool,
    #[serde(default)]
    pub use_max: bool,
    #[serde(default)]
    pub min: [f64; 3],
    #[serde(default = "unit_scale")]
    pub max: [f64; 3],

    // MATERIAL / MATERIAL_EXT
    #[serde(default = "enabled")]
    pub use_diffuse: bool,
    #[serde(default = "enabled")]
    pub use_specular: bool,
}

impl AuthoredNode {
    pub fn new(name: &str, kind: &str) -> Self {
        AuthoredNode {
            name: name.to_string(),
            kind: kind.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            operation: None,
            blend_type: None,
            node_tree_name: None,
            uv_layer: None,
            color_layer: None,
            texture: None,
            material: None,
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: unit_scale(),
            use_min: false,
            use_max: false,
            min: [0.0; 3],
            max: unit_scale(),
            use_diffuse: true,
            use_specular: true,
        }
    }

    pub fn with_input(mut self, identifier: &str, default_value: impl Into<SocketValue>) -> Self {
        self.inputs.push(AuthoredSocket::new(identifier, default_value));
        self
    }

    pub fn with_output(mut self, identifier: &str, default_value: impl Into<SocketValue>) -> Self {
        self.outputs
            .push(AuthoredSocket::new(identifier, default_value));
        self
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_blend_type(mut self, blend_type: &str) -> Self {
        self.blend_type = Some(blend_type.to_string());
        self
    }

    pub fn with_group(mut self, node_tree_name: &str) -> Self {
        self.node_tree_name = Some(node_tree_name.to_string());
        self
    }

    pub fn with_uv_layer(mut self, layer: &str) -> Self {
        self.uv_layer = Some(layer.to_string());
        self
    }

    pub fn with_color_layer(mut self, layer: &str) -> Self {
        self.color_layer = Some(layer.to_string());
        self
    }

    pub fn with_texture(mut self, texture: TextureBinding) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_material(mut self, material: MaterialBinding) -> Self {
        self.material = Some(material);
        self
    }

    pub fn input(&self, identifier: &str) -> Option<&AuthoredSocket> {
        self.inputs.iter().find(|s| s.identifier == identifier)
    }

    pub fn output(&self, identifier: &str) -> Option<&AuthoredSocket> {
        self.outputs.iter().find(|s| s.identifier == identifier)
    }
}

// ── Links ───────────────────────────────────────────────────────────────────

/// A link between an output socket and an input socket, addressed by
/// authored node name and socket identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredLink {
    pub from_node: String,
    pub from_socket: String,
    pub to_node: String,
    pub to_socket: String,
}

// ── Tree ────────────────────────────────────────────────────────────────────

/// A complete authored node tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthoredTree {
    pub nodes: Vec<AuthoredNode>,
    #[serde(default)]
    pub links: Vec<AuthoredLink>,
}

impl AuthoredTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Compact JSON with no whitespace; stable for identical trees.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn with_node(mut self, node: AuthoredNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append a link and set the authoring-time `is_linked` flag on both
    /// endpoint sockets, as the authoring tool does on export.
    pub fn with_link(
        mut self,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
    ) -> Self {
        for node in self.nodes.iter_mut().filter(|n| n.name == from_node) {
            for socket in node.outputs.iter_mut().filter(|s| s.identifier == from_socket) {
                socket.is_linked = true;
            }
        }
        for node in self.nodes.iter_mut().filter(|n| n.name == to_node) {
            for socket in node.inputs.iter_mut().filter(|s| s.identifier == to_socket) {
                socket.is_linked = true;
            }
        }
        self.links.push(AuthoredLink {
            from_node: from_node.to_string(),
            from_socket: from_socket.to_string(),
            to_node: to_node.to_string(),
            to_socket: to_socket.to_string(),
        });
        self
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_tree() {
        let json = r#"{
            "nodes": [
                {"name": "Value", "type": "VALUE",
                 "outputs": [{"name": "Value", "identifier": "Value",
                              "is_linked": true, "default_value": 0.5}]},
                {"name": "Output", "type": "OUTPUT",
                 "inputs": [{"name": "Color", "identifier": "Color",
                             "is_linked": true, "default_value": [1, 1, 1, 1]}]}
            ],
            "links": [
                {"from_node": "Value", "from_socket": "Value",
                 "to_node": "Output", "to_socket": "Color"}
            ]
        }"#;
        let tree = AuthoredTree::from_json(json).expect("valid tree");
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.nodes[0].outputs[0].default_value, SocketValue::Scalar(0.5));
        assert_eq!(
            tree.nodes[1].inputs[0].default_value,
            SocketValue::Vector(vec![1.0, 1.0, 1.0, 1.0])
        );
        assert_eq!(tree.nodes[1].scale, [1.0, 1.0, 1.0]);
        assert!(tree.nodes[1].use_diffuse);
        assert_eq!(tree.links.len(), 1);
    }

    #[test]
    fn texture_type_defaults_to_image() {
        let binding: TextureBinding = serde_json::from_str(r#"{"name": "tex"}"#).unwrap();
        assert_eq!(binding.texture_type, "IMAGE");
        assert!(!binding.is_environment_map());
    }

    #[test]
    fn with_link_marks_sockets() {
        let tree = AuthoredTree::new()
            .with_node(AuthoredNode::new("V", "VALUE").with_output("Value", 0.5))
            .with_node(AuthoredNode::new("Out", "OUTPUT").with_input("Color", 0.0))
            .with_link("V", "Value", "Out", "Color");
        assert!(tree.nodes[0].outputs[0].is_linked);
        assert!(tree.nodes[1].inputs[0].is_linked);
    }

    #[test]
    fn truncated_only_shortens_vectors() {
        let v = SocketValue::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.truncated(3), SocketValue::from([1.0, 2.0, 3.0]));
        assert_eq!(SocketValue::Scalar(2.0).truncated(3), SocketValue::Scalar(2.0));
    }

    #[test]
    fn canonical_json_is_stable() {
        let tree = AuthoredTree::new().with_node(AuthoredNode::new("V", "VALUE"));
        assert_eq!(tree.canonical_json(), tree.clone().canonical_json());
        let back = AuthoredTree::from_json(&tree.canonical_json()).unwrap();
        assert_eq!(back, tree);
    }
}
