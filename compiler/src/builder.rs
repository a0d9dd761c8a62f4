// builder.rs — Authored tree → typed internal graph
//
// Maps every authored node to zero, one, or several internal nodes, resolving
// its kind and sub-kind into a `NodeType` once, and then materializes authored
// links as socket-indexed edges.
//
// Preconditions: `ctx` is fresh for this compile (identifier counters at zero).
// Postconditions: every internal node carries its final type tag, params and
//                 bound data; every edge addresses existing socket indices.
// Failure modes: unsupported sub-kind or missing socket → `Configuration`;
//                texture/material node without binding → `MissingBinding`;
//                link naming an absent node → `Structural`.
// Side effects: advances `ctx.idents`.

use crate::error::CompileError;
use crate::glsl::glsl_value;
use crate::graph::{BoundData, Edge, Graph, Node, Param, Socket};
use crate::id::{CompileContext, NodeId};
use crate::node_type::{
    BlendMode, GeometryKind, GroupKind, MathOp, NodeType, TextureKind, VectOp,
};
use crate::tree::{AuthoredLink, AuthoredNode, AuthoredSocket, AuthoredTree, SocketValue};

/// Input default vectors are trimmed to this many components (vec4 → vec3).
const INPUT_COMPONENTS: usize = 3;

/// Build the internal graph for `tree`.
pub fn build_graph(tree: &AuthoredTree, ctx: &mut CompileContext) -> Result<Graph, CompileError> {
    let mut graph = Graph::new();
    for node in &tree.nodes {
        append_authored_node(&mut graph, node, ctx)?;
    }
    for link in &tree.links {
        append_link(&mut graph, link)?;
    }
    Ok(graph)
}

// ── Nodes ───────────────────────────────────────────────────────────────────

fn append_authored_node(
    graph: &mut Graph,
    node: &AuthoredNode,
    ctx: &mut CompileContext,
) -> Result<(), CompileError> {
    match node.kind.as_str() {
        "GEOMETRY" => {
            // One internal node per linked facet; an unconsumed geometry node
            // produces nothing.
            for socket in node.outputs.iter().filter(|s| s.is_linked) {
                let kind = GeometryKind::from_socket(&socket.identifier).ok_or_else(|| {
                    CompileError::configuration(
                        &node.name,
                        format!("Geometry output is not supported: {}", socket.identifier),
                    )
                })?;
                let built = geometry_node(node, kind, ctx)?;
                add(graph, built);
            }
            Ok(())
        }
        _ => {
            let built = single_node(node, ctx)?;
            add(graph, built);
            Ok(())
        }
    }
}

fn add(graph: &mut Graph, node: Node) -> NodeId {
    tracing::trace!(node = %node.name, kind = %node.kind, "built node");
    graph.add_node(node)
}

fn single_node(node: &AuthoredNode, ctx: &mut CompileContext) -> Result<Node, CompileError> {
    let built = match node.kind.as_str() {
        "CAMERA" => Node {
            outputs: all_outputs(node),
            ..Node::new(NodeType::Camera, &node.name)
        },
        "COMBRGB" => passthrough(node, NodeType::CombRgb),
        "SEPRGB" => passthrough(node, NodeType::SepRgb),
        "GROUP" => group_node(node, ctx)?,
        "NORMAL" => {
            let normal = required_output(node, "Normal")?;
            let mut built = passthrough(node, NodeType::Normal);
            built.params.push(literal(
                ctx.idents.ident("param_NORMAL_Normal"),
                &normal.default_value,
                3,
            ));
            built
        }
        "MAPPING" => mapping_node(node, ctx)?,
        "MATERIAL" => material_node(node, NodeType::Material, ctx)?,
        "MATERIAL_EXT" => material_node(node, NodeType::MaterialExt, ctx)?,
        "MATH" => {
            let op = node.operation.as_deref().unwrap_or_default();
            let op = MathOp::from_authored(op).ok_or_else(|| {
                CompileError::configuration(&node.name, format!("Unsupported MATH operation: {op}"))
            })?;
            passthrough(node, NodeType::Math(op))
        }
        "MIX_RGB" => {
            let mode = node.blend_type.as_deref().unwrap_or_default();
            let mode = BlendMode::from_authored(mode).ok_or_else(|| {
                CompileError::configuration(
                    &node.name,
                    format!("Unsupported MIX_RGB blend type: {mode}"),
                )
            })?;
            passthrough(node, NodeType::MixRgb(mode))
        }
        "VECT_MATH" => {
            let op = node.operation.as_deref().unwrap_or_default();
            let op = VectOp::from_authored(op).ok_or_else(|| {
                CompileError::configuration(
                    &node.name,
                    format!("Unsupported VECT_MATH operation: {op}"),
                )
            })?;
            passthrough(node, NodeType::VectMath(op))
        }
        "OUTPUT" => Node {
            inputs: all_inputs(node),
            ..Node::new(NodeType::Output, &node.name)
        },
        "RGB" => {
            let color = required_output(node, "Color")?;
            let param = literal(ctx.idents.ident("param_RGB_Color"), &color.default_value, 3);
            Node {
                outputs: vec![color],
                params: vec![param],
                ..Node::new(NodeType::Rgb, &node.name)
            }
        }
        "VALUE" => {
            let value = required_output(node, "Value")?;
            let param = literal(ctx.idents.ident("param_VALUE_Value"), &value.default_value, 1);
            Node {
                outputs: vec![value],
                params: vec![param],
                ..Node::new(NodeType::Value, &node.name)
            }
        }
        "TEXTURE" => texture_node(node, ctx)?,
        "REROUTE" => passthrough(node, NodeType::Reroute),
        other => passthrough(node, NodeType::Generic(other.to_string())),
    };
    Ok(built)
}

/// Node keeping all authored sockets.
fn passthrough(node: &AuthoredNode, kind: NodeType) -> Node {
    Node {
        inputs: all_inputs(node),
        outputs: all_outputs(node),
        ..Node::new(kind, &node.name)
    }
}

fn geometry_node(
    node: &AuthoredNode,
    kind: GeometryKind,
    ctx: &mut CompileContext,
) -> Result<Node, CompileError> {
    let mut built = Node::new(NodeType::Geometry(kind), &node.name);
    built.outputs.push(required_output(node, kind.socket_identifier())?);

    let layer = match kind {
        GeometryKind::Uv => node.uv_layer.clone(),
        GeometryKind::VertexColor => node.color_layer.clone(),
        _ => return Ok(built),
    };
    let layer = layer.unwrap_or_default();

    // Attribute plus varying; the fragment side only sees the varying.
    let attribute = ctx.idents.ident(&format!("param_{}_a", built.kind));
    let varying = ctx.idents.ident(&format!("param_{}_v", built.kind));
    built.vparams.push(Param::slot(attribute.clone()));
    built.vparams.push(Param::slot(varying.clone()));
    built.params.push(Param::slot(varying));
    built.data = Some(if kind == GeometryKind::Uv {
        BoundData::UvLayer {
            name: attribute,
            layer,
        }
    } else {
        BoundData::ColorLayer {
            name: attribute,
            layer,
        }
    });
    Ok(built)
}

fn group_node(node: &AuthoredNode, ctx: &mut CompileContext) -> Result<Node, CompileError> {
    let group_name = node.node_tree_name.as_deref().unwrap_or_default();
    let group = GroupKind::from_authored(group_name).ok_or_else(|| {
        CompileError::configuration(&node.name, format!("Wrong group node: {group_name}"))
    })?;

    let mut built = passthrough(node, NodeType::Group(group));
    match group {
        GroupKind::Parallax => {
            // Filled with the absorbed texture during rewriting.
            built.params.push(Param::slot(ctx.idents.ident("temp_texture")));
        }
        GroupKind::Translucency => {
            let mut params =
                Socket::new("TranslucencyParams", "TranslucencyParams", [0.0, 0.0, 0.0, 0.0]);
            params.is_linked = built.outputs.first().map_or(false, |s| s.is_linked);
            built.outputs.push(params);
        }
        _ => {}
    }
    Ok(built)
}

fn mapping_node(node: &AuthoredNode, ctx: &mut CompileContext) -> Result<Node, CompileError> {
    let input = required_input(node, "Vector")?;
    let output = required_output(node, "Vector")?;

    let is_zero = |v: &[f64; 3]| v.iter().all(|c| *c == 0.0);
    let light =
        is_zero(&node.translation) && is_zero(&node.rotation) && !node.use_min && !node.use_max;

    let mut built = Node {
        inputs: vec![input],
        outputs: vec![output],
        ..Node::new(
            if light { NodeType::MappingLight } else { NodeType::MappingHeavy },
            &node.name,
        )
    };

    if light {
        built.params.push(literal(
            ctx.idents.ident("param_MAPPING_LIGHT_scale"),
            &SocketValue::from(node.scale),
            3,
        ));
        return Ok(built);
    }

    let trs = trs_matrix(node.translation, node.rotation, node.scale);
    let flag = |on: bool| SocketValue::Scalar(if on { 1.0 } else { 0.0 });
    built.params.push(literal(
        ctx.idents.ident("param_MAPPING_HEAVY_trs_matrix"),
        &SocketValue::Vector(trs.to_vec()),
        16,
    ));
    built.params.push(literal(
        ctx.idents.ident("param_MAPPING_HEAVY_use_min"),
        &flag(node.use_min),
        1,
    ));
    built.params.push(literal(
        ctx.idents.ident("param_MAPPING_HEAVY_use_max"),
        &flag(node.use_max),
        1,
    ));
    built.params.push(literal(
        ctx.idents.ident("param_MAPPING_HEAVY_min_clip"),
        &SocketValue::from(node.min),
        3,
    ));
    built.params.push(literal(
        ctx.idents.ident("param_MAPPING_HEAVY_max_clip"),
        &SocketValue::from(node.max),
        3,
    ));
    Ok(built)
}

/// Column-major 4x4 transform: rotation (XYZ Euler) times scale, then
/// translation in the last column.
pub fn trs_matrix(translation: [f64; 3], rotation: [f64; 3], scale: [f64; 3]) -> [f64; 16] {
    let (sx, cx) = rotation[0].sin_cos();
    let (sy, cy) = rotation[1].sin_cos();
    let (sz, cz) = rotation[2].sin_cos();

    // Column-major 3x3 rotation.
    let rot = [
        cy * cz,
        cy * sz,
        -sy,
        sy * sx * cz - cx * sz,
        sy * sx * sz + cx * cz,
        cy * sx,
        sy * cx * cz + sx * sz,
        sy * cx * sz - sx * cz,
        cy * cx,
    ];

    let mut m = [0.0; 16];
    for col in 0..3 {
        for row in 0..3 {
            m[col * 4 + row] = rot[col * 3 + row] * scale[col];
        }
    }
    m[12] = translation[0];
    m[13] = translation[1];
    m[14] = translation[2];
    m[15] = 1.0;
    m
}

fn material_node(
    node: &AuthoredNode,
    kind: NodeType,
    ctx: &mut CompileContext,
) -> Result<Node, CompileError> {
    let material = node.material.clone().ok_or_else(|| CompileError::MissingBinding {
        node: node.name.clone(),
        what: "material",
    })?;
    let extended = kind == NodeType::MaterialExt;

    let normal = required_input(node, "Normal")?;
    let normal_linked = normal.is_linked;

    let mut inputs = vec![
        required_input(node, "Color")?,
        optional_input(node, "Alpha", 1.0),
        required_input(node, "Spec")?,
        normal,
    ];
    let mut outputs = vec![
        required_output(node, "Color")?,
        required_output(node, "Alpha")?,
        required_output(node, "Normal")?,
    ];

    if extended {
        inputs.push(optional_input(node, "Emit", 0.0));
        // The translucency link drives two sockets: the factor and its
        // parameter bundle (see edge completion).
        let linked = node.input("Translucency").map_or(false, |s| s.is_linked);
        let mut factor = Socket::new("Translucency", "Translucency", 0.0);
        factor.is_linked = linked;
        let mut params =
            Socket::new("TranslucencyParams", "TranslucencyParams", [0.0, 0.0, 0.0, 0.0]);
        params.is_linked = linked;
        inputs.push(factor);
        inputs.push(params);

        outputs.push(required_output(node, "Diffuse")?);
        outputs.push(required_output(node, "Spec")?);
    }

    let (diffuse_a, diffuse_b) = match material.diffuse_shader.as_str() {
        "LAMBERT" => (0.0, 0.0),
        "OREN_NAYAR" => (material.roughness, 0.0),
        "FRESNEL" => (material.diffuse_fresnel, material.diffuse_fresnel_factor),
        other => {
            tracing::warn!(node = %node.name, shader = other, "unknown diffuse shader");
            (0.0, 0.0)
        }
    };
    let spec = match material.specular_shader.as_str() {
        "COOKTORR" | "PHONG" => material.specular_hardness,
        "WARDISO" => material.specular_slope,
        other => {
            tracing::warn!(node = %node.name, shader = other, "unknown specular shader");
            0.0
        }
    };
    let flag = |on: bool| if on { 1.0 } else { 0.0 };

    let params = vec![
        literal(
            ctx.idents.ident("param_MATERIAL_diffuse"),
            &SocketValue::from([flag(node.use_diffuse), diffuse_a, diffuse_b]),
            3,
        ),
        literal(
            ctx.idents.ident("param_MATERIAL_spec"),
            &SocketValue::from([flag(node.use_specular), material.specular_intensity, spec]),
            3,
        ),
        literal(
            ctx.idents.ident("param_MATERIAL_norm"),
            &SocketValue::Scalar(flag(normal_linked)),
            1,
        ),
    ];

    Ok(Node {
        inputs,
        outputs,
        params,
        data: Some(BoundData::Material {
            name: node.name.clone(),
            material,
        }),
        ..Node::new(kind, &node.name)
    })
}

fn texture_node(node: &AuthoredNode, ctx: &mut CompileContext) -> Result<Node, CompileError> {
    let texture = node.texture.clone().ok_or_else(|| CompileError::MissingBinding {
        node: node.name.clone(),
        what: "texture",
    })?;

    let environment = if texture.is_environment_map() {
        TextureKind::Environment
    } else {
        TextureKind::Color
    };
    // The first linked colour or normal output decides the sampler role; a
    // sampler read only through `Value` is a colour lookup.
    let mut kind = environment;
    for socket in node.outputs.iter().filter(|s| s.is_linked) {
        match socket.identifier.as_str() {
            "Color" => break,
            "Normal" => {
                kind = TextureKind::Normal;
                break;
            }
            "Value" => {}
            other => {
                return Err(CompileError::configuration(
                    &node.name,
                    format!("Unknown texture output: {other}"),
                ))
            }
        }
    }

    let primary = if kind == TextureKind::Normal { "Normal" } else { "Color" };
    let name = ctx.idents.ident("param_TEXTURE_texture");
    Ok(Node {
        inputs: vec![required_input(node, "Vector")?],
        outputs: vec![required_output(node, primary)?, required_output(node, "Value")?],
        params: vec![Param::slot(name.clone())],
        data: Some(BoundData::Texture { name, texture }),
        ..Node::new(NodeType::Texture { kind, lanes: 1 }, &node.name)
    })
}

// ── Sockets and params ──────────────────────────────────────────────────────

fn input_socket(s: &AuthoredSocket) -> Socket {
    let mut socket = Socket::from(s);
    socket.default_value = socket.default_value.truncated(INPUT_COMPONENTS);
    socket
}

fn all_inputs(node: &AuthoredNode) -> Vec<Socket> {
    node.inputs.iter().map(input_socket).collect()
}

fn all_outputs(node: &AuthoredNode) -> Vec<Socket> {
    node.outputs.iter().map(Socket::from).collect()
}

fn required_input(node: &AuthoredNode, identifier: &str) -> Result<Socket, CompileError> {
    node.input(identifier).map(input_socket).ok_or_else(|| {
        CompileError::configuration(
            &node.name,
            format!("{} node has no '{identifier}' input", node.kind),
        )
    })
}

fn optional_input(node: &AuthoredNode, identifier: &str, default: f64) -> Socket {
    node.input(identifier)
        .map(input_socket)
        .unwrap_or_else(|| Socket::new(identifier, identifier, default))
}

fn required_output(node: &AuthoredNode, identifier: &str) -> Result<Socket, CompileError> {
    node.output(identifier).map(Socket::from).ok_or_else(|| {
        CompileError::configuration(
            &node.name,
            format!("{} node has no '{identifier}' output", node.kind),
        )
    })
}

fn literal(name: String, value: &SocketValue, dim: usize) -> Param {
    Param::literal(name, glsl_value(value, dim))
}

// ── Links ───────────────────────────────────────────────────────────────────

/// Materialize one authored link between every pair of internal nodes built
/// from its endpoints, wherever both socket identifiers resolve.
fn append_link(graph: &mut Graph, link: &AuthoredLink) -> Result<(), CompileError> {
    let from_ids = graph.ids_named(&link.from_node);
    if from_ids.is_empty() {
        return Err(CompileError::Structural {
            node: link.from_node.clone(),
        });
    }
    let to_ids = graph.ids_named(&link.to_node);
    if to_ids.is_empty() {
        return Err(CompileError::Structural {
            node: link.to_node.clone(),
        });
    }

    for &from in &from_ids {
        for &to in &to_ids {
            let from_socket = graph
                .node(from)
                .and_then(|n| n.outputs.iter().position(|s| s.identifier == link.from_socket));
            let to_socket = graph
                .node(to)
                .and_then(|n| n.inputs.iter().position(|s| s.identifier == link.to_socket));
            if let (Some(from_socket), Some(to_socket)) = (from_socket, to_socket) {
                graph.add_edge(Edge::new(from, to, from_socket, to_socket));
            }
        }
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
