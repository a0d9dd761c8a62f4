// Snapshot tests: lock the rendered instruction records of the fixtures.
//
// Uses the library API (from_json → compile_tree → compose) and snapshots the
// `Display` form of the records inline.

use std::path::Path;

use nmc::compose::{compose_node_elements, render};
use nmc::id::CompileContext;
use nmc::pipeline::compile_tree;
use nmc::tree::AuthoredTree;

fn render_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    let tree = AuthoredTree::from_json(&source).expect("fixture decodes");
    let graph = compile_tree(&tree, &mut CompileContext::new())
        .unwrap_or_else(|e| panic!("{name}: {e}"));
    render(&compose_node_elements(&graph).expect("compose failed"))
}

#[test]
fn snapshot_value_output() {
    insta::assert_snapshot!(render_fixture("value_output.json"), @r"
    VALUE
      out[0] out_VALUE_Value0
      param param_VALUE_Value0 = 0.5
    OUTPUT
      in[0] out_VALUE_Value0
    ");
}

#[test]
fn snapshot_material() {
    insta::assert_snapshot!(render_fixture("material.json"), @r"
    RGB
      out[0] out_RGB_Color0
      param param_RGB_Color0 = vec3(0.8, 0.2, 0.1)
    MATERIAL
      in[0] out_RGB_Color0
      in[1] in_MATERIAL_Alpha0 = 1.0
      in[2] in_MATERIAL_Spec0 = vec3(1.0, 1.0, 1.0)
      in[3] in_MATERIAL_Normal0 = vec3(0.0, 0.0, 0.0)
      out[0] out_MATERIAL_Color0
      out[1] out_MATERIAL_Alpha0
      out[2] out_MATERIAL_Normal0
      param param_MATERIAL_diffuse0 = vec3(1.0, 0.0, 0.0)
      param param_MATERIAL_spec0 = vec3(1.0, 0.5, 50.0)
      param param_MATERIAL_norm0 = 0.0
    OUTPUT
      in[0] out_MATERIAL_Color0
    ");
}

#[test]
fn snapshot_vertex_color() {
    insta::assert_snapshot!(render_fixture("vertex_color.json"), @r"
    GEOMETRY_VC2
      out[0] out_GEOMETRY_VC2_R0
      out[1] out_GEOMETRY_VC2_B0
      param param_GEOMETRY_VC_v0
      vparam param_GEOMETRY_VC_a0
      vparam param_GEOMETRY_VC_v0
    MATH_MULTIPLY
      in[0] out_GEOMETRY_VC2_R0
      in[1] out_GEOMETRY_VC2_B0
      out[0] out_MATH_MULTIPLY_Value0
    OUTPUT
      in[0] out_MATH_MULTIPLY_Value0
    ");
}
