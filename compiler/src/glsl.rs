// glsl.rs — Shader literal formatting
//
// Renders authored socket values and node parameters as GLSL constant
// expressions for the downstream code generator.

use crate::tree::SocketValue;

/// Format a float so that GLSL parses it as a float (`1.0`, not `1`).
pub fn float_literal(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else if v.is_finite() {
        format!("{v}")
    } else {
        // Non-finite values have no GLSL spelling.
        "0.0".to_string()
    }
}

/// Render `value` as a GLSL constant of `dim` components.
///
/// `dim == 0` infers the size from the value. Vectors are truncated or
/// zero-padded to `dim`; a scalar requested with `dim > 1` is broadcast.
/// 2..=4 components become `vecN`, 9 a `mat3`, 16 a `mat4`.
pub fn glsl_value(value: &SocketValue, dim: usize) -> String {
    let mut comps = value.components();
    if dim > 0 && comps.len() != dim {
        if let SocketValue::Scalar(s) = value {
            comps = vec![*s; dim];
        } else {
            comps.resize(dim, 0.0);
        }
    }
    let body = || {
        comps
            .iter()
            .map(|c| float_literal(*c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    match comps.len() {
        0 => "0.0".to_string(),
        1 => float_literal(comps[0]),
        n @ 2..=4 => format!("vec{n}({})", body()),
        9 => format!("mat3({})", body()),
        16 => format!("mat4({})", body()),
        // No GLSL aggregate of this size; emit an array constructor.
        n => format!("float[{n}]({})", body()),
    }
}
