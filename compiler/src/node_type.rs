// node_type.rs — Closed node type tags
//
// The builder resolves each authored node kind and sub-kind (operator, blend
// mode, group name, geometry facet, texture role) into a `NodeType` exactly
// once. Later passes pattern-match on the variant; the string tag is only
// produced for the downstream generator via `Display`.

use std::fmt;

/// Declares a fieldless enum together with its authored spelling, which is
/// also the suffix of the emitted type tag.
macro_rules! authored_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_authored(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

authored_enum!(
    /// MATH node operators.
    MathOp {
        Add => "ADD",
        Subtract => "SUBTRACT",
        Multiply => "MULTIPLY",
        Divide => "DIVIDE",
        Sine => "SINE",
        Cosine => "COSINE",
        Tangent => "TANGENT",
        Arcsine => "ARCSINE",
        Arccosine => "ARCCOSINE",
        Arctangent => "ARCTANGENT",
        Power => "POWER",
        Logarithm => "LOGARITHM",
        Minimum => "MINIMUM",
        Maximum => "MAXIMUM",
        Round => "ROUND",
        LessThan => "LESS_THAN",
        GreaterThan => "GREATER_THAN",
        Modulo => "MODULO",
    }
);

authored_enum!(
    /// MIX_RGB blend modes.
    BlendMode {
        Mix => "MIX",
        Add => "ADD",
        Multiply => "MULTIPLY",
        Subtract => "SUBTRACT",
        Screen => "SCREEN",
        Divide => "DIVIDE",
        Difference => "DIFFERENCE",
        Darken => "DARKEN",
        Lighten => "LIGHTEN",
        Overlay => "OVERLAY",
        Dodge => "DODGE",
        Burn => "BURN",
        Hue => "HUE",
        Saturation => "SATURATION",
        Value => "VALUE",
        Color => "COLOR",
        SoftLight => "SOFT_LIGHT",
        LinearLight => "LINEAR_LIGHT",
    }
);

authored_enum!(
    /// VECT_MATH node operators.
    VectOp {
        Add => "ADD",
        Subtract => "SUBTRACT",
        Average => "AVERAGE",
        DotProduct => "DOT_PRODUCT",
        CrossProduct => "CROSS_PRODUCT",
        Normalize => "NORMALIZE",
    }
);

authored_enum!(
    /// Node groups with built-in shader implementations.
    GroupKind {
        LinearToSrgb => "LINEAR_TO_SRGB",
        NormalView => "NORMAL_VIEW",
        Replace => "REPLACE",
        SrgbToLinear => "SRGB_TO_LINEAR",
        Reflect => "REFLECT",
        Parallax => "PARALLAX",
        Clamp => "CLAMP",
        Translucency => "TRANSLUCENCY",
    }
);

/// Geometry accessor facets. The `as_str` form is the type-tag suffix; the
/// authored output identifier is `socket_identifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Uv,
    VertexColor,
    Normal,
    FrontBack,
    View,
    Global,
}

impl GeometryKind {
    pub fn from_socket(identifier: &str) -> Option<Self> {
        match identifier {
            "UV" => Some(GeometryKind::Uv),
            "Vertex Color" => Some(GeometryKind::VertexColor),
            "Normal" => Some(GeometryKind::Normal),
            "Front/Back" => Some(GeometryKind::FrontBack),
            "View" => Some(GeometryKind::View),
            "Global" => Some(GeometryKind::Global),
            _ => None,
        }
    }

    pub fn socket_identifier(self) -> &'static str {
        match self {
            GeometryKind::Uv => "UV",
            GeometryKind::VertexColor => "Vertex Color",
            GeometryKind::Normal => "Normal",
            GeometryKind::FrontBack => "Front/Back",
            GeometryKind::View => "View",
            GeometryKind::Global => "Global",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Uv => "UV",
            GeometryKind::VertexColor => "VC",
            GeometryKind::Normal => "NO",
            GeometryKind::FrontBack => "FB",
            GeometryKind::View => "VW",
            GeometryKind::Global => "GL",
        }
    }

    /// Whether accessors of this kind are distinguished by a named layer.
    pub fn is_layer_keyed(self) -> bool {
        matches!(self, GeometryKind::Uv | GeometryKind::VertexColor)
    }
}

/// Texture sampler roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Color,
    Normal,
    Environment,
}

impl TextureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TextureKind::Color => "COLOR",
            TextureKind::Normal => "NORMAL",
            TextureKind::Environment => "ENVIRONMENT",
        }
    }

    /// Environment lookups are never merged into multi-sample calls.
    pub fn is_mergeable(self) -> bool {
        !matches!(self, TextureKind::Environment)
    }
}

/// Resolved type of an internal graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Camera,
    CombRgb,
    SepRgb,
    Geometry(GeometryKind),
    /// Vertex-colour accessor collapsed to the listed number of channels.
    VertexColorChannels(u8),
    Group(GroupKind),
    Normal,
    MappingLight,
    MappingHeavy,
    Material,
    MaterialExt,
    Math(MathOp),
    MixRgb(BlendMode),
    VectMath(VectOp),
    Output,
    Rgb,
    Value,
    /// Texture sampler; `lanes` is the number of merged lookups (1..=3).
    Texture { kind: TextureKind, lanes: u8 },
    Reroute,
    /// Kinds with no special handling keep their authored tag.
    Generic(String),
}

impl NodeType {
    pub fn is_material(&self) -> bool {
        matches!(self, NodeType::Material | NodeType::MaterialExt)
    }

    pub fn is_normal_map(&self) -> bool {
        matches!(
            self,
            NodeType::Texture {
                kind: TextureKind::Normal,
                ..
            }
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Camera => f.write_str("CAMERA"),
            NodeType::CombRgb => f.write_str("COMBRGB"),
            NodeType::SepRgb => f.write_str("SEPRGB"),
            NodeType::Geometry(kind) => write!(f, "GEOMETRY_{}", kind.as_str()),
            NodeType::VertexColorChannels(n) => write!(f, "GEOMETRY_VC{n}"),
            NodeType::Group(kind) => f.write_str(kind.as_str()),
            NodeType::Normal => f.write_str("NORMAL"),
            NodeType::MappingLight => f.write_str("MAPPING_LIGHT"),
            NodeType::MappingHeavy => f.write_str("MAPPING_HEAVY"),
            NodeType::Material => f.write_str("MATERIAL"),
            NodeType::MaterialExt => f.write_str("MATERIAL_EXT"),
            NodeType::Math(op) => write!(f, "MATH_{}", op.as_str()),
            NodeType::MixRgb(mode) => write!(f, "MIX_RGB_{}", mode.as_str()),
            NodeType::VectMath(op) => write!(f, "VECT_MATH_{}", op.as_str()),
            NodeType::Output => f.write_str("OUTPUT"),
            NodeType::Rgb => f.write_str("RGB"),
            NodeType::Value => f.write_str("VALUE"),
            NodeType::Texture { kind, lanes } => {
                write!(f, "TEXTURE_{}", kind.as_str())?;
                if *lanes > 1 {
                    write!(f, "{lanes}")?;
                }
                Ok(())
            }
            NodeType::Reroute => f.write_str("REROUTE"),
            NodeType::Generic(tag) => f.write_str(tag),
        }
    }
}
