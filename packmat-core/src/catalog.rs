//! Node Catalog - Host Node Vocabulary
//!
//! Concrete node type identifiers and the socket names each node exposes on a
//! given host. Socket existence queries answered here are the only basis for
//! candidate fallback; nothing else inspects node internals.

use crate::capability::{HostProfile, ShaderModelKind};

/// Node type identifiers understood by the host.
pub mod node_types {
    pub const PRINCIPLED_BSDF: &str = "ShaderNodeBsdfPrincipled";
    pub const MATERIAL_OUTPUT: &str = "ShaderNodeOutputMaterial";
    pub const TEX_COORD: &str = "ShaderNodeTexCoord";
    pub const MAPPING: &str = "ShaderNodeMapping";
    pub const UV_MAP: &str = "ShaderNodeUVMap";
    pub const TEX_IMAGE: &str = "ShaderNodeTexImage";
    pub const NORMAL_MAP: &str = "ShaderNodeNormalMap";
    pub const INVERT: &str = "ShaderNodeInvert";
    pub const DISPLACEMENT: &str = "ShaderNodeDisplacement";

    // Legacy color vocabulary
    pub const SEPARATE_RGB: &str = "ShaderNodeSeparateRGB";
    pub const COMBINE_RGB: &str = "ShaderNodeCombineRGB";
    pub const MIX_RGB: &str = "ShaderNodeMixRGB";

    // Unified color vocabulary
    pub const SEPARATE_COLOR: &str = "ShaderNodeSeparateColor";
    pub const COMBINE_COLOR: &str = "ShaderNodeCombineColor";
    pub const MIX: &str = "ShaderNodeMix";
}

/// Input and output socket names of one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSockets {
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

const PRINCIPLED_V1: NodeSockets = NodeSockets {
    inputs: &[
        "Base Color",
        "Subsurface",
        "Subsurface Radius",
        "Subsurface Color",
        "Metallic",
        "Specular",
        "Specular Tint",
        "Roughness",
        "Sheen",
        "Clearcoat",
        "IOR",
        "Transmission",
        "Emission",
        "Emission Strength",
        "Alpha",
        "Normal",
    ],
    outputs: &["BSDF"],
};

const PRINCIPLED_V2: NodeSockets = NodeSockets {
    inputs: &[
        "Base Color",
        "Metallic",
        "Roughness",
        "IOR",
        "Alpha",
        "Normal",
        "Subsurface Weight",
        "Subsurface Radius",
        "Specular IOR Level",
        "Specular Tint",
        "Coat Weight",
        "Sheen Weight",
        "Emission Color",
        "Emission Strength",
    ],
    outputs: &["BSDF"],
};

/// Look up the sockets of `node_type` as exposed by `host`.
///
/// Returns `None` for node types this host does not provide, including the
/// unified color nodes on hosts that predate them.
pub fn sockets_for(node_type: &str, host: &HostProfile) -> Option<NodeSockets> {
    use node_types::*;

    let modern = host.capability_level().is_modern();
    let sockets = match node_type {
        PRINCIPLED_BSDF => match host.shader_model() {
            ShaderModelKind::PrincipledV1 => PRINCIPLED_V1,
            ShaderModelKind::PrincipledV2 => PRINCIPLED_V2,
        },
        MATERIAL_OUTPUT => NodeSockets {
            inputs: &["Surface", "Volume", "Displacement"],
            outputs: &[],
        },
        TEX_COORD => NodeSockets {
            inputs: &[],
            outputs: &["Generated", "Normal", "UV", "Object", "Camera", "Window", "Reflection"],
        },
        MAPPING => NodeSockets {
            inputs: &["Vector", "Location", "Rotation", "Scale"],
            outputs: &["Vector"],
        },
        UV_MAP => NodeSockets {
            inputs: &[],
            outputs: &["UV"],
        },
        TEX_IMAGE => NodeSockets {
            inputs: &["Vector"],
            outputs: &["Color", "Alpha"],
        },
        NORMAL_MAP => NodeSockets {
            inputs: &["Strength", "Color"],
            outputs: &["Normal"],
        },
        INVERT => NodeSockets {
            inputs: &["Fac", "Color"],
            outputs: &["Color"],
        },
        DISPLACEMENT => NodeSockets {
            inputs: &["Height", "Midlevel", "Scale", "Normal"],
            outputs: &["Displacement"],
        },
        SEPARATE_RGB => NodeSockets {
            inputs: &["Image"],
            outputs: &["R", "G", "B"],
        },
        COMBINE_RGB => NodeSockets {
            inputs: &["R", "G", "B"],
            outputs: &["Image"],
        },
        MIX_RGB => NodeSockets {
            inputs: &["Fac", "Color1", "Color2"],
            outputs: &["Color"],
        },
        SEPARATE_COLOR if modern => NodeSockets {
            inputs: &["Color"],
            outputs: &["Red", "Green", "Blue"],
        },
        COMBINE_COLOR if modern => NodeSockets {
            inputs: &["Red", "Green", "Blue"],
            outputs: &["Color"],
        },
        MIX if modern => NodeSockets {
            inputs: &["Factor", "A", "B"],
            outputs: &["Result"],
        },
        _ => return None,
    };
    Some(sockets)
}
