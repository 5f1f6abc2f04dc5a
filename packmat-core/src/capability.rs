//! Capability Resolver - Host Version Compatibility
//!
//! Every version branch lives here. Callers ask for abstract nodes
//! ("separate RGB", "multiply blend") and named socket candidates; this module
//! answers with the concrete node type and socket names the running host
//! actually provides.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{node_types, sockets_for};
use crate::graph::{GraphError, GraphPlan, NodeId, SocketDirection, SocketRef};

/// First host version shipping the unified Separate/Combine Color and Mix nodes.
pub const MODERN_COLOR_NODES: Version = Version::new(3, 4, 0);

/// First host version with the reworked shading-model socket names.
pub const PRINCIPLED_V2: Version = Version::new(4, 0, 0);

/// Ordered socket-name candidates per semantic shading-model input.
pub mod candidates {
    pub const BASE_COLOR: &[&str] = &["Base Color"];
    pub const METALLIC: &[&str] = &["Metallic"];
    pub const ROUGHNESS: &[&str] = &["Roughness"];
    pub const ALPHA: &[&str] = &["Alpha"];
    pub const NORMAL: &[&str] = &["Normal"];
    pub const SPECULAR: &[&str] = &["Specular IOR Level", "Specular"];
    pub const SUBSURFACE: &[&str] = &["Subsurface Weight", "Subsurface"];
    pub const EMISSION_COLOR: &[&str] = &["Emission Color", "Emission"];
    pub const EMISSION_STRENGTH: &[&str] = &["Emission Strength"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityLevel {
    /// Separate RGB / Combine RGB / MixRGB nodes
    Legacy,
    /// Unified Separate Color / Combine Color / Mix nodes
    Modern,
}

impl CapabilityLevel {
    pub fn is_modern(self) -> bool {
        self == Self::Modern
    }
}

impl fmt::Display for CapabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Modern => f.write_str("modern"),
        }
    }
}

/// Generation of the shading-model node, which decides its socket naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderModelKind {
    PrincipledV1,
    PrincipledV2,
}

/// The running host, identified by its reported version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    pub version: Version,
}

impl HostProfile {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Parse a host version. Hosts report "4.1" as often as "4.1.0", so
    /// missing minor/patch components are taken as zero.
    pub fn parse(reported: &str) -> Result<Self, semver::Error> {
        let trimmed = reported.trim();
        let parts = trimmed.split('.').count();
        let padded = match parts {
            1 => format!("{}.0.0", trimmed),
            2 => format!("{}.0", trimmed),
            _ => trimmed.to_string(),
        };
        Ok(Self::new(Version::parse(&padded)?))
    }

    pub fn capability_level(&self) -> CapabilityLevel {
        if self.version >= MODERN_COLOR_NODES {
            CapabilityLevel::Modern
        } else {
            CapabilityLevel::Legacy
        }
    }

    pub fn shader_model(&self) -> ShaderModelKind {
        if self.version >= PRINCIPLED_V2 {
            ShaderModelKind::PrincipledV2
        } else {
            ShaderModelKind::PrincipledV1
        }
    }
}

impl Default for HostProfile {
    fn default() -> Self {
        Self::new(Version::new(4, 1, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Mix,
    Multiply,
    Add,
    Subtract,
    Screen,
    Overlay,
}

impl BlendMode {
    pub fn as_host_str(self) -> &'static str {
        match self {
            Self::Mix => "MIX",
            Self::Multiply => "MULTIPLY",
            Self::Add => "ADD",
            Self::Subtract => "SUBTRACT",
            Self::Screen => "SCREEN",
            Self::Overlay => "OVERLAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractNodeKind {
    SeparateRgb,
    CombineRgb,
    Mix(BlendMode),
}

/// Role a socket plays on an abstract node, independent of its host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketRole {
    /// Packed color into a separator
    Input,
    /// Combined color or blend result
    Output,
    Red,
    Green,
    Blue,
    Factor,
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcreteNodeSpec {
    pub node_type: &'static str,
    /// Node properties to set right after creation.
    pub properties: Vec<(&'static str, &'static str)>,
    pub inputs: Vec<(SocketRole, &'static str)>,
    pub outputs: Vec<(SocketRole, &'static str)>,
}

impl ConcreteNodeSpec {
    pub fn input_name(&self, role: SocketRole) -> Option<&'static str> {
        self.inputs.iter().find(|(r, _)| *r == role).map(|(_, n)| *n)
    }

    pub fn output_name(&self, role: SocketRole) -> Option<&'static str> {
        self.outputs.iter().find(|(r, _)| *r == role).map(|(_, n)| *n)
    }
}

/// Map an abstract node request to the host's concrete vocabulary.
pub fn resolve(level: CapabilityLevel, request: AbstractNodeKind) -> ConcreteNodeSpec {
    use SocketRole::*;

    match (level, request) {
        (CapabilityLevel::Legacy, AbstractNodeKind::SeparateRgb) => ConcreteNodeSpec {
            node_type: node_types::SEPARATE_RGB,
            properties: vec![],
            inputs: vec![(Input, "Image")],
            outputs: vec![(Red, "R"), (Green, "G"), (Blue, "B")],
        },
        (CapabilityLevel::Modern, AbstractNodeKind::SeparateRgb) => ConcreteNodeSpec {
            node_type: node_types::SEPARATE_COLOR,
            properties: vec![("mode", "RGB")],
            inputs: vec![(Input, "Color")],
            outputs: vec![(Red, "Red"), (Green, "Green"), (Blue, "Blue")],
        },
        (CapabilityLevel::Legacy, AbstractNodeKind::CombineRgb) => ConcreteNodeSpec {
            node_type: node_types::COMBINE_RGB,
            properties: vec![],
            inputs: vec![(Red, "R"), (Green, "G"), (Blue, "B")],
            outputs: vec![(Output, "Image")],
        },
        (CapabilityLevel::Modern, AbstractNodeKind::CombineRgb) => ConcreteNodeSpec {
            node_type: node_types::COMBINE_COLOR,
            properties: vec![("mode", "RGB")],
            inputs: vec![(Red, "Red"), (Green, "Green"), (Blue, "Blue")],
            outputs: vec![(Output, "Color")],
        },
        (CapabilityLevel::Legacy, AbstractNodeKind::Mix(blend)) => ConcreteNodeSpec {
            node_type: node_types::MIX_RGB,
            properties: vec![("blend_type", blend.as_host_str())],
            inputs: vec![(Factor, "Fac"), (A, "Color1"), (B, "Color2")],
            outputs: vec![(Output, "Color")],
        },
        (CapabilityLevel::Modern, AbstractNodeKind::Mix(blend)) => ConcreteNodeSpec {
            node_type: node_types::MIX,
            properties: vec![
                ("data_type", "RGBA"),
                ("blend_type", blend.as_host_str()),
                ("clamp_factor", "true"),
            ],
            inputs: vec![(Factor, "Factor"), (A, "A"), (B, "B")],
            outputs: vec![(Output, "Result")],
        },
    }
}

/// Try `candidates` in priority order against the inputs of `node` and
/// return the first that exists. `None` means "skip this wire".
pub fn resolve_socket(graph: &GraphPlan, node: NodeId, candidates: &[&str]) -> Option<SocketRef> {
    candidates.iter().find_map(|name| graph.input(node, name))
}

/// An abstract node instantiated in a graph.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub id: NodeId,
    pub spec: ConcreteNodeSpec,
}

impl ResolvedNode {
    pub fn input(&self, role: SocketRole) -> Option<SocketRef> {
        self.spec.input_name(role).map(|name| SocketRef {
            node: self.id,
            name: name.to_string(),
            direction: SocketDirection::Input,
        })
    }

    pub fn output(&self, role: SocketRole) -> Option<SocketRef> {
        self.spec.output_name(role).map(|name| SocketRef {
            node: self.id,
            name: name.to_string(),
            direction: SocketDirection::Output,
        })
    }
}

/// Resolver bound to one host for the duration of one synthesis call.
#[derive(Debug, Clone)]
pub struct CapabilityResolver {
    host: HostProfile,
    level: CapabilityLevel,
}

impl CapabilityResolver {
    pub fn new(host: HostProfile) -> Self {
        let level = host.capability_level();
        Self { host, level }
    }

    pub fn host(&self) -> &HostProfile {
        &self.host
    }

    pub fn level(&self) -> CapabilityLevel {
        self.level
    }

    /// Create a concrete node, with the socket set this host exposes for it.
    pub fn add_node(
        &self,
        graph: &mut GraphPlan,
        node_type: &str,
        label: &str,
        location: [f32; 2],
    ) -> Result<NodeId, GraphError> {
        let sockets = sockets_for(node_type, &self.host)
            .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;
        Ok(graph.add_node(node_type, sockets, label, location))
    }

    /// Create the concrete node for an abstract request and apply its
    /// configuration properties.
    pub fn instantiate(
        &self,
        graph: &mut GraphPlan,
        kind: AbstractNodeKind,
        label: &str,
        location: [f32; 2],
    ) -> Result<ResolvedNode, GraphError> {
        let spec = resolve(self.level, kind);
        let id = self.add_node(graph, spec.node_type, label, location)?;
        for (name, value) in &spec.properties {
            graph.set_property(id, name, *value);
        }
        Ok(ResolvedNode { id, spec })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_threshold() {
        assert_eq!(HostProfile::parse("3.3.21").unwrap().capability_level(), CapabilityLevel::Legacy);
        assert_eq!(HostProfile::parse("3.4").unwrap().capability_level(), CapabilityLevel::Modern);
        assert_eq!(HostProfile::parse("4").unwrap().capability_level(), CapabilityLevel::Modern);
        assert!(HostProfile::parse("four").is_err());
    }

    #[test]
    fn test_resolve_socket_names() {
        let legacy = resolve(CapabilityLevel::Legacy, AbstractNodeKind::SeparateRgb);
        assert_eq!(legacy.output_name(SocketRole::Green), Some("G"));

        let modern = resolve(CapabilityLevel::Modern, AbstractNodeKind::SeparateRgb);
        assert_eq!(modern.output_name(SocketRole::Green), Some("Green"));
        assert!(modern.properties.contains(&("mode", "RGB")));

        let mix = resolve(CapabilityLevel::Legacy, AbstractNodeKind::Mix(BlendMode::Multiply));
        assert_eq!(mix.input_name(SocketRole::Factor), Some("Fac"));
        assert_eq!(mix.input_name(SocketRole::A), Some("Color1"));
        assert_eq!(mix.output_name(SocketRole::Output), Some("Color"));

        let mix = resolve(CapabilityLevel::Modern, AbstractNodeKind::Mix(BlendMode::Multiply));
        assert_eq!(mix.input_name(SocketRole::B), Some("B"));
        assert_eq!(mix.output_name(SocketRole::Output), Some("Result"));
        assert!(mix.properties.contains(&("blend_type", "MULTIPLY")));
    }

    #[test]
    fn test_instantiated_sockets_exist() {
        for version in ["3.0.0", "3.6.0", "4.2.0"] {
            let resolver = CapabilityResolver::new(HostProfile::parse(version).unwrap());
            let mut graph = GraphPlan::new();
            let kinds = [
                AbstractNodeKind::SeparateRgb,
                AbstractNodeKind::CombineRgb,
                AbstractNodeKind::Mix(BlendMode::Multiply),
            ];
            for kind in kinds {
                let node = resolver.instantiate(&mut graph, kind, "n", [0.0, 0.0]).unwrap();
                for (_, name) in &node.spec.inputs {
                    assert!(graph.input(node.id, name).is_some(), "{version}: {name}");
                }
                for (_, name) in &node.spec.outputs {
                    assert!(graph.output(node.id, name).is_some(), "{version}: {name}");
                }
            }
        }
    }

    #[test]
    fn test_candidate_lookup_first_match() {
        let mut graph = GraphPlan::new();
        let v4 = CapabilityResolver::new(HostProfile::parse("4.0").unwrap());
        let bsdf = v4.add_node(&mut graph, node_types::PRINCIPLED_BSDF, "BSDF", [0.0, 0.0]).unwrap();
        let socket = resolve_socket(&graph, bsdf, candidates::SPECULAR).unwrap();
        assert_eq!(socket.name, "Specular IOR Level");

        let v3 = CapabilityResolver::new(HostProfile::parse("3.6").unwrap());
        let bsdf = v3.add_node(&mut graph, node_types::PRINCIPLED_BSDF, "BSDF", [0.0, 0.0]).unwrap();
        let socket = resolve_socket(&graph, bsdf, candidates::SPECULAR).unwrap();
        assert_eq!(socket.name, "Specular");

        assert!(resolve_socket(&graph, bsdf, &["Clearcoat Normal", "Coat Normal"]).is_none());
    }
}
