//! Channel Router
//!
//! Turns one decoded packed channel into wiring against the shading model.
//! Most usages are a single wire; ambient occlusion and displacement
//! synthesize extra nodes.

use serde::Serialize;
use tracing::debug;

use crate::capability::{
    candidates, resolve, resolve_socket, AbstractNodeKind, BlendMode, CapabilityResolver,
    ResolvedNode, SocketRole,
};
use crate::catalog::node_types;
use crate::channels::{ChannelModel, UsageKind};
use crate::graph::{GraphError, GraphPlan, NodeId, NodeKey, SocketRef, SocketValue};
use crate::material::{DisplacementMethod, MaterialSettings};

const AO_MULTIPLY: AbstractNodeKind = AbstractNodeKind::Mix(BlendMode::Multiply);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Signal wired straight into a shading-model or displacement input.
    Wired { node: NodeId, socket: String },
    /// Multiply node spliced in front of the base color.
    AoSpliced { mix: NodeId },
    /// Base color was already AO-multiplied; the AO operand was replaced.
    AoRefed { mix: NodeId },
    Dropped { reason: DropReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Unassigned,
    SocketMissing,
    /// AO has nothing to multiply against.
    NoBaseColor,
}

pub struct ChannelRouter<'a> {
    resolver: &'a CapabilityResolver,
    model: &'a ChannelModel,
    shader: NodeId,
    output: NodeId,
}

impl<'a> ChannelRouter<'a> {
    pub fn new(
        resolver: &'a CapabilityResolver,
        model: &'a ChannelModel,
        shader: NodeId,
        output: NodeId,
    ) -> Self {
        Self {
            resolver,
            model,
            shader,
            output,
        }
    }

    pub fn route(
        &self,
        usage: UsageKind,
        signal: &SocketRef,
        graph: &mut GraphPlan,
        settings: &mut MaterialSettings,
    ) -> Result<RouteOutcome, GraphError> {
        let outcome = match usage {
            UsageKind::None => RouteOutcome::Dropped {
                reason: DropReason::Unassigned,
            },
            UsageKind::Metallic => self.wire(graph, signal, candidates::METALLIC),
            UsageKind::Roughness => self.wire(graph, signal, candidates::ROUGHNESS),
            UsageKind::Alpha => self.wire(graph, signal, candidates::ALPHA),
            UsageKind::Specular => self.wire(graph, signal, candidates::SPECULAR),
            UsageKind::SubsurfaceWeight => self.wire(graph, signal, candidates::SUBSURFACE),
            UsageKind::EmissionStrength => {
                let outcome = self.wire(graph, signal, candidates::EMISSION_STRENGTH);
                if matches!(outcome, RouteOutcome::Wired { .. }) {
                    // Strength alone drives visible emission.
                    if let Some(color) = resolve_socket(graph, self.shader, candidates::EMISSION_COLOR) {
                        graph.set_default(&color, SocketValue::Color([1.0, 1.0, 1.0, 1.0]));
                    }
                }
                outcome
            }
            UsageKind::AmbientOcclusion => self.route_ao(graph, signal)?,
            UsageKind::DisplacementHeight => {
                let disp = self.displacement_node(graph, settings)?;
                match graph.input(disp, "Height") {
                    Some(height) => {
                        graph.connect(signal, &height);
                        RouteOutcome::Wired {
                            node: disp,
                            socket: height.name,
                        }
                    }
                    None => RouteOutcome::Dropped {
                        reason: DropReason::SocketMissing,
                    },
                }
            }
        };
        debug!(?usage, ?outcome, "routed channel");
        Ok(outcome)
    }

    fn wire(&self, graph: &mut GraphPlan, signal: &SocketRef, names: &[&str]) -> RouteOutcome {
        match resolve_socket(graph, self.shader, names) {
            Some(socket) => {
                graph.connect(signal, &socket);
                RouteOutcome::Wired {
                    node: self.shader,
                    socket: socket.name,
                }
            }
            None => RouteOutcome::Dropped {
                reason: DropReason::SocketMissing,
            },
        }
    }

    fn route_ao(&self, graph: &mut GraphPlan, signal: &SocketRef) -> Result<RouteOutcome, GraphError> {
        let Some(base) = resolve_socket(graph, self.shader, candidates::BASE_COLOR) else {
            return Ok(RouteOutcome::Dropped {
                reason: DropReason::SocketMissing,
            });
        };
        let Some(existing) = graph.incoming(&base).cloned() else {
            return Ok(RouteOutcome::Dropped {
                reason: DropReason::NoBaseColor,
            });
        };

        let source_key = graph.node(existing.from.node).and_then(|n| n.key);
        // Last AO wins: the previous operand on B is replaced, not stacked.
        if source_key == Some(NodeKey::AoMultiply) {
            let mix = ResolvedNode {
                id: existing.from.node,
                spec: resolve(self.resolver.level(), AO_MULTIPLY),
            };
            if let Some(b) = mix.input(SocketRole::B) {
                graph.connect(signal, &b);
            }
            return Ok(RouteOutcome::AoRefed { mix: mix.id });
        }

        let mix = self
            .resolver
            .instantiate(graph, AO_MULTIPLY, "AO Multiply", [150.0, 200.0])?;
        graph.assign_key(mix.id, NodeKey::AoMultiply);

        if let Some(factor) = mix.input(SocketRole::Factor) {
            graph.set_default(&factor, SocketValue::Float(1.0));
        }
        graph.disconnect(&base);
        if let Some(a) = mix.input(SocketRole::A) {
            graph.connect(&existing.from, &a);
        }
        if let Some(b) = mix.input(SocketRole::B) {
            graph.connect(signal, &b);
        }
        if let Some(result) = mix.output(SocketRole::Output) {
            graph.connect(&result, &base);
        }
        Ok(RouteOutcome::AoSpliced { mix: mix.id })
    }

    /// The material's single displacement node, created and wired to the
    /// output on first use.
    pub fn displacement_node(
        &self,
        graph: &mut GraphPlan,
        settings: &mut MaterialSettings,
    ) -> Result<NodeId, GraphError> {
        let (disp, created) = graph.get_or_create(NodeKey::Displacement, |g| {
            self.resolver
                .add_node(g, node_types::DISPLACEMENT, "Displacement", [400.0, 100.0])
        })?;
        if !created {
            return Ok(disp);
        }

        if let Some(scale) = graph.input(disp, "Scale") {
            graph.set_default(&scale, SocketValue::Float(self.model.displacement_strength));
        }
        if let Some(midlevel) = graph.input(disp, "Midlevel") {
            graph.set_default(&midlevel, SocketValue::Float(self.model.displacement_midlevel));
        }
        if let (Some(out), Some(into)) = (
            graph.output(disp, "Displacement"),
            graph.input(self.output, "Displacement"),
        ) {
            graph.connect(&out, &into);
            settings.displacement_method = DisplacementMethod::Both;
        }
        Ok(disp)
    }
}
