//! Graph Builder - Channel Configuration to Node Graph
//!
//! Stages run in a fixed order: later stages look up nodes created by
//! earlier ones (shading model, output, displacement) by identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capability::{
    candidates, resolve_socket, AbstractNodeKind, CapabilityResolver, HostProfile, SocketRole,
};
use crate::catalog::node_types;
use crate::channels::{Channel, ChannelModel, TexCoordMode};
use crate::graph::{GraphError, GraphPlan, NodeId, NodeKey, SocketRef, SocketValue};
use crate::images::{ColorSpace, ImageRef, ImageSet};
use crate::material::{BlendMethod, MaterialSettings, ShadowMethod};
use crate::router::{ChannelRouter, RouteOutcome};

// Column layout, left to right.
const IMAGE_X: f32 = -800.0;
const BASE_Y: f32 = 300.0;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No image configured: at least one texture map is required")]
    NoImages,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result of one build: the graph plus material-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltGraph {
    pub graph: GraphPlan,
    pub settings: MaterialSettings,
    pub shader: NodeId,
    pub output: NodeId,
}

struct BuildState {
    graph: GraphPlan,
    settings: MaterialSettings,
    shader: NodeId,
    output: NodeId,
    /// Shared vector feed for every sampler, when a mapping stage exists.
    vector: Option<SocketRef>,
}

pub struct GraphBuilder {
    resolver: CapabilityResolver,
}

impl GraphBuilder {
    pub fn new(host: HostProfile) -> Self {
        Self {
            resolver: CapabilityResolver::new(host),
        }
    }

    pub fn resolver(&self) -> &CapabilityResolver {
        &self.resolver
    }

    /// Build the full material graph for `model` and `images`.
    ///
    /// Refuses before creating anything when no image is configured. Missing
    /// sockets skip single wires, never the build.
    pub fn build(&self, model: &ChannelModel, images: &ImageSet) -> Result<BuiltGraph, BuildError> {
        if images.is_empty() {
            return Err(BuildError::NoImages);
        }

        let mut state = self.shading_stage()?;
        self.mapping_stage(&mut state, model)?;
        if let Some(image) = &images.color {
            self.color_stage(&mut state, image)?;
        }
        if let Some(image) = &images.normal {
            self.normal_stage(&mut state, model, image)?;
        }
        if let Some(image) = &images.emission {
            self.emission_stage(&mut state, image)?;
        }
        if let Some(image) = &images.packed {
            self.packed_stage(&mut state, model, image)?;
        }
        if model.use_displacement {
            if let Some(image) = &images.displacement {
                self.displacement_stage(&mut state, model, image)?;
            }
        }
        if model.alpha_blend {
            state.settings.blend_method = BlendMethod::Blend;
            state.settings.shadow_method = ShadowMethod::Hashed;
        }

        debug!(
            nodes = state.graph.nodes().len(),
            links = state.graph.links().len(),
            level = %self.resolver.level(),
            "graph built"
        );
        Ok(BuiltGraph {
            graph: state.graph,
            settings: state.settings,
            shader: state.shader,
            output: state.output,
        })
    }

    fn shading_stage(&self) -> Result<BuildState, GraphError> {
        let mut graph = GraphPlan::new();
        let shader = self.resolver.add_node(
            &mut graph,
            node_types::PRINCIPLED_BSDF,
            "Principled BSDF",
            [300.0, BASE_Y],
        )?;
        graph.assign_key(shader, NodeKey::ShadingModel);
        let output = self.resolver.add_node(
            &mut graph,
            node_types::MATERIAL_OUTPUT,
            "Material Output",
            [600.0, BASE_Y],
        )?;
        graph.assign_key(output, NodeKey::MaterialOutput);

        if let (Some(bsdf), Some(surface)) = (graph.output(shader, "BSDF"), graph.input(output, "Surface")) {
            graph.connect(&bsdf, &surface);
        }

        Ok(BuildState {
            graph,
            settings: MaterialSettings::default(),
            shader,
            output,
            vector: None,
        })
    }

    fn mapping_stage(&self, state: &mut BuildState, model: &ChannelModel) -> Result<(), GraphError> {
        if !model.needs_mapping() {
            return Ok(());
        }
        let graph = &mut state.graph;
        let uv_map = model.uv_map_name.trim();

        let source = if model.texcoord_mode == TexCoordMode::Uv && !uv_map.is_empty() {
            let node = self.resolver.add_node(
                graph,
                node_types::UV_MAP,
                "UV Map",
                [IMAGE_X - 400.0, BASE_Y - 100.0],
            )?;
            graph.set_property(node, "uv_map", uv_map);
            graph.output(node, "UV")
        } else {
            let node = self.resolver.add_node(
                graph,
                node_types::TEX_COORD,
                "Texture Coordinate",
                [IMAGE_X - 400.0, BASE_Y],
            )?;
            graph.output(node, model.texcoord_mode.output_socket())
        };

        let mapping = self
            .resolver
            .add_node(graph, node_types::MAPPING, "Mapping", [IMAGE_X - 200.0, BASE_Y])?;
        graph.assign_key(mapping, NodeKey::Mapping);
        if let (Some(from), Some(to)) = (source, graph.input(mapping, "Vector")) {
            graph.connect(&from, &to);
        }
        state.vector = graph.output(mapping, "Vector");
        Ok(())
    }

    /// Create an image sampler with its color space and the shared vector feed.
    fn sample(
        &self,
        state: &mut BuildState,
        image: &ImageRef,
        label: &str,
        color_space: ColorSpace,
        location: [f32; 2],
    ) -> Result<NodeId, GraphError> {
        let graph = &mut state.graph;
        let node = self
            .resolver
            .add_node(graph, node_types::TEX_IMAGE, label, location)?;
        graph.set_property(node, "image", image.name.as_str());
        graph.set_property(node, "colorspace", color_space.as_str());
        if let (Some(vector), Some(input)) = (&state.vector, graph.input(node, "Vector")) {
            graph.connect(vector, &input);
        }
        Ok(node)
    }

    fn color_stage(&self, state: &mut BuildState, image: &ImageRef) -> Result<(), GraphError> {
        let tex = self.sample(state, image, "Base Color", ColorSpace::Srgb, [IMAGE_X, BASE_Y + 200.0])?;
        let graph = &mut state.graph;

        if let (Some(color), Some(base)) = (
            graph.output(tex, "Color"),
            resolve_socket(graph, state.shader, candidates::BASE_COLOR),
        ) {
            graph.connect(&color, &base);
        }
        if let (Some(alpha), Some(input)) = (
            graph.output(tex, "Alpha"),
            resolve_socket(graph, state.shader, candidates::ALPHA),
        ) {
            graph.connect(&alpha, &input);
        }
        Ok(())
    }

    fn normal_stage(
        &self,
        state: &mut BuildState,
        model: &ChannelModel,
        image: &ImageRef,
    ) -> Result<(), GraphError> {
        let tex = self.sample(state, image, "Normal Map", ColorSpace::NonColor, [IMAGE_X, BASE_Y])?;
        let graph = &mut state.graph;

        let normal_map = self.resolver.add_node(
            graph,
            node_types::NORMAL_MAP,
            "Normal Map Node",
            [IMAGE_X + 400.0, BASE_Y],
        )?;
        if let Some(strength) = graph.input(normal_map, "Strength") {
            graph.set_default(&strength, SocketValue::Float(model.normal_strength));
        }

        let Some(tex_color) = graph.output(tex, "Color") else {
            return Ok(());
        };
        let feed = if model.normal_invert_green {
            self.flip_green(graph, &tex_color)?
        } else {
            Some(tex_color)
        };
        if let (Some(feed), Some(input)) = (feed, graph.input(normal_map, "Color")) {
            graph.connect(&feed, &input);
        }

        if let (Some(normal), Some(input)) = (
            graph.output(normal_map, "Normal"),
            resolve_socket(graph, state.shader, candidates::NORMAL),
        ) {
            graph.connect(&normal, &input);
        }
        Ok(())
    }

    /// Separate -> invert G -> combine. Converts between the two tangent-space
    /// normal conventions.
    fn flip_green(&self, graph: &mut GraphPlan, color: &SocketRef) -> Result<Option<SocketRef>, GraphError> {
        let sep = self.resolver.instantiate(
            graph,
            AbstractNodeKind::SeparateRgb,
            "Separate Normal",
            [IMAGE_X + 150.0, BASE_Y],
        )?;
        let inv = self.resolver.add_node(
            graph,
            node_types::INVERT,
            "Invert Green",
            [IMAGE_X + 250.0, BASE_Y - 50.0],
        )?;
        let comb = self.resolver.instantiate(
            graph,
            AbstractNodeKind::CombineRgb,
            "Combine Normal",
            [IMAGE_X + 350.0, BASE_Y],
        )?;

        if let Some(input) = sep.input(SocketRole::Input) {
            graph.connect(color, &input);
        }
        for role in [SocketRole::Red, SocketRole::Blue] {
            if let (Some(from), Some(to)) = (sep.output(role), comb.input(role)) {
                graph.connect(&from, &to);
            }
        }
        if let (Some(green), Some(inv_in)) = (sep.output(SocketRole::Green), graph.input(inv, "Color")) {
            graph.connect(&green, &inv_in);
        }
        if let (Some(inv_out), Some(to)) = (graph.output(inv, "Color"), comb.input(SocketRole::Green)) {
            graph.connect(&inv_out, &to);
        }
        Ok(comb.output(SocketRole::Output))
    }

    fn emission_stage(&self, state: &mut BuildState, image: &ImageRef) -> Result<(), GraphError> {
        let tex = self.sample(state, image, "Emission Map", ColorSpace::Srgb, [IMAGE_X, BASE_Y - 200.0])?;
        let graph = &mut state.graph;

        if let (Some(color), Some(input)) = (
            graph.output(tex, "Color"),
            resolve_socket(graph, state.shader, candidates::EMISSION_COLOR),
        ) {
            graph.connect(&color, &input);
        }
        if let Some(strength) = resolve_socket(graph, state.shader, candidates::EMISSION_STRENGTH) {
            graph.set_default(&strength, SocketValue::Float(1.0));
        }
        Ok(())
    }

    fn packed_stage(
        &self,
        state: &mut BuildState,
        model: &ChannelModel,
        image: &ImageRef,
    ) -> Result<(), GraphError> {
        let y = BASE_Y - 400.0;
        let tex = self.sample(state, image, "Packed Map", ColorSpace::NonColor, [IMAGE_X, y])?;
        let graph = &mut state.graph;

        let sep = self.resolver.instantiate(
            graph,
            AbstractNodeKind::SeparateRgb,
            "Separate Packed Channels",
            [IMAGE_X + 200.0, y],
        )?;
        if let (Some(color), Some(input)) = (graph.output(tex, "Color"), sep.input(SocketRole::Input)) {
            graph.connect(&color, &input);
        }

        let router = ChannelRouter::new(&self.resolver, model, state.shader, state.output);
        for (channel, slot) in model.channels.assigned() {
            let raw = match channel {
                Channel::R => sep.output(SocketRole::Red),
                Channel::G => sep.output(SocketRole::Green),
                Channel::B => sep.output(SocketRole::Blue),
                Channel::A => graph.output(tex, "Alpha"),
            };
            let Some(raw) = raw else {
                continue;
            };
            if model.channels.superseded(channel) {
                debug!(%channel, usage = ?slot.usage, "usage reassigned by a later channel, skipped");
                continue;
            }

            let signal = if slot.invert {
                let offset = channel.index() as f32 * 60.0;
                let inv = self.resolver.add_node(
                    graph,
                    node_types::INVERT,
                    &format!("Invert {}", channel),
                    [IMAGE_X + 350.0, y - 50.0 - offset],
                )?;
                match (graph.input(inv, "Color"), graph.output(inv, "Color")) {
                    (Some(inv_in), Some(inv_out)) => {
                        graph.connect(&raw, &inv_in);
                        inv_out
                    }
                    _ => continue,
                }
            } else {
                raw
            };

            let outcome = router.route(slot.usage, &signal, graph, &mut state.settings)?;
            if let RouteOutcome::Dropped { reason } = outcome {
                debug!(%channel, usage = ?slot.usage, ?reason, "channel not wired");
            }
        }
        Ok(())
    }

    fn displacement_stage(
        &self,
        state: &mut BuildState,
        model: &ChannelModel,
        image: &ImageRef,
    ) -> Result<(), GraphError> {
        let tex = self.sample(
            state,
            image,
            "Displacement Map",
            ColorSpace::NonColor,
            [IMAGE_X, BASE_Y - 600.0],
        )?;
        let router = ChannelRouter::new(&self.resolver, model, state.shader, state.output);
        let disp = router.displacement_node(&mut state.graph, &mut state.settings)?;

        let graph = &mut state.graph;
        if let (Some(color), Some(height)) = (graph.output(tex, "Color"), graph.input(disp, "Height")) {
            graph.connect(&color, &height);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::UsageKind;
    use crate::graph::Node;

    fn images_with_packed() -> ImageSet {
        ImageSet {
            packed: Some(ImageRef::named("orm.png")),
            ..Default::default()
        }
    }

    fn by_label<'a>(built: &'a BuiltGraph, label: &str) -> Option<&'a Node> {
        built.graph.nodes().iter().find(|n| n.label == label)
    }

    #[test]
    fn test_refuses_without_images() {
        let builder = GraphBuilder::new(HostProfile::default());
        let result = builder.build(&ChannelModel::default(), &ImageSet::default());
        assert!(matches!(result, Err(BuildError::NoImages)));
    }

    #[test]
    fn test_shader_always_wired_to_output() {
        let builder = GraphBuilder::new(HostProfile::default());
        let built = builder.build(&ChannelModel::default(), &images_with_packed()).unwrap();
        let surface = built.graph.input(built.output, "Surface").unwrap();
        assert_eq!(built.graph.incoming(&surface).unwrap().from.node, built.shader);
        // Separator plus sampler plus the fixed pair.
        assert_eq!(built.graph.nodes().len(), 4);
    }

    #[test]
    fn test_color_spaces() {
        let builder = GraphBuilder::new(HostProfile::default());
        let images = ImageSet {
            color: Some(ImageRef::named("c")),
            normal: Some(ImageRef::named("n")),
            emission: Some(ImageRef::named("e")),
            packed: Some(ImageRef::named("p")),
            displacement: Some(ImageRef::named("d")),
        };
        let mut model = ChannelModel::default();
        model.use_displacement = true;
        let built = builder.build(&model, &images).unwrap();

        let space = |label: &str| by_label(&built, label).unwrap().property("colorspace").map(str::to_string);
        assert_eq!(space("Base Color").as_deref(), Some("sRGB"));
        assert_eq!(space("Emission Map").as_deref(), Some("sRGB"));
        assert_eq!(space("Normal Map").as_deref(), Some("Non-Color"));
        assert_eq!(space("Packed Map").as_deref(), Some("Non-Color"));
        assert_eq!(space("Displacement Map").as_deref(), Some("Non-Color"));
    }

    #[test]
    fn test_mapping_stage_feeds_every_sampler() {
        let builder = GraphBuilder::new(HostProfile::default());
        let mut model = ChannelModel::default();
        model.texcoord_mode = TexCoordMode::Object;
        let images = ImageSet {
            color: Some(ImageRef::named("c")),
            packed: Some(ImageRef::named("p")),
            ..Default::default()
        };
        let built = builder.build(&model, &images).unwrap();

        let mapping = built.graph.find(NodeKey::Mapping).unwrap();
        let mapping_in = built.graph.input(mapping, "Vector").unwrap();
        assert_eq!(built.graph.incoming(&mapping_in).unwrap().from.name, "Object");

        for sampler in built.graph.nodes_of_type(node_types::TEX_IMAGE) {
            let vector = built.graph.input(sampler.id, "Vector").unwrap();
            assert_eq!(built.graph.incoming(&vector).unwrap().from.node, mapping);
        }
    }

    #[test]
    fn test_named_uv_map_replaces_coordinate_node() {
        let builder = GraphBuilder::new(HostProfile::default());
        let mut model = ChannelModel::default();
        model.uv_map_name = "Lightmap".into();
        let built = builder.build(&model, &images_with_packed()).unwrap();

        assert_eq!(built.graph.nodes_of_type(node_types::TEX_COORD).count(), 0);
        let uv = built.graph.nodes_of_type(node_types::UV_MAP).next().unwrap();
        assert_eq!(uv.property("uv_map"), Some("Lightmap"));

        let mapping = built.graph.find(NodeKey::Mapping).unwrap();
        let mapping_in = built.graph.input(mapping, "Vector").unwrap();
        let feed = &built.graph.incoming(&mapping_in).unwrap().from;
        assert_eq!((feed.node, feed.name.as_str()), (uv.id, "UV"));
    }

    #[test]
    fn test_no_mapping_by_default() {
        let builder = GraphBuilder::new(HostProfile::default());
        let built = builder.build(&ChannelModel::default(), &images_with_packed()).unwrap();
        assert!(built.graph.find(NodeKey::Mapping).is_none());
    }

    #[test]
    fn test_emission_image_on_old_host() {
        let builder = GraphBuilder::new(HostProfile::parse("3.6").unwrap());
        let images = ImageSet {
            emission: Some(ImageRef::named("glow")),
            ..Default::default()
        };
        let built = builder.build(&ChannelModel::default(), &images).unwrap();
        let emission = built.graph.input(built.shader, "Emission").unwrap();
        assert!(built.graph.is_linked(&emission));
        let shader = built.graph.node(built.shader).unwrap();
        assert_eq!(shader.default_value("Emission Strength"), Some(&SocketValue::Float(1.0)));
    }

    #[test]
    fn test_emission_image_on_modern_host() {
        let builder = GraphBuilder::new(HostProfile::parse("4.1").unwrap());
        let images = ImageSet {
            emission: Some(ImageRef::named("glow")),
            ..Default::default()
        };
        let built = builder.build(&ChannelModel::default(), &images).unwrap();

        let emission = built.graph.input(built.shader, "Emission Color").unwrap();
        let link = built.graph.incoming(&emission).unwrap();
        assert_eq!(by_label(&built, "Emission Map").unwrap().id, link.from.node);
        assert_eq!(link.from.name, "Color");
        assert!(built.graph.input(built.shader, "Emission").is_none());
    }

    #[test]
    fn test_color_sampler_alpha_feeds_shader_alpha() {
        let builder = GraphBuilder::new(HostProfile::default());
        let images = ImageSet {
            color: Some(ImageRef::named("albedo")),
            ..Default::default()
        };
        let built = builder.build(&ChannelModel::default(), &images).unwrap();
        let color = by_label(&built, "Base Color").unwrap();

        let alpha = built.graph.input(built.shader, "Alpha").unwrap();
        let link = built.graph.incoming(&alpha).unwrap();
        assert_eq!((link.from.node, link.from.name.as_str()), (color.id, "Alpha"));

        let base = built.graph.input(built.shader, "Base Color").unwrap();
        assert_eq!(built.graph.incoming(&base).unwrap().from.node, color.id);
    }

    #[test]
    fn test_alpha_slot_reads_sampler_alpha() {
        let builder = GraphBuilder::new(HostProfile::default());
        let mut model = ChannelModel::default();
        model.set_slot(Channel::A, UsageKind::Alpha, false);
        let built = builder.build(&model, &images_with_packed()).unwrap();

        let alpha = built.graph.input(built.shader, "Alpha").unwrap();
        let link = built.graph.incoming(&alpha).unwrap();
        let source = built.graph.node(link.from.node).unwrap();
        assert_eq!(source.node_type, node_types::TEX_IMAGE);
        assert_eq!(link.from.name, "Alpha");
    }

    #[test]
    fn test_alpha_blend_settings() {
        let builder = GraphBuilder::new(HostProfile::default());
        let mut model = ChannelModel::default();
        model.alpha_blend = true;
        let built = builder.build(&model, &images_with_packed()).unwrap();
        assert_eq!(built.settings.blend_method, BlendMethod::Blend);
        assert_eq!(built.settings.shadow_method, ShadowMethod::Hashed);
    }

    #[test]
    fn test_displacement_image_ignored_when_disabled() {
        let builder = GraphBuilder::new(HostProfile::default());
        let images = ImageSet {
            displacement: Some(ImageRef::named("height")),
            ..Default::default()
        };
        let built = builder.build(&ChannelModel::default(), &images).unwrap();
        assert_eq!(built.graph.nodes().len(), 2);
        assert!(built.graph.find(NodeKey::Displacement).is_none());
    }
}
