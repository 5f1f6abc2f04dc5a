//! Channel Model - Packed Channel Configuration
//!
//! Which channel of the packed map carries which material property, plus the
//! material-level parameters a synthesis request supplies.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MATERIAL_NAME: &str = "Enhanced_Packed_Material";

pub const NORMAL_STRENGTH_RANGE: (f64, f64) = (0.0, 5.0);
pub const DISPLACEMENT_STRENGTH_RANGE: (f64, f64) = (0.0, 10.0);
pub const DISPLACEMENT_MIDLEVEL_RANGE: (f64, f64) = (0.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    R,
    G,
    B,
    A,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::R, Channel::G, Channel::B, Channel::A];

    pub fn index(self) -> usize {
        match self {
            Self::R => 0,
            Self::G => 1,
            Self::B => 2,
            Self::A => 3,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::R => "R",
            Self::G => "G",
            Self::B => "B",
            Self::A => "A",
        };
        f.write_str(s)
    }
}

/// Semantic role of one packed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    #[default]
    None,
    Metallic,
    Roughness,
    AmbientOcclusion,
    EmissionStrength,
    Alpha,
    Specular,
    DisplacementHeight,
    SubsurfaceWeight,
}

impl UsageKind {
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Metallic => "Metallic",
            Self::Roughness => "Roughness",
            Self::AmbientOcclusion => "Ambient Occlusion",
            Self::EmissionStrength => "Emission Strength",
            Self::Alpha => "Alpha (Transparency)",
            Self::Specular => "Specular",
            Self::DisplacementHeight => "Displacement Height",
            Self::SubsurfaceWeight => "Subsurface Weight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelSlot {
    #[serde(default)]
    pub usage: UsageKind,
    #[serde(default)]
    pub invert: bool,
}

impl ChannelSlot {
    pub const fn new(usage: UsageKind, invert: bool) -> Self {
        Self { usage, invert }
    }

    pub const fn unassigned() -> Self {
        Self::new(UsageKind::None, false)
    }
}

/// The four slots of a packed map, in R, G, B, A order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelSlots {
    #[serde(default)]
    pub r: ChannelSlot,
    #[serde(default)]
    pub g: ChannelSlot,
    #[serde(default)]
    pub b: ChannelSlot,
    #[serde(default)]
    pub a: ChannelSlot,
}

impl ChannelSlots {
    pub const fn new(r: ChannelSlot, g: ChannelSlot, b: ChannelSlot, a: ChannelSlot) -> Self {
        Self { r, g, b, a }
    }

    pub fn get(&self, channel: Channel) -> &ChannelSlot {
        match channel {
            Channel::R => &self.r,
            Channel::G => &self.g,
            Channel::B => &self.b,
            Channel::A => &self.a,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut ChannelSlot {
        match channel {
            Channel::R => &mut self.r,
            Channel::G => &mut self.g,
            Channel::B => &mut self.b,
            Channel::A => &mut self.a,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelSlot)> + '_ {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Slots with a usage other than `None`.
    pub fn assigned(&self) -> impl Iterator<Item = (Channel, &ChannelSlot)> + '_ {
        self.iter().filter(|(_, s)| !s.usage.is_none())
    }

    /// Whether a later channel carries the same usage as `channel`. The later
    /// slot owns the target socket, so this one is never wired.
    pub fn superseded(&self, channel: Channel) -> bool {
        let usage = self.get(channel).usage;
        !usage.is_none()
            && Channel::ALL[channel.index() + 1..]
                .iter()
                .any(|&later| self.get(later).usage == usage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexCoordMode {
    #[default]
    Uv,
    Generated,
    Object,
    Camera,
}

impl TexCoordMode {
    /// Output socket on the texture-coordinate node for this mode.
    pub fn output_socket(self) -> &'static str {
        match self {
            Self::Uv => "UV",
            Self::Generated => "Generated",
            Self::Object => "Object",
            Self::Camera => "Camera",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelModel {
    pub material_name: String,
    pub channels: ChannelSlots,
    pub normal_strength: f64,
    pub normal_invert_green: bool,
    pub displacement_strength: f64,
    pub displacement_midlevel: f64,
    pub use_displacement: bool,
    pub texcoord_mode: TexCoordMode,
    pub uv_map_name: String,
    pub alpha_blend: bool,
    pub apply_to_all: bool,
}

impl Default for ChannelModel {
    fn default() -> Self {
        Self {
            material_name: String::new(),
            channels: ChannelSlots::default(),
            normal_strength: 1.0,
            normal_invert_green: false,
            displacement_strength: 0.1,
            displacement_midlevel: 0.5,
            use_displacement: false,
            texcoord_mode: TexCoordMode::Uv,
            uv_map_name: String::new(),
            alpha_blend: false,
            apply_to_all: false,
        }
    }
}

impl ChannelModel {
    pub fn slot(&self, channel: Channel) -> &ChannelSlot {
        self.channels.get(channel)
    }

    pub fn set_slot(&mut self, channel: Channel, usage: UsageKind, invert: bool) {
        *self.channels.get_mut(channel) = ChannelSlot::new(usage, invert);
    }

    /// Trimmed material name, or the default when none was given.
    pub fn resolved_material_name(&self) -> &str {
        let name = self.material_name.trim();
        if name.is_empty() {
            DEFAULT_MATERIAL_NAME
        } else {
            name
        }
    }

    /// Whether a coordinate/mapping stage is needed in front of the samplers.
    pub fn needs_mapping(&self) -> bool {
        self.texcoord_mode != TexCoordMode::Uv || !self.uv_map_name.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let model = ChannelModel::default();
        assert_eq!(model.normal_strength, 1.0);
        assert_eq!(model.displacement_midlevel, 0.5);
        assert_eq!(model.channels.assigned().count(), 0);
        assert_eq!(model.resolved_material_name(), DEFAULT_MATERIAL_NAME);
        assert!(!model.needs_mapping());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let model: ChannelModel = serde_json::from_str(
            r#"{"material_name": "  Rock ", "channels": {"a": {"usage": "roughness", "invert": true}}}"#,
        )
        .unwrap();
        assert_eq!(model.resolved_material_name(), "Rock");
        assert_eq!(model.slot(Channel::A), &ChannelSlot::new(UsageKind::Roughness, true));
        assert_eq!(model.slot(Channel::R).usage, UsageKind::None);
        assert_eq!(model.displacement_strength, 0.1);
    }

    #[test]
    fn test_needs_mapping() {
        let mut model = ChannelModel::default();
        model.uv_map_name = "UVMap.001".into();
        assert!(model.needs_mapping());

        model.uv_map_name.clear();
        model.texcoord_mode = TexCoordMode::Object;
        assert!(model.needs_mapping());
    }

    #[test]
    fn test_later_slot_supersedes_earlier() {
        let mut slots = ChannelSlots::default();
        slots.get_mut(Channel::R).usage = UsageKind::AmbientOcclusion;
        slots.get_mut(Channel::B).usage = UsageKind::AmbientOcclusion;
        slots.get_mut(Channel::G).usage = UsageKind::Roughness;

        assert!(slots.superseded(Channel::R));
        assert!(!slots.superseded(Channel::B));
        assert!(!slots.superseded(Channel::G));
        assert!(!slots.superseded(Channel::A));
    }
}
