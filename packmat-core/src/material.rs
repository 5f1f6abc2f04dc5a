//! Material-level settings and the finished material handed to the host.

use serde::{Deserialize, Serialize};

use crate::graph::GraphPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShadowMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    None,
}

/// How the renderer evaluates the displacement output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplacementMethod {
    #[default]
    Bump,
    Displacement,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialSettings {
    pub blend_method: BlendMethod,
    pub shadow_method: ShadowMethod,
    pub displacement_method: DisplacementMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub settings: MaterialSettings,
    pub graph: GraphPlan,
}
