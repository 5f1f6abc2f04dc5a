//! Preset System - Named Channel Packings
//!
//! A preset replaces all four channel slots at once. Built-in presets cover
//! the common engine packings; more can be loaded from a directory of JSON files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::channels::{ChannelModel, ChannelSlot, ChannelSlots, UsageKind};

pub type PresetId = String;

pub const CUSTOM: &str = "custom";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Failed to read preset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid preset file: {0}")]
    Parse(#[from] serde_json::Error),
}

const fn slot(usage: UsageKind) -> ChannelSlot {
    ChannelSlot::new(usage, false)
}

const NONE: ChannelSlot = ChannelSlot::unassigned();

// Smoothness packed in alpha, stored as roughness after inversion.
const MADS: ChannelSlots = ChannelSlots::new(
    slot(UsageKind::Metallic),
    slot(UsageKind::AmbientOcclusion),
    NONE,
    ChannelSlot::new(UsageKind::Roughness, true),
);

const ORM: ChannelSlots = ChannelSlots::new(
    slot(UsageKind::AmbientOcclusion),
    slot(UsageKind::Roughness),
    slot(UsageKind::Metallic),
    NONE,
);

const SOURCE: ChannelSlots = ChannelSlots::new(
    NONE,
    slot(UsageKind::Metallic),
    NONE,
    slot(UsageKind::Specular),
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `None` only for the custom preset, which leaves the model untouched.
    #[serde(default)]
    pub channels: Option<ChannelSlots>,
}

/// On-disk preset. Unlike the built-in table, `channels` is mandatory.
#[derive(Debug, Deserialize)]
struct PresetFile {
    id: PresetId,
    name: String,
    #[serde(default)]
    description: String,
    channels: ChannelSlots,
}

impl From<PresetFile> for Preset {
    fn from(file: PresetFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            description: file.description,
            channels: Some(file.channels),
        }
    }
}

impl Preset {
    fn builtin(id: &str, name: &str, description: &str, channels: Option<ChannelSlots>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            channels,
        }
    }

    /// Overwrite all four slots of `model` with this preset's assignment.
    pub fn apply(&self, model: &mut ChannelModel) {
        let Some(channels) = self.channels else {
            return;
        };
        model.channels = channels;
    }

    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM
    }

    /// Parse a user preset file.
    pub fn from_json(content: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str::<PresetFile>(content)?.into())
    }
}

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::builtin(CUSTOM, "Custom", "User-defined channel configuration", None),
        Preset::builtin(
            "unity_hdrp",
            "Unity HDRP (MADS)",
            "Metallic(R), AO(G), Detail(B), Smoothness(A)",
            Some(MADS),
        ),
        Preset::builtin(
            "unity_urp",
            "Unity URP",
            "Metallic(R), Occlusion(G), unused(B), Smoothness(A)",
            Some(MADS),
        ),
        Preset::builtin("unreal", "Unreal Engine (ORM)", "AO(R), Roughness(G), Metallic(B)", Some(ORM)),
        Preset::builtin("substance", "Substance (ORM)", "AO(R), Roughness(G), Metallic(B)", Some(ORM)),
        Preset::builtin("gltf", "glTF (ORM)", "Occlusion(R), Roughness(G), Metallic(B)", Some(ORM)),
        Preset::builtin(
            "source",
            "Source Engine",
            "Phong Exp(R), Metallic/Env(G), unused(B), Phong mask(A)",
            Some(SOURCE),
        ),
        Preset::builtin("godot", "Godot Engine (ORM)", "AO(R), Roughness(G), Metallic(B)", Some(ORM)),
    ]
}

/// Preset registry - built-ins plus presets loaded from disk
pub struct PresetRegistry {
    presets: HashMap<PresetId, Preset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        let presets = builtin_presets()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { presets }
    }

    /// Built-ins plus every `*.json` preset in `dir`. Files that fail to
    /// parse are skipped; user presets never replace a built-in.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    let parsed = fs::read_to_string(&path)
                        .map_err(PresetError::from)
                        .and_then(|content| Preset::from_json(&content));
                    match parsed {
                        Ok(preset) => {
                            if !registry.register(preset) {
                                tracing::warn!(path = %path.display(), "preset id collides with a built-in, skipped");
                            }
                        }
                        Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping preset file"),
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    /// Presets sorted by id, custom first.
    pub fn list(&self) -> Vec<&Preset> {
        let mut list: Vec<_> = self.presets.values().collect();
        list.sort_by(|a, b| (!a.is_custom(), &a.id).cmp(&(!b.is_custom(), &b.id)));
        list
    }

    /// Add a preset. Returns `false` if the id is already a built-in or the
    /// preset assigns no channels.
    pub fn register(&mut self, preset: Preset) -> bool {
        let builtin = builtin_presets().iter().any(|b| b.id == preset.id);
        if builtin || preset.channels.is_none() {
            return false;
        }
        self.presets.insert(preset.id.clone(), preset);
        true
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
