//! Synthesis Pipeline - Single Entry Point
//!
//! CRITICAL: create_material MUST call validate internally. No bypass.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::builder::{BuildError, GraphBuilder};
use crate::capability::{CapabilityLevel, HostProfile};
use crate::channels::{ChannelModel, ChannelSlots};
use crate::graph::GraphPlan;
use crate::hashing::{compute_plan_hash, compute_request_hash};
use crate::images::ImageSet;
use crate::material::{Material, MaterialSettings};
use crate::presets::{Preset, PresetRegistry};
use crate::scene::{apply_material, SceneHost};
use crate::validation::{ValidationResult, Validator, ViolationSeverity};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Preset applied over `model.channels` before building.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub model: ChannelModel,
    #[serde(default)]
    pub images: ImageSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialReport {
    pub id: String,
    pub material_name: String,
    pub engine_version: String,
    pub host_version: String,
    pub capability: CapabilityLevel,
    pub created_at: DateTime<Utc>,
    pub validation: ValidationResult,
    pub settings: MaterialSettings,
    pub affected_objects: usize,
    pub plan_hash: String,
    pub request_hash: String,
    pub plan: GraphPlan,
}

impl SynthesisRequest {
    /// Drop images, preset, material name and every channel assignment.
    /// Normal, displacement and mapping parameters are kept.
    pub fn clear(&mut self) {
        self.images = ImageSet::default();
        self.preset = None;
        self.model.material_name.clear();
        self.model.channels = ChannelSlots::default();
    }
}

/// The synthesis pipeline - single entry point for material creation
pub struct MaterialPipeline {
    presets: PresetRegistry,
    validator: Validator,
    builder: GraphBuilder,
}

impl MaterialPipeline {
    pub fn new(host: HostProfile, presets: PresetRegistry) -> Self {
        Self {
            presets,
            validator: Validator::new(),
            builder: GraphBuilder::new(host),
        }
    }

    pub fn host(&self) -> &HostProfile {
        self.builder.resolver().host()
    }

    /// List all available presets
    pub fn list_presets(&self) -> Vec<&Preset> {
        self.presets.list()
    }

    /// The model the builder will see: the request's model with its preset applied.
    pub fn effective_model(&self, request: &SynthesisRequest) -> Result<ChannelModel, PipelineError> {
        let mut model = request.model.clone();
        if let Some(id) = &request.preset {
            let preset = self.presets.get(id)
                .ok_or_else(|| PipelineError::PresetNotFound(id.clone()))?;
            preset.apply(&mut model);
        }
        Ok(model)
    }

    /// Validate a request
    ///
    /// This is the ONLY validation entry point.
    pub fn validate_request(&self, request: &SynthesisRequest) -> Result<ValidationResult, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let model = self.effective_model(request)?;
        Ok(self.validator.validate(&model, &request.images))
    }

    /// Build a material, register it with the host and attach it to the
    /// target objects.
    ///
    /// CRITICAL: This ALWAYS calls validate_request internally. No bypass possible.
    pub fn create_material<H: SceneHost + ?Sized>(
        &self,
        request: &SynthesisRequest,
        scene: &mut H,
    ) -> Result<MaterialReport, PipelineError> {
        // MANDATORY: refused requests never reach the builder.
        let validation = self.validate_request(request)?;

        if !validation.valid {
            let messages: Vec<_> = validation.errors()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(PipelineError::ValidationFailed(messages.join("; ")));
        }
        for violation in &validation.violations {
            match violation.severity {
                ViolationSeverity::Warning => tracing::warn!(rule = %violation.rule, "{}", violation.message),
                _ => tracing::debug!(rule = %violation.rule, "{}", violation.message),
            }
        }

        let model = self.effective_model(request)?;
        let built = self.builder.build(&model, &request.images)?;

        let host_version = self.host().version.to_string();
        let plan_hash = compute_plan_hash(&built.graph)?;
        let request_hash = compute_request_hash(&host_version, request, ENGINE_VERSION)?;

        let material_name = scene.add_material(Material {
            name: model.resolved_material_name().to_string(),
            settings: built.settings,
            graph: built.graph.clone(),
        });
        let affected_objects = apply_material(scene, &material_name, model.apply_to_all);

        if affected_objects > 0 {
            tracing::info!(material = %material_name, objects = affected_objects, "material created and applied");
        } else {
            tracing::info!(material = %material_name, "material created (no mesh object selected)");
        }

        Ok(MaterialReport {
            id: Uuid::new_v4().to_string(),
            material_name,
            engine_version: ENGINE_VERSION.to_string(),
            host_version,
            capability: self.builder.resolver().level(),
            created_at: Utc::now(),
            validation,
            settings: built.settings,
            affected_objects,
            plan_hash,
            request_hash,
            plan: built.graph,
        })
    }
}

impl Default for MaterialPipeline {
    fn default() -> Self {
        Self::new(HostProfile::default(), PresetRegistry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Channel, UsageKind};
    use crate::images::ImageRef;

    #[test]
    fn test_clear_resets_request() {
        let mut request = SynthesisRequest {
            preset: Some("gltf".to_string()),
            images: ImageSet {
                color: Some(ImageRef::named("albedo.png")),
                packed: Some(ImageRef::named("orm.png")),
                ..Default::default()
            },
            ..Default::default()
        };
        request.model.material_name = "Crate".to_string();
        request.model.normal_strength = 2.5;
        request.model.set_slot(Channel::G, UsageKind::Metallic, true);

        request.clear();

        assert!(request.preset.is_none());
        assert!(request.images.is_empty());
        assert_eq!(request.model.material_name, "");
        assert_eq!(request.model.channels, ChannelSlots::default());
        assert_eq!(request.model.normal_strength, 2.5);
    }
}
