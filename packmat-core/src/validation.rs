//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy: any error blocks synthesis, warnings and info are reported.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::channels::{
    ChannelModel, UsageKind, DISPLACEMENT_MIDLEVEL_RANGE, DISPLACEMENT_STRENGTH_RANGE,
    NORMAL_STRENGTH_RANGE,
};
use crate::images::ImageSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, model: &ChannelModel, images: &ImageSet) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct ImagePresenceRule;

impl ValidationRule for ImagePresenceRule {
    fn name(&self) -> &'static str { "image_presence" }

    fn validate(&self, _model: &ChannelModel, images: &ImageSet) -> Vec<ValidationViolation> {
        if !images.is_empty() {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "No image configured".to_string(),
            expected: Some("at least one of color, normal, emission, packed, displacement".to_string()),
            actual: Some("none".to_string()),
            remediation: vec!["Load at least one texture map".to_string()],
        }]
    }
}

pub struct ParameterRangeRule;

impl ParameterRangeRule {
    fn check(&self, field: &str, value: f64, (min, max): (f64, f64)) -> Option<ValidationViolation> {
        if value >= min && value <= max {
            return None;
        }
        Some(ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: format!("{} out of range", field),
            expected: Some(format!("{} to {}", min, max)),
            actual: Some(format!("{}", value)),
            remediation: vec![format!("Set {} within its range", field)],
        })
    }
}

impl ValidationRule for ParameterRangeRule {
    fn name(&self) -> &'static str { "parameter_range" }

    fn validate(&self, model: &ChannelModel, _images: &ImageSet) -> Vec<ValidationViolation> {
        [
            self.check("normal_strength", model.normal_strength, NORMAL_STRENGTH_RANGE),
            self.check("displacement_strength", model.displacement_strength, DISPLACEMENT_STRENGTH_RANGE),
            self.check("displacement_midlevel", model.displacement_midlevel, DISPLACEMENT_MIDLEVEL_RANGE),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub struct PackedChannelsRule;

impl ValidationRule for PackedChannelsRule {
    fn name(&self) -> &'static str { "packed_channels" }

    fn validate(&self, model: &ChannelModel, images: &ImageSet) -> Vec<ValidationViolation> {
        let assigned = model.channels.assigned().count();
        match (images.packed.is_some(), assigned) {
            (false, n) if n > 0 => vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Channels assigned but no packed image".to_string(),
                expected: Some("packed image".to_string()),
                actual: Some(format!("{} assigned channel(s)", n)),
                remediation: vec!["Load a packed map or clear the channel usages".to_string()],
            }],
            (true, 0) => vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                message: "Packed image has no assigned channels".to_string(),
                expected: None,
                actual: None,
                remediation: vec!["Pick a preset or assign channel usages".to_string()],
            }],
            _ => vec![],
        }
    }
}

pub struct DisplacementRule;

impl ValidationRule for DisplacementRule {
    fn name(&self) -> &'static str { "displacement" }

    fn validate(&self, model: &ChannelModel, images: &ImageSet) -> Vec<ValidationViolation> {
        if !model.use_displacement || images.displacement.is_some() {
            return vec![];
        }
        let packed_height = images.packed.is_some()
            && model
                .channels
                .assigned()
                .any(|(_, s)| s.usage == UsageKind::DisplacementHeight);
        if packed_height {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Displacement enabled without a height source".to_string(),
            expected: Some("displacement image or displacement_height channel".to_string()),
            actual: None,
            remediation: vec!["Load a displacement map".to_string()],
        }]
    }
}

pub struct DuplicateUsageRule;

impl ValidationRule for DuplicateUsageRule {
    fn name(&self) -> &'static str { "duplicate_usage" }

    fn validate(&self, model: &ChannelModel, _images: &ImageSet) -> Vec<ValidationViolation> {
        let mut seen: HashMap<UsageKind, Vec<String>> = HashMap::new();
        for (channel, slot) in model.channels.assigned() {
            seen.entry(slot.usage).or_default().push(channel.to_string());
        }

        let mut violations: Vec<_> = seen
            .into_iter()
            .filter(|(_, channels)| channels.len() > 1)
            .map(|(usage, channels)| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: format!("{} assigned to more than one channel", usage.display_name()),
                expected: Some("one channel".to_string()),
                actual: Some(channels.join(", ")),
                remediation: vec![format!(
                    "Only channel {} takes effect",
                    channels.last().map(String::as_str).unwrap_or_default()
                )],
            })
            .collect();
        violations.sort_by(|a, b| a.message.cmp(&b.message));
        violations
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ImagePresenceRule),
                Box::new(ParameterRangeRule),
                Box::new(PackedChannelsRule),
                Box::new(DisplacementRule),
                Box::new(DuplicateUsageRule),
            ],
        }
    }

    pub fn validate(&self, model: &ChannelModel, images: &ImageSet) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(model, images);
            all_violations.extend(violations);
        }

        let has_errors = all_violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid: !has_errors,
            violations: all_violations,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Channel;
    use crate::images::ImageRef;

    fn packed() -> ImageSet {
        ImageSet {
            packed: Some(ImageRef::named("orm")),
            ..Default::default()
        }
    }

    fn rules_hit(result: &ValidationResult) -> Vec<&str> {
        result.violations.iter().map(|v| v.rule.as_str()).collect()
    }

    #[test]
    fn test_no_images_is_error() {
        let result = Validator::new().validate(&ChannelModel::default(), &ImageSet::default());
        assert!(!result.valid);
        assert_eq!(result.errors().next().unwrap().rule, "image_presence");
    }

    #[test]
    fn test_out_of_range_blocks() {
        let mut model = ChannelModel::default();
        model.normal_strength = 7.5;
        model.displacement_midlevel = -0.1;
        let result = Validator::new().validate(&model, &packed());
        assert!(!result.valid);
        assert_eq!(result.errors().count(), 2);
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut model = ChannelModel::default();
        model.set_slot(Channel::R, UsageKind::Metallic, false);
        model.set_slot(Channel::B, UsageKind::Metallic, false);
        model.use_displacement = true;

        let images = ImageSet {
            color: Some(ImageRef::named("albedo")),
            ..Default::default()
        };
        let result = Validator::new().validate(&model, &images);
        assert!(result.valid);
        let hit = rules_hit(&result);
        assert!(hit.contains(&"packed_channels"));
        assert!(hit.contains(&"displacement"));
        assert!(hit.contains(&"duplicate_usage"));
    }

    #[test]
    fn test_packed_height_satisfies_displacement() {
        let mut model = ChannelModel::default();
        model.use_displacement = true;
        model.set_slot(Channel::B, UsageKind::DisplacementHeight, false);
        let result = Validator::new().validate(&model, &packed());
        assert!(result.violations.is_empty());
    }
}
