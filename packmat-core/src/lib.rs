//! Packed Channel Material Compiler
//!
//! Compiles a declarative packed-channel configuration into a shader node
//! graph for the running host.
//!
//! Flow: preset (optional) -> `ChannelModel` -> `GraphBuilder`, which uses the
//! `CapabilityResolver` for every version-dependent node and the
//! `ChannelRouter` for every packed channel -> `GraphPlan` handed to the host.

pub mod capability;
pub mod catalog;
pub mod graph;
pub mod channels;
pub mod presets;
pub mod router;
pub mod builder;
pub mod material;
pub mod images;
pub mod scene;
pub mod validation;
pub mod hashing;
pub mod pipeline;

pub use capability::{CapabilityLevel, CapabilityResolver, HostProfile, AbstractNodeKind, BlendMode};
pub use channels::{Channel, ChannelModel, ChannelSlot, UsageKind, TexCoordMode};
pub use presets::{Preset, PresetError, PresetRegistry};
pub use graph::{GraphPlan, NodeId, NodeKey, SocketRef};
pub use builder::{BuildError, BuiltGraph, GraphBuilder};
pub use router::{ChannelRouter, RouteOutcome};
pub use images::{ImageLibrary, ImageRef, ImageSet, LoadError};
pub use scene::{Scene, SceneHost, SceneObject, ObjectKind};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};
pub use hashing::{compute_plan_hash, compute_request_hash, canonical_json};
pub use pipeline::{MaterialPipeline, MaterialReport, SynthesisRequest, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
