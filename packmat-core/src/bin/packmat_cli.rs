//! Packmat CLI - JSON bridge for host add-ons
//!
//! Commands: presets, validate, build, resolve
//! Outputs JSON to stdout, logs to stderr (filter via PACKMAT_LOG)
//! Returns 1 on bad input, 2 on validation failure

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use packmat_core::{
    capability::{resolve, AbstractNodeKind, BlendMode},
    HostProfile, ImageLibrary, MaterialPipeline, PresetRegistry, Scene, SynthesisRequest,
};

#[derive(Parser)]
#[command(name = "packmat-cli")]
#[command(about = "Packmat CLI - Packed Channel Material Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to user presets directory
    #[arg(short, long, default_value = "presets")]
    presets_dir: PathBuf,

    /// Version reported by the host application
    #[arg(long, default_value = "4.1.0")]
    host_version: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List available presets
    Presets,

    /// Validate a synthesis request
    Validate {
        /// JSON payload (SynthesisRequest)
        #[arg(short, long)]
        payload: String,
    },

    /// Build a material graph
    Build {
        /// JSON payload (SynthesisRequest)
        #[arg(short, long)]
        payload: String,

        /// Scene description (JSON file) receiving the material
        #[arg(short, long)]
        scene: Option<PathBuf>,
    },

    /// Show the concrete node an abstract node resolves to on this host
    Resolve {
        #[arg(short, long, value_enum)]
        kind: KindArg,

        /// Blend mode for mix nodes
        #[arg(short, long, value_enum, default_value = "multiply")]
        blend: BlendArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    SeparateRgb,
    CombineRgb,
    Mix,
}

#[derive(Clone, Copy, ValueEnum)]
enum BlendArg {
    Mix,
    Multiply,
    Add,
    Subtract,
    Screen,
    Overlay,
}

impl From<BlendArg> for BlendMode {
    fn from(b: BlendArg) -> Self {
        match b {
            BlendArg::Mix => BlendMode::Mix,
            BlendArg::Multiply => BlendMode::Multiply,
            BlendArg::Add => BlendMode::Add,
            BlendArg::Subtract => BlendMode::Subtract,
            BlendArg::Screen => BlendMode::Screen,
            BlendArg::Overlay => BlendMode::Overlay,
        }
    }
}

/// Single-line JSON error reply. `status` names the boolean flag set to
/// `false` alongside the message, if the command reports one.
fn error_reply(status: Option<&str>, message: String) -> serde_json::Value {
    let mut reply = serde_json::Map::new();
    if let Some(flag) = status {
        reply.insert(flag.to_string(), serde_json::Value::Bool(false));
    }
    reply.insert("error".to_string(), serde_json::Value::String(message));
    serde_json::Value::Object(reply)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("PACKMAT_LOG")
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let host = match HostProfile::parse(&cli.host_version) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}", error_reply(None, format!("Invalid host version: {}", e)));
            return ExitCode::FAILURE;
        }
    };

    let presets = match PresetRegistry::load_from_dir(&cli.presets_dir) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", error_reply(None, format!("Failed to load presets: {}", e)));
            return ExitCode::FAILURE;
        }
    };

    let pipeline = MaterialPipeline::new(host, presets);

    match cli.command {
        Commands::Presets => {
            let presets: Vec<_> = pipeline.list_presets()
                .iter()
                .map(|p| serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "description": p.description,
                    "channels": p.channels,
                }))
                .collect();

            println!("{}", serde_json::to_string_pretty(&presets).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Validate { payload } => {
            let request: SynthesisRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!("{}", error_reply(Some("valid"), format!("Invalid payload: {}", e)));
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.validate_request(&request) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result).unwrap());
                    if result.valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)  // Validation failure
                    }
                }
                Err(e) => {
                    println!("{}", error_reply(Some("valid"), e.to_string()));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Build { payload, scene } => {
            let mut request: SynthesisRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!("{}", error_reply(Some("success"), format!("Invalid payload: {}", e)));
                    return ExitCode::FAILURE;
                }
            };

            let mut scene: Scene = match scene {
                Some(path) => {
                    let parsed = fs::read_to_string(&path)
                        .map_err(|e| e.to_string())
                        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()));
                    match parsed {
                        Ok(s) => s,
                        Err(e) => {
                            println!("{}", error_reply(Some("success"), format!("Invalid scene: {}", e)));
                            return ExitCode::FAILURE;
                        }
                    }
                }
                None => Scene::new(),
            };

            // Loading happens before synthesis; failed slots stay empty.
            let mut library = ImageLibrary::new();
            let (images, load_errors) = library.resolve_set(&request.images);
            request.images = images;
            let load_errors: Vec<_> = load_errors.iter().map(|e| e.to_string()).collect();

            match pipeline.create_material(&request, &mut scene) {
                Ok(report) => {
                    let output = serde_json::json!({
                        "success": true,
                        "report": report,
                        "load_errors": load_errors,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                        "load_errors": load_errors,
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2)
                }
            }
        }

        Commands::Resolve { kind, blend } => {
            let request = match kind {
                KindArg::SeparateRgb => AbstractNodeKind::SeparateRgb,
                KindArg::CombineRgb => AbstractNodeKind::CombineRgb,
                KindArg::Mix => AbstractNodeKind::Mix(blend.into()),
            };
            let level = pipeline.host().capability_level();
            let output = serde_json::json!({
                "host_version": pipeline.host().version.to_string(),
                "capability": level,
                "node": resolve(level, request),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_escapes_quotes() {
        let err = serde_json::from_str::<SynthesisRequest>(r#"{"model":{"normal_strength":"high"}}"#)
            .unwrap_err();
        let text = error_reply(Some("valid"), format!("Invalid payload: {}", err)).to_string();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["valid"], false);
        assert!(parsed["error"].as_str().unwrap().contains(r#""high""#));
    }

    #[test]
    fn test_error_reply_for_unknown_preset() {
        let pipeline = MaterialPipeline::default();
        let request = SynthesisRequest {
            preset: Some(r#"my "hdrp""#.to_string()),
            ..Default::default()
        };
        let err = pipeline.validate_request(&request).unwrap_err();
        let text = error_reply(Some("valid"), err.to_string()).to_string();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["error"], r#"Preset not found: my "hdrp""#);
    }

    #[test]
    fn test_error_reply_without_status_flag() {
        let parsed = error_reply(None, "Invalid host version: x".to_string());
        assert_eq!(parsed.as_object().unwrap().len(), 1);
    }
}
