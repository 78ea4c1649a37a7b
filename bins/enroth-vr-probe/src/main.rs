#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use enroth_vr::runtime::{checked, XrRuntime};
use enroth_vr::session::XrSession;
use enroth_vr::types::BlendMode;
use enroth_vr::VrConfig;
use enroth_vr_openxr::OpenXrRuntime;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "enroth-vr-probe", about = "Report what the active OpenXR runtime offers")]
struct Args {
    /// JSON file overriding the default VR configuration.
    #[arg(long, env = "ENROTH_VR_CONFIG")]
    config: Option<PathBuf>,

    /// Print the snapshot as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ViewSnapshot {
    recommended_width: u32,
    recommended_height: u32,
    max_width: u32,
    max_height: u32,
    sample_count: u32,
}

#[derive(Debug, Serialize)]
struct Snapshot {
    runtime_name: Option<String>,
    runtime_version: Option<String>,
    system_name: String,
    vendor_id: u32,
    max_layer_count: u32,
    orientation_tracking: bool,
    position_tracking: bool,
    min_gl_version: String,
    max_gl_version: String,
    views: Vec<ViewSnapshot>,
    blend_modes: Vec<String>,
    chosen_blend_mode: String,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            VrConfig::from_json(&text)?
        }
        None => VrConfig::default(),
    };

    let mut runtime = OpenXrRuntime::load()?;
    let mut session = XrSession::default();
    let snapshot = probe(&mut runtime, &mut session, &config);
    session.destroy(&mut runtime);
    let snapshot = snapshot?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_text(&snapshot);
    }
    Ok(())
}

fn probe(
    runtime: &mut OpenXrRuntime,
    session: &mut XrSession,
    config: &VrConfig,
) -> Result<Snapshot> {
    session
        .initialize(runtime, config)
        .context("OpenXR capability discovery failed")?;
    let system = session.system().cloned().unwrap_or_default();
    let requirements = session.requirements().unwrap_or_default();
    let info = runtime.runtime_info();

    let result = runtime.view_configuration();
    let views = checked(&*runtime, result).unwrap_or_default();
    if views.is_empty() {
        warn!("runtime reported no views for the stereo configuration");
    }
    let result = runtime.environment_blend_modes();
    let blend_modes = checked(&*runtime, result).unwrap_or_default();
    let chosen = BlendMode::negotiate(&blend_modes);
    info!("probe complete: {} view(s), blend {:?}", views.len(), chosen);

    Ok(Snapshot {
        runtime_name: info.as_ref().map(|i| i.runtime_name.clone()),
        runtime_version: info.map(|i| i.runtime_version),
        system_name: system.system_name,
        vendor_id: system.vendor_id,
        max_layer_count: system.max_layer_count,
        orientation_tracking: system.orientation_tracking,
        position_tracking: system.position_tracking,
        min_gl_version: version(requirements.min_api_version),
        max_gl_version: version(requirements.max_api_version),
        views: views
            .iter()
            .map(|v| ViewSnapshot {
                recommended_width: v.recommended_width,
                recommended_height: v.recommended_height,
                max_width: v.max_width,
                max_height: v.max_height,
                sample_count: v.recommended_sample_count,
            })
            .collect(),
        blend_modes: blend_modes.iter().map(|m| format!("{m:?}")).collect(),
        chosen_blend_mode: format!("{chosen:?}"),
    })
}

fn version((major, minor): (u16, u16)) -> String {
    format!("{major}.{minor}")
}

fn print_text(s: &Snapshot) {
    println!(
        "runtime:      {} {}",
        s.runtime_name.as_deref().unwrap_or("unknown"),
        s.runtime_version.as_deref().unwrap_or("")
    );
    println!("system:       {} (vendor 0x{:04X})", s.system_name, s.vendor_id);
    println!(
        "tracking:     orientation={} position={}",
        s.orientation_tracking, s.position_tracking
    );
    println!("layers:       up to {}", s.max_layer_count);
    println!("OpenGL:       {} .. {}", s.min_gl_version, s.max_gl_version);
    for (i, v) in s.views.iter().enumerate() {
        println!(
            "view {i}:       {}x{} recommended, {}x{} max, {} sample(s)",
            v.recommended_width, v.recommended_height, v.max_width, v.max_height, v.sample_count
        );
    }
    println!(
        "blend modes:  {} -> {}",
        s.blend_modes.join(", "),
        s.chosen_blend_mode
    );
}
