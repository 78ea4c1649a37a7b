//! Tunables and debug switches.
//!
//! Every placement constant (panel distances, yaw phase, thresholds) lives
//! here so it can be recalibrated per headset instead of being baked in.

use serde::Deserialize;

use crate::{VrError, VrResult};

pub const DEBUG_CLEAR_ENV: &str = "ENROTH_VR_TEST_CLEAR";
pub const DEBUG_GLSTATE_ENV: &str = "ENROTH_VR_GLSTATE_LOG";
pub const DEBUG_OVERLAY_ENV: &str = "ENROTH_VR_OVERLAY_LOG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VrConfig {
    pub application_name: String,
    pub engine_name: String,
    /// Used when the host has no active camera to ask.
    pub default_near_clip: f32,
    pub default_far_clip: f32,
    /// Degrees between the host's zero yaw and the runtime's forward axis.
    pub yaw_phase_degrees: f32,
    pub overlay: OverlayConfig,
    pub input: InputConfig,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            application_name: "OpenEnroth VR".to_string(),
            engine_name: "OpenEnroth".to_string(),
            default_near_clip: 4.0,
            default_far_clip: 30000.0,
            yaw_phase_degrees: 90.0,
            overlay: OverlayConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl VrConfig {
    pub fn from_json(text: &str) -> VrResult<Self> {
        serde_json::from_str(text).map_err(|e| VrError::Config(e.to_string()))
    }

    pub fn yaw_phase(&self) -> f32 {
        self.yaw_phase_degrees.to_radians()
    }
}

/// Overlay placement, in meters of runtime space unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Head-locked screen capture quad.
    pub head_locked_distance: f32,
    pub head_locked_width: f32,
    /// Interactive world panel, latched in front of the head.
    pub panel_distance: f32,
    pub panel_width: f32,
    /// Native compositor quad layer.
    pub layer_distance: f32,
    pub layer_width: f32,
    pub layer_resolution: (u32, u32),
    /// Dialogue and menu quads, below the line of sight.
    pub dialogue_distance: f32,
    pub dialogue_width: f32,
    pub dialogue_drop: f32,
    /// Pixel width of the rasterised dialogue and menu textures.
    pub dialogue_texture_width: u32,
    pub dialogue_padding: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            head_locked_distance: 1.5,
            head_locked_width: 1.6,
            panel_distance: 1.2,
            panel_width: 1.2,
            layer_distance: 1.5,
            layer_width: 1.6,
            layer_resolution: (1280, 720),
            dialogue_distance: 1.2,
            dialogue_width: 0.9,
            dialogue_drop: 0.35,
            dialogue_texture_width: 1024,
            dialogue_padding: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Float triggers and grips count as pressed above this value.
    pub press_threshold: f32,
    /// Right stick Y above this value reads as jump.
    pub jump_threshold: f32,
    /// Stick deflection that steps the menu selection.
    pub menu_step_threshold: f32,
    /// Stick must return within this deflection before the next step.
    pub menu_rearm_threshold: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            press_threshold: 0.5,
            jump_threshold: 0.7,
            menu_step_threshold: 0.6,
            menu_rearm_threshold: 0.25,
        }
    }
}

/// Diagnostic switches read from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Clear each acquired eye image to a distinct color.
    pub clear_per_eye: bool,
    /// Log viewport/scissor after each swapchain framebuffer bind.
    pub log_gl_state: bool,
    /// Log overlay capture sizes.
    pub log_overlay: bool,
}

impl DebugFlags {
    pub fn from_env() -> Self {
        Self {
            clear_per_eye: env_bool(DEBUG_CLEAR_ENV, false),
            log_gl_state: env_bool(DEBUG_GLSTATE_ENV, false),
            log_overlay: env_bool(DEBUG_OVERLAY_ENV, false),
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
