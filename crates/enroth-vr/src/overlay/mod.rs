//! Re-presenting the host's 2D screen inside the headset.
//!
//! Two independent paths exist. The capture path blits the screen into a
//! texture and draws it as a quad inside each eye's projection (head-locked,
//! or latched in the world for the interactive panel). The layer path blits
//! into a runtime swapchain submitted as a native compositor quad layer.
//! Dialogue text and menus are rasterised into their own textures and drawn
//! as extra head-locked quads.

pub mod capture;
pub mod dialogue;
pub mod layer;
pub mod panel;
pub mod pointer;

use glam::{Mat4, Vec3};

use crate::diag::{Diagnostic, OneShotLog};
use crate::graphics::{GraphicsApi, MeshId, ProgramId, RasterGuard, RasterState, TextureId};
use crate::math::{yaw_only, Quad};
use crate::types::Pose;

pub use capture::ScreenCapture;
pub use dialogue::{DialogueOverlay, MenuNavigator};
pub use layer::{LayerSpaces, QuadLayer};
pub use panel::WorldPanel;
pub use pointer::{MenuPointer, PointerState};

pub const QUAD_VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec2 a_uv;
uniform mat4 u_mvp;
out vec2 v_uv;
void main() {
    v_uv = a_uv;
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

pub const QUAD_FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 v_uv;
uniform sampler2D u_texture;
uniform float u_opacity;
out vec4 frag_color;
void main() {
    vec4 color = texture(u_texture, v_uv);
    frag_color = vec4(color.rgb, color.a * u_opacity);
}
"#;

/// Holds a pose captured once per enable cycle.
///
/// Disabling drops the pose; the next enabled request captures a fresh one
/// and keeps returning it until the latch is disabled again.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorLatch {
    enabled: bool,
    pose: Option<Pose>,
}

impl AnchorLatch {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.pose = None;
        }
    }

    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Returns the latched pose, capturing it first if needed. A failed
    /// capture leaves the latch empty so the next frame retries.
    pub fn get_or_capture(&mut self, capture: impl FnOnce() -> Option<Pose>) -> Option<Pose> {
        if !self.enabled {
            return None;
        }
        if self.pose.is_none() {
            self.pose = capture();
        }
        self.pose
    }
}

/// Pose `distance` meters in front of `head`, level with it and facing back at it.
pub fn level_pose_ahead(head: &Pose, distance: f32) -> Pose {
    let orientation = yaw_only(head.orientation);
    Pose::new(
        head.position + orientation * Vec3::new(0.0, 0.0, -distance),
        orientation,
    )
}

/// Pose `distance` meters along the head's gaze, sharing its orientation.
pub fn head_locked_pose(head: &Pose, distance: f32, drop: f32) -> Pose {
    Pose::new(
        head.position + head.orientation * Vec3::new(0.0, -drop, -distance),
        head.orientation,
    )
}

/// Shader and mesh shared by every overlay quad drawn inside the eye passes.
#[derive(Debug, Default)]
pub struct QuadRenderer {
    program: Option<ProgramId>,
    mesh: Option<MeshId>,
}

impl QuadRenderer {
    /// Creates the program and mesh on first use. A compile failure is
    /// logged and retried on the next draw.
    pub fn ensure<G: GraphicsApi + ?Sized>(
        &mut self,
        gfx: &mut G,
        diagnostics: &mut OneShotLog,
    ) -> Option<(ProgramId, MeshId)> {
        if self.program.is_none() {
            match gfx.compile_program(QUAD_VERTEX_SHADER, QUAD_FRAGMENT_SHADER) {
                Ok(program) => self.program = Some(program),
                Err(err) => {
                    if diagnostics.first(Diagnostic::QuadShaderFailure) {
                        log::error!("overlay quad shader unavailable: {err}");
                    }
                    return None;
                }
            }
        }
        if self.mesh.is_none() {
            self.mesh = gfx.create_quad_mesh();
        }
        Some((self.program?, self.mesh?))
    }

    /// Draws `texture` on `quad` with depth testing off and blending on; the
    /// host's rasterizer state is restored afterwards.
    pub fn draw<G: GraphicsApi + ?Sized>(
        &mut self,
        gfx: &mut G,
        diagnostics: &mut OneShotLog,
        texture: TextureId,
        quad: &Quad,
        view_projection: &Mat4,
        opacity: f32,
    ) {
        let Some((program, mesh)) = self.ensure(gfx, diagnostics) else {
            return;
        };
        let mvp = *view_projection * quad.model_matrix();
        let mut guard = RasterGuard::new(
            gfx,
            RasterState {
                depth_test: false,
                blend: true,
                cull_face: false,
            },
        );
        guard
            .gfx()
            .draw_textured_quad(program, mesh, texture, &mvp, opacity);
    }

    pub fn destroy<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(program) = self.program.take() {
            gfx.delete_program(program);
        }
        if let Some(mesh) = self.mesh.take() {
            gfx.delete_mesh(mesh);
        }
    }
}
