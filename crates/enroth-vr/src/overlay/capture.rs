//! Off-screen copy of the host's 2D screen, drawn back as a head-locked quad.

use glam::{Mat4, Vec2};

use crate::config::{DebugFlags, OverlayConfig};
use crate::diag::{Diagnostic, OneShotLog};
use crate::graphics::{
    FramebufferId, FramebufferStatus, FramebufferTarget, GraphicsApi, Rect, TextureId,
};
use crate::math::Quad;
use crate::overlay::{head_locked_pose, QuadRenderer};
use crate::types::Pose;

#[derive(Debug, Default)]
pub struct ScreenCapture {
    framebuffer: Option<FramebufferId>,
    texture: Option<TextureId>,
    width: u32,
    height: u32,
    has_frame: bool,
    /// Binding and viewport saved by `begin_render`.
    saved: Option<(Option<FramebufferId>, Rect)>,
}

impl ScreenCapture {
    pub fn is_ready(&self) -> bool {
        self.framebuffer.is_some() && self.texture.is_some()
    }

    pub fn has_frame(&self) -> bool {
        self.has_frame
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Physical size of the quad for a given width, keeping the capture's aspect ratio.
    pub fn quad_size(&self, width: f32) -> Vec2 {
        if self.width == 0 {
            return Vec2::new(width, width * 9.0 / 16.0);
        }
        Vec2::new(width, width * self.height as f32 / self.width as f32)
    }

    /// Allocates the capture target, recreating it when the size changes.
    pub fn ensure<G: GraphicsApi + ?Sized>(
        &mut self,
        gfx: &mut G,
        width: u32,
        height: u32,
    ) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.is_ready() && self.width == width && self.height == height {
            return true;
        }
        self.destroy(gfx);

        let Some(texture) = gfx.create_texture(width, height) else {
            log::error!("overlay texture {width}x{height} could not be created");
            return false;
        };
        let Some(framebuffer) = gfx.create_framebuffer() else {
            gfx.delete_texture(texture);
            log::error!("overlay framebuffer could not be created");
            return false;
        };

        let previous = gfx.bound_framebuffer();
        gfx.bind_framebuffer(FramebufferTarget::Both, Some(framebuffer));
        gfx.attach_color_texture(texture);
        let status = gfx.framebuffer_status();
        gfx.bind_framebuffer(FramebufferTarget::Both, previous);

        if let FramebufferStatus::Incomplete(code) = status {
            log::error!("overlay framebuffer incomplete ({code:#x})");
            gfx.delete_framebuffer(framebuffer);
            gfx.delete_texture(texture);
            return false;
        }

        self.texture = Some(texture);
        self.framebuffer = Some(framebuffer);
        self.width = width;
        self.height = height;
        log::info!("overlay capture target {width}x{height}");
        true
    }

    /// Redirects host 2D drawing into the capture target.
    pub fn begin_render<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) -> bool {
        let Some(framebuffer) = self.framebuffer else {
            return false;
        };
        if self.saved.is_none() {
            self.saved = Some((gfx.bound_framebuffer(), gfx.viewport()));
        }
        gfx.bind_framebuffer(FramebufferTarget::Both, Some(framebuffer));
        gfx.set_viewport(Rect::sized(self.width, self.height));
        true
    }

    pub fn end_render<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        if let Some((framebuffer, viewport)) = self.saved.take() {
            gfx.bind_framebuffer(FramebufferTarget::Both, framebuffer);
            gfx.set_viewport(viewport);
            self.has_frame = true;
        }
    }

    /// Blits the default framebuffer (`src_width` x `src_height`) into the
    /// capture texture, scaling to the target size.
    pub fn capture<G: GraphicsApi + ?Sized>(
        &mut self,
        gfx: &mut G,
        src_width: u32,
        src_height: u32,
        debug: DebugFlags,
        diagnostics: &mut OneShotLog,
    ) -> bool {
        let Some(framebuffer) = self.framebuffer else {
            return false;
        };
        if src_width == 0 || src_height == 0 {
            return false;
        }

        let previous = gfx.bound_framebuffer();
        gfx.bind_framebuffer(FramebufferTarget::Read, None);
        gfx.bind_framebuffer(FramebufferTarget::Draw, Some(framebuffer));
        gfx.blit(
            Rect::sized(src_width, src_height),
            Rect::sized(self.width, self.height),
        );
        gfx.bind_framebuffer(FramebufferTarget::Both, previous);
        self.has_frame = true;

        if debug.log_overlay || diagnostics.first(Diagnostic::OverlayCapture) {
            log::info!(
                "overlay capture {src_width}x{src_height} -> {}x{}",
                self.width,
                self.height
            );
        }
        true
    }

    /// Quad the capture is drawn on this frame, in front of the head.
    pub fn head_locked_quad(&self, head: &Pose, config: &OverlayConfig) -> Quad {
        let pose = head_locked_pose(head, config.head_locked_distance, 0.0);
        Quad::from_pose(&pose, self.quad_size(config.head_locked_width))
    }

    /// Draws the last capture into the currently bound eye target.
    pub fn render<G: GraphicsApi + ?Sized>(
        &self,
        gfx: &mut G,
        renderer: &mut QuadRenderer,
        diagnostics: &mut OneShotLog,
        quad: &Quad,
        view_projection: &Mat4,
    ) {
        let Some(texture) = self.texture.filter(|_| self.has_frame) else {
            return;
        };
        renderer.draw(gfx, diagnostics, texture, quad, view_projection, 1.0);
    }

    pub fn destroy<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(framebuffer) = self.framebuffer.take() {
            gfx.delete_framebuffer(framebuffer);
        }
        if let Some(texture) = self.texture.take() {
            gfx.delete_texture(texture);
        }
        self.has_frame = false;
        self.saved = None;
    }
}
