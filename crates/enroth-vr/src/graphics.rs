//! Capability interface onto the graphics API.
//!
//! Covers the small slice of object lifecycle and global rasterizer state the
//! core touches. Object ids are the API's own names; `None` stands for the
//! default framebuffer or a failed allocation.

use glam::Mat4;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width as i32,
            height: height as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScissorState {
    pub enabled: bool,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterState {
    pub depth_test: bool,
    pub blend: bool,
    pub cull_face: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferTarget {
    Read,
    Draw,
    Both,
}

#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error("shader compile failed: {0}")]
    Compile(String),
    #[error("program link failed: {0}")]
    Link(String),
}

pub trait GraphicsApi {
    fn create_framebuffer(&mut self) -> Option<FramebufferId>;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    /// 24-bit depth renderbuffer.
    fn create_depth_buffer(&mut self, width: u32, height: u32) -> Option<RenderbufferId>;
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);
    /// RGBA8 texture, linear filtering, clamped to edge.
    fn create_texture(&mut self, width: u32, height: u32) -> Option<TextureId>;
    /// Replaces the whole texture with tightly packed RGBA8 rows, bottom row first.
    fn upload_texture(&mut self, texture: TextureId, width: u32, height: u32, pixels: &[u8]);
    fn delete_texture(&mut self, texture: TextureId);

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>);
    /// Current draw framebuffer binding.
    fn bound_framebuffer(&self) -> Option<FramebufferId>;
    /// Attaches to the bound draw framebuffer.
    fn attach_color_texture(&mut self, texture: TextureId);
    fn attach_depth_buffer(&mut self, renderbuffer: RenderbufferId);
    fn framebuffer_status(&self) -> FramebufferStatus;
    /// Draw buffer to color attachment 0 with all color channels writable.
    fn select_color_attachment(&mut self);

    fn viewport(&self) -> Rect;
    fn set_viewport(&mut self, rect: Rect);
    fn scissor(&self) -> ScissorState;
    fn set_scissor(&mut self, state: ScissorState);
    fn raster_state(&self) -> RasterState;
    fn set_raster_state(&mut self, state: RasterState);
    fn clear(&mut self, color: [f32; 4]);
    /// Copies color from the read framebuffer to the draw framebuffer.
    fn blit(&mut self, src: Rect, dst: Rect);

    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, GraphicsError>;
    fn delete_program(&mut self, program: ProgramId);
    /// Unit quad spanning [-0.5, 0.5] on X/Y, facing +Z, with UVs.
    fn create_quad_mesh(&mut self) -> Option<MeshId>;
    fn delete_mesh(&mut self, mesh: MeshId);
    fn draw_textured_quad(
        &mut self,
        program: ProgramId,
        mesh: MeshId,
        texture: TextureId,
        mvp: &Mat4,
        opacity: f32,
    );
}

/// Restores the rasterizer state captured at construction when dropped.
pub struct RasterGuard<'a, G: GraphicsApi + ?Sized> {
    gfx: &'a mut G,
    saved: RasterState,
}

impl<'a, G: GraphicsApi + ?Sized> RasterGuard<'a, G> {
    pub fn new(gfx: &'a mut G, state: RasterState) -> Self {
        let saved = gfx.raster_state();
        gfx.set_raster_state(state);
        Self { gfx, saved }
    }

    pub fn gfx(&mut self) -> &mut G {
        self.gfx
    }
}

impl<G: GraphicsApi + ?Sized> Drop for RasterGuard<'_, G> {
    fn drop(&mut self) {
        self.gfx.set_raster_state(self.saved);
    }
}
