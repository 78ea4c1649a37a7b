//! [`GraphicsApi`] over `glow`, for the host's current OpenGL 3.3+ context.

use std::collections::HashMap;
use std::ffi::c_void;
use std::num::NonZeroU32;

use enroth_vr::graphics::{
    FramebufferId, FramebufferStatus, FramebufferTarget, GraphicsApi, GraphicsError, MeshId,
    ProgramId, RasterState, Rect, RenderbufferId, ScissorState, TextureId,
};
use glam::Mat4;
use glow::HasContext;

/// Unit quad as a triangle strip: position xyz, then uv.
const QUAD_VERTICES: [f32; 20] = [
    -0.5, -0.5, 0.0, 0.0, 0.0, //
    0.5, -0.5, 0.0, 1.0, 0.0, //
    -0.5, 0.5, 0.0, 0.0, 1.0, //
    0.5, 0.5, 0.0, 1.0, 1.0, //
];
const VERTEX_STRIDE: i32 = 5 * 4;

struct QuadMesh {
    vao: glow::NativeVertexArray,
    vbo: glow::NativeBuffer,
}

pub struct GlowGraphics {
    gl: glow::Context,
    meshes: HashMap<MeshId, QuadMesh>,
}

impl GlowGraphics {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            meshes: HashMap::new(),
        }
    }

    /// # Safety
    ///
    /// The context the loader resolves symbols for must be current on this
    /// thread for every later call.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        Self::new(glow::Context::from_loader_function(loader))
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn set_capability(&self, capability: u32, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability);
            } else {
                self.gl.disable(capability);
            }
        }
    }

    fn rect_parameter(&self, parameter: u32) -> Rect {
        let mut values = [0i32; 4];
        unsafe { self.gl.get_parameter_i32_slice(parameter, &mut values) };
        Rect {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
        }
    }

    fn compile_shader(&self, kind: u32, source: &str) -> Result<glow::NativeShader, GraphicsError> {
        unsafe {
            let shader = self
                .gl
                .create_shader(kind)
                .map_err(GraphicsError::Compile)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let info = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(GraphicsError::Compile(info));
            }
            Ok(shader)
        }
    }
}

fn texture(id: TextureId) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id.0).map(glow::NativeTexture)
}

fn framebuffer(id: FramebufferId) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(id.0).map(glow::NativeFramebuffer)
}

fn renderbuffer(id: RenderbufferId) -> Option<glow::NativeRenderbuffer> {
    NonZeroU32::new(id.0).map(glow::NativeRenderbuffer)
}

fn program(id: ProgramId) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id.0).map(glow::NativeProgram)
}

fn framebuffer_target(target: FramebufferTarget) -> u32 {
    match target {
        FramebufferTarget::Read => glow::READ_FRAMEBUFFER,
        FramebufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
        FramebufferTarget::Both => glow::FRAMEBUFFER,
    }
}

fn vertex_bytes(vertices: &[f32]) -> Vec<u8> {
    vertices.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

impl GraphicsApi for GlowGraphics {
    fn create_framebuffer(&mut self) -> Option<FramebufferId> {
        unsafe { self.gl.create_framebuffer() }
            .ok()
            .map(|fb| FramebufferId(fb.0.get()))
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        if let Some(fb) = framebuffer(id) {
            unsafe { self.gl.delete_framebuffer(fb) };
        }
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32) -> Option<RenderbufferId> {
        unsafe {
            let rb = self.gl.create_renderbuffer().ok()?;
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
            self.gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT24,
                width as i32,
                height as i32,
            );
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            Some(RenderbufferId(rb.0.get()))
        }
    }

    fn delete_renderbuffer(&mut self, id: RenderbufferId) {
        if let Some(rb) = renderbuffer(id) {
            unsafe { self.gl.delete_renderbuffer(rb) };
        }
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Option<TextureId> {
        unsafe {
            let tex = self.gl.create_texture().ok()?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );
            for (param, value) in [
                (glow::TEXTURE_MIN_FILTER, glow::LINEAR),
                (glow::TEXTURE_MAG_FILTER, glow::LINEAR),
                (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            ] {
                self.gl
                    .tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
            }
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Some(TextureId(tex.0.get()))
        }
    }

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) {
        let Some(tex) = texture(id) else {
            return;
        };
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    fn delete_texture(&mut self, id: TextureId) {
        if let Some(tex) = texture(id) {
            unsafe { self.gl.delete_texture(tex) };
        }
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, id: Option<FramebufferId>) {
        unsafe {
            self.gl
                .bind_framebuffer(framebuffer_target(target), id.and_then(framebuffer))
        };
    }

    fn bound_framebuffer(&self) -> Option<FramebufferId> {
        let name = unsafe { self.gl.get_parameter_i32(glow::DRAW_FRAMEBUFFER_BINDING) };
        (name > 0).then_some(FramebufferId(name as u32))
    }

    fn attach_color_texture(&mut self, id: TextureId) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::DRAW_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                texture(id),
                0,
            );
        }
    }

    fn attach_depth_buffer(&mut self, id: RenderbufferId) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::DRAW_FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                renderbuffer(id),
            );
        }
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        let status = unsafe { self.gl.check_framebuffer_status(glow::DRAW_FRAMEBUFFER) };
        if status == glow::FRAMEBUFFER_COMPLETE {
            FramebufferStatus::Complete
        } else {
            FramebufferStatus::Incomplete(status)
        }
    }

    fn select_color_attachment(&mut self) {
        unsafe {
            self.gl.draw_buffer(glow::COLOR_ATTACHMENT0);
            self.gl.color_mask(true, true, true, true);
        }
    }

    fn viewport(&self) -> Rect {
        self.rect_parameter(glow::VIEWPORT)
    }

    fn set_viewport(&mut self, rect: Rect) {
        unsafe { self.gl.viewport(rect.x, rect.y, rect.width, rect.height) };
    }

    fn scissor(&self) -> ScissorState {
        ScissorState {
            enabled: unsafe { self.gl.is_enabled(glow::SCISSOR_TEST) },
            rect: self.rect_parameter(glow::SCISSOR_BOX),
        }
    }

    fn set_scissor(&mut self, state: ScissorState) {
        let rect = state.rect;
        unsafe { self.gl.scissor(rect.x, rect.y, rect.width, rect.height) };
        self.set_capability(glow::SCISSOR_TEST, state.enabled);
    }

    fn raster_state(&self) -> RasterState {
        unsafe {
            RasterState {
                depth_test: self.gl.is_enabled(glow::DEPTH_TEST),
                blend: self.gl.is_enabled(glow::BLEND),
                cull_face: self.gl.is_enabled(glow::CULL_FACE),
            }
        }
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.set_capability(glow::DEPTH_TEST, state.depth_test);
        self.set_capability(glow::BLEND, state.blend);
        self.set_capability(glow::CULL_FACE, state.cull_face);
        if state.blend {
            unsafe {
                self.gl
                    .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA)
            };
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn blit(&mut self, src: Rect, dst: Rect) {
        unsafe {
            self.gl.blit_framebuffer(
                src.x,
                src.y,
                src.x + src.width,
                src.y + src.height,
                dst.x,
                dst.y,
                dst.x + dst.width,
                dst.y + dst.height,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
        }
    }

    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<ProgramId, GraphicsError> {
        let vertex = self.compile_shader(glow::VERTEX_SHADER, vertex_src)?;
        let fragment = match self.compile_shader(glow::FRAGMENT_SHADER, fragment_src) {
            Ok(shader) => shader,
            Err(err) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(err);
            }
        };
        unsafe {
            let cleanup = |gl: &glow::Context| {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
            };
            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    cleanup(&self.gl);
                    return Err(GraphicsError::Link(err));
                }
            };
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
            cleanup(&self.gl);
            if !self.gl.get_program_link_status(program) {
                let info = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(GraphicsError::Link(info));
            }
            Ok(ProgramId(program.0.get()))
        }
    }

    fn delete_program(&mut self, id: ProgramId) {
        if let Some(program) = program(id) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn create_quad_mesh(&mut self) -> Option<MeshId> {
        unsafe {
            let vao = self.gl.create_vertex_array().ok()?;
            let vbo = match self.gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(_) => {
                    self.gl.delete_vertex_array(vao);
                    return None;
                }
            };
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                &vertex_bytes(&QUAD_VERTICES),
                glow::STATIC_DRAW,
            );
            self.gl.enable_vertex_attrib_array(0);
            self.gl
                .vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, VERTEX_STRIDE, 0);
            self.gl.enable_vertex_attrib_array(1);
            self.gl
                .vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, VERTEX_STRIDE, 3 * 4);
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let id = MeshId(vao.0.get());
            self.meshes.insert(id, QuadMesh { vao, vbo });
            Some(id)
        }
    }

    fn delete_mesh(&mut self, id: MeshId) {
        if let Some(mesh) = self.meshes.remove(&id) {
            unsafe {
                self.gl.delete_vertex_array(mesh.vao);
                self.gl.delete_buffer(mesh.vbo);
            }
        }
    }

    fn draw_textured_quad(
        &mut self,
        program_id: ProgramId,
        mesh_id: MeshId,
        texture_id: TextureId,
        mvp: &Mat4,
        opacity: f32,
    ) {
        let (Some(program), Some(mesh), Some(tex)) = (
            program(program_id),
            self.meshes.get(&mesh_id),
            texture(texture_id),
        ) else {
            return;
        };
        unsafe {
            self.gl.use_program(Some(program));
            let mvp_loc = self.gl.get_uniform_location(program, "u_mvp");
            self.gl
                .uniform_matrix_4_f32_slice(mvp_loc.as_ref(), false, &mvp.to_cols_array());
            let opacity_loc = self.gl.get_uniform_location(program, "u_opacity");
            self.gl.uniform_1_f32(opacity_loc.as_ref(), opacity);
            let texture_loc = self.gl.get_uniform_location(program, "u_texture");
            self.gl.uniform_1_i32(texture_loc.as_ref(), 0);

            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(tex));
            self.gl.bind_vertex_array(Some(mesh.vao));
            self.gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            self.gl.bind_vertex_array(None);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            self.gl.use_program(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_names_are_not_objects() {
        assert!(texture(TextureId(0)).is_none());
        assert!(framebuffer(FramebufferId(0)).is_none());
        assert_eq!(
            texture(TextureId(42)).map(|t| t.0.get()),
            Some(42)
        );
    }

    #[test]
    fn quad_spans_unit_square_with_matching_uvs() {
        for vertex in QUAD_VERTICES.chunks_exact(5) {
            assert_eq!(vertex[0] + 0.5, vertex[3]);
            assert_eq!(vertex[1] + 0.5, vertex[4]);
            assert_eq!(vertex[2], 0.0);
        }
        assert_eq!(vertex_bytes(&QUAD_VERTICES).len(), 80);
    }
}
