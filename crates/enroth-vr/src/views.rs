//! Per-eye swapchains, render targets and matrices.

use glam::Mat4;

use crate::config::DebugFlags;
use crate::diag::{Diagnostic, OneShotLog};
use crate::graphics::{
    FramebufferId, FramebufferStatus, FramebufferTarget, GraphicsApi, Rect, RenderbufferId,
    ScissorState, TextureId,
};
use crate::math::{projection_from_tangents, view_from_pose};
use crate::runtime::{checked, log_failure, XrRuntime};
use crate::types::{
    FovTangents, Pose, ProjectionView, SubImage, SwapchainDesc, SwapchainId, ViewLocation,
    XrDuration,
};
use crate::VrResult;

pub const GL_RGBA8: u32 = 0x8058;
pub const GL_SRGB8_ALPHA8: u32 = 0x8C43;

/// Linear RGBA8 first: the host writes already-encoded colors.
pub const PREFERRED_COLOR_FORMATS: [u32; 2] = [GL_RGBA8, GL_SRGB8_ALPHA8];

/// Debug clear colors, one per eye.
const EYE_CLEAR_COLORS: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
];

/// Picks the swapchain color format, falling back to whatever the runtime lists first.
pub fn choose_color_format(available: &[u32]) -> Option<u32> {
    PREFERRED_COLOR_FORMATS
        .iter()
        .copied()
        .find(|f| available.contains(f))
        .or_else(|| available.first().copied())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

#[derive(Debug)]
pub struct View {
    pub index: usize,
    pub location: ViewLocation,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub width: u32,
    pub height: u32,
    pub swapchain: SwapchainId,
    images: Vec<TextureId>,
    current_image: Option<u32>,
    framebuffer: Option<FramebufferId>,
    depth_buffer: Option<RenderbufferId>,
}

impl View {
    fn new(index: usize, swapchain: SwapchainId, width: u32, height: u32) -> Self {
        Self {
            index,
            location: ViewLocation::default(),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            width,
            height,
            swapchain,
            images: Vec::new(),
            current_image: None,
            framebuffer: None,
            depth_buffer: None,
        }
    }

    pub fn tangents(&self) -> FovTangents {
        self.location.fov.tangents()
    }

    pub fn pose(&self) -> Pose {
        self.location.pose
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn depth_buffer(&self) -> Option<RenderbufferId> {
        self.depth_buffer
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn current_image(&self) -> Option<u32> {
        self.current_image
    }

    fn sub_image(&self) -> SubImage {
        SubImage {
            swapchain: self.swapchain,
            width: self.width,
            height: self.height,
        }
    }

    fn ensure_framebuffer<G>(&mut self, gfx: &mut G) -> Option<FramebufferId>
    where
        G: GraphicsApi + ?Sized,
    {
        if self.framebuffer.is_none() {
            self.framebuffer = gfx.create_framebuffer();
            if self.framebuffer.is_none() {
                log::error!("failed to create framebuffer for view {}", self.index);
            }
        }
        self.framebuffer
    }

    fn ensure_depth_buffer<G>(&mut self, gfx: &mut G) -> Option<RenderbufferId>
    where
        G: GraphicsApi + ?Sized,
    {
        if self.depth_buffer.is_none() {
            self.depth_buffer = gfx.create_depth_buffer(self.width, self.height);
            if self.depth_buffer.is_none() {
                log::warn!("failed to create depth buffer for view {}", self.index);
            }
        }
        self.depth_buffer
    }
}

#[derive(Debug, Default)]
pub struct ViewManager {
    views: Vec<View>,
}

impl ViewManager {
    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, index: usize) -> Option<&View> {
        self.views.get(index)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn poses(&self) -> Vec<Pose> {
        self.views.iter().map(View::pose).collect()
    }

    /// One swapchain per view at the recommended size. Idempotent; a partial
    /// failure leaves the swapchains created so far for shutdown.
    pub fn create_swapchains<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) -> VrResult<()> {
        if !self.views.is_empty() {
            return Ok(());
        }

        let configs = runtime.view_configuration()?;
        let result = runtime.swapchain_formats();
        let formats = checked(&*runtime, result).unwrap_or_default();
        let format = choose_color_format(&formats).unwrap_or(GL_RGBA8);
        log::info!(
            "OpenXR swapchain format {format:#x} ({} formats available), {} views",
            formats.len(),
            configs.len()
        );

        for (index, config) in configs.iter().enumerate() {
            let desc = SwapchainDesc {
                format,
                width: config.recommended_width,
                height: config.recommended_height,
                sample_count: 1,
            };
            let swapchain = runtime.create_swapchain(&desc)?;
            self.views
                .push(View::new(index, swapchain, desc.width, desc.height));
            let images = runtime.swapchain_images(swapchain)?;
            log::info!(
                "view {index}: {}x{} swapchain with {} images",
                desc.width,
                desc.height,
                images.len()
            );
            self.views[index].images = images;
        }
        Ok(())
    }

    /// Refreshes poses, FOVs and both matrices from this frame's located views.
    pub fn update_located(&mut self, locations: &[ViewLocation], clip: ClipPlanes) {
        for (view, location) in self.views.iter_mut().zip(locations) {
            view.location = *location;
            view.view_matrix = view_from_pose(&location.pose);
            view.projection_matrix =
                projection_from_tangents(location.fov.tangents(), clip.near, clip.far);
        }
    }

    pub fn projection_views(&self) -> Vec<ProjectionView> {
        self.views
            .iter()
            .map(|view| ProjectionView {
                pose: view.location.pose,
                fov: view.location.fov,
                sub_image: view.sub_image(),
            })
            .collect()
    }

    /// Acquires and binds the eye's next swapchain image with its depth
    /// buffer; the host renders into the returned framebuffer.
    pub fn acquire<R, G>(
        &mut self,
        runtime: &mut R,
        gfx: &mut G,
        index: usize,
        debug: DebugFlags,
        diagnostics: &mut OneShotLog,
    ) -> Option<FramebufferId>
    where
        R: XrRuntime + ?Sized,
        G: GraphicsApi + ?Sized,
    {
        let view = self.views.get_mut(index)?;

        let result = runtime.acquire_image(view.swapchain);
        let image = checked(&*runtime, result)?;
        // An image whose wait failed may not be released.
        if let Err(err) = runtime.wait_image(view.swapchain, XrDuration::INFINITE) {
            log_failure(&*runtime, &err);
            return None;
        }

        let Some(&texture) = view.images.get(image as usize) else {
            log::error!(
                "view {index}: runtime returned image {image} of {}",
                view.images.len()
            );
            release_image(runtime, view.swapchain);
            return None;
        };
        let Some(framebuffer) = view.ensure_framebuffer(gfx) else {
            release_image(runtime, view.swapchain);
            return None;
        };
        view.current_image = Some(image);

        gfx.bind_framebuffer(FramebufferTarget::Both, Some(framebuffer));
        gfx.attach_color_texture(texture);
        if let Some(depth) = view.ensure_depth_buffer(gfx) {
            gfx.attach_depth_buffer(depth);
        }
        gfx.select_color_attachment();
        gfx.set_scissor(ScissorState {
            enabled: false,
            rect: Rect::sized(view.width, view.height),
        });
        gfx.set_viewport(Rect::sized(view.width, view.height));

        let status = gfx.framebuffer_status();
        if let FramebufferStatus::Incomplete(code) = status {
            log::error!("view {index}: framebuffer incomplete ({code:#x})");
        } else if diagnostics.first(Diagnostic::EyeFramebufferComplete) {
            log::info!(
                "view {index}: framebuffer complete at {}x{}",
                view.width,
                view.height
            );
        }

        if debug.clear_per_eye {
            gfx.clear(EYE_CLEAR_COLORS[index % EYE_CLEAR_COLORS.len()]);
        }
        Some(framebuffer)
    }

    /// Hands the eye image back to the compositor and restores the default framebuffer.
    pub fn release<R, G>(&mut self, runtime: &mut R, gfx: &mut G, index: usize)
    where
        R: XrRuntime + ?Sized,
        G: GraphicsApi + ?Sized,
    {
        if let Some(view) = self.views.get_mut(index) {
            if view.current_image.take().is_some() {
                release_image(runtime, view.swapchain);
            }
        }
        gfx.bind_framebuffer(FramebufferTarget::Both, None);
    }

    /// Rebinds an already acquired eye target, e.g. after the host switched
    /// framebuffers mid-eye.
    pub fn bind<G: GraphicsApi + ?Sized>(
        &self,
        gfx: &mut G,
        index: usize,
        debug: DebugFlags,
    ) -> Option<FramebufferId> {
        let view = self.views.get(index)?;
        let framebuffer = view.framebuffer?;
        let full = Rect::sized(view.width, view.height);
        gfx.bind_framebuffer(FramebufferTarget::Both, Some(framebuffer));
        gfx.select_color_attachment();
        gfx.set_viewport(full);
        gfx.set_scissor(ScissorState {
            enabled: false,
            rect: full,
        });
        if debug.log_gl_state {
            let viewport = gfx.viewport();
            let scissor = gfx.scissor();
            log::info!(
                "view {index}: fb {} viewport {:?} scissor {} {:?}",
                framebuffer.0,
                viewport,
                if scissor.enabled { "on" } else { "off" },
                scissor.rect
            );
        }
        Some(framebuffer)
    }

    pub fn destroy<R, G>(&mut self, runtime: &mut R, gfx: &mut G)
    where
        R: XrRuntime + ?Sized,
        G: GraphicsApi + ?Sized,
    {
        for view in self.views.drain(..) {
            if let Some(framebuffer) = view.framebuffer {
                gfx.delete_framebuffer(framebuffer);
            }
            if let Some(depth) = view.depth_buffer {
                gfx.delete_renderbuffer(depth);
            }
            runtime.destroy_swapchain(view.swapchain);
        }
    }
}

fn release_image<R: XrRuntime + ?Sized>(runtime: &mut R, swapchain: SwapchainId) {
    if let Err(err) = runtime.release_image(swapchain) {
        log_failure(&*runtime, &err);
    }
}
