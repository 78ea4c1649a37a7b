//! Native compositor quad layer carrying the host's 2D screen.

use glam::{Quat, Vec2, Vec3};

use crate::config::{DebugFlags, OverlayConfig};
use crate::diag::{Diagnostic, OneShotLog};
use crate::graphics::{
    FramebufferId, FramebufferStatus, FramebufferTarget, GraphicsApi, Rect, TextureId,
};
use crate::math::{average_position, yaw_only, Quad};
use crate::overlay::AnchorLatch;
use crate::runtime::{checked, log_failure, XrRuntime};
use crate::types::{
    CompositionLayer, Pose, QuadPlacement, SpaceId, SubImage, SwapchainDesc, SwapchainId,
    XrDuration,
};
use crate::views::{choose_color_format, GL_RGBA8};

/// Spaces a quad layer may be submitted in, best first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerSpaces {
    pub local: Option<SpaceId>,
    pub view: Option<SpaceId>,
}

#[derive(Debug)]
pub struct QuadLayer {
    swapchain: Option<SwapchainId>,
    images: Vec<TextureId>,
    framebuffer: Option<FramebufferId>,
    width: u32,
    height: u32,
    has_frame: bool,
    anchor: AnchorLatch,
    distance: f32,
    quad_width: f32,
}

impl QuadLayer {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            swapchain: None,
            images: Vec::new(),
            framebuffer: None,
            width: 0,
            height: 0,
            has_frame: false,
            anchor: AnchorLatch::default(),
            distance: config.layer_distance,
            quad_width: config.layer_width,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.anchor.is_enabled()
    }

    pub fn has_frame(&self) -> bool {
        self.has_frame
    }

    pub fn anchor(&self) -> Option<Pose> {
        self.anchor.pose()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Physical size in meters, keeping the swapchain's aspect ratio.
    pub fn quad_size(&self) -> Vec2 {
        if self.width == 0 {
            return Vec2::new(self.quad_width, self.quad_width * 9.0 / 16.0);
        }
        Vec2::new(
            self.quad_width,
            self.quad_width * self.height as f32 / self.width as f32,
        )
    }

    /// World quad the layer currently occupies, once anchored.
    pub fn world_quad(&self) -> Option<Quad> {
        if !self.is_enabled() {
            return None;
        }
        Some(Quad::from_pose(&self.anchor.pose()?, self.quad_size()))
    }

    /// Toggling re-anchors the layer on the next submitted frame. A disabled
    /// layer drops its captured content.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.anchor.set_enabled(enabled);
        if !enabled {
            self.has_frame = false;
        }
    }

    /// Creates the layer swapchain. Idempotent for the same size.
    pub fn ensure<R: XrRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        width: u32,
        height: u32,
    ) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.swapchain.is_some() && self.width == width && self.height == height {
            return true;
        }
        if let Some(swapchain) = self.swapchain.take() {
            runtime.destroy_swapchain(swapchain);
            self.images.clear();
            self.has_frame = false;
        }

        let result = runtime.swapchain_formats();
        let formats = checked(&*runtime, result).unwrap_or_default();
        let desc = SwapchainDesc {
            format: choose_color_format(&formats).unwrap_or(GL_RGBA8),
            width,
            height,
            sample_count: 1,
        };
        let result = runtime.create_swapchain(&desc);
        let Some(swapchain) = checked(&*runtime, result) else {
            return false;
        };
        self.swapchain = Some(swapchain);
        let result = runtime.swapchain_images(swapchain);
        self.images = checked(&*runtime, result).unwrap_or_default();
        self.width = width;
        self.height = height;
        log::info!(
            "overlay layer swapchain {width}x{height} with {} images",
            self.images.len()
        );
        !self.images.is_empty()
    }

    /// Copies the default framebuffer into the layer's next image.
    pub fn capture<R, G>(
        &mut self,
        runtime: &mut R,
        gfx: &mut G,
        src_width: u32,
        src_height: u32,
        debug: DebugFlags,
        diagnostics: &mut OneShotLog,
    ) -> bool
    where
        R: XrRuntime + ?Sized,
        G: GraphicsApi + ?Sized,
    {
        let Some(swapchain) = self.swapchain else {
            return false;
        };
        if !self.is_enabled() || src_width == 0 || src_height == 0 {
            return false;
        }

        let result = runtime.acquire_image(swapchain);
        let Some(image) = checked(&*runtime, result) else {
            return false;
        };
        if let Err(err) = runtime.wait_image(swapchain, XrDuration::INFINITE) {
            log_failure(&*runtime, &err);
            return false;
        }
        let captured = self.blit_into(gfx, image, src_width, src_height);
        if let Err(err) = runtime.release_image(swapchain) {
            log_failure(&*runtime, &err);
            return false;
        }

        if captured {
            self.has_frame = true;
            if debug.log_overlay || diagnostics.first(Diagnostic::OverlayLayerCapture) {
                log::info!(
                    "overlay layer capture {src_width}x{src_height} -> {}x{}",
                    self.width,
                    self.height
                );
            }
        }
        captured
    }

    fn blit_into<G: GraphicsApi + ?Sized>(
        &mut self,
        gfx: &mut G,
        image: u32,
        src_width: u32,
        src_height: u32,
    ) -> bool {
        let Some(&texture) = self.images.get(image as usize) else {
            log::error!("overlay layer image {image} out of range");
            return false;
        };
        if self.framebuffer.is_none() {
            self.framebuffer = gfx.create_framebuffer();
        }
        let Some(framebuffer) = self.framebuffer else {
            log::error!("overlay layer framebuffer could not be created");
            return false;
        };

        let previous = gfx.bound_framebuffer();
        gfx.bind_framebuffer(FramebufferTarget::Draw, Some(framebuffer));
        gfx.attach_color_texture(texture);
        let ok = match gfx.framebuffer_status() {
            FramebufferStatus::Complete => {
                gfx.bind_framebuffer(FramebufferTarget::Read, None);
                gfx.blit(
                    Rect::sized(src_width, src_height),
                    Rect::sized(self.width, self.height),
                );
                true
            }
            FramebufferStatus::Incomplete(code) => {
                log::error!("overlay layer framebuffer incomplete ({code:#x})");
                false
            }
        };
        gfx.bind_framebuffer(FramebufferTarget::Both, previous);
        ok
    }

    /// Layer to submit this frame, or `None` when disabled or nothing has
    /// been captured yet. `eyes` are this frame's located eye poses.
    pub fn composition_layer(
        &mut self,
        spaces: LayerSpaces,
        eyes: &[Pose],
        diagnostics: &mut OneShotLog,
    ) -> Option<CompositionLayer> {
        let swapchain = self.swapchain?;
        if !self.is_enabled() || !self.has_frame {
            return None;
        }

        let distance = self.distance;
        let world = match spaces.local {
            Some(local) => self
                .anchor
                .get_or_capture(|| anchor_from_eyes(eyes, distance))
                .map(|anchor| (local, QuadPlacement::WorldAnchored, anchor)),
            None => None,
        };
        let (space, placement, pose) = world
            .or_else(|| {
                spaces.view.map(|view| {
                    let ahead = Pose::new(Vec3::new(0.0, 0.0, -distance), Quat::IDENTITY);
                    (view, QuadPlacement::HeadLocked, ahead)
                })
            })
            .or_else(|| {
                spaces
                    .local
                    .map(|local| (local, QuadPlacement::WorldIdentity, Pose::IDENTITY))
            })?;

        if diagnostics.first(Diagnostic::OverlayLayerPlacement) {
            log::info!("overlay layer placement {placement:?}");
        }
        if diagnostics.first(Diagnostic::OverlayLayerSubmit) {
            log::info!(
                "first overlay layer submit {}x{} at {:?}",
                self.width,
                self.height,
                pose.position
            );
        }

        Some(CompositionLayer::Quad {
            space,
            placement,
            sub_image: SubImage {
                swapchain,
                width: self.width,
                height: self.height,
            },
            pose,
            size: self.quad_size(),
        })
    }

    pub fn destroy_swapchain<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        if let Some(swapchain) = self.swapchain.take() {
            runtime.destroy_swapchain(swapchain);
        }
        self.images.clear();
        self.has_frame = false;
    }

    pub fn destroy_framebuffer<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        if let Some(framebuffer) = self.framebuffer.take() {
            gfx.delete_framebuffer(framebuffer);
        }
    }
}

/// Midpoint between the eyes pushed `distance` meters forward, level with the horizon.
fn anchor_from_eyes(eyes: &[Pose], distance: f32) -> Option<Pose> {
    let center = average_position(eyes)?;
    let orientation = yaw_only(eyes.first()?.orientation);
    Some(Pose::new(
        center + orientation * Vec3::new(0.0, 0.0, -distance),
        orientation,
    ))
}
