//! The headset service the host engine talks to.
//!
//! One [`VrManager`] exists per process, because the runtime allows a single
//! instance and session. The host constructs it when VR is first requested,
//! keeps it next to its renderer and calls [`VrManager::shutdown`] (or drops
//! it) on exit. Every component below is owned here and receives the runtime
//! and graphics collaborators by reference; nothing reaches for globals.

use glam::{Mat4, Vec3};

use crate::config::{DebugFlags, VrConfig};
use crate::context::{ContextProvider, GraphicsContext};
use crate::diag::{Diagnostic, OneShotLog};
use crate::frame::{FrameLoop, LoopState};
use crate::graphics::{FramebufferId, GraphicsApi};
use crate::input::{InputMapper, InputState};
use crate::math::{average_position, host_view_matrix, Quad, Ray};
use crate::overlay::dialogue::MenuEvent;
use crate::overlay::{
    DialogueOverlay, LayerSpaces, MenuPointer, PointerState, QuadLayer, QuadRenderer,
    ScreenCapture, WorldPanel,
};
use crate::runtime::{log_failure, XrRuntime};
use crate::session::XrSession;
use crate::text::TextRasterizer;
use crate::types::{CompositionLayer, FovTangents, Pose, SessionState, SystemInfo};
use crate::views::{ClipPlanes, View, ViewManager};
use crate::{VrError, VrResult};

pub struct VrManager<R: XrRuntime, G: GraphicsApi> {
    runtime: R,
    gfx: G,
    config: VrConfig,
    debug: DebugFlags,
    diagnostics: OneShotLog,

    session: XrSession,
    views: ViewManager,
    frame: FrameLoop,
    input: InputMapper,

    quad_renderer: QuadRenderer,
    capture: ScreenCapture,
    head_locked_overlay: bool,
    panel: WorldPanel,
    layer: QuadLayer,
    dialogue: DialogueOverlay,
    pointer: PointerState,

    current_view: usize,
    rendering_eye: bool,
    host_clip: Option<ClipPlanes>,
}

impl<R: XrRuntime, G: GraphicsApi> VrManager<R, G> {
    /// Debug switches are read from the environment.
    pub fn new(runtime: R, gfx: G, config: VrConfig) -> Self {
        Self {
            input: InputMapper::new(config.input.clone()),
            panel: WorldPanel::new(&config.overlay),
            layer: QuadLayer::new(&config.overlay),
            dialogue: DialogueOverlay::new(&config.overlay, &config.input),
            runtime,
            gfx,
            config,
            debug: DebugFlags::from_env(),
            diagnostics: OneShotLog::default(),
            session: XrSession::default(),
            views: ViewManager::default(),
            frame: FrameLoop::default(),
            quad_renderer: QuadRenderer::default(),
            capture: ScreenCapture::default(),
            head_locked_overlay: false,
            pointer: PointerState::default(),
            current_view: 0,
            rendering_eye: false,
            host_clip: None,
        }
    }

    pub fn with_debug_flags(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }

    pub fn config(&self) -> &VrConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn graphics(&self) -> &G {
        &self.gfx
    }

    pub fn graphics_mut(&mut self) -> &mut G {
        &mut self.gfx
    }

    /// First-time messages already logged this session.
    pub fn diagnostics(&self) -> &OneShotLog {
        &self.diagnostics
    }

    fn logged<T>(&self, result: VrResult<T>) -> VrResult<T> {
        if let Err(VrError::Runtime(err)) = &result {
            log_failure(&self.runtime, err);
        }
        result
    }

    /// Capability discovery: checks for OpenGL interop and queries the
    /// headset. Idempotent.
    pub fn initialize(&mut self) -> VrResult<()> {
        let result = self.session.initialize(&mut self.runtime, &self.config);
        self.logged(result)
    }

    /// Binds the session to the host's GL context, then creates swapchains
    /// and input actions. `context` overrides discovery through `provider`.
    pub fn create_session(
        &mut self,
        context: Option<GraphicsContext>,
        provider: &dyn ContextProvider,
    ) -> VrResult<()> {
        let result = self.bootstrap_session(context, provider);
        self.logged(result)
    }

    fn bootstrap_session(
        &mut self,
        context: Option<GraphicsContext>,
        provider: &dyn ContextProvider,
    ) -> VrResult<()> {
        self.session
            .create_session(&mut self.runtime, context, provider)?;
        self.create_swapchains()?;
        self.input.setup(&mut self.runtime)
    }

    /// Negotiates the blend mode and creates one swapchain per view. Idempotent.
    pub fn create_swapchains(&mut self) -> VrResult<()> {
        if !self.session.has_session() {
            return Err(VrError::NotInitialized);
        }
        if self.views.is_empty() {
            self.session.negotiate_blend_mode(&mut self.runtime);
        }
        self.views.create_swapchains(&mut self.runtime)
    }

    /// Releases everything in dependency order: spaces, swapchains, action
    /// sets, session, instance. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.frame.is_begun() {
            self.end_frame();
        }
        let was_initialized = self.session.is_initialized() || self.session.has_session();

        self.input.destroy_spaces(&mut self.runtime);
        self.session.destroy_spaces(&mut self.runtime);

        self.views.destroy(&mut self.runtime, &mut self.gfx);
        self.layer.destroy_swapchain(&mut self.runtime);

        self.input.destroy_action_sets(&mut self.runtime);
        self.session.destroy(&mut self.runtime);

        self.layer.destroy_framebuffer(&mut self.gfx);
        self.capture.destroy(&mut self.gfx);
        self.dialogue.destroy(&mut self.gfx);
        self.quad_renderer.destroy(&mut self.gfx);
        self.frame.reset();
        self.pointer.reset();
        self.diagnostics.reset();
        self.rendering_eye = false;

        if was_initialized {
            log::info!("OpenXR shut down");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn has_session(&self) -> bool {
        self.session.has_session()
    }

    pub fn is_session_running(&self) -> bool {
        self.frame.is_running()
    }

    pub fn loop_state(&self) -> LoopState {
        self.frame.state()
    }

    pub fn session_state(&self) -> SessionState {
        self.frame.session_state()
    }

    pub fn system(&self) -> Option<&SystemInfo> {
        self.session.system()
    }

    /// Drains runtime events. Also done at the start of every `begin_frame`.
    pub fn poll_events(&mut self) {
        self.frame.poll_events(&mut self.runtime);
    }

    /// Starts a frame. Returns true when the host should render both eyes
    /// and then call [`Self::end_frame`]. On false no frame is outstanding.
    pub fn begin_frame(&mut self) -> bool {
        self.pointer.clear_click();
        self.frame.poll_events(&mut self.runtime);
        if !self.frame.is_running() {
            return false;
        }
        if !self.frame.wait_and_begin(&mut self.runtime) {
            return false;
        }

        let synced = self
            .input
            .sync(&mut self.runtime, self.frame.session_state());
        self.frame.suspend_scissor(&mut self.gfx);

        if !self.frame.should_render() {
            self.end_frame();
            return false;
        }

        let Some(space) = self.session.local_space() else {
            self.frame.skip_render();
            self.end_frame();
            return false;
        };
        let time = self.frame.display_time();
        let clip = self.clip_planes();
        match self.runtime.locate_views(time, space) {
            Ok(locations) => self.views.update_located(&locations, clip),
            Err(err) => {
                log_failure(&self.runtime, &err);
                self.frame.skip_render();
                self.end_frame();
                return false;
            }
        }

        self.update_overlay_anchors();
        self.update_pointer(synced);
        true
    }

    /// Submits the frame. No-op when no frame is outstanding.
    pub fn end_frame(&mut self) {
        if !self.frame.is_begun() {
            return;
        }
        let layers = self.assemble_layers();
        let blend_mode = self.session.blend_mode();
        self.frame
            .finish(&mut self.runtime, &mut self.gfx, blend_mode, &layers);
        self.rendering_eye = false;
    }

    pub fn should_render(&self) -> bool {
        self.frame.should_render()
    }

    fn assemble_layers(&mut self) -> Vec<CompositionLayer> {
        let mut layers = Vec::new();
        if !self.frame.should_render() {
            return layers;
        }
        if let Some(space) = self.session.local_space() {
            layers.push(CompositionLayer::Projection {
                space,
                views: self.views.projection_views(),
            });
        }
        let spaces = LayerSpaces {
            local: self.session.local_space(),
            view: self.session.view_space(),
        };
        let eyes = self.views.poses();
        if let Some(quad) = self
            .layer
            .composition_layer(spaces, &eyes, &mut self.diagnostics)
        {
            layers.push(quad);
        }
        layers
    }

    fn clip_planes(&self) -> ClipPlanes {
        self.host_clip.unwrap_or(ClipPlanes {
            near: self.config.default_near_clip,
            far: self.config.default_far_clip,
        })
    }

    /// Head pose for this frame: the eyes' midpoint with the first eye's orientation.
    pub fn head_pose(&self) -> Option<Pose> {
        let eyes = self.views.poses();
        let position = average_position(&eyes)?;
        Some(Pose::new(position, eyes[0].orientation))
    }

    fn update_overlay_anchors(&mut self) {
        let head = self.head_pose();
        self.panel.update(head);
    }

    fn update_pointer(&mut self, synced: bool) {
        if !synced {
            self.pointer.update(None, false);
            return;
        }
        let ray = self.session.local_space().and_then(|base| {
            self.input
                .aim_pose(&mut self.runtime, base, self.frame.display_time())
        });
        let pressed = self.input.select_pressed(&mut self.runtime);
        self.pointer.update(ray.as_ref().map(Ray::from_pose), pressed);
    }

    /// Acquires the eye's next image and binds its framebuffer. `None` means
    /// skip this eye.
    pub fn acquire_swapchain_texture(&mut self, view: usize) -> Option<FramebufferId> {
        if !self.frame.should_render() {
            return None;
        }
        self.views.acquire(
            &mut self.runtime,
            &mut self.gfx,
            view,
            self.debug,
            &mut self.diagnostics,
        )
    }

    pub fn release_swapchain_texture(&mut self, view: usize) {
        self.views.release(&mut self.runtime, &mut self.gfx, view);
    }

    /// Rebinds the eye target acquired for `view`.
    pub fn bind_swapchain_framebuffer(&mut self, view: usize) -> Option<FramebufferId> {
        self.views.bind(&mut self.gfx, view, self.debug)
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, index: usize) -> Option<&View> {
        self.views.view(index)
    }

    pub fn view_size(&self, index: usize) -> Option<(u32, u32)> {
        self.views.view(index).map(|v| (v.width, v.height))
    }

    pub fn view_tangents(&self, index: usize) -> Option<FovTangents> {
        self.views.view(index).map(View::tangents)
    }

    pub fn set_current_view_index(&mut self, index: usize) {
        self.current_view = index;
    }

    pub fn current_view_index(&self) -> usize {
        self.current_view
    }

    /// Set by the host while it draws into an eye target.
    pub fn set_rendering_vr_eye(&mut self, rendering: bool) {
        self.rendering_eye = rendering;
    }

    pub fn is_rendering_vr_eye(&self) -> bool {
        self.rendering_eye
    }

    /// Near/far from the host's active camera; `None` reverts to the configured defaults.
    pub fn set_host_clip_planes(&mut self, clip: Option<ClipPlanes>) {
        self.host_clip = clip;
    }

    /// Current eye's view matrix combined with the host camera at `origin`
    /// facing `yaw` (host convention, Z-up).
    pub fn current_view_matrix(&self, origin: Vec3, yaw: f32) -> Mat4 {
        let eye_view = self
            .views
            .view(self.current_view)
            .map(|v| v.view_matrix)
            .unwrap_or(Mat4::IDENTITY);
        host_view_matrix(&eye_view, origin, yaw, self.config.yaw_phase())
    }

    pub fn current_projection_matrix(&self) -> Mat4 {
        self.views
            .view(self.current_view)
            .map(|v| v.projection_matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Eye view matrix without the host camera, for content placed in runtime space.
    pub fn current_eye_view_matrix(&self) -> Mat4 {
        self.views
            .view(self.current_view)
            .map(|v| v.view_matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Gameplay snapshot; neutral unless the session is visible or focused.
    pub fn input_state(&mut self) -> InputState {
        self.input
            .input_state(&mut self.runtime, self.frame.session_state())
    }

    /// Cursor for the host's mouse-driven UI, while the overlay layer or the
    /// world panel is there to point at.
    pub fn menu_mouse_state(&mut self, width: u32, height: u32) -> Option<MenuPointer> {
        let target = self.pointer_target();
        let state = self.pointer.locate(target.as_ref(), width, height);
        if state.is_some() && self.diagnostics.first(Diagnostic::PointerTarget) {
            log::info!("menu pointer active on {width}x{height} screen");
        }
        state
    }

    fn pointer_target(&self) -> Option<Quad> {
        self.layer
            .world_quad()
            .filter(|_| self.layer.has_frame())
            .or_else(|| self.panel.quad())
    }

    /// Allocates the capture target at the host's screen size.
    pub fn init_overlay(&mut self, width: u32, height: u32) -> bool {
        let ok = self.capture.ensure(&mut self.gfx, width, height);
        if ok {
            self.panel.set_aspect(width, height);
        }
        ok
    }

    /// Redirects host 2D drawing into the capture target until [`Self::end_overlay_render`].
    pub fn begin_overlay_render(&mut self) -> bool {
        self.capture.begin_render(&mut self.gfx)
    }

    pub fn end_overlay_render(&mut self) {
        self.capture.end_render(&mut self.gfx);
    }

    /// Copies the default framebuffer into the capture target.
    pub fn capture_screen_to_overlay(&mut self, width: u32, height: u32) -> bool {
        if !self.capture.is_ready() && !self.init_overlay(width, height) {
            return false;
        }
        self.capture.capture(
            &mut self.gfx,
            width,
            height,
            self.debug,
            &mut self.diagnostics,
        )
    }

    /// Shows the capture as a quad in front of the head.
    pub fn set_head_locked_overlay(&mut self, enabled: bool) {
        self.head_locked_overlay = enabled;
    }

    /// Latches the interactive panel in front of the player; re-latched after
    /// each deactivation.
    pub fn set_world_panel_active(&mut self, active: bool) {
        self.panel.set_active(active);
    }

    pub fn world_panel_anchor(&self) -> Option<Pose> {
        self.panel.anchor()
    }

    /// Draws the in-projection overlays (head-locked capture, world panel,
    /// dialogue) into the currently bound eye target.
    pub fn render_overlays(&mut self) {
        if !self.frame.should_render() {
            return;
        }
        let Some(view) = self.views.view(self.current_view) else {
            return;
        };
        let view_projection = view.projection_matrix * view.view_matrix;
        let Some(head) = self.head_pose() else {
            return;
        };

        if self.head_locked_overlay {
            let quad = self.capture.head_locked_quad(&head, &self.config.overlay);
            self.capture.render(
                &mut self.gfx,
                &mut self.quad_renderer,
                &mut self.diagnostics,
                &quad,
                &view_projection,
            );
        }
        if let Some(quad) = self.panel.quad() {
            self.capture.render(
                &mut self.gfx,
                &mut self.quad_renderer,
                &mut self.diagnostics,
                &quad,
                &view_projection,
            );
        }
        self.dialogue.render(
            &mut self.gfx,
            &mut self.quad_renderer,
            &mut self.diagnostics,
            &head,
            &view_projection,
        );
    }

    /// Creates the layer swapchain; `None` uses the configured resolution.
    pub fn init_overlay_layer(&mut self, size: Option<(u32, u32)>) -> bool {
        if !self.session.has_session() {
            return false;
        }
        let (width, height) = size.unwrap_or(self.config.overlay.layer_resolution);
        self.layer.ensure(&mut self.runtime, width, height)
    }

    pub fn set_overlay_layer_enabled(&mut self, enabled: bool) {
        self.layer.set_enabled(enabled);
    }

    pub fn is_overlay_layer_enabled(&self) -> bool {
        self.layer.is_enabled()
    }

    pub fn overlay_layer_anchor(&self) -> Option<Pose> {
        self.layer.anchor()
    }

    /// Copies the default framebuffer (`width` x `height`) into the layer swapchain.
    pub fn capture_screen_to_overlay_layer(&mut self, width: u32, height: u32) -> bool {
        self.layer.capture(
            &mut self.runtime,
            &mut self.gfx,
            width,
            height,
            self.debug,
            &mut self.diagnostics,
        )
    }

    pub fn set_dialogue_text<T: TextRasterizer + ?Sized>(&mut self, fonts: &T, text: &str) {
        self.dialogue.set_text(&mut self.gfx, fonts, text);
    }

    pub fn set_dialogue_options<T: TextRasterizer + ?Sized>(
        &mut self,
        fonts: &T,
        options: &[String],
    ) {
        self.dialogue.set_options(&mut self.gfx, fonts, options);
    }

    pub fn hide_dialogue(&mut self) {
        self.dialogue.hide();
    }

    pub fn dialogue_selection(&self) -> usize {
        self.dialogue.selected()
    }

    /// Steps the dialogue menu with the left stick and confirms with the
    /// pointer's select press. Returns the confirmed option, if any.
    pub fn update_dialogue_menu<T: TextRasterizer + ?Sized>(
        &mut self,
        fonts: &T,
    ) -> Option<usize> {
        if !self.dialogue.has_menu() || !self.frame.session_state().accepts_input() {
            return None;
        }
        let stick_y = self.input.read_state(&mut self.runtime).movement.y;
        let confirm = self.pointer.clicked();
        match self
            .dialogue
            .update_menu(&mut self.gfx, fonts, stick_y, confirm)?
        {
            MenuEvent::Confirmed(index) => Some(index),
            MenuEvent::Moved(_) => None,
        }
    }
}

impl<R: XrRuntime, G: GraphicsApi> Drop for VrManager<R, G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
