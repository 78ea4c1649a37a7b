#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use enroth_vr::context::{ContextProvider, GraphicsContext};
use enroth_vr::graphics::{
    FramebufferId, FramebufferStatus, FramebufferTarget, GraphicsApi, GraphicsError, MeshId,
    ProgramId, RasterState, Rect, RenderbufferId, ScissorState, TextureId,
};
use enroth_vr::runtime::{ActionDesc, RuntimeError, SuggestedBinding, XrCall, XrRuntime};
use enroth_vr::text::{PixelBuffer, Rgba, TextRasterizer};
use enroth_vr::types::{
    ActionId, ActionSetId, ActionState, ApplicationInfo, BlendMode, CompositionLayer, Fov,
    FrameTiming, GraphicsRequirements, Hand, Pose, ReferenceSpaceKind, RuntimeEvent, RuntimeInfo,
    SessionState, SpaceId, SpaceLocation, SwapchainDesc, SwapchainId, SystemInfo, ViewConfig,
    ViewLocation, XrDuration, XrTime,
};
use enroth_vr::{DebugFlags, VrConfig, VrManager};
use glam::{Quat, Vec2, Vec3};

pub const ERROR_RUNTIME_FAILURE: i32 = -2;

pub fn eye_fov() -> Fov {
    let a = 45f32.to_radians();
    Fov {
        angle_left: -a,
        angle_right: a,
        angle_up: a,
        angle_down: -a,
    }
}

/// Scripted runtime that records every call.
pub struct MockRuntime {
    pub calls: Vec<&'static str>,
    /// Destroy calls in order, e.g. `"space"`, `"swapchain"`, `"session"`.
    pub destroyed: Vec<&'static str>,
    pub extensions: Vec<String>,
    pub events: VecDeque<RuntimeEvent>,
    pub blend_modes: Vec<BlendMode>,
    pub formats: Vec<u32>,
    pub view_count: usize,
    pub should_render: bool,
    pub fail_locate: bool,
    pub fail_acquire: bool,
    pub fail_wait: bool,
    pub eye_poses: Vec<Pose>,
    pub aim_pose: Option<Pose>,
    pub bools: HashMap<&'static str, bool>,
    pub floats: HashMap<&'static str, f32>,
    pub vectors: HashMap<&'static str, Vec2>,
    pub created_swapchains: Vec<SwapchainDesc>,
    pub suggested: Vec<(String, Vec<SuggestedBinding>)>,
    pub attach_count: usize,
    pub sync_count: usize,
    pub submitted: Vec<(BlendMode, Vec<CompositionLayer>)>,
    pub frame_open: bool,
    pub pairing_violations: usize,
    pub acquired: HashMap<SwapchainId, usize>,
    pub(crate) next_id: u32,
    pub(crate) time: i64,
    pub(crate) action_names: HashMap<ActionId, &'static str>,
    pub(crate) images: HashMap<SwapchainId, Vec<TextureId>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            destroyed: Vec::new(),
            extensions: vec![
                "XR_KHR_opengl_enable".to_string(),
                "XR_EXT_debug_utils".to_string(),
            ],
            events: VecDeque::new(),
            blend_modes: vec![BlendMode::Opaque],
            formats: vec![0x8C43, 0x8058],
            view_count: 2,
            should_render: true,
            fail_locate: false,
            fail_acquire: false,
            fail_wait: false,
            eye_poses: vec![
                Pose::new(Vec3::new(-0.032, 1.6, 0.0), Quat::IDENTITY),
                Pose::new(Vec3::new(0.032, 1.6, 0.0), Quat::IDENTITY),
            ],
            aim_pose: None,
            bools: HashMap::new(),
            floats: HashMap::new(),
            vectors: HashMap::new(),
            created_swapchains: Vec::new(),
            suggested: Vec::new(),
            attach_count: 0,
            sync_count: 0,
            submitted: Vec::new(),
            frame_open: false,
            pairing_violations: 0,
            acquired: HashMap::new(),
            next_id: 1,
            time: 0,
            action_names: HashMap::new(),
            images: HashMap::new(),
        }
    }
}

impl MockRuntime {
    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn push_state(&mut self, state: SessionState) {
        self.events
            .push_back(RuntimeEvent::SessionStateChanged(state));
    }

    pub fn action_name(&self, action: ActionId) -> &'static str {
        self.action_names.get(&action).copied().unwrap_or("")
    }

    fn active<T>(current: T) -> XrCall<ActionState<T>> {
        Ok(ActionState {
            current,
            is_active: true,
            changed_since_last_sync: false,
        })
    }
}

impl XrRuntime for MockRuntime {
    fn enumerate_extensions(&mut self) -> XrCall<Vec<String>> {
        self.calls.push("enumerate_extensions");
        Ok(self.extensions.clone())
    }

    fn create_instance(&mut self, _app: &ApplicationInfo, _extensions: &[&str]) -> XrCall<()> {
        self.calls.push("create_instance");
        Ok(())
    }

    fn runtime_info(&self) -> Option<RuntimeInfo> {
        Some(RuntimeInfo {
            runtime_name: "Mock Runtime".to_string(),
            runtime_version: "1.0.0".to_string(),
        })
    }

    fn result_string(&self, _code: i32) -> Option<String> {
        None
    }

    fn system(&mut self) -> XrCall<SystemInfo> {
        self.calls.push("system");
        Ok(SystemInfo {
            system_name: "Mock HMD".to_string(),
            vendor_id: 0x2833,
            max_layer_count: 16,
            orientation_tracking: true,
            position_tracking: true,
        })
    }

    fn graphics_requirements(&mut self) -> XrCall<GraphicsRequirements> {
        self.calls.push("graphics_requirements");
        Ok(GraphicsRequirements {
            min_api_version: (4, 0),
            max_api_version: (4, 6),
        })
    }

    fn create_session(&mut self, _context: &GraphicsContext) -> XrCall<()> {
        self.calls.push("create_session");
        Ok(())
    }

    fn create_reference_space(&mut self, _kind: ReferenceSpaceKind) -> XrCall<SpaceId> {
        self.calls.push("create_reference_space");
        Ok(SpaceId(self.id()))
    }

    fn view_configuration(&mut self) -> XrCall<Vec<ViewConfig>> {
        self.calls.push("view_configuration");
        Ok(vec![
            ViewConfig {
                recommended_width: 1440,
                recommended_height: 1584,
                max_width: 4096,
                max_height: 4096,
                recommended_sample_count: 1,
            };
            self.view_count
        ])
    }

    fn environment_blend_modes(&mut self) -> XrCall<Vec<BlendMode>> {
        Ok(self.blend_modes.clone())
    }

    fn swapchain_formats(&mut self) -> XrCall<Vec<u32>> {
        Ok(self.formats.clone())
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> XrCall<SwapchainId> {
        self.calls.push("create_swapchain");
        self.created_swapchains.push(*desc);
        let id = SwapchainId(self.id());
        let base = 100 + id.0 * 10;
        self.images
            .insert(id, (0..3).map(|i| TextureId(base + i)).collect());
        Ok(id)
    }

    fn swapchain_images(&mut self, swapchain: SwapchainId) -> XrCall<Vec<TextureId>> {
        Ok(self.images.get(&swapchain).cloned().unwrap_or_default())
    }

    fn acquire_image(&mut self, swapchain: SwapchainId) -> XrCall<u32> {
        self.calls.push("acquire_image");
        if self.fail_acquire {
            return Err(RuntimeError::new("xrAcquireSwapchainImage", ERROR_RUNTIME_FAILURE));
        }
        let count = self.acquired.entry(swapchain).or_insert(0);
        let index = (*count % 3) as u32;
        *count += 1;
        Ok(index)
    }

    fn wait_image(&mut self, _swapchain: SwapchainId, _timeout: XrDuration) -> XrCall<()> {
        self.calls.push("wait_image");
        if self.fail_wait {
            return Err(RuntimeError::new("xrWaitSwapchainImage", ERROR_RUNTIME_FAILURE));
        }
        Ok(())
    }

    fn release_image(&mut self, _swapchain: SwapchainId) -> XrCall<()> {
        self.calls.push("release_image");
        Ok(())
    }

    fn poll_event(&mut self) -> XrCall<Option<RuntimeEvent>> {
        Ok(self.events.pop_front())
    }

    fn begin_session(&mut self) -> XrCall<()> {
        self.calls.push("begin_session");
        Ok(())
    }

    fn end_session(&mut self) -> XrCall<()> {
        self.calls.push("end_session");
        Ok(())
    }

    fn wait_frame(&mut self) -> XrCall<FrameTiming> {
        self.calls.push("wait_frame");
        self.time += 11_111_111;
        Ok(FrameTiming {
            predicted_display_time: XrTime(self.time),
            predicted_display_period: 11_111_111,
            should_render: self.should_render,
        })
    }

    fn begin_frame(&mut self) -> XrCall<()> {
        self.calls.push("begin_frame");
        if self.frame_open {
            self.pairing_violations += 1;
        }
        self.frame_open = true;
        Ok(())
    }

    fn locate_views(&mut self, _time: XrTime, _space: SpaceId) -> XrCall<Vec<ViewLocation>> {
        self.calls.push("locate_views");
        if self.fail_locate {
            return Err(RuntimeError::new("xrLocateViews", ERROR_RUNTIME_FAILURE));
        }
        Ok(self
            .eye_poses
            .iter()
            .map(|&pose| ViewLocation {
                pose,
                fov: eye_fov(),
            })
            .collect())
    }

    fn end_frame(
        &mut self,
        _time: XrTime,
        blend_mode: BlendMode,
        layers: &[CompositionLayer],
    ) -> XrCall<()> {
        self.calls.push("end_frame");
        if !self.frame_open {
            self.pairing_violations += 1;
        }
        self.frame_open = false;
        self.submitted.push((blend_mode, layers.to_vec()));
        Ok(())
    }

    fn create_action_set(
        &mut self,
        _name: &str,
        _localized_name: &str,
        _priority: u32,
    ) -> XrCall<ActionSetId> {
        self.calls.push("create_action_set");
        Ok(ActionSetId(self.id()))
    }

    fn create_action(&mut self, _set: ActionSetId, desc: &ActionDesc) -> XrCall<ActionId> {
        let id = ActionId(self.id());
        self.action_names.insert(id, desc.name);
        Ok(id)
    }

    fn suggest_bindings(&mut self, profile: &str, bindings: &[SuggestedBinding]) -> XrCall<()> {
        self.calls.push("suggest_bindings");
        self.suggested.push((profile.to_string(), bindings.to_vec()));
        Ok(())
    }

    fn attach_action_sets(&mut self, _sets: &[ActionSetId]) -> XrCall<()> {
        self.attach_count += 1;
        Ok(())
    }

    fn sync_actions(&mut self, _sets: &[ActionSetId]) -> XrCall<()> {
        self.sync_count += 1;
        Ok(())
    }

    fn bool_state(&mut self, action: ActionId, _hand: Option<Hand>) -> XrCall<ActionState<bool>> {
        let name = self.action_name(action);
        Self::active(self.bools.get(name).copied().unwrap_or(false))
    }

    fn float_state(&mut self, action: ActionId, _hand: Option<Hand>) -> XrCall<ActionState<f32>> {
        let name = self.action_name(action);
        Self::active(self.floats.get(name).copied().unwrap_or(0.0))
    }

    fn vector2_state(
        &mut self,
        action: ActionId,
        _hand: Option<Hand>,
    ) -> XrCall<ActionState<Vec2>> {
        let name = self.action_name(action);
        Self::active(self.vectors.get(name).copied().unwrap_or(Vec2::ZERO))
    }

    fn create_action_space(&mut self, _action: ActionId, _hand: Hand) -> XrCall<SpaceId> {
        self.calls.push("create_action_space");
        Ok(SpaceId(self.id()))
    }

    fn locate_space(
        &mut self,
        _space: SpaceId,
        _base: SpaceId,
        _time: XrTime,
    ) -> XrCall<SpaceLocation> {
        Ok(match self.aim_pose {
            Some(pose) => SpaceLocation {
                pose,
                position_valid: true,
                orientation_valid: true,
            },
            None => SpaceLocation::default(),
        })
    }

    fn destroy_space(&mut self, _space: SpaceId) {
        self.destroyed.push("space");
    }

    fn destroy_swapchain(&mut self, _swapchain: SwapchainId) {
        self.destroyed.push("swapchain");
    }

    fn destroy_action_set(&mut self, _set: ActionSetId) {
        self.destroyed.push("action_set");
    }

    fn destroy_session(&mut self) {
        self.destroyed.push("session");
    }

    fn destroy_instance(&mut self) {
        self.destroyed.push("instance");
    }
}

/// GL stand-in tracking object lifetimes and bound state.
#[derive(Default)]
pub struct MockGraphics {
    next_id: u32,
    pub draw_framebuffer: Option<FramebufferId>,
    pub read_framebuffer: Option<FramebufferId>,
    pub live_framebuffers: Vec<FramebufferId>,
    pub live_renderbuffers: Vec<RenderbufferId>,
    pub live_textures: Vec<TextureId>,
    pub renderbuffers_created: usize,
    pub attached_color: Option<TextureId>,
    pub attached_depth: Option<RenderbufferId>,
    pub viewport: Rect,
    pub scissor: ScissorState,
    pub raster: RasterState,
    pub clears: Vec<[f32; 4]>,
    pub blits: Vec<(Rect, Rect, Option<FramebufferId>, Option<FramebufferId>)>,
    pub uploads: Vec<(TextureId, u32, u32, Vec<u8>)>,
    pub draws: Vec<(TextureId, RasterState)>,
    pub fail_compile: bool,
    pub incomplete: bool,
}

impl MockGraphics {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsApi for MockGraphics {
    fn create_framebuffer(&mut self) -> Option<FramebufferId> {
        let fb = FramebufferId(self.id());
        self.live_framebuffers.push(fb);
        Some(fb)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.live_framebuffers.retain(|f| *f != framebuffer);
    }

    fn create_depth_buffer(&mut self, _width: u32, _height: u32) -> Option<RenderbufferId> {
        let rb = RenderbufferId(self.id());
        self.live_renderbuffers.push(rb);
        self.renderbuffers_created += 1;
        Some(rb)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.live_renderbuffers.retain(|r| *r != renderbuffer);
    }

    fn create_texture(&mut self, _width: u32, _height: u32) -> Option<TextureId> {
        let tex = TextureId(self.id());
        self.live_textures.push(tex);
        Some(tex)
    }

    fn upload_texture(&mut self, texture: TextureId, width: u32, height: u32, pixels: &[u8]) {
        self.uploads.push((texture, width, height, pixels.to_vec()));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.live_textures.retain(|t| *t != texture);
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<FramebufferId>) {
        match target {
            FramebufferTarget::Read => self.read_framebuffer = framebuffer,
            FramebufferTarget::Draw => self.draw_framebuffer = framebuffer,
            FramebufferTarget::Both => {
                self.read_framebuffer = framebuffer;
                self.draw_framebuffer = framebuffer;
            }
        }
    }

    fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.draw_framebuffer
    }

    fn attach_color_texture(&mut self, texture: TextureId) {
        self.attached_color = Some(texture);
    }

    fn attach_depth_buffer(&mut self, renderbuffer: RenderbufferId) {
        self.attached_depth = Some(renderbuffer);
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        if self.incomplete {
            FramebufferStatus::Incomplete(0x8CD6)
        } else {
            FramebufferStatus::Complete
        }
    }

    fn select_color_attachment(&mut self) {}

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.viewport = rect;
    }

    fn scissor(&self) -> ScissorState {
        self.scissor
    }

    fn set_scissor(&mut self, state: ScissorState) {
        self.scissor = state;
    }

    fn raster_state(&self) -> RasterState {
        self.raster
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.raster = state;
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clears.push(color);
    }

    fn blit(&mut self, src: Rect, dst: Rect) {
        self.blits
            .push((src, dst, self.read_framebuffer, self.draw_framebuffer));
    }

    fn compile_program(
        &mut self,
        _vertex_src: &str,
        _fragment_src: &str,
    ) -> Result<ProgramId, GraphicsError> {
        if self.fail_compile {
            return Err(GraphicsError::Compile("mock".to_string()));
        }
        Ok(ProgramId(self.id()))
    }

    fn delete_program(&mut self, _program: ProgramId) {}

    fn create_quad_mesh(&mut self) -> Option<MeshId> {
        Some(MeshId(self.id()))
    }

    fn delete_mesh(&mut self, _mesh: MeshId) {}

    fn draw_textured_quad(
        &mut self,
        _program: ProgramId,
        _mesh: MeshId,
        texture: TextureId,
        _mvp: &glam::Mat4,
        _opacity: f32,
    ) {
        self.draws.push((texture, self.raster));
    }
}

/// Fixed-pitch font: every glyph is 6x10 pixels.
pub struct MockText;

impl TextRasterizer for MockText {
    fn line_height(&self) -> u32 {
        10
    }

    fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * 6
    }

    fn rasterize_line(&self, line: &str, target: &mut PixelBuffer, x: u32, y: u32, color: Rgba) {
        target.fill_rect(x, y, self.text_width(line), self.line_height(), color);
    }
}

pub struct MockContext(pub Option<GraphicsContext>);

impl ContextProvider for MockContext {
    fn current_context(&self) -> Option<GraphicsContext> {
        self.0
    }
}

pub fn xlib_context() -> GraphicsContext {
    GraphicsContext::Xlib {
        display: 0x1000,
        visual_id: 33,
        fb_config: 0x2000,
        drawable: 0x3000,
        context: 0x4000,
    }
}

pub type Manager = VrManager<MockRuntime, MockGraphics>;

pub fn manager_with(runtime: MockRuntime) -> Manager {
    VrManager::new(runtime, MockGraphics::default(), VrConfig::default())
        .with_debug_flags(DebugFlags::default())
}

/// Initialized manager with a session bound to a mock GLX context.
pub fn session_manager() -> Manager {
    let mut vr = manager_with(MockRuntime::default());
    vr.initialize().expect("initialize");
    vr.create_session(None, &MockContext(Some(xlib_context())))
        .expect("create session");
    vr
}

/// Session that the runtime has started and focused.
pub fn running_manager() -> Manager {
    let mut vr = session_manager();
    vr.runtime_mut().push_state(SessionState::Ready);
    vr.runtime_mut().push_state(SessionState::Synchronized);
    vr.runtime_mut().push_state(SessionState::Visible);
    vr.runtime_mut().push_state(SessionState::Focused);
    vr.poll_events();
    assert!(vr.is_session_running());
    vr
}

/// Runs one host frame: both eyes acquired, rendered and released.
pub fn render_frame(vr: &mut Manager) -> bool {
    if !vr.begin_frame() {
        return false;
    }
    for eye in 0..vr.view_count() {
        vr.set_current_view_index(eye);
        vr.acquire_swapchain_texture(eye);
        vr.release_swapchain_texture(eye);
    }
    vr.end_frame();
    true
}
