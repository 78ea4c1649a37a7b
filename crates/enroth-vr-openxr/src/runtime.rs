//! [`XrRuntime`] backed by the `openxr` crate with the OpenGL graphics binding.
//!
//! Handles live in id-keyed maps; dropping an entry destroys the handle.

use std::collections::HashMap;

use enroth_vr::context::GraphicsContext;
use enroth_vr::graphics::TextureId;
use enroth_vr::runtime::{ActionDesc, RuntimeError, SuggestedBinding, XrCall, XrRuntime};
use enroth_vr::session::OPENGL_EXTENSION;
use enroth_vr::types::{
    ActionId, ActionKind, ActionSetId, ActionState, ApplicationInfo, BlendMode,
    CompositionLayer, Fov, FrameTiming, GraphicsRequirements, Hand, Pose, ReferenceSpaceKind,
    RuntimeEvent, RuntimeInfo, SessionState, SpaceId, SpaceLocation, SubImage, SwapchainDesc,
    SwapchainId, SystemInfo, ViewConfig, ViewLocation, XrDuration, XrTime,
};
use glam::{Quat, Vec2, Vec3};
use openxr as xr;

use crate::BackendError;

const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

fn fail(call: &'static str) -> impl FnOnce(xr::sys::Result) -> RuntimeError {
    move |e| RuntimeError::new(call, e.into_raw())
}

fn missing(call: &'static str) -> RuntimeError {
    RuntimeError::new(call, xr::sys::Result::ERROR_HANDLE_INVALID.into_raw())
}

struct SessionHandles {
    session: xr::Session<xr::OpenGL>,
    waiter: xr::FrameWaiter,
    stream: xr::FrameStream<xr::OpenGL>,
}

enum ActionHandle {
    Bool(xr::Action<bool>),
    Float(xr::Action<f32>),
    Vector2(xr::Action<xr::Vector2f>),
    Pose(xr::Action<xr::Posef>),
}

struct ActionEntry {
    set: ActionSetId,
    handle: ActionHandle,
    hands: Vec<(Hand, xr::Path)>,
}

impl ActionEntry {
    fn subaction_path(&self, hand: Option<Hand>, call: &'static str) -> XrCall<xr::Path> {
        match hand {
            None => Ok(xr::Path::NULL),
            Some(hand) => self
                .hands
                .iter()
                .find(|(h, _)| *h == hand)
                .map(|(_, path)| *path)
                .ok_or_else(|| {
                    RuntimeError::new(call, xr::sys::Result::ERROR_PATH_UNSUPPORTED.into_raw())
                }),
        }
    }
}

fn type_mismatch(call: &'static str) -> RuntimeError {
    RuntimeError::new(call, xr::sys::Result::ERROR_ACTION_TYPE_MISMATCH.into_raw())
}

pub struct OpenXrRuntime {
    entry: xr::Entry,
    instance: Option<xr::Instance>,
    system: Option<xr::SystemId>,
    session: Option<SessionHandles>,
    events: xr::EventDataBuffer,
    spaces: HashMap<SpaceId, xr::Space>,
    swapchains: HashMap<SwapchainId, xr::Swapchain<xr::OpenGL>>,
    action_sets: HashMap<ActionSetId, xr::ActionSet>,
    actions: HashMap<ActionId, ActionEntry>,
    next_id: u32,
}

impl OpenXrRuntime {
    /// Loads the system OpenXR loader.
    pub fn load() -> Result<Self, BackendError> {
        let entry = unsafe { xr::Entry::load() }
            .map_err(|e| BackendError::Loader(format!("OpenXR load failed: {e:?}")))?;
        Ok(Self {
            entry,
            instance: None,
            system: None,
            session: None,
            events: xr::EventDataBuffer::new(),
            spaces: HashMap::new(),
            swapchains: HashMap::new(),
            action_sets: HashMap::new(),
            actions: HashMap::new(),
            next_id: 0,
        })
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn instance(&self, call: &'static str) -> XrCall<&xr::Instance> {
        self.instance.as_ref().ok_or_else(|| missing(call))
    }

    fn system_id(&self, call: &'static str) -> XrCall<xr::SystemId> {
        self.system.ok_or_else(|| missing(call))
    }

    fn session(&self, call: &'static str) -> XrCall<&xr::Session<xr::OpenGL>> {
        self.session
            .as_ref()
            .map(|handles| &handles.session)
            .ok_or_else(|| missing(call))
    }

    fn session_handles(&mut self, call: &'static str) -> XrCall<&mut SessionHandles> {
        self.session.as_mut().ok_or_else(|| missing(call))
    }

    fn action(&self, action: ActionId, call: &'static str) -> XrCall<&ActionEntry> {
        self.actions.get(&action).ok_or_else(|| missing(call))
    }

    fn insert_space(&mut self, space: xr::Space) -> SpaceId {
        let id = SpaceId(self.allocate_id());
        self.spaces.insert(id, space);
        id
    }
}

impl XrRuntime for OpenXrRuntime {
    fn enumerate_extensions(&mut self) -> XrCall<Vec<String>> {
        let available = self
            .entry
            .enumerate_extensions()
            .map_err(fail("xrEnumerateInstanceExtensionProperties"))?;
        let mut names = Vec::with_capacity(available.other.len() + 1);
        if available.khr_opengl_enable {
            names.push(OPENGL_EXTENSION.to_string());
        }
        names.extend(
            available
                .other
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        );
        Ok(names)
    }

    fn create_instance(&mut self, app: &ApplicationInfo, extensions: &[&str]) -> XrCall<()> {
        let mut exts = xr::ExtensionSet::default();
        for name in extensions {
            if *name == OPENGL_EXTENSION {
                exts.khr_opengl_enable = true;
            } else {
                exts.other.push(name.as_bytes().to_vec());
            }
        }
        let app_info = xr::ApplicationInfo {
            application_name: &app.application_name,
            application_version: app.application_version,
            engine_name: &app.engine_name,
            engine_version: app.engine_version,
            api_version: xr::Version::new(1, 0, 0),
        };
        let instance = self
            .entry
            .create_instance(&app_info, &exts, &[])
            .map_err(fail("xrCreateInstance"))?;
        self.instance = Some(instance);
        Ok(())
    }

    fn runtime_info(&self) -> Option<RuntimeInfo> {
        let props = self.instance.as_ref()?.properties().ok()?;
        let version = props.runtime_version;
        Some(RuntimeInfo {
            runtime_name: props.runtime_name,
            runtime_version: format!(
                "{}.{}.{}",
                version.major(),
                version.minor(),
                version.patch()
            ),
        })
    }

    fn result_string(&self, code: i32) -> Option<String> {
        Some(xr::sys::Result::from_raw(code).to_string())
    }

    fn system(&mut self) -> XrCall<SystemInfo> {
        let instance = self.instance("xrGetSystem")?;
        let system = instance
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .map_err(fail("xrGetSystem"))?;
        let props = instance
            .system_properties(system)
            .map_err(fail("xrGetSystemProperties"))?;
        self.system = Some(system);
        Ok(SystemInfo {
            system_name: props.system_name,
            vendor_id: props.vendor_id,
            max_layer_count: props.graphics_properties.max_layer_count,
            orientation_tracking: props.tracking_properties.orientation_tracking.into(),
            position_tracking: props.tracking_properties.position_tracking.into(),
        })
    }

    fn graphics_requirements(&mut self) -> XrCall<GraphicsRequirements> {
        let system = self.system_id("xrGetOpenGLGraphicsRequirementsKHR")?;
        let reqs = self
            .instance("xrGetOpenGLGraphicsRequirementsKHR")?
            .graphics_requirements::<xr::OpenGL>(system)
            .map_err(fail("xrGetOpenGLGraphicsRequirementsKHR"))?;
        let min = reqs.min_api_version_supported;
        let max = reqs.max_api_version_supported;
        Ok(GraphicsRequirements {
            min_api_version: (min.major(), min.minor()),
            max_api_version: (max.major(), max.minor()),
        })
    }

    fn create_session(&mut self, context: &GraphicsContext) -> XrCall<()> {
        let create_info = session_create_info(context).ok_or_else(|| {
            RuntimeError::new(
                "xrCreateSession",
                xr::sys::Result::ERROR_GRAPHICS_DEVICE_INVALID.into_raw(),
            )
        })?;
        let system = self.system_id("xrCreateSession")?;
        let instance = self.instance("xrCreateSession")?;
        let (session, waiter, stream) = unsafe {
            instance
                .create_session::<xr::OpenGL>(system, &create_info)
                .map_err(fail("xrCreateSession"))?
        };
        self.session = Some(SessionHandles {
            session,
            waiter,
            stream,
        });
        Ok(())
    }

    fn create_reference_space(&mut self, kind: ReferenceSpaceKind) -> XrCall<SpaceId> {
        let ty = match kind {
            ReferenceSpaceKind::Local => xr::ReferenceSpaceType::LOCAL,
            ReferenceSpaceKind::View => xr::ReferenceSpaceType::VIEW,
        };
        let space = self
            .session("xrCreateReferenceSpace")?
            .create_reference_space(ty, xr::Posef::IDENTITY)
            .map_err(fail("xrCreateReferenceSpace"))?;
        Ok(self.insert_space(space))
    }

    fn view_configuration(&mut self) -> XrCall<Vec<ViewConfig>> {
        let system = self.system_id("xrEnumerateViewConfigurationViews")?;
        let views = self
            .instance("xrEnumerateViewConfigurationViews")?
            .enumerate_view_configuration_views(system, VIEW_TYPE)
            .map_err(fail("xrEnumerateViewConfigurationViews"))?;
        Ok(views
            .iter()
            .map(|v| ViewConfig {
                recommended_width: v.recommended_image_rect_width,
                recommended_height: v.recommended_image_rect_height,
                max_width: v.max_image_rect_width,
                max_height: v.max_image_rect_height,
                recommended_sample_count: v.recommended_swapchain_sample_count,
            })
            .collect())
    }

    fn environment_blend_modes(&mut self) -> XrCall<Vec<BlendMode>> {
        let system = self.system_id("xrEnumerateEnvironmentBlendModes")?;
        let modes = self
            .instance("xrEnumerateEnvironmentBlendModes")?
            .enumerate_environment_blend_modes(system, VIEW_TYPE)
            .map_err(fail("xrEnumerateEnvironmentBlendModes"))?;
        Ok(modes.into_iter().filter_map(from_xr_blend_mode).collect())
    }

    fn swapchain_formats(&mut self) -> XrCall<Vec<u32>> {
        self.session("xrEnumerateSwapchainFormats")?
            .enumerate_swapchain_formats()
            .map_err(fail("xrEnumerateSwapchainFormats"))
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> XrCall<SwapchainId> {
        let create_info = xr::SwapchainCreateInfo {
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT
                | xr::SwapchainUsageFlags::SAMPLED,
            format: desc.format,
            sample_count: desc.sample_count,
            width: desc.width,
            height: desc.height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };
        let swapchain = self
            .session("xrCreateSwapchain")?
            .create_swapchain(&create_info)
            .map_err(fail("xrCreateSwapchain"))?;
        let id = SwapchainId(self.allocate_id());
        self.swapchains.insert(id, swapchain);
        Ok(id)
    }

    fn swapchain_images(&mut self, swapchain: SwapchainId) -> XrCall<Vec<TextureId>> {
        let images = self
            .swapchains
            .get(&swapchain)
            .ok_or_else(|| missing("xrEnumerateSwapchainImages"))?
            .enumerate_images()
            .map_err(fail("xrEnumerateSwapchainImages"))?;
        Ok(images.into_iter().map(TextureId).collect())
    }

    fn acquire_image(&mut self, swapchain: SwapchainId) -> XrCall<u32> {
        self.swapchains
            .get_mut(&swapchain)
            .ok_or_else(|| missing("xrAcquireSwapchainImage"))?
            .acquire_image()
            .map_err(fail("xrAcquireSwapchainImage"))
    }

    fn wait_image(&mut self, swapchain: SwapchainId, timeout: XrDuration) -> XrCall<()> {
        self.swapchains
            .get_mut(&swapchain)
            .ok_or_else(|| missing("xrWaitSwapchainImage"))?
            .wait_image(xr::Duration::from_nanos(timeout.0))
            .map_err(fail("xrWaitSwapchainImage"))
    }

    fn release_image(&mut self, swapchain: SwapchainId) -> XrCall<()> {
        self.swapchains
            .get_mut(&swapchain)
            .ok_or_else(|| missing("xrReleaseSwapchainImage"))?
            .release_image()
            .map_err(fail("xrReleaseSwapchainImage"))
    }

    fn poll_event(&mut self) -> XrCall<Option<RuntimeEvent>> {
        let instance = self.instance.as_ref().ok_or_else(|| missing("xrPollEvent"))?;
        let event = instance
            .poll_event(&mut self.events)
            .map_err(fail("xrPollEvent"))?;
        Ok(event.map(|event| match event {
            xr::Event::SessionStateChanged(e) => {
                RuntimeEvent::SessionStateChanged(from_xr_session_state(e.state()))
            }
            xr::Event::InstanceLossPending(_) => RuntimeEvent::InstanceLossPending,
            _ => RuntimeEvent::Other,
        }))
    }

    fn begin_session(&mut self) -> XrCall<()> {
        self.session("xrBeginSession")?
            .begin(VIEW_TYPE)
            .map(|_| ())
            .map_err(fail("xrBeginSession"))
    }

    fn end_session(&mut self) -> XrCall<()> {
        self.session("xrEndSession")?
            .end()
            .map(|_| ())
            .map_err(fail("xrEndSession"))
    }

    fn wait_frame(&mut self) -> XrCall<FrameTiming> {
        let state = self
            .session_handles("xrWaitFrame")?
            .waiter
            .wait()
            .map_err(fail("xrWaitFrame"))?;
        Ok(FrameTiming {
            predicted_display_time: XrTime(state.predicted_display_time.as_nanos()),
            predicted_display_period: state.predicted_display_period.as_nanos(),
            should_render: state.should_render,
        })
    }

    fn begin_frame(&mut self) -> XrCall<()> {
        self.session_handles("xrBeginFrame")?
            .stream
            .begin()
            .map(|_| ())
            .map_err(fail("xrBeginFrame"))
    }

    fn locate_views(&mut self, time: XrTime, space: SpaceId) -> XrCall<Vec<ViewLocation>> {
        let base = self
            .spaces
            .get(&space)
            .ok_or_else(|| missing("xrLocateViews"))?;
        let (_, views) = self
            .session("xrLocateViews")?
            .locate_views(VIEW_TYPE, xr::Time::from_nanos(time.0), base)
            .map_err(fail("xrLocateViews"))?;
        Ok(views
            .iter()
            .map(|view| ViewLocation {
                pose: to_pose(view.pose),
                fov: to_fov(view.fov),
            })
            .collect())
    }

    fn end_frame(
        &mut self,
        time: XrTime,
        blend_mode: BlendMode,
        layers: &[CompositionLayer],
    ) -> XrCall<()> {
        let Self {
            session,
            spaces,
            swapchains,
            ..
        } = self;
        let handles = session.as_mut().ok_or_else(|| missing("xrEndFrame"))?;

        let projection_views: Vec<Vec<xr::CompositionLayerProjectionView<xr::OpenGL>>> = layers
            .iter()
            .map(|layer| match layer {
                CompositionLayer::Projection { views, .. } => views
                    .iter()
                    .filter_map(|view| {
                        let swapchain = swapchains.get(&view.sub_image.swapchain)?;
                        Some(
                            xr::CompositionLayerProjectionView::new()
                                .pose(to_posef(view.pose))
                                .fov(to_fovf(view.fov))
                                .sub_image(sub_image(swapchain, &view.sub_image)),
                        )
                    })
                    .collect(),
                CompositionLayer::Quad { .. } => Vec::new(),
            })
            .collect();

        let mut built = Vec::with_capacity(layers.len());
        for (layer, views) in layers.iter().zip(&projection_views) {
            match layer {
                CompositionLayer::Projection { space, .. } => {
                    let Some(space) = spaces.get(space) else {
                        continue;
                    };
                    built.push(Layer::Projection(
                        xr::CompositionLayerProjection::new()
                            .space(space)
                            .views(views),
                    ));
                }
                CompositionLayer::Quad {
                    space,
                    sub_image: image,
                    pose,
                    size,
                    ..
                } => {
                    let (Some(space), Some(swapchain)) =
                        (spaces.get(space), swapchains.get(&image.swapchain))
                    else {
                        continue;
                    };
                    built.push(Layer::Quad(
                        xr::CompositionLayerQuad::new()
                            .layer_flags(xr::CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA)
                            .space(space)
                            .eye_visibility(xr::EyeVisibility::BOTH)
                            .sub_image(sub_image(swapchain, image))
                            .pose(to_posef(*pose))
                            .size(xr::Extent2Df {
                                width: size.x,
                                height: size.y,
                            }),
                    ));
                }
            }
        }
        let refs: Vec<&xr::CompositionLayerBase<xr::OpenGL>> =
            built.iter().map(Layer::base).collect();

        handles
            .stream
            .end(
                xr::Time::from_nanos(time.0),
                to_xr_blend_mode(blend_mode),
                &refs,
            )
            .map_err(fail("xrEndFrame"))
    }

    fn create_action_set(
        &mut self,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> XrCall<ActionSetId> {
        let set = self
            .instance("xrCreateActionSet")?
            .create_action_set(name, localized_name, priority)
            .map_err(fail("xrCreateActionSet"))?;
        let id = ActionSetId(self.allocate_id());
        self.action_sets.insert(id, set);
        Ok(id)
    }

    fn create_action(&mut self, set: ActionSetId, desc: &ActionDesc) -> XrCall<ActionId> {
        let instance = self.instance("xrCreateAction")?;
        let hands = desc
            .hands
            .iter()
            .map(|hand| {
                instance
                    .string_to_path(hand.user_path())
                    .map(|path| (*hand, path))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail("xrStringToPath"))?;
        let paths: Vec<xr::Path> = hands.iter().map(|(_, path)| *path).collect();

        let action_set = self
            .action_sets
            .get(&set)
            .ok_or_else(|| missing("xrCreateAction"))?;
        let (name, localized) = (desc.name, desc.localized_name);
        let created = match desc.kind {
            ActionKind::Boolean => action_set
                .create_action(name, localized, &paths)
                .map(ActionHandle::Bool),
            ActionKind::Float => action_set
                .create_action(name, localized, &paths)
                .map(ActionHandle::Float),
            ActionKind::Vector2 => action_set
                .create_action(name, localized, &paths)
                .map(ActionHandle::Vector2),
            ActionKind::Pose => action_set
                .create_action(name, localized, &paths)
                .map(ActionHandle::Pose),
        };
        let handle = created.map_err(fail("xrCreateAction"))?;

        let id = ActionId(self.allocate_id());
        self.actions.insert(id, ActionEntry { set, handle, hands });
        Ok(id)
    }

    fn suggest_bindings(&mut self, profile: &str, bindings: &[SuggestedBinding]) -> XrCall<()> {
        let instance = self.instance("xrSuggestInteractionProfileBindings")?;
        let profile_path = instance
            .string_to_path(profile)
            .map_err(fail("xrStringToPath"))?;

        let mut suggested = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let path = instance
                .string_to_path(binding.path)
                .map_err(fail("xrStringToPath"))?;
            let entry = self.action(binding.action, "xrSuggestInteractionProfileBindings")?;
            suggested.push(match &entry.handle {
                ActionHandle::Bool(action) => xr::Binding::new(action, path),
                ActionHandle::Float(action) => xr::Binding::new(action, path),
                ActionHandle::Vector2(action) => xr::Binding::new(action, path),
                ActionHandle::Pose(action) => xr::Binding::new(action, path),
            });
        }
        instance
            .suggest_interaction_profile_bindings(profile_path, &suggested)
            .map_err(fail("xrSuggestInteractionProfileBindings"))
    }

    fn attach_action_sets(&mut self, sets: &[ActionSetId]) -> XrCall<()> {
        let sets = sets
            .iter()
            .map(|id| {
                self.action_sets
                    .get(id)
                    .ok_or_else(|| missing("xrAttachSessionActionSets"))
            })
            .collect::<XrCall<Vec<_>>>()?;
        self.session("xrAttachSessionActionSets")?
            .attach_action_sets(&sets)
            .map_err(fail("xrAttachSessionActionSets"))
    }

    fn sync_actions(&mut self, sets: &[ActionSetId]) -> XrCall<()> {
        let active = sets
            .iter()
            .map(|id| {
                self.action_sets
                    .get(id)
                    .map(xr::ActiveActionSet::new)
                    .ok_or_else(|| missing("xrSyncActions"))
            })
            .collect::<XrCall<Vec<_>>>()?;
        self.session("xrSyncActions")?
            .sync_actions(&active)
            .map_err(fail("xrSyncActions"))
    }

    fn bool_state(&mut self, action: ActionId, hand: Option<Hand>) -> XrCall<ActionState<bool>> {
        const CALL: &str = "xrGetActionStateBoolean";
        let entry = self.action(action, CALL)?;
        let path = entry.subaction_path(hand, CALL)?;
        let ActionHandle::Bool(handle) = &entry.handle else {
            return Err(type_mismatch(CALL));
        };
        let state = handle.state(self.session(CALL)?, path).map_err(fail(CALL))?;
        Ok(ActionState {
            current: state.current_state,
            is_active: state.is_active,
            changed_since_last_sync: state.changed_since_last_sync,
        })
    }

    fn float_state(&mut self, action: ActionId, hand: Option<Hand>) -> XrCall<ActionState<f32>> {
        const CALL: &str = "xrGetActionStateFloat";
        let entry = self.action(action, CALL)?;
        let path = entry.subaction_path(hand, CALL)?;
        let ActionHandle::Float(handle) = &entry.handle else {
            return Err(type_mismatch(CALL));
        };
        let state = handle.state(self.session(CALL)?, path).map_err(fail(CALL))?;
        Ok(ActionState {
            current: state.current_state,
            is_active: state.is_active,
            changed_since_last_sync: state.changed_since_last_sync,
        })
    }

    fn vector2_state(
        &mut self,
        action: ActionId,
        hand: Option<Hand>,
    ) -> XrCall<ActionState<Vec2>> {
        const CALL: &str = "xrGetActionStateVector2f";
        let entry = self.action(action, CALL)?;
        let path = entry.subaction_path(hand, CALL)?;
        let ActionHandle::Vector2(handle) = &entry.handle else {
            return Err(type_mismatch(CALL));
        };
        let state = handle.state(self.session(CALL)?, path).map_err(fail(CALL))?;
        Ok(ActionState {
            current: Vec2::new(state.current_state.x, state.current_state.y),
            is_active: state.is_active,
            changed_since_last_sync: state.changed_since_last_sync,
        })
    }

    fn create_action_space(&mut self, action: ActionId, hand: Hand) -> XrCall<SpaceId> {
        const CALL: &str = "xrCreateActionSpace";
        let entry = self.action(action, CALL)?;
        let path = entry.subaction_path(Some(hand), CALL)?;
        let ActionHandle::Pose(handle) = &entry.handle else {
            return Err(type_mismatch(CALL));
        };
        let session = self.session(CALL)?.clone();
        let space = handle
            .create_space(&session, path, xr::Posef::IDENTITY)
            .map_err(fail(CALL))?;
        Ok(self.insert_space(space))
    }

    fn locate_space(
        &mut self,
        space: SpaceId,
        base: SpaceId,
        time: XrTime,
    ) -> XrCall<SpaceLocation> {
        let (Some(space), Some(base)) = (self.spaces.get(&space), self.spaces.get(&base)) else {
            return Err(missing("xrLocateSpace"));
        };
        let location = space
            .locate(base, xr::Time::from_nanos(time.0))
            .map_err(fail("xrLocateSpace"))?;
        Ok(SpaceLocation {
            pose: to_pose(location.pose),
            position_valid: location
                .location_flags
                .contains(xr::SpaceLocationFlags::POSITION_VALID),
            orientation_valid: location
                .location_flags
                .contains(xr::SpaceLocationFlags::ORIENTATION_VALID),
        })
    }

    fn destroy_space(&mut self, space: SpaceId) {
        self.spaces.remove(&space);
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainId) {
        self.swapchains.remove(&swapchain);
    }

    fn destroy_action_set(&mut self, set: ActionSetId) {
        self.actions.retain(|_, action| action.set != set);
        self.action_sets.remove(&set);
    }

    fn destroy_session(&mut self) {
        self.session = None;
    }

    fn destroy_instance(&mut self) {
        self.spaces.clear();
        self.swapchains.clear();
        self.actions.clear();
        self.action_sets.clear();
        self.session = None;
        self.system = None;
        self.instance = None;
    }
}

enum Layer<'a> {
    Projection(xr::CompositionLayerProjection<'a, xr::OpenGL>),
    Quad(xr::CompositionLayerQuad<'a, xr::OpenGL>),
}

impl<'a> Layer<'a> {
    fn base(&self) -> &xr::CompositionLayerBase<'a, xr::OpenGL> {
        match self {
            Self::Projection(layer) => layer,
            Self::Quad(layer) => layer,
        }
    }
}

fn sub_image<'a>(
    swapchain: &'a xr::Swapchain<xr::OpenGL>,
    image: &SubImage,
) -> xr::SwapchainSubImage<'a, xr::OpenGL> {
    xr::SwapchainSubImage::new()
        .swapchain(swapchain)
        .image_rect(xr::Rect2Di {
            offset: xr::Offset2Di { x: 0, y: 0 },
            extent: xr::Extent2Di {
                width: image.width as i32,
                height: image.height as i32,
            },
        })
        .image_array_index(0)
}

fn session_create_info(context: &GraphicsContext) -> Option<xr::opengl::SessionCreateInfo> {
    match *context {
        #[cfg(target_os = "linux")]
        GraphicsContext::Xlib {
            display,
            visual_id,
            fb_config,
            drawable,
            context,
        } => Some(xr::opengl::SessionCreateInfo::Xlib {
            x_display: display as _,
            visualid: visual_id,
            glx_fb_config: fb_config as _,
            glx_drawable: drawable as _,
            glx_context: context as _,
        }),
        #[cfg(target_os = "windows")]
        GraphicsContext::Win32 { hdc, hglrc } => Some(xr::opengl::SessionCreateInfo::Windows {
            h_dc: hdc as _,
            h_glrc: hglrc as _,
        }),
        _ => None,
    }
}

pub(crate) fn to_pose(pose: xr::Posef) -> Pose {
    let p = pose.position;
    let o = pose.orientation;
    Pose::new(Vec3::new(p.x, p.y, p.z), Quat::from_xyzw(o.x, o.y, o.z, o.w))
}

pub(crate) fn to_posef(pose: Pose) -> xr::Posef {
    let o = pose.orientation;
    xr::Posef {
        orientation: xr::Quaternionf {
            x: o.x,
            y: o.y,
            z: o.z,
            w: o.w,
        },
        position: xr::Vector3f {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
        },
    }
}

fn to_fov(fov: xr::Fovf) -> Fov {
    Fov {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn to_fovf(fov: Fov) -> xr::Fovf {
    xr::Fovf {
        angle_left: fov.angle_left,
        angle_right: fov.angle_right,
        angle_up: fov.angle_up,
        angle_down: fov.angle_down,
    }
}

fn from_xr_session_state(state: xr::SessionState) -> SessionState {
    match state {
        xr::SessionState::IDLE => SessionState::Idle,
        xr::SessionState::READY => SessionState::Ready,
        xr::SessionState::SYNCHRONIZED => SessionState::Synchronized,
        xr::SessionState::VISIBLE => SessionState::Visible,
        xr::SessionState::FOCUSED => SessionState::Focused,
        xr::SessionState::STOPPING => SessionState::Stopping,
        xr::SessionState::LOSS_PENDING => SessionState::LossPending,
        xr::SessionState::EXITING => SessionState::Exiting,
        _ => SessionState::Unknown,
    }
}

fn from_xr_blend_mode(mode: xr::EnvironmentBlendMode) -> Option<BlendMode> {
    match mode {
        xr::EnvironmentBlendMode::OPAQUE => Some(BlendMode::Opaque),
        xr::EnvironmentBlendMode::ADDITIVE => Some(BlendMode::Additive),
        xr::EnvironmentBlendMode::ALPHA_BLEND => Some(BlendMode::AlphaBlend),
        _ => None,
    }
}

fn to_xr_blend_mode(mode: BlendMode) -> xr::EnvironmentBlendMode {
    match mode {
        BlendMode::Opaque => xr::EnvironmentBlendMode::OPAQUE,
        BlendMode::Additive => xr::EnvironmentBlendMode::ADDITIVE,
        BlendMode::AlphaBlend => xr::EnvironmentBlendMode::ALPHA_BLEND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quaternion_components_keep_their_order() {
        let posef = xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.7071068,
                z: 0.0,
                w: 0.7071068,
            },
            position: xr::Vector3f {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
        };
        let pose = to_pose(posef);
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((pose.forward() - Vec3::NEG_X).length() < 1e-5);
        assert_eq!(to_posef(pose).orientation.y, 0.7071068);
    }

    #[test]
    fn unknown_blend_modes_are_skipped() {
        assert_eq!(
            from_xr_blend_mode(xr::EnvironmentBlendMode::ALPHA_BLEND),
            Some(BlendMode::AlphaBlend)
        );
        assert_eq!(from_xr_blend_mode(xr::EnvironmentBlendMode::from_raw(99)), None);
    }

    #[test]
    fn session_states_map_one_to_one() {
        assert_eq!(
            from_xr_session_state(xr::SessionState::LOSS_PENDING),
            SessionState::LossPending
        );
        assert_eq!(
            from_xr_session_state(xr::SessionState::UNKNOWN),
            SessionState::Unknown
        );
    }
}
