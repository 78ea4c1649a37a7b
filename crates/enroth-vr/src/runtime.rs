//! Capability interface onto the XR runtime.
//!
//! The core never talks to a runtime loader directly. Everything it needs
//! (instance/session/space/swapchain/action lifecycle, event polling, frame
//! pacing, view and space location) goes through [`XrRuntime`], and every
//! call reports failure as a [`RuntimeError`] carrying the call name and the
//! runtime's numeric result code.

use glam::Vec2;
use thiserror::Error;

use crate::graphics::TextureId;
use crate::types::{
    ActionId, ActionKind, ActionSetId, ActionState, ApplicationInfo, BlendMode,
    CompositionLayer, FrameTiming, GraphicsRequirements, Hand, ReferenceSpaceKind, RuntimeEvent,
    RuntimeInfo, SpaceId, SpaceLocation, SwapchainDesc, SwapchainId, SystemInfo, ViewConfig,
    ViewLocation, XrDuration, XrTime,
};
use crate::context::GraphicsContext;

/// Failed runtime call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{call} failed: {code} [{}]", result_name(*.code))]
pub struct RuntimeError {
    pub call: &'static str,
    pub code: i32,
}

impl RuntimeError {
    pub fn new(call: &'static str, code: i32) -> Self {
        Self { call, code }
    }

    pub fn name(&self) -> &'static str {
        result_name(self.code)
    }
}

pub type XrCall<T> = Result<T, RuntimeError>;

/// Symbolic name for the result codes the runtime commonly reports.
pub fn result_name(code: i32) -> &'static str {
    match code {
        0 => "XR_SUCCESS",
        1 => "XR_TIMEOUT_EXPIRED",
        3 => "XR_SESSION_LOSS_PENDING",
        4 => "XR_EVENT_UNAVAILABLE",
        7 => "XR_SPACE_BOUNDS_UNAVAILABLE",
        8 => "XR_SESSION_NOT_FOCUSED",
        9 => "XR_FRAME_DISCARDED",
        -1 => "XR_ERROR_VALIDATION_FAILURE",
        -2 => "XR_ERROR_RUNTIME_FAILURE",
        -3 => "XR_ERROR_OUT_OF_MEMORY",
        -4 => "XR_ERROR_API_VERSION_UNSUPPORTED",
        -6 => "XR_ERROR_INITIALIZATION_FAILED",
        -7 => "XR_ERROR_FUNCTION_UNSUPPORTED",
        -8 => "XR_ERROR_FEATURE_UNSUPPORTED",
        -9 => "XR_ERROR_EXTENSION_NOT_PRESENT",
        -10 => "XR_ERROR_LIMIT_REACHED",
        -11 => "XR_ERROR_SIZE_INSUFFICIENT",
        -12 => "XR_ERROR_HANDLE_INVALID",
        -13 => "XR_ERROR_INSTANCE_LOST",
        -14 => "XR_ERROR_SESSION_RUNNING",
        -16 => "XR_ERROR_SESSION_NOT_RUNNING",
        -17 => "XR_ERROR_SESSION_LOST",
        -18 => "XR_ERROR_SYSTEM_INVALID",
        -19 => "XR_ERROR_PATH_INVALID",
        -20 => "XR_ERROR_PATH_COUNT_EXCEEDED",
        -21 => "XR_ERROR_PATH_FORMAT_INVALID",
        -22 => "XR_ERROR_PATH_UNSUPPORTED",
        -23 => "XR_ERROR_LAYER_INVALID",
        -24 => "XR_ERROR_LAYER_LIMIT_EXCEEDED",
        -25 => "XR_ERROR_SWAPCHAIN_RECT_INVALID",
        -26 => "XR_ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED",
        -27 => "XR_ERROR_ACTION_TYPE_MISMATCH",
        -28 => "XR_ERROR_SESSION_NOT_READY",
        -29 => "XR_ERROR_SESSION_NOT_STOPPING",
        -30 => "XR_ERROR_TIME_INVALID",
        -31 => "XR_ERROR_REFERENCE_SPACE_UNSUPPORTED",
        -32 => "XR_ERROR_FILE_ACCESS_ERROR",
        -33 => "XR_ERROR_FILE_CONTENTS_INVALID",
        -34 => "XR_ERROR_FORM_FACTOR_UNSUPPORTED",
        -35 => "XR_ERROR_FORM_FACTOR_UNAVAILABLE",
        -36 => "XR_ERROR_API_LAYER_NOT_PRESENT",
        -37 => "XR_ERROR_CALL_ORDER_INVALID",
        -38 => "XR_ERROR_GRAPHICS_DEVICE_INVALID",
        -39 => "XR_ERROR_POSE_INVALID",
        -40 => "XR_ERROR_INDEX_OUT_OF_RANGE",
        -41 => "XR_ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED",
        -42 => "XR_ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED",
        -44 => "XR_ERROR_NAME_DUPLICATED",
        -45 => "XR_ERROR_NAME_INVALID",
        -46 => "XR_ERROR_ACTIONSET_NOT_ATTACHED",
        -47 => "XR_ERROR_ACTIONSETS_ALREADY_ATTACHED",
        -48 => "XR_ERROR_LOCALIZED_NAME_DUPLICATED",
        -49 => "XR_ERROR_LOCALIZED_NAME_INVALID",
        -50 => "XR_ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING",
        -51 => "XR_ERROR_RUNTIME_UNAVAILABLE",
        _ => "XR_UNKNOWN_RESULT",
    }
}

/// Logs a failed call, preferring the runtime's own description of the code.
pub fn log_failure<R: XrRuntime + ?Sized>(runtime: &R, err: &RuntimeError) {
    match runtime.result_string(err.code) {
        Some(text) => log::error!(
            "OpenXR {} failed: {} [{}] ({})",
            err.call,
            text,
            err.name(),
            err.code
        ),
        None => log::error!("OpenXR {} failed: {} [{}]", err.call, err.code, err.name()),
    }
}

/// Unwraps a call result, logging the failure and returning `None` on error.
pub fn checked<R: XrRuntime + ?Sized, T>(runtime: &R, result: XrCall<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log_failure(runtime, &err);
            None
        }
    }
}

/// Input action declaration handed to [`XrRuntime::create_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDesc {
    pub name: &'static str,
    pub localized_name: &'static str,
    pub kind: ActionKind,
    pub hands: &'static [Hand],
}

/// One suggested binding: action plus the full input path it binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedBinding {
    pub action: ActionId,
    pub path: &'static str,
}

/// Everything the core consumes from the XR runtime.
///
/// Implementations own the real handles and hand out lightweight ids.
/// Destroy calls on unknown ids are no-ops.
pub trait XrRuntime {
    fn enumerate_extensions(&mut self) -> XrCall<Vec<String>>;
    fn create_instance(&mut self, app: &ApplicationInfo, extensions: &[&str]) -> XrCall<()>;
    fn runtime_info(&self) -> Option<RuntimeInfo>;
    /// Human-readable description of a result code, when the runtime provides one.
    fn result_string(&self, code: i32) -> Option<String>;
    /// Locates the head-mounted display system.
    fn system(&mut self) -> XrCall<SystemInfo>;
    fn graphics_requirements(&mut self) -> XrCall<GraphicsRequirements>;

    fn create_session(&mut self, context: &GraphicsContext) -> XrCall<()>;
    fn create_reference_space(&mut self, kind: ReferenceSpaceKind) -> XrCall<SpaceId>;
    fn view_configuration(&mut self) -> XrCall<Vec<ViewConfig>>;
    fn environment_blend_modes(&mut self) -> XrCall<Vec<BlendMode>>;
    fn swapchain_formats(&mut self) -> XrCall<Vec<u32>>;

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> XrCall<SwapchainId>;
    fn swapchain_images(&mut self, swapchain: SwapchainId) -> XrCall<Vec<TextureId>>;
    fn acquire_image(&mut self, swapchain: SwapchainId) -> XrCall<u32>;
    fn wait_image(&mut self, swapchain: SwapchainId, timeout: XrDuration) -> XrCall<()>;
    fn release_image(&mut self, swapchain: SwapchainId) -> XrCall<()>;

    fn poll_event(&mut self) -> XrCall<Option<RuntimeEvent>>;
    fn begin_session(&mut self) -> XrCall<()>;
    fn end_session(&mut self) -> XrCall<()>;

    fn wait_frame(&mut self) -> XrCall<FrameTiming>;
    fn begin_frame(&mut self) -> XrCall<()>;
    fn locate_views(&mut self, time: XrTime, space: SpaceId) -> XrCall<Vec<ViewLocation>>;
    fn end_frame(
        &mut self,
        time: XrTime,
        blend_mode: BlendMode,
        layers: &[CompositionLayer],
    ) -> XrCall<()>;

    fn create_action_set(
        &mut self,
        name: &str,
        localized_name: &str,
        priority: u32,
    ) -> XrCall<ActionSetId>;
    fn create_action(&mut self, set: ActionSetId, desc: &ActionDesc) -> XrCall<ActionId>;
    fn suggest_bindings(&mut self, profile: &str, bindings: &[SuggestedBinding]) -> XrCall<()>;
    fn attach_action_sets(&mut self, sets: &[ActionSetId]) -> XrCall<()>;
    fn sync_actions(&mut self, sets: &[ActionSetId]) -> XrCall<()>;
    fn bool_state(&mut self, action: ActionId, hand: Option<Hand>) -> XrCall<ActionState<bool>>;
    fn float_state(&mut self, action: ActionId, hand: Option<Hand>) -> XrCall<ActionState<f32>>;
    fn vector2_state(&mut self, action: ActionId, hand: Option<Hand>)
        -> XrCall<ActionState<Vec2>>;
    fn create_action_space(&mut self, action: ActionId, hand: Hand) -> XrCall<SpaceId>;
    fn locate_space(&mut self, space: SpaceId, base: SpaceId, time: XrTime)
        -> XrCall<SpaceLocation>;

    fn destroy_space(&mut self, space: SpaceId);
    fn destroy_swapchain(&mut self, swapchain: SwapchainId);
    fn destroy_action_set(&mut self, set: ActionSetId);
    fn destroy_session(&mut self);
    fn destroy_instance(&mut self);
}
