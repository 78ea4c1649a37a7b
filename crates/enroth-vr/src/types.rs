use glam::{Quat, Vec2, Vec3};

/// Runtime timestamp in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct XrTime(pub i64);

/// Timeout passed to swapchain image waits, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrDuration(pub i64);

impl XrDuration {
    pub const INFINITE: Self = Self(i64::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Direction the pose looks along (runtime convention: -Z is forward).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }
}

/// Field of view half-angles in radians, as reported per eye by the runtime.
/// `angle_left` and `angle_down` are normally negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

/// Tangents of the four FOV half-angles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FovTangents {
    pub left: f32,
    pub right: f32,
    pub up: f32,
    pub down: f32,
}

impl Fov {
    pub fn tangents(&self) -> FovTangents {
        FovTangents {
            left: self.angle_left.tan(),
            right: self.angle_right.tan(),
            up: self.angle_up.tan(),
            down: self.angle_down.tan(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl SessionState {
    /// Action state is only delivered while the session is visible or focused.
    pub fn accepts_input(self) -> bool {
        matches!(self, Self::Visible | Self::Focused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Synchronized => "synchronized",
            Self::Visible => "visible",
            Self::Focused => "focused",
            Self::Stopping => "stopping",
            Self::LossPending => "loss-pending",
            Self::Exiting => "exiting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    SessionStateChanged(SessionState),
    InstanceLossPending,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Additive,
    AlphaBlend,
}

impl BlendMode {
    /// Picks opaque, then alpha-blend, then additive; otherwise the first
    /// mode the runtime listed.
    pub fn negotiate(available: &[BlendMode]) -> BlendMode {
        const PREFERENCE: [BlendMode; 3] =
            [BlendMode::Opaque, BlendMode::AlphaBlend, BlendMode::Additive];
        PREFERENCE
            .iter()
            .copied()
            .find(|mode| available.contains(mode))
            .or_else(|| available.first().copied())
            .unwrap_or(BlendMode::Opaque)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSpaceKind {
    /// World origin fixed where the session started.
    Local,
    /// Origin tracks the headset.
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn user_path(self) -> &'static str {
        match self {
            Self::Left => "/user/hand/left",
            Self::Right => "/user/hand/right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapchainId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionSetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeInfo {
    pub runtime_name: String,
    pub runtime_version: String,
}

#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
    pub system_name: String,
    pub vendor_id: u32,
    pub max_layer_count: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
}

/// Graphics API versions the runtime accepts for interop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsRequirements {
    pub min_api_version: (u16, u16),
    pub max_api_version: (u16, u16),
}

/// Recommended render configuration for one view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewConfig {
    pub recommended_width: u32,
    pub recommended_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub recommended_sample_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTiming {
    pub predicted_display_time: XrTime,
    pub predicted_display_period: i64,
    pub should_render: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewLocation {
    pub pose: Pose,
    pub fov: Fov,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpaceLocation {
    pub pose: Pose,
    pub position_valid: bool,
    pub orientation_valid: bool,
}

impl SpaceLocation {
    pub fn is_tracked(&self) -> bool {
        self.position_valid && self.orientation_valid
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionState<T> {
    pub current: T,
    pub is_active: bool,
    pub changed_since_last_sync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Boolean,
    Float,
    Vector2,
    Pose,
}

/// A sub-rectangle of a swapchain image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubImage {
    pub swapchain: SwapchainId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionView {
    pub pose: Pose,
    pub fov: Fov,
    pub sub_image: SubImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadPlacement {
    /// Attached to the view space; moves with the head.
    HeadLocked,
    /// Fixed world pose latched once.
    WorldAnchored,
    /// World space at the identity pose, used when nothing better exists.
    WorldIdentity,
}

/// One unit of content handed to the compositor at frame end.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionLayer {
    Projection {
        space: SpaceId,
        views: Vec<ProjectionView>,
    },
    Quad {
        space: SpaceId,
        placement: QuadPlacement,
        sub_image: SubImage,
        pose: Pose,
        size: Vec2,
    },
}
