#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod diag;
pub mod frame;
pub mod graphics;
pub mod input;
pub mod manager;
pub mod math;
pub mod overlay;
pub mod runtime;
pub mod session;
pub mod text;
pub mod types;
pub mod views;

pub use config::{DebugFlags, InputConfig, OverlayConfig, VrConfig};
pub use context::{ContextProvider, GraphicsContext, NoContext};
pub use graphics::{FramebufferId, GraphicsApi, TextureId};
pub use input::InputState;
pub use manager::VrManager;
pub use overlay::MenuPointer;
pub use runtime::{RuntimeError, XrCall, XrRuntime};
pub use text::{PixelBuffer, TextRasterizer};
pub use types::{CompositionLayer, FovTangents, Pose, SessionState};
pub use views::ClipPlanes;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VrError {
    #[error("runtime lacks required capability: {0}")]
    CapabilityMissing(String),
    #[error("runtime call failed: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("no graphics context to bind the session to")]
    NoGraphicsContext,
    #[error("not initialized")]
    NotInitialized,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type VrResult<T> = Result<T, VrError>;
