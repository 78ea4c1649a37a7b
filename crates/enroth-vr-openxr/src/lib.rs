//! OpenXR and OpenGL backends for `enroth-vr`.
//!
//! [`OpenXrRuntime`] drives the system runtime through the OpenXR loader,
//! [`GlowGraphics`] issues GL calls on the host's context, and
//! [`CurrentContext`] finds the native handles of that context so the
//! session can bind to it.

pub mod context;
pub mod gl;
pub mod runtime;

use enroth_vr::{VrConfig, VrManager};
use thiserror::Error;

pub use context::{proc_address, CurrentContext};
pub use gl::GlowGraphics;
pub use runtime::OpenXrRuntime;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    Loader(String),
}

/// Manager wired to the real runtime and GL backends.
pub type OpenXrManager = VrManager<OpenXrRuntime, GlowGraphics>;

/// Builds a manager against the loader and the GL context current on this
/// thread.
///
/// # Safety
///
/// The host's GL context must be current and stay current on this thread for
/// every later call into the manager.
pub unsafe fn manager_for_current_context(
    config: VrConfig,
) -> Result<OpenXrManager, BackendError> {
    let runtime = OpenXrRuntime::load()?;
    let gfx = GlowGraphics::from_loader_function(proc_address);
    Ok(VrManager::new(runtime, gfx, config))
}
