//! Instance, system and session lifecycle.

use crate::config::VrConfig;
use crate::context::{ContextProvider, GraphicsContext};
use crate::runtime::{checked, XrRuntime};
use crate::types::{
    ApplicationInfo, BlendMode, GraphicsRequirements, ReferenceSpaceKind, SpaceId, SystemInfo,
};
use crate::{VrError, VrResult};

/// Interop extension every supported runtime must expose.
pub const OPENGL_EXTENSION: &str = "XR_KHR_opengl_enable";

#[derive(Debug, Default)]
pub struct XrSession {
    instance: bool,
    system: Option<SystemInfo>,
    requirements: Option<GraphicsRequirements>,
    session: bool,
    local_space: Option<SpaceId>,
    view_space: Option<SpaceId>,
    blend_mode: Option<BlendMode>,
}

impl XrSession {
    pub fn is_initialized(&self) -> bool {
        self.instance && self.system.is_some() && self.requirements.is_some()
    }

    pub fn has_session(&self) -> bool {
        self.session
    }

    pub fn system(&self) -> Option<&SystemInfo> {
        self.system.as_ref()
    }

    pub fn requirements(&self) -> Option<GraphicsRequirements> {
        self.requirements
    }

    /// Seated world space the projection layer is submitted in.
    pub fn local_space(&self) -> Option<SpaceId> {
        self.local_space
    }

    /// Head-relative space used for head-locked quad layers.
    pub fn view_space(&self) -> Option<SpaceId> {
        self.view_space
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode.unwrap_or(BlendMode::Opaque)
    }

    /// Loads the runtime, checks for OpenGL interop and queries the headset.
    /// Calling it again after success does nothing.
    pub fn initialize<R: XrRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        config: &VrConfig,
    ) -> VrResult<()> {
        if self.is_initialized() {
            return Ok(());
        }

        if !self.instance {
            let extensions = runtime.enumerate_extensions()?;
            if !extensions.iter().any(|e| e == OPENGL_EXTENSION) {
                log::error!("OpenXR runtime does not support {OPENGL_EXTENSION}");
                return Err(VrError::CapabilityMissing(OPENGL_EXTENSION.to_string()));
            }

            let app = ApplicationInfo {
                application_name: config.application_name.clone(),
                application_version: 1,
                engine_name: config.engine_name.clone(),
                engine_version: 1,
            };
            runtime.create_instance(&app, &[OPENGL_EXTENSION])?;
            self.instance = true;

            match runtime.runtime_info() {
                Some(info) => log::info!(
                    "OpenXR runtime: {} {}",
                    info.runtime_name,
                    info.runtime_version
                ),
                None => log::info!("OpenXR runtime: unknown"),
            }
        }

        let system = runtime.system()?;
        log::info!(
            "OpenXR system: {} (vendor {:#x}, {} layers, orientation tracking {}, position tracking {})",
            system.system_name,
            system.vendor_id,
            system.max_layer_count,
            system.orientation_tracking,
            system.position_tracking
        );
        self.system = Some(system);

        let requirements = runtime.graphics_requirements()?;
        log::info!(
            "OpenXR OpenGL requirements: min {}.{}, max {}.{}",
            requirements.min_api_version.0,
            requirements.min_api_version.1,
            requirements.max_api_version.0,
            requirements.max_api_version.1
        );
        self.requirements = Some(requirements);
        Ok(())
    }

    /// Binds a session to the host's GL context and creates the seated and
    /// head spaces. An explicit context wins over discovery.
    pub fn create_session<R: XrRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        context: Option<GraphicsContext>,
        provider: &dyn ContextProvider,
    ) -> VrResult<()> {
        if !self.is_initialized() {
            return Err(VrError::NotInitialized);
        }
        if self.session {
            return Ok(());
        }

        let context = context
            .filter(GraphicsContext::is_complete)
            .or_else(|| provider.current_context().filter(GraphicsContext::is_complete))
            .ok_or_else(|| {
                log::error!("no current OpenGL context to bind the OpenXR session to");
                VrError::NoGraphicsContext
            })?;

        runtime.create_session(&context)?;
        self.session = true;
        log::info!("OpenXR session created ({})", context.platform());

        self.local_space = Some(runtime.create_reference_space(ReferenceSpaceKind::Local)?);
        self.view_space = Some(runtime.create_reference_space(ReferenceSpaceKind::View)?);
        Ok(())
    }

    /// Chooses how rendered frames combine with the user's surroundings.
    pub fn negotiate_blend_mode<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) -> BlendMode {
        let result = runtime.environment_blend_modes();
        let available = checked(&*runtime, result).unwrap_or_default();
        let mode = BlendMode::negotiate(&available);
        log::info!("OpenXR blend mode: {mode:?} (available {available:?})");
        self.blend_mode = Some(mode);
        mode
    }

    pub fn destroy_spaces<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        if let Some(space) = self.view_space.take() {
            runtime.destroy_space(space);
        }
        if let Some(space) = self.local_space.take() {
            runtime.destroy_space(space);
        }
    }

    /// Destroys the session and then the instance. Spaces, swapchains and
    /// action sets must already be gone.
    pub fn destroy<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        if self.session {
            runtime.destroy_session();
            self.session = false;
        }
        if self.instance {
            runtime.destroy_instance();
            self.instance = false;
        }
        self.system = None;
        self.requirements = None;
        self.blend_mode = None;
    }
}
