//! Discovers the OpenGL context current on the calling thread.
//!
//! GLX on Linux, WGL on Windows. Everywhere else discovery yields nothing and
//! the host has to pass handles explicitly.

use std::ffi::c_void;

use enroth_vr::context::{ContextProvider, GraphicsContext};

/// Reads the thread's current GL context from the platform window system.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentContext;

impl ContextProvider for CurrentContext {
    fn current_context(&self) -> Option<GraphicsContext> {
        let context = platform::current_context();
        match &context {
            Some(ctx) => log::debug!("discovered current {} context", ctx.platform()),
            None => log::debug!("no current GL context on this thread"),
        }
        context
    }
}

/// Resolves a GL entry point for the current context, or null.
pub fn proc_address(name: &str) -> *const c_void {
    platform::proc_address(name)
}

#[cfg(target_os = "linux")]
mod platform {
    use std::ffi::{c_void, CString};
    use std::ptr;

    use enroth_vr::context::GraphicsContext;
    use x11::{glx, xlib};

    pub fn current_context() -> Option<GraphicsContext> {
        unsafe {
            let display = glx::glXGetCurrentDisplay();
            let context = glx::glXGetCurrentContext();
            let drawable = glx::glXGetCurrentDrawable();
            if display.is_null() || context.is_null() || drawable == 0 {
                return None;
            }

            let mut fb_config_id = 0;
            if glx::glXQueryContext(display, context, glx::GLX_FBCONFIG_ID, &mut fb_config_id)
                != 0
            {
                log::warn!("glXQueryContext(GLX_FBCONFIG_ID) failed");
                return None;
            }
            let attrs = [glx::GLX_FBCONFIG_ID, fb_config_id, 0];
            let screen = xlib::XDefaultScreen(display);
            let mut count = 0;
            let configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut count);
            if configs.is_null() || count == 0 {
                log::warn!("no GLX framebuffer config matches the current context");
                return None;
            }
            let fb_config = *configs;
            xlib::XFree(configs as *mut _);

            let visual = glx::glXGetVisualFromFBConfig(display, fb_config);
            let visual_id = if visual.is_null() {
                0
            } else {
                let id = (*visual).visualid as u32;
                xlib::XFree(visual as *mut _);
                id
            };

            Some(GraphicsContext::Xlib {
                display: display as usize,
                visual_id,
                fb_config: fb_config as usize,
                drawable,
                context: context as usize,
            })
        }
    }

    pub fn proc_address(name: &str) -> *const c_void {
        let Ok(symbol) = CString::new(name) else {
            return ptr::null();
        };
        match unsafe { glx::glXGetProcAddress(symbol.as_ptr() as *const u8) } {
            Some(function) => function as *const c_void,
            None => ptr::null(),
        }
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::ffi::{c_void, CString};
    use std::ptr;

    use enroth_vr::context::GraphicsContext;
    use windows::core::{s, PCSTR};
    use windows::Win32::Graphics::OpenGL::{
        wglGetCurrentContext, wglGetCurrentDC, wglGetProcAddress,
    };
    use windows::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};

    pub fn current_context() -> Option<GraphicsContext> {
        let (hdc, hglrc) = unsafe { (wglGetCurrentDC(), wglGetCurrentContext()) };
        if hdc.is_invalid() || hglrc.is_invalid() {
            return None;
        }
        Some(GraphicsContext::Win32 {
            hdc: hdc.0 as usize,
            hglrc: hglrc.0 as usize,
        })
    }

    pub fn proc_address(name: &str) -> *const c_void {
        let Ok(symbol) = CString::new(name) else {
            return ptr::null();
        };
        let symbol = PCSTR(symbol.as_ptr() as *const u8);
        unsafe {
            if let Some(function) = wglGetProcAddress(symbol) {
                return function as *const c_void;
            }
            // GL 1.1 entry points are only exported by opengl32.dll itself.
            let Ok(module) = GetModuleHandleA(s!("opengl32.dll")) else {
                return ptr::null();
            };
            match GetProcAddress(module, symbol) {
                Some(function) => function as *const c_void,
                None => ptr::null(),
            }
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod platform {
    use std::ffi::c_void;
    use std::ptr;

    use enroth_vr::context::GraphicsContext;

    pub fn current_context() -> Option<GraphicsContext> {
        None
    }

    pub fn proc_address(_name: &str) -> *const c_void {
        ptr::null()
    }
}
