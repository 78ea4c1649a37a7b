//! Graphics context handles the session binds to.
//!
//! Handles are carried as plain integers so the core stays free of raw
//! pointers; the runtime backend converts them back when creating the session.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsContext {
    Win32 {
        hdc: usize,
        hglrc: usize,
    },
    Xlib {
        display: usize,
        visual_id: u32,
        fb_config: usize,
        drawable: u64,
        context: usize,
    },
}

impl GraphicsContext {
    /// All handles are non-null.
    pub fn is_complete(&self) -> bool {
        match *self {
            Self::Win32 { hdc, hglrc } => hdc != 0 && hglrc != 0,
            Self::Xlib {
                display,
                fb_config,
                drawable,
                context,
                ..
            } => display != 0 && fb_config != 0 && drawable != 0 && context != 0,
        }
    }

    pub fn platform(&self) -> &'static str {
        match self {
            Self::Win32 { .. } => "WGL",
            Self::Xlib { .. } => "GLX",
        }
    }
}

/// Finds the graphics context current on the calling thread.
pub trait ContextProvider {
    fn current_context(&self) -> Option<GraphicsContext>;
}

/// Provider for hosts that always pass handles explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContext;

impl ContextProvider for NoContext {
    fn current_context(&self) -> Option<GraphicsContext> {
        None
    }
}
