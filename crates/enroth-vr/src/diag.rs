use std::collections::HashSet;

/// Messages worth logging once per manager rather than every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    EyeFramebufferComplete,
    OverlayCapture,
    OverlayLayerCapture,
    OverlayLayerSubmit,
    OverlayLayerPlacement,
    QuadShaderFailure,
    PointerTarget,
}

#[derive(Debug, Default)]
pub struct OneShotLog {
    fired: HashSet<Diagnostic>,
}

impl OneShotLog {
    /// True the first time `diagnostic` is seen.
    pub fn first(&mut self, diagnostic: Diagnostic) -> bool {
        self.fired.insert(diagnostic)
    }

    pub fn has_fired(&self, diagnostic: Diagnostic) -> bool {
        self.fired.contains(&diagnostic)
    }

    pub fn reset(&mut self) {
        self.fired.clear();
    }
}
