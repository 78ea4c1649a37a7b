//! Session state machine and frame pacing.
//!
//! The loop only runs frames while the session is running. Every frame that
//! is begun with the runtime is ended exactly once, whether or not the host
//! renders it.

use crate::graphics::{GraphicsApi, ScissorState};
use crate::runtime::{log_failure, XrRuntime};
use crate::types::{BlendMode, CompositionLayer, FrameTiming, RuntimeEvent, SessionState, XrTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    SessionReady,
    Running,
    Stopping,
}

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    session_state: SessionState,
    timing: FrameTiming,
    begun: bool,
    should_render: bool,
    saved_scissor: Option<ScissorState>,
    frames_ended: u64,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self {
            state: LoopState::Idle,
            session_state: SessionState::Unknown,
            timing: FrameTiming::default(),
            begun: false,
            should_render: false,
            saved_scissor: None,
            frames_ended: 0,
        }
    }
}

impl FrameLoop {
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    /// True only between a successful begin and the matching end of a frame
    /// the compositor wants drawn.
    pub fn should_render(&self) -> bool {
        self.begun && self.should_render
    }

    pub fn display_time(&self) -> XrTime {
        self.timing.predicted_display_time
    }

    pub fn frames_ended(&self) -> u64 {
        self.frames_ended
    }

    /// Drains pending runtime events, beginning or ending the session as the
    /// runtime asks.
    pub fn poll_events<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        loop {
            match runtime.poll_event() {
                Ok(Some(event)) => self.handle_event(runtime, event),
                Ok(None) => break,
                Err(err) => {
                    log_failure(&*runtime, &err);
                    break;
                }
            }
        }
    }

    fn handle_event<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R, event: RuntimeEvent) {
        match event {
            RuntimeEvent::SessionStateChanged(state) => {
                log::info!(
                    "OpenXR session state {} -> {}",
                    self.session_state.as_str(),
                    state.as_str()
                );
                self.session_state = state;
                match state {
                    SessionState::Ready => {
                        self.state = LoopState::SessionReady;
                        match runtime.begin_session() {
                            Ok(()) => {
                                self.state = LoopState::Running;
                                log::info!("OpenXR session running");
                            }
                            Err(err) => {
                                log_failure(&*runtime, &err);
                                self.state = LoopState::Idle;
                            }
                        }
                    }
                    SessionState::Stopping => {
                        self.state = LoopState::Stopping;
                        if let Err(err) = runtime.end_session() {
                            log_failure(&*runtime, &err);
                        }
                        self.state = LoopState::Idle;
                    }
                    SessionState::LossPending | SessionState::Exiting => {
                        log::warn!("OpenXR session {}; frames stop", state.as_str());
                        self.state = LoopState::Idle;
                    }
                    _ => {}
                }
            }
            RuntimeEvent::InstanceLossPending => {
                log::warn!("OpenXR instance loss pending");
                self.state = LoopState::Idle;
            }
            RuntimeEvent::Other => {}
        }
    }

    /// Waits for the next frame slot and begins it. Returns false when no
    /// frame was begun.
    pub fn wait_and_begin<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) -> bool {
        debug_assert!(!self.begun, "frame begun twice without end");
        if !self.is_running() || self.begun {
            return false;
        }

        self.timing = match runtime.wait_frame() {
            Ok(timing) => timing,
            Err(err) => {
                log_failure(&*runtime, &err);
                return false;
            }
        };
        if let Err(err) = runtime.begin_frame() {
            log_failure(&*runtime, &err);
            return false;
        }
        self.begun = true;
        self.should_render = self.timing.should_render;
        true
    }

    /// Marks the current frame as not rendered, e.g. when its views could not be located.
    pub fn skip_render(&mut self) {
        self.should_render = false;
    }

    /// Disables the host's scissor for the eye passes. Restored in [`Self::finish`].
    pub fn suspend_scissor<G: GraphicsApi + ?Sized>(&mut self, gfx: &mut G) {
        let saved = gfx.scissor();
        self.saved_scissor = Some(saved);
        gfx.set_scissor(ScissorState {
            enabled: false,
            ..saved
        });
    }

    /// Submits `layers` and closes the frame. No-op when no frame is begun.
    pub fn finish<R, G>(
        &mut self,
        runtime: &mut R,
        gfx: &mut G,
        blend_mode: BlendMode,
        layers: &[CompositionLayer],
    ) where
        R: XrRuntime + ?Sized,
        G: GraphicsApi + ?Sized,
    {
        if !self.begun {
            return;
        }
        let display_time = self.timing.predicted_display_time;
        if let Err(err) = runtime.end_frame(display_time, blend_mode, layers) {
            log_failure(&*runtime, &err);
        }
        if let Some(scissor) = self.saved_scissor.take() {
            gfx.set_scissor(scissor);
        }
        self.begun = false;
        self.should_render = false;
        self.frames_ended += 1;
    }

    /// Forgets all session progress; used on shutdown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
