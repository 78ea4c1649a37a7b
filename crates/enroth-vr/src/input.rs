//! Controller actions and the semantic input state derived from them.
//!
//! Two action sets are declared once per session: gameplay (sticks and
//! buttons) and menu (right-hand aim pose plus select). Both are bound to the
//! Oculus Touch profile in a single suggestion and attached together, since
//! attachment is irreversible for the session.

use glam::Vec2;

use crate::config::InputConfig;
use crate::runtime::{checked, log_failure, ActionDesc, SuggestedBinding, XrRuntime};
use crate::types::{
    ActionId, ActionKind, ActionSetId, Hand, Pose, SessionState, SpaceId, XrTime,
};
use crate::VrResult;

pub const TOUCH_PROFILE: &str = "/interaction_profiles/oculus/touch_controller";

const NO_HANDS: &[Hand] = &[];
const RIGHT_HAND: &[Hand] = &[Hand::Right];

const fn action(name: &'static str, localized_name: &'static str, kind: ActionKind) -> ActionDesc {
    ActionDesc {
        name,
        localized_name,
        kind,
        hands: NO_HANDS,
    }
}

const MOVE: ActionDesc = action("move", "Move", ActionKind::Vector2);
const TURN: ActionDesc = action("turn", "Turn", ActionKind::Vector2);
const ATTACK: ActionDesc = action("attack", "Attack", ActionKind::Boolean);
const CAST_READY: ActionDesc = action("cast_ready", "Cast Ready", ActionKind::Boolean);
const INTERACT: ActionDesc = action("interact", "Interact", ActionKind::Float);
const ESCAPE: ActionDesc = action("escape", "Escape", ActionKind::Float);
const COMBAT: ActionDesc = action("combat", "Toggle Combat", ActionKind::Boolean);
const CAST: ActionDesc = action("cast", "Cast", ActionKind::Boolean);
const FLY_UP: ActionDesc = action("fly_up", "Fly Up", ActionKind::Float);
const FLY_DOWN: ActionDesc = action("fly_down", "Fly Down", ActionKind::Float);
const QUEST: ActionDesc = action("quest", "Quest Log", ActionKind::Boolean);
const PASS: ActionDesc = action("pass", "Pass Turn", ActionKind::Boolean);

const MENU_AIM: ActionDesc = ActionDesc {
    name: "menu_aim",
    localized_name: "Menu Aim",
    kind: ActionKind::Pose,
    hands: RIGHT_HAND,
};
const MENU_SELECT_CLICK: ActionDesc =
    action("menu_select_click", "Menu Select", ActionKind::Boolean);
const MENU_SELECT_VALUE: ActionDesc =
    action("menu_select_value", "Menu Select Value", ActionKind::Float);

/// Semantic per-frame controller snapshot handed to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub movement: Vec2,
    pub turn: Vec2,
    /// Synthesised from the turn stick pushed up; not a bound action.
    pub jump: bool,
    pub attack: bool,
    pub cast_ready: bool,
    pub interact: bool,
    pub escape: bool,
    pub combat: bool,
    pub cast: bool,
    pub fly_up: bool,
    pub fly_down: bool,
    pub quest: bool,
    pub pass: bool,
}

#[derive(Debug, Clone, Copy)]
struct GameplayActions {
    set: ActionSetId,
    movement: ActionId,
    turn: ActionId,
    attack: ActionId,
    cast_ready: ActionId,
    interact: ActionId,
    escape: ActionId,
    combat: ActionId,
    cast: ActionId,
    fly_up: ActionId,
    fly_down: ActionId,
    quest: ActionId,
    pass: ActionId,
}

impl GameplayActions {
    fn create<R: XrRuntime + ?Sized>(runtime: &mut R) -> VrResult<Self> {
        let set = runtime.create_action_set("gameplay", "Gameplay", 0)?;
        let mut make = |desc: &ActionDesc| runtime.create_action(set, desc);
        Ok(Self {
            set,
            movement: make(&MOVE)?,
            turn: make(&TURN)?,
            attack: make(&ATTACK)?,
            cast_ready: make(&CAST_READY)?,
            interact: make(&INTERACT)?,
            escape: make(&ESCAPE)?,
            combat: make(&COMBAT)?,
            cast: make(&CAST)?,
            fly_up: make(&FLY_UP)?,
            fly_down: make(&FLY_DOWN)?,
            quest: make(&QUEST)?,
            pass: make(&PASS)?,
        })
    }

    fn touch_bindings(&self) -> [SuggestedBinding; 12] {
        let bind = |action, path| SuggestedBinding { action, path };
        [
            bind(self.movement, "/user/hand/left/input/thumbstick"),
            bind(self.turn, "/user/hand/right/input/thumbstick"),
            bind(self.attack, "/user/hand/right/input/a/click"),
            bind(self.cast_ready, "/user/hand/right/input/b/click"),
            bind(self.interact, "/user/hand/right/input/trigger/value"),
            bind(self.escape, "/user/hand/left/input/trigger/value"),
            bind(self.combat, "/user/hand/left/input/y/click"),
            bind(self.cast, "/user/hand/left/input/x/click"),
            bind(self.fly_up, "/user/hand/right/input/squeeze/value"),
            bind(self.fly_down, "/user/hand/left/input/squeeze/value"),
            bind(self.quest, "/user/hand/left/input/thumbstick/click"),
            bind(self.pass, "/user/hand/right/input/thumbstick/click"),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct MenuActions {
    set: ActionSetId,
    aim: ActionId,
    select_click: ActionId,
    select_value: ActionId,
}

impl MenuActions {
    fn create<R: XrRuntime + ?Sized>(runtime: &mut R) -> VrResult<Self> {
        let set = runtime.create_action_set("menu", "Menu", 0)?;
        Ok(Self {
            set,
            aim: runtime.create_action(set, &MENU_AIM)?,
            select_click: runtime.create_action(set, &MENU_SELECT_CLICK)?,
            select_value: runtime.create_action(set, &MENU_SELECT_VALUE)?,
        })
    }

    fn touch_bindings(&self) -> [SuggestedBinding; 3] {
        [
            SuggestedBinding {
                action: self.aim,
                path: "/user/hand/right/input/aim/pose",
            },
            // Shares A with gameplay attack. While a menu or panel is up the
            // host ignores gameplay input, so one press only acts once.
            SuggestedBinding {
                action: self.select_click,
                path: "/user/hand/right/input/a/click",
            },
            SuggestedBinding {
                action: self.select_value,
                path: "/user/hand/right/input/trigger/value",
            },
        ]
    }
}

#[derive(Debug)]
pub struct InputMapper {
    config: InputConfig,
    gameplay: Option<GameplayActions>,
    menu: Option<MenuActions>,
    aim_space: Option<SpaceId>,
    attached: bool,
}

impl InputMapper {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            gameplay: None,
            menu: None,
            aim_space: None,
            attached: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn aim_space(&self) -> Option<SpaceId> {
        self.aim_space
    }

    /// Declares, binds and attaches the action sets. Idempotent.
    pub fn setup<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) -> VrResult<()> {
        if self.attached {
            return Ok(());
        }

        let gameplay = match self.gameplay {
            Some(actions) => actions,
            None => {
                let actions = GameplayActions::create(runtime)?;
                self.gameplay = Some(actions);
                actions
            }
        };
        let menu = match self.menu {
            Some(actions) => actions,
            None => {
                let actions = MenuActions::create(runtime)?;
                self.menu = Some(actions);
                actions
            }
        };

        // One suggestion per profile: a later call would replace the earlier one.
        let mut bindings = gameplay.touch_bindings().to_vec();
        bindings.extend(menu.touch_bindings());
        runtime.suggest_bindings(TOUCH_PROFILE, &bindings)?;

        runtime.attach_action_sets(&[gameplay.set, menu.set])?;
        self.attached = true;

        self.aim_space = Some(runtime.create_action_space(menu.aim, Hand::Right)?);
        log::info!(
            "OpenXR actions attached ({} bindings for {TOUCH_PROFILE})",
            bindings.len()
        );
        Ok(())
    }

    fn active_sets(&self) -> Vec<ActionSetId> {
        self.gameplay
            .iter()
            .map(|g| g.set)
            .chain(self.menu.iter().map(|m| m.set))
            .collect()
    }

    /// Synchronises action state for this frame. Only meaningful while the
    /// session is visible or focused.
    pub fn sync<R>(&self, runtime: &mut R, session_state: SessionState) -> bool
    where
        R: XrRuntime + ?Sized,
    {
        if !self.attached || !session_state.accepts_input() {
            return false;
        }
        match runtime.sync_actions(&self.active_sets()) {
            Ok(()) => true,
            Err(err) => {
                log_failure(&*runtime, &err);
                false
            }
        }
    }

    /// Syncs and reads the gameplay snapshot; neutral when input is unavailable.
    pub fn input_state<R: XrRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        session_state: SessionState,
    ) -> InputState {
        if !self.sync(runtime, session_state) {
            return InputState::default();
        }
        self.read_state(runtime)
    }

    /// Reads the gameplay snapshot from the last sync.
    pub fn read_state<R: XrRuntime + ?Sized>(&self, runtime: &mut R) -> InputState {
        let Some(actions) = self.gameplay else {
            return InputState::default();
        };
        let threshold = self.config.press_threshold;
        let vec2 = |runtime: &mut R, action| {
            runtime
                .vector2_state(action, None)
                .ok()
                .filter(|s| s.is_active)
                .map(|s| s.current)
                .unwrap_or(Vec2::ZERO)
        };
        let button = |runtime: &mut R, action| {
            runtime
                .bool_state(action, None)
                .map(|s| s.is_active && s.current)
                .unwrap_or(false)
        };
        let trigger = |runtime: &mut R, action| {
            runtime
                .float_state(action, None)
                .map(|s| s.is_active && s.current > threshold)
                .unwrap_or(false)
        };

        let turn = vec2(runtime, actions.turn);
        InputState {
            movement: vec2(runtime, actions.movement),
            turn,
            jump: turn.y > self.config.jump_threshold,
            attack: button(runtime, actions.attack),
            cast_ready: button(runtime, actions.cast_ready),
            interact: trigger(runtime, actions.interact),
            escape: trigger(runtime, actions.escape),
            combat: button(runtime, actions.combat),
            cast: button(runtime, actions.cast),
            fly_up: trigger(runtime, actions.fly_up),
            fly_down: trigger(runtime, actions.fly_down),
            quest: button(runtime, actions.quest),
            pass: button(runtime, actions.pass),
        }
    }

    /// Raw (held) state of the menu select control.
    pub fn select_pressed<R: XrRuntime + ?Sized>(&self, runtime: &mut R) -> bool {
        let Some(menu) = self.menu else {
            return false;
        };
        let click = runtime
            .bool_state(menu.select_click, None)
            .map(|s| s.is_active && s.current)
            .unwrap_or(false);
        let value = runtime
            .float_state(menu.select_value, None)
            .map(|s| s.is_active && s.current > self.config.press_threshold)
            .unwrap_or(false);
        click || value
    }

    /// Right-hand aim pose in `base` at `time`, if tracked.
    pub fn aim_pose<R: XrRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        base: SpaceId,
        time: XrTime,
    ) -> Option<Pose> {
        let space = self.aim_space?;
        let result = runtime.locate_space(space, base, time);
        let location = checked(&*runtime, result)?;
        location.is_tracked().then_some(location.pose)
    }

    pub fn destroy_spaces<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        if let Some(space) = self.aim_space.take() {
            runtime.destroy_space(space);
        }
    }

    pub fn destroy_action_sets<R: XrRuntime + ?Sized>(&mut self, runtime: &mut R) {
        for set in self.active_sets() {
            runtime.destroy_action_set(set);
        }
        self.gameplay = None;
        self.menu = None;
        self.attached = false;
    }
}

/// Turns a held signal into press-this-frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    pub fn update(&mut self, pressed: bool) -> bool {
        let edge = pressed && !self.previous;
        self.previous = pressed;
        edge
    }

    pub fn reset(&mut self) {
        self.previous = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickStep {
    Up,
    Down,
}

/// One discrete step per stick deflection. After a step the stick must come
/// back inside the re-arm zone before it can step again.
#[derive(Debug, Clone, Copy)]
pub struct StickStepper {
    step_threshold: f32,
    rearm_threshold: f32,
    armed: bool,
}

impl StickStepper {
    pub fn new(step_threshold: f32, rearm_threshold: f32) -> Self {
        Self {
            step_threshold,
            rearm_threshold,
            armed: true,
        }
    }

    pub fn update(&mut self, value: f32) -> Option<StickStep> {
        if !self.armed {
            if value.abs() < self.rearm_threshold {
                self.armed = true;
            }
            return None;
        }
        let step = if value > self.step_threshold {
            StickStep::Up
        } else if value < -self.step_threshold {
            StickStep::Down
        } else {
            return None;
        };
        self.armed = false;
        Some(step)
    }
}

impl From<&InputConfig> for StickStepper {
    fn from(config: &InputConfig) -> Self {
        Self::new(config.menu_step_threshold, config.menu_rearm_threshold)
    }
}
