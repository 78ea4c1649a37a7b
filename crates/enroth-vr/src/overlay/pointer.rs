//! Controller-driven cursor for the host's mouse-based UI.

use glam::Vec2;

use crate::input::EdgeDetector;
use crate::math::{intersect_ray_quad, uv_to_pixel, Quad, Ray};

/// Cursor in host screen pixels plus a click that fires once per press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuPointer {
    pub x: i32,
    pub y: i32,
    pub click: bool,
}

/// Aim ray and select edge, refreshed once per frame.
#[derive(Debug, Default)]
pub struct PointerState {
    ray: Option<Ray>,
    select: EdgeDetector,
    clicked: bool,
    /// Last hit on the target, kept so the cursor holds still when the ray
    /// leaves the panel.
    last_uv: Option<Vec2>,
}

impl PointerState {
    pub fn update(&mut self, ray: Option<Ray>, select_pressed: bool) {
        self.ray = ray;
        self.clicked = self.select.update(select_pressed);
    }

    /// Drops this frame's click without sampling the button. Frames that are
    /// not rendered never report a press.
    pub fn clear_click(&mut self) {
        self.clicked = false;
    }

    pub fn ray(&self) -> Option<Ray> {
        self.ray
    }

    /// Edge-detected select for this frame.
    pub fn clicked(&self) -> bool {
        self.clicked
    }

    /// Maps the aim ray onto `target` and then onto a `width` x `height`
    /// screen. `None` when there is no interactive target.
    pub fn locate(
        &mut self,
        target: Option<&Quad>,
        width: u32,
        height: u32,
    ) -> Option<MenuPointer> {
        let Some(target) = target else {
            self.last_uv = None;
            return None;
        };
        let hit = self
            .ray
            .as_ref()
            .and_then(|ray| intersect_ray_quad(ray, target));
        if let Some(hit) = hit {
            self.last_uv = Some(hit.uv);
        }
        let uv = self.last_uv.unwrap_or(Vec2::splat(0.5));
        let (x, y) = uv_to_pixel(uv, width, height);
        Some(MenuPointer {
            x,
            y,
            click: self.clicked && hit.is_some(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
