//! Interactive panel latched in the world in front of the player.

use glam::Vec2;

use crate::config::OverlayConfig;
use crate::math::{intersect_ray_quad, Quad, QuadHit, Ray};
use crate::overlay::{level_pose_ahead, AnchorLatch};
use crate::types::Pose;

#[derive(Debug)]
pub struct WorldPanel {
    anchor: AnchorLatch,
    distance: f32,
    width: f32,
    aspect: f32,
}

impl WorldPanel {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            anchor: AnchorLatch::default(),
            distance: config.panel_distance,
            width: config.panel_width,
            aspect: 9.0 / 16.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_enabled()
    }

    /// Activating after a deactivation re-anchors in front of the player.
    pub fn set_active(&mut self, active: bool) {
        self.anchor.set_enabled(active);
    }

    /// Height/width ratio of the content shown on the panel.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = height as f32 / width as f32;
        }
    }

    pub fn anchor(&self) -> Option<Pose> {
        self.anchor.pose()
    }

    /// Latches the panel on the first tracked head pose after activation.
    pub fn update(&mut self, head: Option<Pose>) -> Option<Pose> {
        let distance = self.distance;
        self.anchor
            .get_or_capture(|| head.map(|h| level_pose_ahead(&h, distance)))
    }

    pub fn quad(&self) -> Option<Quad> {
        let pose = self.anchor.pose()?;
        Some(Quad::from_pose(
            &pose,
            Vec2::new(self.width, self.width * self.aspect),
        ))
    }

    pub fn hit(&self, ray: &Ray) -> Option<QuadHit> {
        intersect_ray_quad(ray, &self.quad()?)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;

    fn head_at(x: f32, yaw: f32) -> Pose {
        Pose::new(Vec3::new(x, 1.6, 0.0), Quat::from_rotation_y(yaw))
    }

    #[test]
    fn panel_stays_put_while_active() {
        let mut panel = WorldPanel::new(&OverlayConfig::default());
        panel.set_active(true);
        let first = panel.update(Some(head_at(0.0, 0.0)));
        let later = panel.update(Some(head_at(3.0, 1.0)));
        assert_eq!(first, later);

        panel.set_active(false);
        panel.set_active(true);
        let moved = panel.update(Some(head_at(3.0, 0.0)));
        assert_ne!(first, moved);
    }

    #[test]
    fn ray_from_head_hits_panel_center() {
        let mut panel = WorldPanel::new(&OverlayConfig::default());
        panel.set_active(true);
        let head = head_at(0.0, 0.7);
        panel.update(Some(head));
        let hit = panel.hit(&Ray::from_pose(&head)).expect("hit");
        assert!((hit.uv - Vec2::splat(0.5)).length() < 1e-4);
        assert!((hit.distance - OverlayConfig::default().panel_distance).abs() < 1e-4);
    }
}
