//! Coordinate and matrix helpers.
//!
//! The runtime reports poses right-handed, Y-up, looking down -Z. The host
//! engine works Z-up with a yaw angle around Z; [`host_view_matrix`] bridges
//! the two by a fixed quarter turn about X plus a configurable yaw phase.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::types::{Fov, FovTangents, Pose};

/// Default yaw phase between the host's zero heading and the runtime's forward axis.
pub const DEFAULT_YAW_PHASE: f32 = FRAC_PI_2;

pub fn pose_matrix(pose: &Pose) -> Mat4 {
    Mat4::from_translation(pose.position) * Mat4::from_quat(pose.orientation)
}

/// World-to-eye transform: the inverse of the eye pose.
pub fn view_from_pose(pose: &Pose) -> Mat4 {
    pose_matrix(pose).inverse()
}

/// Off-center perspective projection (OpenGL clip space) built from the four
/// FOV tangents. HMD frusta are asymmetric, so this must not be replaced by a
/// symmetric perspective.
pub fn projection_from_tangents(t: FovTangents, near: f32, far: f32) -> Mat4 {
    let width = t.right - t.left;
    let height = t.up - t.down;
    let depth = far - near;
    Mat4::from_cols(
        [2.0 / width, 0.0, 0.0, 0.0].into(),
        [0.0, 2.0 / height, 0.0, 0.0].into(),
        [
            (t.right + t.left) / width,
            (t.up + t.down) / height,
            -(far + near) / depth,
            -1.0,
        ]
        .into(),
        [0.0, 0.0, -(2.0 * far * near) / depth, 0.0].into(),
    )
}

pub fn projection_from_fov(fov: &Fov, near: f32, far: f32) -> Mat4 {
    projection_from_tangents(fov.tangents(), near, far)
}

/// Maps host Z-up coordinates into runtime Y-up coordinates
/// (+Z becomes +Y, +Y becomes -Z).
pub fn z_up_to_y_up() -> Mat4 {
    Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Combines an eye's runtime view matrix with the host camera placement.
///
/// Only host yaw is applied; pitch and roll come from head tracking.
pub fn host_view_matrix(eye_view: &Mat4, origin: Vec3, yaw: f32, yaw_phase: f32) -> Mat4 {
    let game_rotation = Mat4::from_rotation_z(-yaw + yaw_phase);
    let world_translation = Mat4::from_translation(-origin);
    *eye_view * z_up_to_y_up() * game_rotation * world_translation
}

/// Host-space heading the untracked camera faces for a given host yaw.
pub fn host_forward(yaw: f32, yaw_phase: f32) -> Vec3 {
    let angle = yaw - yaw_phase;
    Vec3::new(-angle.sin(), angle.cos(), 0.0)
}

/// Inverse of [`host_forward`], normalised to `[0, 2π)`.
pub fn host_yaw_from_forward(forward: Vec3, yaw_phase: f32) -> f32 {
    let yaw = (-forward.x).atan2(forward.y) + yaw_phase;
    yaw.rem_euclid(TAU)
}

/// Keeps only the rotation about the runtime up axis.
pub fn yaw_only(orientation: Quat) -> Quat {
    let forward = orientation * Vec3::NEG_Z;
    if forward.x.abs() < f32::EPSILON && forward.z.abs() < f32::EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y((-forward.x).atan2(-forward.z))
}

pub fn average_position(poses: &[Pose]) -> Option<Vec3> {
    if poses.is_empty() {
        return None;
    }
    let sum: Vec3 = poses.iter().map(|p| p.position).sum();
    Some(sum / poses.len() as f32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Self::new(pose.position, pose.forward())
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Bounded rectangle in 3D. Local X runs left to right, local Y bottom to
/// top, and the visible face looks down local +Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub center: Vec3,
    pub orientation: Quat,
    pub size: Vec2,
}

impl Quad {
    pub fn from_pose(pose: &Pose, size: Vec2) -> Self {
        Self {
            center: pose.position,
            orientation: pose.orientation,
            size,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Model matrix scaling the unit quad mesh to this rectangle.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.size.extend(1.0), self.orientation, self.center)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadHit {
    pub distance: f32,
    pub point: Vec3,
    /// Normalised position on the quad, origin top-left.
    pub uv: Vec2,
}

pub fn intersect_ray_quad(ray: &Ray, quad: &Quad) -> Option<QuadHit> {
    let normal = quad.normal();
    let denom = ray.direction.dot(normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let distance = (quad.center - ray.origin).dot(normal) / denom;
    if distance < 0.0 {
        return None;
    }

    let point = ray.at(distance);
    let local = quad.orientation.inverse() * (point - quad.center);
    let half = quad.size * 0.5;
    if local.x.abs() > half.x || local.y.abs() > half.y {
        return None;
    }

    Some(QuadHit {
        distance,
        point,
        uv: Vec2::new(local.x / quad.size.x + 0.5, 0.5 - local.y / quad.size.y),
    })
}

/// Maps a normalised coordinate onto a pixel grid, clamped to its bounds.
pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> (i32, i32) {
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    let x = (uv.x * width as f32).clamp(0.0, max_x);
    let y = (uv.y * height as f32).clamp(0.0, max_y);
    (x as i32, y as i32)
}
