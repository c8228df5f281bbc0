//! Head-mounted display interface.

use glam::{Mat4, Quat, Vec3};

/// Pose and projection of one eye for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub size: (u32, u32),
    pub orientation: Quat,
    /// Eye offset from the tracking origin, in headset space.
    pub position: Vec3,
    /// Inverse-Z, right-handed.
    pub projection: Mat4,
}

pub trait VrSession {
    fn is_connected(&self) -> bool;
    fn is_active(&self) -> bool;
    fn recenter(&mut self);
    /// Sample the head pose. Called right before rendering the eyes.
    fn eye_views(&mut self) -> Vec<EyeView>;
    /// Hand the rendered eye textures to the compositor.
    fn submit_frame(&mut self, eyes: &[&wgpu::Texture]);
}

/// The session used when no headset runtime is available.
#[derive(Debug, Default)]
pub struct NoHeadset;

impl VrSession for NoHeadset {
    fn is_connected(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn recenter(&mut self) {}

    fn eye_views(&mut self) -> Vec<EyeView> {
        Vec::new()
    }

    fn submit_frame(&mut self, _eyes: &[&wgpu::Texture]) {}
}

/// World-space camera of one eye: the head pose applied on top of the
/// viewer camera, with the head translation scaled by `head_multiplier`.
pub fn eye_camera(
    camera_position: Vec3,
    camera_rotation: Quat,
    eye: &EyeView,
    head_multiplier: f32,
) -> (Vec3, Quat) {
    let offset = camera_rotation * eye.position * head_multiplier;
    (camera_position + offset, camera_rotation * eye.orientation)
}
