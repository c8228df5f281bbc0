use glam::Vec3;

use crate::constants::{SHADOW_DEPTH_BIAS, SHADOW_RESOLUTION, SHADOW_SS_DEPTH_BIAS};
use crate::modes::{AntialiasingMode, TonemapMode};

/// A point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub falloff: f32,
    pub color: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            falloff: 1.0,
            color: Vec3::ONE,
        }
    }
}

/// Every user-adjustable parameter that is persisted in a preset.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderingState {
    pub svbrdf_name: String,
    pub mesh_name: String,
    pub vr_scale: i32,
    pub displacement_density: f32,
    pub displacement_magnitude: f32,
    pub aa_mode: AntialiasingMode,
    pub tonemap_mode: TonemapMode,
    pub camera_position: Vec3,
    pub camera_yaw_degrees: f32,
    pub camera_pitch_degrees: f32,
    pub ambient: Vec3,
    pub shadow_lights: u32,
    pub shadow_resolution: u32,
    pub shadow_depth_bias: i32,
    pub shadow_ss_depth_bias: f32,
    pub lights: Vec<Light>,
}

impl Default for RenderingState {
    fn default() -> Self {
        Self {
            svbrdf_name: String::new(),
            mesh_name: String::new(),
            vr_scale: 4,
            displacement_density: 16.0,
            displacement_magnitude: 0.01,
            aa_mode: AntialiasingMode::None,
            tonemap_mode: TonemapMode::Identity,
            camera_position: Vec3::new(-5.5, -5.0, 2.5),
            camera_yaw_degrees: (-0.85f32).to_degrees(),
            camera_pitch_degrees: 1.15f32.to_degrees(),
            ambient: Vec3::splat(0.05),
            shadow_lights: 1,
            shadow_resolution: SHADOW_RESOLUTION,
            shadow_depth_bias: SHADOW_DEPTH_BIAS,
            shadow_ss_depth_bias: SHADOW_SS_DEPTH_BIAS,
            lights: vec![Light {
                position: Vec3::new(3.0, 3.0, 3.0),
                falloff: 1.0,
                color: Vec3::ONE,
            }],
        }
    }
}

impl RenderingState {
    /// Head-tracking position multiplier: 10^(vr_scale/4), or 0 for negative scales.
    pub fn head_position_multiplier(&self) -> f32 {
        if self.vr_scale < 0 {
            0.0
        } else {
            10f32.powf(self.vr_scale as f32 / 4.0)
        }
    }

    /// Shadow-casting light count, never more than the lights present.
    pub fn clamped_shadow_lights(&self) -> u32 {
        self.shadow_lights.min(self.lights.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_has_one_light() {
        let state = RenderingState::default();
        assert_eq!(state.lights.len(), 1);
        assert_eq!(state.lights[0].position, Vec3::splat(3.0));
        assert_eq!(state.shadow_lights, 1);
    }

    #[test]
    fn test_default_camera_angles() {
        let state = RenderingState::default();
        assert!((state.camera_yaw_degrees.to_radians() + 0.85).abs() < 1e-6);
        assert!((state.camera_pitch_degrees.to_radians() - 1.15).abs() < 1e-6);
    }

    #[test]
    fn test_head_position_multiplier() {
        let mut state = RenderingState::default();
        assert!((state.head_position_multiplier() - 10.0).abs() < 1e-4);
        state.vr_scale = 0;
        assert!((state.head_position_multiplier() - 1.0).abs() < 1e-6);
        state.vr_scale = -1;
        assert_eq!(state.head_position_multiplier(), 0.0);
    }

    #[test]
    fn test_shadow_lights_clamped_to_light_count() {
        let mut state = RenderingState::default();
        state.shadow_lights = 5;
        assert_eq!(state.clamped_shadow_lights(), 1);
    }
}
