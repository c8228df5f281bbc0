use glam::{Mat4, Vec3};

use crate::constants::{MAX_LUMINANCE, SHADOW_KERNEL_WIDTH, SHADOW_PCF_TAPS};
use crate::modes::{DisplacementMode, NormalMode, RenderModes, ShadowMode, TonemapMode};
use crate::state::RenderingState;

/// Camera snapshot for one rendered view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSnapshot {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
        }
    }
}

/// Immutable per-view constants derived from the rendering state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConstants {
    pub view: ViewSnapshot,
    pub ambient: Vec3,
    pub tonemap: TonemapMode,
    pub max_luminance: f32,
    pub normal_mode: NormalMode,
    pub use_normal_mapping: bool,
    pub displacement_density: f32,
    pub displacement_magnitude: f32,
    pub shadow_lights: u32,
    pub shadow_resolution: u32,
    pub shadow_pcf_taps: u32,
    pub shadow_kernel_width: f32,
    pub shadow_depth_bias: i32,
    pub shadow_ss_depth_bias: f32,
    pub wireframe: bool,
    pub tessellation: bool,
}

/// Shadow sampling parameters shared by every view of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConstants {
    pub shadow_lights: u32,
    pub pcf_taps: u32,
    pub kernel_width: f32,
    pub resolution: f32,
}

impl FrameConstants {
    pub fn shadow_constants(&self) -> ShadowConstants {
        ShadowConstants {
            shadow_lights: self.shadow_lights,
            pcf_taps: self.shadow_pcf_taps,
            kernel_width: self.shadow_kernel_width,
            resolution: self.shadow_resolution as f32,
        }
    }

    /// Same constants seen from a different camera.
    pub fn with_view(&self, view: ViewSnapshot) -> Self {
        Self { view, ..*self }
    }
}

/// Material normals are already part of CPU-displaced geometry, so normal
/// mapping would apply them twice unless shading uses constant normals.
pub fn normal_mapping_allowed(modes: &RenderModes) -> bool {
    !(modes.displacement == DisplacementMode::Cpu && modes.normals != NormalMode::Constant)
}

/// Assemble the constants for one view. Pure: equal inputs give equal output.
pub fn compute_constants(
    state: &RenderingState,
    modes: &RenderModes,
    view: ViewSnapshot,
) -> FrameConstants {
    let shadow_lights = match modes.shadows {
        ShadowMode::None => 0,
        ShadowMode::ShadowMapping => state.clamped_shadow_lights(),
    };

    FrameConstants {
        view,
        ambient: state.ambient,
        tonemap: state.tonemap_mode,
        max_luminance: MAX_LUMINANCE,
        normal_mode: modes.normals,
        use_normal_mapping: modes.use_normal_mapping && normal_mapping_allowed(modes),
        displacement_density: state.displacement_density,
        displacement_magnitude: state.displacement_magnitude,
        shadow_lights,
        shadow_resolution: state.shadow_resolution,
        shadow_pcf_taps: SHADOW_PCF_TAPS.max(1),
        shadow_kernel_width: SHADOW_KERNEL_WIDTH,
        shadow_depth_bias: state.shadow_depth_bias,
        shadow_ss_depth_bias: state.shadow_ss_depth_bias,
        wireframe: modes.wireframe,
        tessellation: modes.displacement == DisplacementMode::Gpu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ViewSnapshot {
        ViewSnapshot {
            view_proj: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            camera_position: Vec3::new(-5.5, -5.0, 2.5),
        }
    }

    #[test]
    fn test_constants_are_idempotent() {
        let state = RenderingState::default();
        let modes = RenderModes {
            shadows: ShadowMode::ShadowMapping,
            displacement: DisplacementMode::Gpu,
            ..Default::default()
        };
        let a = compute_constants(&state, &modes, snapshot());
        let b = compute_constants(&state, &modes, snapshot());
        assert_eq!(a, b);
        assert_eq!(
            a.view.view_proj.to_cols_array().map(f32::to_bits),
            b.view.view_proj.to_cols_array().map(f32::to_bits)
        );
    }

    #[test]
    fn test_shadows_off_means_zero_shadow_lights() {
        let state = RenderingState::default();
        let c = compute_constants(&state, &RenderModes::default(), snapshot());
        assert_eq!(c.shadow_lights, 0);
        assert_eq!(c.shadow_constants().shadow_lights, 0);
    }

    #[test]
    fn test_normal_mapping_suppressed_for_cpu_displacement() {
        let state = RenderingState::default();
        let mut modes = RenderModes {
            displacement: DisplacementMode::Cpu,
            normals: NormalMode::Interpolated,
            use_normal_mapping: true,
            ..Default::default()
        };
        assert!(!compute_constants(&state, &modes, snapshot()).use_normal_mapping);
        modes.normals = NormalMode::Constant;
        assert!(compute_constants(&state, &modes, snapshot()).use_normal_mapping);
        modes.displacement = DisplacementMode::Gpu;
        modes.normals = NormalMode::Reconstructed;
        assert!(compute_constants(&state, &modes, snapshot()).use_normal_mapping);
    }

    #[test]
    fn test_tessellation_only_for_gpu_displacement() {
        let state = RenderingState::default();
        for (mode, expected) in [
            (DisplacementMode::None, false),
            (DisplacementMode::Gpu, true),
            (DisplacementMode::Cpu, false),
        ] {
            let modes = RenderModes {
                displacement: mode,
                ..Default::default()
            };
            assert_eq!(compute_constants(&state, &modes, snapshot()).tessellation, expected);
        }
    }

    #[test]
    fn test_shadow_constants_independent_of_view() {
        let state = RenderingState {
            shadow_resolution: 512,
            ..Default::default()
        };
        let modes = RenderModes {
            shadows: ShadowMode::ShadowMapping,
            ..Default::default()
        };
        let frame = compute_constants(&state, &modes, ViewSnapshot::default());
        let left = frame.with_view(snapshot());
        assert_eq!(frame.shadow_constants(), left.shadow_constants());
        assert_eq!(left.shadow_constants().resolution, 512.0);
        assert!(left.shadow_constants().pcf_taps >= 1);
    }
}
