//! Single source of truth for shared viewer constants.
//! Values that shaders need are injected into WGSL preambles by the renderer.

/// Default window width in pixels.
pub const DEFAULT_WINDOW_WIDTH: u32 = 1600;

/// Default window height in pixels.
pub const DEFAULT_WINDOW_HEIGHT: u32 = 900;

/// Camera near clip plane.
pub const NEAR_Z: f32 = 0.1;

/// Camera far clip plane.
pub const FAR_Z: f32 = 40.0;

/// Vertical field of view for monitor rendering (60 degrees).
pub const DEFAULT_VERTICAL_FOV: f32 = std::f32::consts::FRAC_PI_3;

/// Shadow cube face near clip plane.
pub const SHADOW_NEAR_Z: f32 = 0.1;

/// Shadow cube face far clip plane.
pub const SHADOW_FAR_Z: f32 = 50.0;

/// Default shadow map side length in texels.
pub const SHADOW_RESOLUTION: u32 = 1024;

/// Default constant depth bias for shadow rendering (negative under inverse-Z).
pub const SHADOW_DEPTH_BIAS: i32 = -8;

/// Default slope-scaled depth bias for shadow rendering.
pub const SHADOW_SS_DEPTH_BIAS: f32 = -1.0;

/// PCF taps per axis.
pub const SHADOW_PCF_TAPS: u32 = 4;

/// PCF kernel width in shadow map texels.
pub const SHADOW_KERNEL_WIDTH: f32 = 2.0;

/// Cube faces rendered per shadow-casting light.
pub const CUBE_FACES: u32 = 6;

/// Capacity of the GPU light buffer.
pub const MAX_LIGHTS: u32 = 1024;

/// Light positions are clamped to [-LIGHT_POS_EXTENT, LIGHT_POS_EXTENT].
pub const LIGHT_POS_EXTENT: f32 = FAR_Z;

/// Light position change per frame while a key is held.
pub const LIGHT_POS_INCREMENT: f32 = 0.05;

/// Upper clamp for each HDR light color channel.
pub const LIGHT_MAX_INTENSITY: f32 = 50.0;

/// Upper clamp for the pixels-per-vertex stride and tessellation factors.
pub const MAX_TESSELLATION: u32 = 64;

/// Multiplier applied to increments while Ctrl is held.
pub const CTRL_MULTIPLIER: f32 = 5.0;

/// White point for the modified Reinhard tonemapper.
pub const MAX_LUMINANCE: f32 = 2.0;

/// Base half-extent of the material quad along its shorter side.
pub const QUAD_DIM: f32 = 5.0;

/// Anisotropic filtering clamp for material sampling.
pub const ANISOTROPY: u16 = 8;

/// Upper bound on vertices produced when refining a coarse mesh for GPU displacement.
pub const MAX_REFINED_VERTICES: usize = 4_000_000;

/// Number of F-key quick preset slots.
pub const QUICK_PRESET_COUNT: usize = 10;

/// Quick preset file name for a zero-based slot ("preset_01.svp" for slot 0).
pub fn quick_preset_filename(slot: usize) -> String {
    format!("preset_{:02}.svp", slot + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_preset_filenames() {
        assert_eq!(quick_preset_filename(0), "preset_01.svp");
        assert_eq!(quick_preset_filename(QUICK_PRESET_COUNT - 1), "preset_10.svp");
    }

    #[test]
    fn test_light_extent_matches_far_plane() {
        assert_eq!(LIGHT_POS_EXTENT, FAR_Z);
    }
}
