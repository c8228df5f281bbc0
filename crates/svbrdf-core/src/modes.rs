//! Rendering mode enums. Every mode cycles through a fixed total order
//! with wraparound, independent of any integer representation.

use serde::{Deserialize, Serialize};

/// A mode with a fixed cycle order.
pub trait Cycle: Copy + PartialEq + Sized + 'static {
    /// All variants in cycle order.
    const ALL: &'static [Self];

    fn position(self) -> usize {
        Self::ALL.iter().position(|&v| v == self).unwrap_or(0)
    }

    /// The following variant, wrapping from last to first.
    fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    /// The preceding variant, wrapping from first to last.
    fn prev(self) -> Self {
        let n = Self::ALL.len();
        Self::ALL[(self.position() + n - 1) % n]
    }
}

macro_rules! cycle_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl Cycle for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }
    };
}

cycle_enum! {
    /// How lighting is evaluated for the material mesh.
    LightingMode { Forward, TextureSpace } default Forward
}

cycle_enum! {
    /// Storage precision of the texture-space lightmap.
    LightingPrecision { Float11_11_10, Float16, Float32 } default Float11_11_10
}

cycle_enum! {
    /// Where height-field displacement is applied.
    DisplacementMode { None, Gpu, Cpu } default None
}

cycle_enum! {
    /// Which geometry the material is rendered on.
    MeshMode { SingleQuad, LoadedMesh } default SingleQuad
}

cycle_enum! {
    /// Source of the shading normal.
    NormalMode { Interpolated, Reconstructed, Constant } default Interpolated
}

cycle_enum! {
    ShadowMode { None, ShadowMapping } default None
}

cycle_enum! {
    /// Tonemapping operator. The shader index matches `gpu_index`.
    TonemapMode { Identity, Reinhard, ReinhardModified } default Identity
}

cycle_enum! {
    AntialiasingMode { None, Ssaa2x, Ssaa4x, Msaa4x } default None
}

impl TonemapMode {
    pub fn gpu_index(self) -> u32 {
        match self {
            Self::Identity => 0,
            Self::Reinhard => 1,
            Self::ReinhardModified => 2,
        }
    }
}

impl NormalMode {
    pub fn gpu_index(self) -> u32 {
        match self {
            Self::Interpolated => 0,
            Self::Reconstructed => 1,
            Self::Constant => 2,
        }
    }
}

impl AntialiasingMode {
    /// Linear supersampling factor of the offscreen target.
    pub fn supersampling(self) -> u32 {
        match self {
            Self::Ssaa2x => 2,
            Self::Ssaa4x => 4,
            Self::None | Self::Msaa4x => 1,
        }
    }

    /// Mip levels needed to reach native resolution by successive halving.
    pub fn mip_levels(self) -> u32 {
        self.supersampling().trailing_zeros() + 1
    }

    pub fn sample_count(self) -> u32 {
        match self {
            Self::Msaa4x => 4,
            _ => 1,
        }
    }
}

/// Structural and per-frame modes that are not part of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderModes {
    pub lighting: LightingMode,
    pub precision: LightingPrecision,
    pub displacement: DisplacementMode,
    pub mesh: MeshMode,
    pub normals: NormalMode,
    pub shadows: ShadowMode,
    pub use_normal_mapping: bool,
    pub wireframe: bool,
}

impl Default for RenderModes {
    fn default() -> Self {
        Self {
            lighting: LightingMode::Forward,
            precision: LightingPrecision::Float11_11_10,
            displacement: DisplacementMode::None,
            mesh: MeshMode::SingleQuad,
            normals: NormalMode::Constant,
            shadows: ShadowMode::None,
            use_normal_mapping: true,
            wireframe: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_wraps_around() {
        assert_eq!(DisplacementMode::None.next(), DisplacementMode::Gpu);
        assert_eq!(DisplacementMode::Gpu.next(), DisplacementMode::Cpu);
        assert_eq!(DisplacementMode::Cpu.next(), DisplacementMode::None);
        assert_eq!(MeshMode::LoadedMesh.next(), MeshMode::SingleQuad);
    }

    #[test]
    fn test_prev_wraps_around() {
        assert_eq!(AntialiasingMode::None.prev(), AntialiasingMode::Msaa4x);
        assert_eq!(AntialiasingMode::Ssaa2x.prev(), AntialiasingMode::None);
        assert_eq!(TonemapMode::Identity.prev(), TonemapMode::ReinhardModified);
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let mut mode = NormalMode::Reconstructed;
        for _ in 0..NormalMode::ALL.len() {
            mode = mode.next();
        }
        assert_eq!(mode, NormalMode::Reconstructed);
    }

    #[test]
    fn test_next_then_prev_is_identity() {
        for &mode in LightingPrecision::ALL {
            assert_eq!(mode.next().prev(), mode);
        }
    }

    #[test]
    fn test_aa_mip_levels() {
        assert_eq!(AntialiasingMode::None.mip_levels(), 1);
        assert_eq!(AntialiasingMode::Ssaa2x.mip_levels(), 2);
        assert_eq!(AntialiasingMode::Ssaa4x.mip_levels(), 3);
        assert_eq!(AntialiasingMode::Msaa4x.sample_count(), 4);
    }
}
