pub mod constants;
pub mod displacement;
pub mod error;
pub mod frame;
pub mod material;
pub mod math;
pub mod mesh;
pub mod modes;
pub mod pfm;
pub mod preset;
pub mod state;

pub use error::SvbrdfError;
pub use frame::{compute_constants, FrameConstants, ShadowConstants, ViewSnapshot};
pub use material::Material;
pub use mesh::{MeshData, Vertex};
pub use modes::{
    AntialiasingMode, Cycle, DisplacementMode, LightingMode, LightingPrecision, MeshMode,
    NormalMode, RenderModes, ShadowMode, TonemapMode,
};
pub use pfm::FloatImage;
pub use state::{Light, RenderingState};
