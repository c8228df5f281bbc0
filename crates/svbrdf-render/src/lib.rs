pub mod aa;
pub mod blit;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod indicator;
pub mod lights;
pub mod material;
pub mod shadow;
pub mod texture;

pub use aa::{AaPlan, AaTarget, AaTargets};
pub use error::RenderError;
pub use gpu::{init_gpu, GpuContext};
pub use indicator::LightIndicator;
pub use material::{FrameUniforms, MaterialRenderer, RendererDesc, MAX_VIEWS};
pub use shadow::ShadowConfig;
pub use texture::MaterialTextures;
