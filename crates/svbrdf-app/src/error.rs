use std::path::PathBuf;

use svbrdf_core::SvbrdfError;
use svbrdf_render::RenderError;
use thiserror::Error;

/// Errors that stop the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Data(#[from] SvbrdfError),

    #[error("No SVBRDFs found under {}", .0.display())]
    NoMaterials(PathBuf),

    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
