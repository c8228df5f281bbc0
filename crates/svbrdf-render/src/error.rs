use thiserror::Error;

/// Failures of the graphics environment. All of them are fatal.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("GPU adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Failed to request GPU device: {0}")]
    DeviceRequestFailed(String),

    #[error("Surface configuration failed: {0}")]
    SurfaceConfigFailed(String),
}
