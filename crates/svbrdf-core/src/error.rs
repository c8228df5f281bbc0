use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading materials, meshes, presets or config.
#[derive(Debug, Error)]
pub enum SvbrdfError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid PFM image {}: {reason}", .path.display())]
    InvalidPfm { path: PathBuf, reason: String },

    #[error("Failed to load mesh {}: {reason}", .path.display())]
    MeshLoad { path: PathBuf, reason: String },

    #[error("Mesh directory {} contains no triangles", .0.display())]
    EmptyMesh(PathBuf),

    #[error("Failed to read BRDF alpha parameter from {}", .0.display())]
    InvalidParams(PathBuf),

    #[error("Config error: {0}")]
    Config(String),
}

impl SvbrdfError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
