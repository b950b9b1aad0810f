//! Error types for layout reconstruction.

use std::path::PathBuf;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// An envelope was requested over zero boxes
    #[error("cannot compute an envelope over zero bounding boxes")]
    EmptyInput,

    /// The page raster could not be produced or read
    #[error("page {page}: bitmap unavailable: {reason}")]
    MissingBitmap { page: usize, reason: String },

    /// The images directory or an image file could not be written
    #[error("cannot write {}: {reason}", path.display())]
    UnwritableOutput { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A page layout handed over by a collaborator is malformed
    #[error("page {page}: invalid layout: {reason}")]
    InvalidLayout { page: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl LayoutError {
    pub fn unwritable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        LayoutError::UnwritableOutput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_bitmap(page: usize, reason: impl ToString) -> Self {
        LayoutError::MissingBitmap {
            page,
            reason: reason.to_string(),
        }
    }
}
