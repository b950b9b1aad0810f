// Layoutstream Core Library
//
// Rebuilds the content of PDF pages from positioned primitives: clusters
// graphic fragments into figures, puts text, figures and tables into
// reading order, and crops figure and table regions out of page rasters.

pub mod config;
pub mod error;
pub mod geometry;
pub mod merger;
pub mod processor;
pub mod render;
pub mod rules;
pub mod sources;
pub mod storage;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::{ClusterConfig, LayoutConfig, MissingBitmapPolicy, NoisePolicy};
pub use error::{LayoutError, Result};
pub use merger::LayoutMerger;
pub use processor::{DocumentContext, DocumentProcessor};
pub use sources::{LayoutManifest, LayoutSource, ManifestSource};
pub use storage::{FileImageStore, ImageStore, MemoryImageStore};
