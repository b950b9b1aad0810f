// Layout source abstraction
//
// Everything before this seam (content-stream interpretation, table
// detection, rasterization) belongs to external collaborators. Everything
// after it works with typed primitives only.

use crate::error::Result;
use crate::types::PageLayout;
use image::DynamicImage;

/// Supplies one document's pages to the core, in page order.
pub trait LayoutSource {
    /// Name of the underlying document, used for output naming and logs
    fn name(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Primitives of page `index` (0-based)
    fn page_layout(&self, index: usize) -> Result<PageLayout>;

    /// Raster of page `index`; failures surface as `LayoutError::MissingBitmap`.
    /// The core resizes it to the media box before cropping.
    fn page_raster(&self, index: usize) -> Result<DynamicImage>;
}
