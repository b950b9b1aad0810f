//! Page rasters and region crops.
//!
//! A page raster is brought to the size of the page's media box before any
//! crop, so PDF coordinates map 1:1 onto pixels and only the vertical flip
//! is needed.

use crate::error::{LayoutError, Result};
use crate::geometry::to_pixel_rect;
use crate::types::{BoundingBox, ElementKind, PageSize};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};

/// Rendered bitmap of one page, owned for the duration of that page
#[derive(Debug, Clone)]
pub struct PageBitmap {
    image: DynamicImage,
}

impl PageBitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Brings page rasters to media-box resolution
pub struct PageRenderer;

impl PageRenderer {
    /// Resize `raster` to the media box (rounded to whole pixels) unless it
    /// already matches.
    pub fn rasterize(page_index: usize, raster: DynamicImage, media_box: PageSize) -> Result<PageBitmap> {
        let target_w = media_box.width.round();
        let target_h = media_box.height.round();
        if !(target_w >= 1.0 && target_h >= 1.0) || !target_w.is_finite() || !target_h.is_finite() {
            return Err(LayoutError::InvalidLayout {
                page: page_index,
                reason: format!(
                    "media box {}x{} cannot be rasterized",
                    media_box.width, media_box.height
                ),
            });
        }
        let (target_w, target_h) = (target_w as u32, target_h as u32);

        if raster.width() == 0 || raster.height() == 0 {
            return Err(LayoutError::missing_bitmap(page_index, "page raster is empty"));
        }

        if raster.dimensions() == (target_w, target_h) {
            return Ok(PageBitmap::new(raster));
        }

        log::debug!(
            "page {}: resizing raster {}x{} to media box {}x{}",
            page_index,
            raster.width(),
            raster.height(),
            target_w,
            target_h
        );
        Ok(PageBitmap::new(raster.resize_exact(
            target_w,
            target_h,
            FilterType::Triangle,
        )))
    }
}

/// Cut the pixels under a PDF-space box out of the page bitmap.
///
/// The crop always has the full size of the box; whatever lies outside the
/// bitmap is black. Returns `None` only for a non-finite box.
pub fn crop_region(bitmap: &PageBitmap, bbox: &BoundingBox) -> Option<PageBitmap> {
    let rect = to_pixel_rect(bbox, bitmap.height())?;
    let mut canvas = RgbImage::new(rect.width, rect.height);

    match rect.visible_part(bitmap.width(), bitmap.height()) {
        Some((left, top, width, height)) => {
            let inside = bitmap.image.crop_imm(left, top, width, height).to_rgb8();
            imageops::replace(
                &mut canvas,
                &inside,
                left as i64 - rect.left,
                top as i64 - rect.top,
            );
        }
        None => log::warn!(
            "region {:?} lies outside the {}x{} page bitmap, writing a blank crop",
            bbox,
            bitmap.width(),
            bitmap.height()
        ),
    }

    Some(PageBitmap::new(DynamicImage::ImageRgb8(canvas)))
}

/// Stable name of a saved region: `{image|table}_page-{p}_im-{t}.jpg`
/// with the 0-based page index and the element's sorted position.
pub fn image_name(kind: ElementKind, page_index: usize, position: usize) -> Option<String> {
    kind.image_prefix()
        .map(|prefix| format!("{prefix}_page-{page_index}_im-{position}.jpg"))
}
