//! JSON layout manifest source
//!
//! A manifest lists, for every page, the primitives a PDF front end and a
//! table detector produced plus the path of a rendered page raster:
//!
//! ```json
//! {
//!   "source": "paper.pdf",
//!   "pages": [{
//!     "index": 0,
//!     "media_box": {"width": 612, "height": 792},
//!     "raster": "rasters/page-0.png",
//!     "text_blocks": [{"bbox": [72, 700, 540, 720], "text": "Title"}],
//!     "fragments": [{"bbox": [100, 300, 180, 420]}],
//!     "tables": [{"bbox": [72, 72, 540, 200]}],
//!     "table_origin": "bottom_left"
//!   }]
//! }
//! ```
//!
//! Raster paths are relative to the manifest's directory.

use super::source::LayoutSource;
use crate::error::{LayoutError, Result};
use crate::types::{
    BoundingBox, FragmentArena, GraphicFragment, PageLayout, PageSize, Table, TextBlock,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutManifest {
    /// Original document name (e.g. the PDF file name)
    #[serde(default)]
    pub source: Option<String>,
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestPage {
    /// 0-based page index; defaults to the position in `pages`
    #[serde(default)]
    pub index: Option<usize>,
    pub media_box: PageSize,
    #[serde(default)]
    pub raster: Option<PathBuf>,
    #[serde(default)]
    pub text_blocks: Vec<TextBlock>,
    #[serde(default)]
    pub fragments: Vec<GraphicFragment>,
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Coordinate origin the table detector reported boxes in
    #[serde(default)]
    pub table_origin: BoxOrigin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxOrigin {
    /// PDF user space, y up
    #[default]
    BottomLeft,
    /// Image-style space, y down (e.g. detectors working on rendered pages)
    TopLeft,
}

pub struct ManifestSource {
    name: String,
    base_dir: PathBuf,
    pages: Vec<(usize, ManifestPage)>,
}

impl ManifestSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let manifest: LayoutManifest = serde_json::from_str(&json)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let fallback_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        Self::from_manifest(manifest, base_dir, fallback_name)
    }

    /// Validate a parsed manifest. Pages are ordered by index.
    pub fn from_manifest(
        manifest: LayoutManifest,
        base_dir: PathBuf,
        fallback_name: String,
    ) -> Result<Self> {
        let name = manifest.source.clone().unwrap_or(fallback_name);

        let mut seen = HashSet::new();
        let mut pages = Vec::with_capacity(manifest.pages.len());
        for (position, page) in manifest.pages.into_iter().enumerate() {
            let index = page.index.unwrap_or(position);
            if !seen.insert(index) {
                return Err(LayoutError::InvalidLayout {
                    page: index,
                    reason: "page index listed twice".to_string(),
                });
            }
            validate_page(index, &page)?;
            pages.push((index, page));
        }
        pages.sort_by_key(|(index, _)| *index);

        Ok(Self {
            name,
            base_dir,
            pages,
        })
    }

    fn page(&self, position: usize) -> Result<&(usize, ManifestPage)> {
        self.pages.get(position).ok_or_else(|| LayoutError::InvalidLayout {
            page: position,
            reason: format!("manifest has only {} pages", self.pages.len()),
        })
    }
}

fn validate_page(index: usize, page: &ManifestPage) -> Result<()> {
    let invalid = |reason: String| LayoutError::InvalidLayout { page: index, reason };

    let PageSize { width, height } = page.media_box;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(invalid(format!("media box {width}x{height} is not positive")));
    }

    let boxes = page
        .text_blocks
        .iter()
        .map(|b| b.bbox)
        .chain(page.fragments.iter().map(|f| f.bbox))
        .chain(page.tables.iter().map(|t| t.bbox));
    for bbox in boxes {
        if !bbox.is_finite() {
            return Err(invalid(format!("non-finite bounding box {bbox:?}")));
        }
    }
    Ok(())
}

impl LayoutSource for ManifestSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `position` counts pages in index order
    fn page_layout(&self, position: usize) -> Result<PageLayout> {
        let (index, page) = self.page(position)?;
        let height = page.media_box.height;

        let tables = page
            .tables
            .iter()
            .map(|table| match page.table_origin {
                BoxOrigin::BottomLeft => *table,
                BoxOrigin::TopLeft => Table {
                    bbox: table.bbox.flip_vertical(height),
                },
            })
            .collect();

        Ok(PageLayout {
            index: *index,
            media_box: page.media_box,
            text_blocks: page.text_blocks.clone(),
            fragments: FragmentArena::for_page(*index, page.fragments.clone()),
            tables,
        })
    }

    fn page_raster(&self, position: usize) -> Result<DynamicImage> {
        let (index, page) = self.page(position)?;
        let raster = page
            .raster
            .as_ref()
            .ok_or_else(|| LayoutError::missing_bitmap(*index, "no raster listed in manifest"))?;
        let path = self.base_dir.join(raster);
        image::open(&path)
            .map_err(|e| LayoutError::missing_bitmap(*index, format!("{}: {e}", path.display())))
    }
}

/// Helper for callers assembling manifests programmatically
impl ManifestPage {
    pub fn new(media_box: PageSize) -> Self {
        Self {
            index: None,
            media_box,
            raster: None,
            text_blocks: Vec::new(),
            fragments: Vec::new(),
            tables: Vec::new(),
            table_origin: BoxOrigin::default(),
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_raster(mut self, raster: impl Into<PathBuf>) -> Self {
        self.raster = Some(raster.into());
        self
    }

    pub fn with_text(mut self, bbox: BoundingBox, text: &str) -> Self {
        self.text_blocks.push(TextBlock {
            bbox,
            text: text.to_string(),
        });
        self
    }

    pub fn with_fragment(mut self, bbox: BoundingBox) -> Self {
        self.fragments.push(GraphicFragment { bbox });
        self
    }

    pub fn with_table(mut self, bbox: BoundingBox) -> Self {
        self.tables.push(Table { bbox });
        self
    }
}
