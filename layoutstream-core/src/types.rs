use crate::error::{LayoutError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ===== GEOMETRY =====

/// Axis-aligned box in PDF page coordinates (origin bottom-left, y up).
///
/// Serialized as `[x0, y0, x1, y1]`, the shape PDF layout dumps use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Build a box from two corners; swapped corners are normalized so that
    /// `x0 <= x1` and `y0 <= y1` always hold.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(coords: [f64; 4]) -> Self {
        BoundingBox::new(coords[0], coords[1], coords[2], coords[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x0, bbox.y0, bbox.x1, bbox.y1]
    }
}

/// Page media box dimensions in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

// ===== LAYOUT PRIMITIVES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub text: String,
}

/// One atomic vector/raster primitive from the page content stream.
/// Only ever reachable through a [`FragmentArena`]; clustering consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicFragment {
    pub bbox: BoundingBox,
}

/// Index of a fragment inside its page's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FragmentId(usize);

impl FragmentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-page owner of all graphic fragments. Figures refer to fragments by
/// [`FragmentId`] only, so a fragment can never be emitted on its own.
#[derive(Debug, Clone, Default)]
pub struct FragmentArena {
    page: usize,
    fragments: Vec<GraphicFragment>,
}

impl FragmentArena {
    pub fn new(fragments: Vec<GraphicFragment>) -> Self {
        Self::for_page(0, fragments)
    }

    /// Arena for page `page` (0-based), named in errors
    pub fn for_page(page: usize, fragments: Vec<GraphicFragment>) -> Self {
        Self { page, fragments }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, id: FragmentId) -> Option<&GraphicFragment> {
        self.fragments.get(id.0)
    }

    pub fn ids(&self) -> impl Iterator<Item = FragmentId> + '_ {
        (0..self.fragments.len()).map(FragmentId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FragmentId, &GraphicFragment)> + '_ {
        self.fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| (FragmentId(index), fragment))
    }
}

/// A group of fragments rendered as one image region.
///
/// The bounding box is always the envelope of the owned fragments: the only
/// constructor computes it from the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    bbox: BoundingBox,
    fragments: Vec<FragmentId>,
}

impl Figure {
    pub fn from_fragments(arena: &FragmentArena, fragments: Vec<FragmentId>) -> Result<Self> {
        let boxes = fragments
            .iter()
            .map(|&id| {
                arena.get(id).map(|f| f.bbox).ok_or_else(|| LayoutError::InvalidLayout {
                    page: arena.page(),
                    reason: format!("fragment {} is not part of this page", id.index()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let bbox = crate::geometry::envelope(&boxes)?;
        Ok(Self { bbox, fragments })
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn fragments(&self) -> &[FragmentId] {
        &self.fragments
    }
}

/// Region reported by the table-detection collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub bbox: BoundingBox,
}

/// Everything that can appear in a page's merged sequence.
///
/// There is no fragment variant: raw fragments never survive merging.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutElement {
    Text(TextBlock),
    Figure(Figure),
    Table(Table),
}

impl LayoutElement {
    pub fn bbox(&self) -> BoundingBox {
        match self {
            LayoutElement::Text(block) => block.bbox,
            LayoutElement::Figure(figure) => figure.bbox(),
            LayoutElement::Table(table) => table.bbox,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            LayoutElement::Text(_) => ElementKind::Text,
            LayoutElement::Figure(_) => ElementKind::Figure,
            LayoutElement::Table(_) => ElementKind::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Text,
    Figure,
    Table,
}

impl ElementKind {
    /// File name prefix for regions saved as images
    pub fn image_prefix(self) -> Option<&'static str> {
        match self {
            ElementKind::Text => None,
            ElementKind::Figure => Some("image"),
            ElementKind::Table => Some("table"),
        }
    }
}

// ===== PAGES =====

/// One page's primitives as handed over by the PDF and table collaborators
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// 0-based page index
    pub index: usize,
    pub media_box: PageSize,
    pub text_blocks: Vec<TextBlock>,
    pub fragments: FragmentArena,
    pub tables: Vec<Table>,
}

impl PageLayout {
    pub fn new(index: usize, media_box: PageSize) -> Self {
        Self {
            index,
            media_box,
            text_blocks: Vec::new(),
            fragments: FragmentArena::for_page(index, Vec::new()),
            tables: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.fragments.is_empty() && self.tables.is_empty()
    }
}

/// Output record for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page: u32,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    pub text_blocks: usize,
    pub fragments: usize,
    pub figures: usize,
    pub noise_figures: usize,
    pub tables: usize,
    pub images_written: usize,
    pub regions_skipped: usize,
}

impl PageStats {
    pub fn accumulate(&mut self, other: &PageStats) {
        self.text_blocks += other.text_blocks;
        self.fragments += other.fragments;
        self.figures += other.figures;
        self.noise_figures += other.noise_figures;
        self.tables += other.tables;
        self.images_written += other.images_written;
        self.regions_skipped += other.regions_skipped;
    }
}

/// Run summary written next to the content file when requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub source: String,
    pub pages: usize,
    pub totals: PageStats,
    pub content_file: PathBuf,
    pub images_dir: PathBuf,
    pub generated_at: DateTime<Utc>,
}
