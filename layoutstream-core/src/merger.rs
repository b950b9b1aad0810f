use crate::config::{LayoutConfig, MissingBitmapPolicy};
use crate::error::{LayoutError, Result};
use crate::render::{crop_region, image_name, PageBitmap};
use crate::rules::reading_order::ReadingOrderRule;
use crate::rules::spatial_clustering::SpatialClusteringRule;
use crate::storage::ImageStore;
use crate::types::{LayoutElement, PageContent, PageLayout, PageStats};

/// A page's elements after clustering, in reading order
#[derive(Debug, Clone)]
pub struct MergedPage {
    pub index: usize,
    pub elements: Vec<LayoutElement>,
    pub stats: PageStats,
}

impl MergedPage {
    pub fn needs_bitmap(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, LayoutElement::Figure(_) | LayoutElement::Table(_)))
    }
}

/// Builds the ordered content record for a page and persists its
/// figure and table regions.
pub struct LayoutMerger<'a> {
    config: &'a LayoutConfig,
}

impl<'a> LayoutMerger<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Cluster fragments into figures, add tables, and sort everything into
    /// reading order. Raw fragments do not survive this step.
    pub fn merge_elements(&self, page: PageLayout) -> Result<MergedPage> {
        let PageLayout {
            index,
            text_blocks,
            fragments,
            tables,
            ..
        } = page;

        let mut stats = PageStats {
            text_blocks: text_blocks.len(),
            fragments: fragments.len(),
            tables: tables.len(),
            ..PageStats::default()
        };

        let mut working: Vec<LayoutElement> = text_blocks.into_iter().map(LayoutElement::Text).collect();

        if !fragments.is_empty() {
            let clustering = SpatialClusteringRule::new(&self.config.clustering).apply(&fragments)?;
            stats.figures = clustering.figures.len();
            stats.noise_figures = clustering.noise_figures;
            working.extend(clustering.figures.into_iter().map(LayoutElement::Figure));
        }

        working.extend(tables.into_iter().map(LayoutElement::Table));

        let elements = ReadingOrderRule::new(&self.config.reading_order).apply(working)?;

        log::debug!(
            "page {}: {} text blocks, {} fragments -> {} figures, {} tables",
            index,
            stats.text_blocks,
            stats.fragments,
            stats.figures,
            stats.tables
        );

        Ok(MergedPage {
            index,
            elements,
            stats,
        })
    }

    /// Walk the sorted elements and build the page's content string.
    ///
    /// Every element contributes one fragment: text blocks their trimmed
    /// text, figures and tables an `<image>{name}</image>` placeholder after
    /// being cropped from `bitmap` and saved through `store`.
    pub fn emit_page(
        &self,
        merged: MergedPage,
        bitmap: Option<&PageBitmap>,
        store: &mut dyn ImageStore,
    ) -> Result<(PageContent, PageStats)> {
        let MergedPage {
            index,
            elements,
            mut stats,
        } = merged;

        let mut parts: Vec<String> = Vec::with_capacity(elements.len());

        for (position, element) in elements.iter().enumerate() {
            let kind = element.kind();
            match element {
                // Blank blocks still take a slot in the joined content
                LayoutElement::Text(block) => parts.push(block.text.trim().to_string()),
                LayoutElement::Figure(_) | LayoutElement::Table(_) => {
                    let Some(bitmap) = bitmap else {
                        match self.config.missing_bitmap {
                            MissingBitmapPolicy::Fail => {
                                return Err(LayoutError::missing_bitmap(
                                    index,
                                    "a figure or table needs cropping but no page bitmap is available",
                                ));
                            }
                            MissingBitmapPolicy::TextOnly => {
                                stats.regions_skipped += 1;
                                continue;
                            }
                        }
                    };

                    let bbox = element.bbox();
                    let region = crop_region(bitmap, &bbox).ok_or_else(|| LayoutError::InvalidLayout {
                        page: index,
                        reason: format!("{kind:?} has a non-finite bounding box {bbox:?}"),
                    })?;

                    // Only figures and tables reach this arm, so a name always exists
                    let name = image_name(kind, index, position).ok_or_else(|| {
                        LayoutError::InvalidLayout {
                            page: index,
                            reason: format!("{kind:?} elements are not saved as images"),
                        }
                    })?;
                    store.save(&name, &region)?;
                    stats.images_written += 1;
                    parts.push(format!("<image>{name}</image>"));
                }
            }
        }

        if stats.regions_skipped > 0 && bitmap.is_none() {
            log::warn!(
                "page {}: no bitmap, dropped {} figure/table regions (text only)",
                index,
                stats.regions_skipped
            );
        }

        let content = PageContent {
            page: (index + 1) as u32,
            content: parts.join(" "),
        };
        Ok((content, stats))
    }

    /// Merge and emit in one go
    pub fn merge_page(
        &self,
        page: PageLayout,
        bitmap: Option<&PageBitmap>,
        store: &mut dyn ImageStore,
    ) -> Result<(PageContent, PageStats)> {
        let merged = self.merge_elements(page)?;
        self.emit_page(merged, bitmap, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryImageStore;
    use crate::types::{BoundingBox, FragmentArena, GraphicFragment, PageSize, Table, TextBlock};
    use image::{DynamicImage, RgbImage};

    fn page(index: usize) -> PageLayout {
        PageLayout::new(
            index,
            PageSize {
                width: 300.0,
                height: 300.0,
            },
        )
    }

    fn bitmap() -> PageBitmap {
        PageBitmap::new(DynamicImage::ImageRgb8(RgbImage::new(300, 300)))
    }

    fn text(s: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> TextBlock {
        TextBlock {
            bbox: BoundingBox::new(x0, y0, x1, y1),
            text: s.to_string(),
        }
    }

    fn fragments(boxes: &[(f64, f64, f64, f64)]) -> FragmentArena {
        FragmentArena::new(
            boxes
                .iter()
                .map(|&(x0, y0, x1, y1)| GraphicFragment {
                    bbox: BoundingBox::new(x0, y0, x1, y1),
                })
                .collect(),
        )
    }

    #[test]
    fn test_text_only_page() {
        let config = LayoutConfig::default();
        let mut layout = page(0);
        layout.text_blocks.push(text("  Hello\n", 0.0, 90.0, 50.0, 100.0));

        let mut store = MemoryImageStore::new();
        let (content, stats) = LayoutMerger::new(&config)
            .merge_page(layout, None, &mut store)
            .unwrap();
        assert_eq!(content, PageContent { page: 1, content: "Hello".to_string() });
        assert_eq!(stats.images_written, 0);
        assert_eq!(store.saved_count(), 0);
    }

    #[test]
    fn test_fragments_never_reach_output() {
        let mut config = LayoutConfig::default();
        config.clustering.eps = 20.0;
        let mut layout = page(2);
        layout.fragments = fragments(&[
            (0.0, 0.0, 10.0, 10.0),
            (5.0, 5.0, 15.0, 15.0),
            (200.0, 200.0, 210.0, 210.0),
        ]);

        let merged = LayoutMerger::new(&config).merge_elements(layout).unwrap();
        assert_eq!(merged.elements.len(), 2);
        assert!(merged
            .elements
            .iter()
            .all(|e| matches!(e, LayoutElement::Figure(_))));
        // Higher figure first
        assert_eq!(merged.elements[0].bbox(), BoundingBox::new(200.0, 200.0, 210.0, 210.0));
        assert_eq!(merged.elements[1].bbox(), BoundingBox::new(0.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn test_mixed_page_placeholders_follow_reading_order() {
        let config = LayoutConfig::default();
        let mut layout = page(1);
        layout.text_blocks.push(text("Title", 0.0, 280.0, 200.0, 295.0));
        layout.text_blocks.push(text("Caption", 0.0, 100.0, 200.0, 110.0));
        layout.fragments = fragments(&[(10.0, 150.0, 100.0, 250.0)]);
        layout.tables.push(Table {
            bbox: BoundingBox::new(0.0, 10.0, 250.0, 90.0),
        });

        let mut store = MemoryImageStore::new();
        let bitmap = bitmap();
        let (content, stats) = LayoutMerger::new(&config)
            .merge_page(layout, Some(&bitmap), &mut store)
            .unwrap();

        assert_eq!(
            content.content,
            "Title <image>image_page-1_im-1.jpg</image> Caption <image>table_page-1_im-3.jpg</image>"
        );
        assert_eq!(content.page, 2);
        assert_eq!(store.names(), vec!["image_page-1_im-1.jpg", "table_page-1_im-3.jpg"]);
        assert_eq!(store.regions()[0].width, 90);
        assert_eq!(store.regions()[0].height, 100);
        assert_eq!(stats.images_written, 2);
    }

    #[test]
    fn test_missing_bitmap_is_fatal_by_default() {
        let config = LayoutConfig::default();
        let mut layout = page(4);
        layout.tables.push(Table {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        });
        let mut store = MemoryImageStore::new();
        let result = LayoutMerger::new(&config).merge_page(layout, None, &mut store);
        assert!(matches!(result, Err(LayoutError::MissingBitmap { page: 4, .. })));
    }

    #[test]
    fn test_missing_bitmap_text_only_keeps_text() {
        let mut config = LayoutConfig::default();
        config.missing_bitmap = MissingBitmapPolicy::TextOnly;
        let mut layout = page(0);
        layout.text_blocks.push(text("Body", 0.0, 200.0, 100.0, 210.0));
        layout.tables.push(Table {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
        });
        let mut store = MemoryImageStore::new();
        let (content, stats) = LayoutMerger::new(&config)
            .merge_page(layout, None, &mut store)
            .unwrap();
        assert_eq!(content.content, "Body");
        assert_eq!(stats.regions_skipped, 1);
        assert_eq!(store.saved_count(), 0);
    }

    #[test]
    fn test_regions_past_the_bitmap_keep_placeholder_and_size() {
        let config = LayoutConfig::default();
        let mut layout = page(0);
        // Entirely right of the page, starting on its right edge, and straddling it
        layout.tables.push(Table {
            bbox: BoundingBox::new(500.0, 200.0, 600.0, 210.0),
        });
        layout.tables.push(Table {
            bbox: BoundingBox::new(300.0, 100.0, 320.0, 110.0),
        });
        layout.tables.push(Table {
            bbox: BoundingBox::new(280.0, 0.0, 320.0, 10.0),
        });
        let mut store = MemoryImageStore::new();
        let bitmap = bitmap();
        let (content, stats) = LayoutMerger::new(&config)
            .merge_page(layout, Some(&bitmap), &mut store)
            .unwrap();

        assert_eq!(
            content.content,
            "<image>table_page-0_im-0.jpg</image> <image>table_page-0_im-1.jpg</image> <image>table_page-0_im-2.jpg</image>"
        );
        let sizes: Vec<_> = store.regions().iter().map(|r| (r.width, r.height)).collect();
        assert_eq!(sizes, vec![(100, 10), (20, 10), (40, 10)]);
        assert_eq!(stats.images_written, 3);
        assert_eq!(stats.regions_skipped, 0);
    }

    #[test]
    fn test_non_finite_region_is_rejected() {
        let config = LayoutConfig::default();
        let mut layout = page(3);
        layout.tables.push(Table {
            bbox: BoundingBox {
                x0: f64::NAN,
                y0: 0.0,
                x1: 10.0,
                y1: 10.0,
            },
        });
        let mut store = MemoryImageStore::new();
        let bitmap = bitmap();
        let result = LayoutMerger::new(&config).merge_page(layout, Some(&bitmap), &mut store);
        assert!(matches!(result, Err(LayoutError::InvalidLayout { page: 3, .. })));
    }

    #[test]
    fn test_empty_page() {
        let config = LayoutConfig::default();
        let mut store = MemoryImageStore::new();
        let (content, _) = LayoutMerger::new(&config)
            .merge_page(page(7), None, &mut store)
            .unwrap();
        assert_eq!(content, PageContent { page: 8, content: String::new() });
        assert_eq!(store.saved_count(), 0);
    }

    #[test]
    fn test_blank_text_blocks_keep_their_separator() {
        let config = LayoutConfig::default();
        let mut layout = page(0);
        layout.text_blocks.push(text("A", 0.0, 200.0, 10.0, 210.0));
        layout.text_blocks.push(text("   ", 0.0, 150.0, 10.0, 160.0));
        layout.text_blocks.push(text("B", 0.0, 100.0, 10.0, 110.0));
        let mut store = MemoryImageStore::new();
        let (content, _) = LayoutMerger::new(&config)
            .merge_page(layout, None, &mut store)
            .unwrap();
        assert_eq!(content.content, "A  B");
    }
}
