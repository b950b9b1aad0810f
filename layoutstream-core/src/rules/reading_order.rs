use crate::config::ReadingOrderConfig;
use crate::error::Result;
use crate::types::{BoundingBox, LayoutElement};
use std::cmp::Ordering;

/// Orders a page's elements top-to-bottom, then left-to-right.
///
/// Elements whose top edges fall in the same `y_tolerance` bucket count as
/// one visual row and are ordered by their left edge.
pub struct ReadingOrderRule<'a> {
    config: &'a ReadingOrderConfig,
}

impl<'a> ReadingOrderRule<'a> {
    pub fn new(config: &'a ReadingOrderConfig) -> Self {
        Self { config }
    }

    pub fn apply(&self, mut elements: Vec<LayoutElement>) -> Result<Vec<LayoutElement>> {
        self.config.validate()?;
        let tolerance = self.config.y_tolerance;
        // Stable: ties on both keys keep input order
        elements.sort_by(|a, b| compare_reading_order(&a.bbox(), &b.bbox(), tolerance));
        Ok(elements)
    }
}

/// Sort with an explicit tolerance
pub fn sort_reading_order(elements: Vec<LayoutElement>, y_tolerance: f64) -> Result<Vec<LayoutElement>> {
    let config = ReadingOrderConfig { y_tolerance };
    ReadingOrderRule::new(&config).apply(elements)
}

/// Row bucket of a box: `round(-y1 / y_tolerance)`, ties to even.
///
/// Higher boxes (larger `y1`) get smaller buckets and therefore come first.
pub fn row_bucket(bbox: &BoundingBox, y_tolerance: f64) -> i64 {
    (-bbox.y1 / y_tolerance).round_ties_even() as i64
}

pub fn compare_reading_order(a: &BoundingBox, b: &BoundingBox, y_tolerance: f64) -> Ordering {
    row_bucket(a, y_tolerance)
        .cmp(&row_bucket(b, y_tolerance))
        .then_with(|| a.x0.total_cmp(&b.x0))
}
