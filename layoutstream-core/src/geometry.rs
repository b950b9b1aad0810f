//! Bounding box operations: envelopes, corner extraction, containment and
//! overlap queries, and the PDF-to-bitmap coordinate transform used for
//! cropping.

use crate::error::{LayoutError, Result};
use crate::types::BoundingBox;

/// Smallest axis-aligned box covering every input box.
pub fn envelope(boxes: &[BoundingBox]) -> Result<BoundingBox> {
    let (first, rest) = boxes.split_first().ok_or(LayoutError::EmptyInput)?;
    Ok(rest.iter().fold(*first, |acc, bbox| acc.union(bbox)))
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// The clustering anchor of a fragment
    pub fn bottom_left(&self) -> (f64, f64) {
        (self.x0, self.y0)
    }

    /// Corners counter-clockwise from the bottom-left
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x0, self.y0),
            (self.x1, self.y0),
            (self.x1, self.y1),
            (self.x0, self.y1),
        ]
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Boxes that only touch along an edge do not overlap
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.overlaps(other) {
            return None;
        }
        Some(BoundingBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        })
    }

    /// Flip a box given in a top-left-origin space of the given page height
    /// into PDF coordinates (or back; the transform is its own inverse).
    pub fn flip_vertical(&self, page_height: f64) -> BoundingBox {
        BoundingBox::new(self.x0, page_height - self.y1, self.x1, page_height - self.y0)
    }
}

/// Pixel rectangle in bitmap space (origin top-left, y down). It may extend
/// past any edge of the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> i64 {
        self.left + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height as i64
    }

    /// Part of the rectangle covered by a bitmap of the given size, as
    /// `(left, top, width, height)` in bitmap pixels.
    pub fn visible_part(&self, bitmap_width: u32, bitmap_height: u32) -> Option<(u32, u32, u32, u32)> {
        let left = self.left.max(0);
        let top = self.top.max(0);
        let right = self.right().min(bitmap_width as i64);
        let bottom = self.bottom().min(bitmap_height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Map a PDF-space box onto a bitmap of height `bitmap_height`.
///
/// Columns `[x0, x1)` and rows `[H - y1, H - y0)`, rounded half to even.
/// Nothing is clamped: the caller pads whatever falls outside the bitmap.
/// Zero-area boxes get one pixel. `None` only for non-finite boxes.
pub fn to_pixel_rect(bbox: &BoundingBox, bitmap_height: u32) -> Option<PixelRect> {
    if !bbox.is_finite() {
        return None;
    }
    let h = bitmap_height as f64;

    let left = bbox.x0.round_ties_even() as i64;
    let right = bbox.x1.round_ties_even() as i64;
    let top = (h - bbox.y1).round_ties_even() as i64;
    let bottom = (h - bbox.y0).round_ties_even() as i64;

    Some(PixelRect {
        left,
        top,
        width: span(left, right),
        height: span(top, bottom),
    })
}

// JPEG cannot hold an empty image
fn span(start: i64, end: i64) -> u32 {
    (end - start).clamp(1, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1)
    }

    #[test]
    fn test_envelope_covers_all_boxes() {
        let boxes = vec![
            bbox(10.0, 20.0, 30.0, 40.0),
            bbox(-5.0, 25.0, 12.0, 80.0),
            bbox(15.0, 0.0, 50.0, 10.0),
        ];
        let env = envelope(&boxes).unwrap();
        assert_eq!(env, bbox(-5.0, 0.0, 50.0, 80.0));
        for b in &boxes {
            assert!(env.contains(b));
        }
    }

    #[test]
    fn test_envelope_of_single_box_is_identity() {
        let b = bbox(1.5, 2.5, 3.5, 4.5);
        assert_eq!(envelope(&[b]).unwrap(), b);
    }

    #[test]
    fn test_envelope_of_nothing_fails() {
        assert!(matches!(envelope(&[]), Err(LayoutError::EmptyInput)));
    }

    #[test]
    fn test_overlap_and_intersection() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 5.0, 15.0, 15.0);
        let c = bbox(10.0, 0.0, 20.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "edge contact is not overlap");
        assert_eq!(a.intersection(&b), Some(bbox(5.0, 5.0, 10.0, 10.0)));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_corners_and_points() {
        let b = bbox(1.0, 2.0, 3.0, 4.0);
        assert_eq!(b.corners(), [(1.0, 2.0), (3.0, 2.0), (3.0, 4.0), (1.0, 4.0)]);
        assert_eq!(b.bottom_left(), (1.0, 2.0));
        assert!(b.contains_point(3.0, 4.0));
        assert!(!b.contains_point(3.1, 4.0));
    }

    #[test]
    fn test_flip_vertical_round_trips() {
        let b = bbox(10.0, 100.0, 50.0, 150.0);
        let flipped = b.flip_vertical(200.0);
        assert_eq!(flipped, bbox(10.0, 50.0, 50.0, 100.0));
        assert_eq!(flipped.flip_vertical(200.0), b);
    }

    #[test]
    fn test_pixel_rect_flips_rows() {
        // Rows [H - y1, H - y0) and columns [x0, x1)
        let rect = to_pixel_rect(&bbox(10.0, 20.0, 40.0, 70.0), 100).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                left: 10,
                top: 30,
                width: 30,
                height: 50
            }
        );
        assert_eq!(rect.bottom(), 80);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.visible_part(100, 100), Some((10, 30, 30, 50)));
    }

    #[test]
    fn test_pixel_rect_keeps_full_size_past_edges() {
        let rect = to_pixel_rect(&bbox(-10.0, -10.0, 50.0, 120.0), 100).unwrap();
        assert_eq!((rect.left, rect.top, rect.width, rect.height), (-10, -20, 60, 130));
        assert_eq!(rect.visible_part(40, 100), Some((0, 0, 40, 100)));
    }

    #[test]
    fn test_pixel_rect_partly_outside() {
        let rect = to_pixel_rect(&bbox(80.0, 0.0, 120.0, 10.0), 100).unwrap();
        assert_eq!((rect.width, rect.height), (40, 10));
        assert_eq!(rect.visible_part(100, 100), Some((80, 90, 20, 10)));
    }

    #[test]
    fn test_pixel_rect_outside_has_no_visible_part() {
        let beyond = to_pixel_rect(&bbox(150.0, 0.0, 200.0, 10.0), 100).unwrap();
        assert_eq!((beyond.width, beyond.height), (50, 10));
        assert_eq!(beyond.visible_part(100, 100), None);

        // Starts exactly on the right edge: no pixel inside
        let edge = to_pixel_rect(&bbox(100.0, 0.0, 120.0, 10.0), 100).unwrap();
        assert_eq!(edge.visible_part(100, 100), None);

        let above = to_pixel_rect(&bbox(0.0, 150.0, 10.0, 160.0), 100).unwrap();
        assert_eq!(above.visible_part(100, 100), None);
    }

    #[test]
    fn test_pixel_rect_rounds_half_to_even() {
        let rect = to_pixel_rect(&bbox(0.5, 0.0, 2.5, 10.0), 10).unwrap();
        assert_eq!((rect.left, rect.right()), (0, 2));
    }

    #[test]
    fn test_pixel_rect_hairline_gets_one_pixel() {
        let rect = to_pixel_rect(&bbox(10.0, 50.0, 60.0, 50.0), 100).unwrap();
        assert_eq!(rect.height, 1);
        assert_eq!(rect.width, 50);
    }

    #[test]
    fn test_pixel_rect_rejects_non_finite_box() {
        let nan = BoundingBox {
            x0: f64::NAN,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
        };
        assert_eq!(to_pixel_rect(&nan, 100), None);
    }
}
