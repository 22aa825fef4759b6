// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inclusive rectangle predicates shared by backends and callers.

use kurbo::{Point, Rect};

/// Whether two rectangles overlap in any way.
///
/// Edges are part of the rectangle, so rectangles that only touch along an edge
/// or at a corner overlap. Rectangles are expected to be normalized
/// (`x0 <= x1`, `y0 <= y1`).
///
/// # Examples
///
/// ```
/// use kurbo::Rect;
/// use tessera_index::overlaps;
///
/// let a = Rect::new(0.0, 0.0, 10.0, 10.0);
/// assert!(overlaps(&a, &Rect::new(5.0, 5.0, 15.0, 15.0)));
/// assert!(overlaps(&a, &Rect::new(10.0, 0.0, 20.0, 10.0)));
/// assert!(!overlaps(&a, &Rect::new(11.0, 0.0, 20.0, 10.0)));
/// ```
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Whether the rectangle contains the point, edges included.
#[inline]
pub fn contains_point(rect: &Rect, pt: Point) -> bool {
    rect.x0 <= pt.x && pt.x <= rect.x1 && rect.y0 <= pt.y && pt.y <= rect.y1
}

#[inline]
pub(crate) fn is_finite(rect: &Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_contact_counts_as_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 10.0, 12.0, 12.0);
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn degenerate_rect_is_a_point() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let p = Rect::new(3.0, 3.0, 3.0, 3.0);
        assert!(overlaps(&a, &p));
        assert!(contains_point(&a, Point::new(10.0, 0.0)));
        assert!(!contains_point(&a, Point::new(10.5, 0.0)));
    }
}
