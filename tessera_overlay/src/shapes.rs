// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stock handle variants: anchored boxes and boxes strung along a path.

use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::{Point, Rect, Size, Vec2};
use tessera_view::ScreenView;

use crate::handle::{FeatureId, OverlayHandle, PixelShape};

/// Which side of a [`RectHandle`] sits on its pivot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
    /// Box centered on the pivot.
    #[default]
    Center,
    /// Top edge on the pivot; the box hangs below it.
    Top,
    /// Bottom edge on the pivot; the box sits above it.
    Bottom,
    /// Left edge on the pivot; the box extends to the right.
    Left,
    /// Right edge on the pivot; the box extends to the left.
    Right,
}

/// A fixed-size pixel box pinned to a world point: icons, point labels, shields.
#[derive(Debug)]
pub struct RectHandle {
    pivot: Point,
    size: Size,
    anchor: Anchor,
    offset: Vec2,
    priority: f64,
    feature: FeatureId,
    visible: Cell<bool>,
}

impl RectHandle {
    /// A centered box of `size` pixels at world point `pivot`.
    pub fn new(pivot: Point, size: Size, priority: f64) -> Self {
        Self {
            pivot,
            size,
            anchor: Anchor::Center,
            offset: Vec2::ZERO,
            priority,
            feature: FeatureId::INVALID,
            visible: Cell::new(false),
        }
    }

    /// Set the anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Shift the box by a pixel offset after anchoring.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Attach the feature this box decorates.
    #[must_use]
    pub fn with_feature(mut self, feature: FeatureId) -> Self {
        self.feature = feature;
        self
    }

    /// World-space pivot.
    pub fn pivot(&self) -> Point {
        self.pivot
    }
}

impl OverlayHandle for RectHandle {
    fn priority(&self) -> f64 {
        self.priority
    }

    fn feature_id(&self) -> FeatureId {
        self.feature
    }

    fn update(&self, view: &ScreenView) -> bool {
        let p = view.g_to_p(self.pivot);
        self.size.width > 0.0 && self.size.height > 0.0 && p.x.is_finite() && p.y.is_finite()
    }

    fn pixel_rect(&self, view: &ScreenView) -> Rect {
        let p = view.g_to_p(self.pivot) + self.offset;
        let (w, h) = (self.size.width, self.size.height);
        let origin = match self.anchor {
            Anchor::Center => Point::new(p.x - w / 2.0, p.y - h / 2.0),
            Anchor::Top => Point::new(p.x - w / 2.0, p.y),
            Anchor::Bottom => Point::new(p.x - w / 2.0, p.y - h),
            Anchor::Left => Point::new(p.x, p.y - h / 2.0),
            Anchor::Right => Point::new(p.x - w, p.y - h / 2.0),
        };
        Rect::from_origin_size(origin, self.size)
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

/// Glyph-sized boxes strung along a world-space polyline (road names, contour labels).
///
/// The shape is one box per sample point, so two path labels only conflict where
/// their glyphs actually come close, not wherever their bounding boxes overlap.
#[derive(Debug)]
pub struct PathHandle {
    samples: Vec<Point>,
    glyph: Size,
    priority: f64,
    feature: FeatureId,
    visible: Cell<bool>,
}

impl PathHandle {
    /// Boxes of size `glyph` centered on each world-space sample.
    pub fn new(samples: Vec<Point>, glyph: Size, priority: f64) -> Self {
        Self {
            samples,
            glyph,
            priority,
            feature: FeatureId::INVALID,
            visible: Cell::new(false),
        }
    }

    /// Attach the feature this path label decorates.
    #[must_use]
    pub fn with_feature(mut self, feature: FeatureId) -> Self {
        self.feature = feature;
        self
    }
}

impl OverlayHandle for PathHandle {
    fn priority(&self) -> f64 {
        self.priority
    }

    fn feature_id(&self) -> FeatureId {
        self.feature
    }

    fn update(&self, view: &ScreenView) -> bool {
        !self.samples.is_empty()
            && self.glyph.width > 0.0
            && self.glyph.height > 0.0
            && self.samples.iter().all(|s| {
                let p = view.g_to_p(*s);
                p.x.is_finite() && p.y.is_finite()
            })
    }

    fn pixel_rect(&self, view: &ScreenView) -> Rect {
        self.pixel_shape(view)
            .into_iter()
            .reduce(|acc, r| acc.union(r))
            .unwrap_or(Rect::ZERO)
    }

    fn pixel_shape(&self, view: &ScreenView) -> PixelShape {
        self.samples
            .iter()
            .map(|s| Rect::from_center_size(view.g_to_p(*s), self.glyph))
            .collect()
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn view() -> ScreenView {
        // World origin at pixel (50, 50), scale 1, y-up world.
        ScreenView::new(Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn anchors_position_box_around_pivot() {
        let v = view();
        let size = Size::new(10.0, 4.0);
        let at = |anchor| {
            RectHandle::new(Point::ORIGIN, size, 0.0)
                .with_anchor(anchor)
                .pixel_rect(&v)
        };
        assert_eq!(at(Anchor::Center), Rect::new(45.0, 48.0, 55.0, 52.0));
        assert_eq!(at(Anchor::Top), Rect::new(45.0, 50.0, 55.0, 54.0));
        assert_eq!(at(Anchor::Bottom), Rect::new(45.0, 46.0, 55.0, 50.0));
        assert_eq!(at(Anchor::Left), Rect::new(50.0, 48.0, 60.0, 52.0));
        assert_eq!(at(Anchor::Right), Rect::new(40.0, 48.0, 50.0, 52.0));
    }

    #[test]
    fn offset_applies_after_anchoring() {
        let h = RectHandle::new(Point::ORIGIN, Size::new(2.0, 2.0), 0.0)
            .with_offset(Vec2::new(5.0, -5.0));
        assert_eq!(h.pixel_rect(&view()), Rect::new(54.0, 44.0, 56.0, 46.0));
    }

    #[test]
    fn degenerate_geometry_declines_update() {
        let v = view();
        assert!(!RectHandle::new(Point::ORIGIN, Size::new(0.0, 3.0), 0.0).update(&v));
        assert!(!PathHandle::new(Vec::new(), Size::new(3.0, 3.0), 0.0).update(&v));
        assert!(PathHandle::new(vec![Point::ORIGIN], Size::new(3.0, 3.0), 0.0).update(&v));
    }

    #[test]
    fn path_shape_is_finer_than_its_bounds() {
        let v = view();
        // An L-shaped run of glyphs: bounds cover the empty corner, the shape does not.
        let path = PathHandle::new(
            vec![
                Point::new(-20.0, 20.0),
                Point::new(-20.0, -20.0),
                Point::new(20.0, -20.0),
            ],
            Size::new(4.0, 4.0),
            1.0,
        );
        let bounds = path.pixel_rect(&v);
        assert_eq!(bounds, Rect::new(28.0, 28.0, 72.0, 72.0));

        let corner = [Rect::new(60.0, 30.0, 70.0, 40.0)];
        assert!(bounds.intersect(corner[0]).area() > 0.0);
        assert!(!path.intersects(&v, &corner));

        let on_glyph = [Rect::new(69.0, 69.0, 71.0, 71.0)];
        assert!(path.intersects(&v, &on_glyph));
    }
}
