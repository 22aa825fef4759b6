// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera View: the per-frame screen transform of a map view.
//!
//! A [`ScreenView`] answers two questions for everything that places or draws
//! content in a frame:
//! - Where does a world-space point land on screen? ([`ScreenView::g_to_p`])
//! - Which part of the world is visible? ([`ScreenView::global_rect`])
//!
//! World space is y-up (map convention); pixel space is y-down with the origin at
//! the top-left of the surface. The view is defined by the pixel viewport, the
//! world point shown at the viewport center, a uniform scale in pixels per world
//! unit, and a rotation angle in radians.
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use tessera_view::ScreenView;
//!
//! let mut view = ScreenView::new(Rect::new(0.0, 0.0, 800.0, 600.0));
//! view.set_center(Point::new(10.0, 20.0));
//! view.set_scale(2.0);
//!
//! // The center of the world view lands in the middle of the viewport.
//! assert_eq!(view.g_to_p(Point::new(10.0, 20.0)), Point::new(400.0, 300.0));
//! // One world unit up is two pixels up on screen.
//! assert_eq!(view.g_to_p(Point::new(10.0, 21.0)), Point::new(400.0, 298.0));
//! ```
//!
//! This crate is `no_std`.

#![no_std]

use kurbo::{Affine, Point, Rect, Vec2};

/// Screen transform of a map view for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenView {
    pixel_rect: Rect,
    center: Point,
    scale: f64,
    angle: f64,
    world_to_pixel: Affine,
    pixel_to_world: Affine,
}

impl Default for ScreenView {
    fn default() -> Self {
        Self::new(Rect::ZERO)
    }
}

impl ScreenView {
    /// A view over `pixel_rect` centered on the world origin at scale 1 and no rotation.
    #[must_use]
    pub fn new(pixel_rect: Rect) -> Self {
        Self::with_center(pixel_rect, Point::ORIGIN, 1.0, 0.0)
    }

    /// A fully specified view.
    ///
    /// Non-positive or non-finite scales fall back to `1.0`.
    #[must_use]
    pub fn with_center(pixel_rect: Rect, center: Point, scale: f64, angle: f64) -> Self {
        let mut view = Self {
            pixel_rect,
            center,
            scale: sanitize_scale(scale),
            angle,
            world_to_pixel: Affine::IDENTITY,
            pixel_to_world: Affine::IDENTITY,
        };
        view.rebuild();
        view
    }

    /// Pixel viewport of the drawing surface.
    pub fn pixel_rect(&self) -> Rect {
        self.pixel_rect
    }

    /// World point shown at the viewport center.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Pixels per world unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// World-to-pixel transform.
    pub fn world_to_pixel(&self) -> Affine {
        self.world_to_pixel
    }

    /// Pixel-to-world transform.
    pub fn pixel_to_world(&self) -> Affine {
        self.pixel_to_world
    }

    /// Replace the pixel viewport (for example after a surface resize).
    pub fn set_pixel_rect(&mut self, rect: Rect) {
        if self.pixel_rect != rect {
            self.pixel_rect = rect;
            self.rebuild();
        }
    }

    /// Move the view so `center` is shown in the middle of the viewport.
    pub fn set_center(&mut self, center: Point) {
        if self.center != center {
            self.center = center;
            self.rebuild();
        }
    }

    /// Set the scale in pixels per world unit. Invalid scales are ignored.
    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 && scale.is_finite() && scale != self.scale {
            self.scale = scale;
            self.rebuild();
        }
    }

    /// Set the rotation angle in radians.
    pub fn set_angle(&mut self, angle: f64) {
        if self.angle != angle {
            self.angle = angle;
            self.rebuild();
        }
    }

    /// Drag the map by a pixel-space delta: content follows the pointer.
    pub fn move_by_pixels(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        let anchor = self.pixel_rect.center();
        let target = self.p_to_g(anchor - delta);
        self.set_center(target);
    }

    /// Zoom by `factor` keeping the world point under `anchor` (pixel space) fixed.
    pub fn scale_about_pixel(&mut self, anchor: Point, factor: f64) {
        if !(factor > 0.0 && factor.is_finite()) {
            return;
        }
        let fixed = self.p_to_g(anchor);
        self.scale = sanitize_scale(self.scale * factor);
        self.rebuild();
        let drift = self.g_to_p(fixed) - anchor;
        self.move_by_pixels(-drift);
    }

    /// Convert a world point to pixel space.
    pub fn g_to_p(&self, pt: Point) -> Point {
        self.world_to_pixel * pt
    }

    /// Convert a pixel point to world space.
    pub fn p_to_g(&self, pt: Point) -> Point {
        self.pixel_to_world * pt
    }

    /// Pixel-space bounding box of a world rectangle.
    ///
    /// Loose under rotation: the box contains the rotated rectangle but is not tight.
    pub fn g_to_p_rect(&self, rect: Rect) -> Rect {
        self.world_to_pixel.transform_rect_bbox(rect)
    }

    /// World-space bounding box of the visible viewport.
    pub fn global_rect(&self) -> Rect {
        self.pixel_to_world.transform_rect_bbox(self.pixel_rect)
    }

    fn rebuild(&mut self) {
        self.world_to_pixel = Affine::translate(self.pixel_rect.center().to_vec2())
            * Affine::rotate(self.angle)
            * Affine::scale_non_uniform(self.scale, -self.scale)
            * Affine::translate(-self.center.to_vec2());
        self.pixel_to_world = self.world_to_pixel.inverse();
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale > 0.0 && scale.is_finite() {
        scale
    } else {
        1.0
    }
}
