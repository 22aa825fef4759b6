// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability interface every overlay candidate implements.

use kurbo::Rect;
use smallvec::{SmallVec, smallvec};
use tessera_index::overlaps;
use tessera_view::ScreenView;

/// Pixel-space shape of a handle: one or more rectangles.
pub type PixelShape = SmallVec<[Rect; 4]>;

/// Identifier of the map feature a decoration belongs to.
///
/// Only handles with a valid identifier can be picked by
/// [`OverlayTree::select`](crate::OverlayTree::select).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureId {
    /// Data source (dataset, tile set, layer) the feature comes from.
    pub source: u32,
    /// Index of the feature within its source.
    pub index: u32,
}

impl FeatureId {
    /// Identifier of decorations that do not belong to any feature.
    pub const INVALID: Self = Self {
        source: u32::MAX,
        index: u32::MAX,
    };

    /// Create an identifier.
    pub const fn new(source: u32, index: u32) -> Self {
        Self { source, index }
    }

    /// Whether this refers to an actual feature.
    pub const fn is_valid(&self) -> bool {
        self.source != u32::MAX
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A screen-space decoration candidate (label, icon, path text, ...).
///
/// Handles are shared between the code that produces them and the
/// [`OverlayTree`](crate::OverlayTree); the tree never owns or destroys them and
/// only toggles their visibility flag. Because of that sharing every method
/// takes `&self`, and implementations keep the visibility flag in a
/// [`Cell`](core::cell::Cell).
pub trait OverlayHandle {
    /// Placement priority. Higher wins conflicts.
    fn priority(&self) -> f64;

    /// Feature this decoration belongs to.
    fn feature_id(&self) -> FeatureId {
        FeatureId::INVALID
    }

    /// Recompute geometry for `view`.
    ///
    /// Returning `false` drops the candidate for the current placement cycle,
    /// for example when its geometry degenerates at this scale.
    fn update(&self, view: &ScreenView) -> bool;

    /// Pixel-space bounding box. Used for viewport culling and as the
    /// broad-phase key in the spatial index.
    fn pixel_rect(&self, view: &ScreenView) -> Rect;

    /// Pixel-space shape, possibly several rectangles, all within
    /// [`pixel_rect`](Self::pixel_rect).
    fn pixel_shape(&self, view: &ScreenView) -> PixelShape {
        smallvec![self.pixel_rect(view)]
    }

    /// Whether this handle collides with another handle's pixel shape.
    ///
    /// Called only after the bounding boxes were found to overlap.
    fn intersects(&self, view: &ScreenView, other: &[Rect]) -> bool {
        let own = self.pixel_shape(view);
        own.iter().any(|a| other.iter().any(|b| overlaps(a, b)))
    }

    /// Current visibility flag.
    fn is_visible(&self) -> bool;

    /// Set the visibility flag.
    fn set_visible(&self, visible: bool);
}
