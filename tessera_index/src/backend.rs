// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.

use kurbo::{Point, Rect};

/// Spatial backend abstraction used by [`IndexGeneric`][crate::IndexGeneric].
///
/// Backends only know about slot numbers and rectangles. The index owns the
/// payloads and the key generations, and guarantees that a slot is removed
/// before it is inserted again.
pub trait Backend {
    /// Insert a slot with its rectangle.
    fn insert(&mut self, slot: usize, rect: Rect);

    /// Remove a slot. Removing an unknown slot is a no-op.
    fn remove(&mut self, slot: usize);

    /// Drop every slot.
    fn clear(&mut self);

    /// Visit slots whose rectangle contains the point (edges included).
    fn visit_point<F: FnMut(usize)>(&self, pt: Point, f: F);

    /// Visit slots whose rectangle overlaps `rect` (edges included).
    ///
    /// Each matching slot is reported exactly once.
    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F);
}
