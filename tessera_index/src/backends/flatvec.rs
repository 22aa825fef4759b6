// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. Small and simple; good for tiny sets.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::geom::{contains_point, overlaps};

/// Flat vector backend with linear scans.
#[derive(Default)]
pub struct FlatVec {
    rects: Vec<Option<Rect>>,
}

impl Debug for FlatVec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.rects.iter().filter(|r| r.is_some()).count();
        f.debug_struct("FlatVec")
            .field("total_slots", &self.rects.len())
            .field("alive", &alive)
            .finish_non_exhaustive()
    }
}

impl Backend for FlatVec {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.rects.len() <= slot {
            self.rects.resize(slot + 1, None);
        }
        self.rects[slot] = Some(rect);
    }

    fn remove(&mut self, slot: usize) {
        if let Some(r) = self.rects.get_mut(slot) {
            *r = None;
        }
    }

    fn clear(&mut self) {
        self.rects.clear();
    }

    fn visit_point<F: FnMut(usize)>(&self, pt: Point, mut f: F) {
        for (i, r) in self.rects.iter().enumerate() {
            if let Some(r) = r
                && contains_point(r, pt)
            {
                f(i);
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        for (i, r) in self.rects.iter().enumerate() {
            if let Some(r) = r
                && overlaps(r, &rect)
            {
                f(i);
            }
        }
    }
}
