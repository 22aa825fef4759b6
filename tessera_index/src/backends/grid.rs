// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid backend for screen-space rectangles.
//!
//! Rectangles are bucketed into square cells and queries only touch the cells
//! overlapping the query. A slot spanning several cells is listed in each of
//! them; rect queries report it once, from the first cell (in x-then-y order)
//! shared by the slot's cell range and the query's cell range, so no
//! per-query "seen" set is needed.
//!
//! Slots covering more than [`MAX_LINKED_CELLS`] cells are not linked into
//! cells at all. They sit in a side list that every query scans linearly, so
//! inserting a rectangle costs at most that many cells whatever its area.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::backend::Backend;
use crate::geom::{contains_point, overlaps};

/// Cell size used by [`Grid::default`], in the same units as inserted rectangles.
pub const DEFAULT_CELL_SIZE: f64 = 128.0;

/// Largest number of cells a slot is linked into; bigger slots are kept aside.
pub const MAX_LINKED_CELLS: u64 = 64;

/// Inclusive range of cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellRange {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl CellRange {
    fn intersect(self, other: Self) -> Option<Self> {
        let r = Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
    }

    fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    fn contains(self, (x, y): (i32, i32)) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }

    fn count(self) -> u64 {
        let w = (i64::from(self.x1) - i64::from(self.x0) + 1).unsigned_abs();
        let h = (i64::from(self.y1) - i64::from(self.y0) + 1).unsigned_abs();
        w.saturating_mul(h)
    }

    fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.x0..=self.x1).flat_map(move |x| (self.y0..=self.y1).map(move |y| (x, y)))
    }
}

#[derive(Clone, Debug)]
struct SlotEntry {
    rect: Rect,
    range: CellRange,
    oversized: bool,
}

/// Uniform grid backend with a fixed cell size.
pub struct Grid {
    cell_size: f64,
    origin: Point,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
    slots: Vec<Option<SlotEntry>>,
    oversized: Vec<usize>,
    // Bounding range of every cell ever occupied since the last clear.
    extent: Option<CellRange>,
}

impl Debug for Grid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let live_slots = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Grid")
            .field("cell_size", &self.cell_size)
            .field("origin", &self.origin)
            .field("live_slots", &live_slots)
            .field("cells", &self.cells.len())
            .field("oversized", &self.oversized.len())
            .finish_non_exhaustive()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl Grid {
    /// Create a grid with the given cell size and its origin at (0, 0).
    pub fn new(cell_size: f64) -> Self {
        Self::with_origin(cell_size, Point::ORIGIN)
    }

    /// Create a grid with the given cell size and origin.
    pub fn with_origin(cell_size: f64, origin: Point) -> Self {
        debug_assert!(
            cell_size > 0.0 && cell_size.is_finite(),
            "grid cell_size must be finite and strictly positive"
        );
        Self {
            cell_size,
            origin,
            cells: HashMap::new(),
            slots: Vec::new(),
            oversized: Vec::new(),
            extent: None,
        }
    }

    /// The configured cell size.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Cell coordinates are i32; float-to-int casts saturate out-of-range values."
    )]
    fn cell_coord(&self, value: f64, origin: f64) -> i32 {
        let t = (value - origin) / self.cell_size;
        let coord = t as i32;
        // The cast truncates toward zero; step down for negative fractions.
        if t < 0.0 && f64::from(coord) > t {
            coord.saturating_sub(1)
        } else {
            coord
        }
    }

    fn range_of(&self, rect: &Rect) -> CellRange {
        let x0 = self.cell_coord(rect.x0, self.origin.x);
        let x1 = self.cell_coord(rect.x1, self.origin.x);
        let y0 = self.cell_coord(rect.y0, self.origin.y);
        let y1 = self.cell_coord(rect.y1, self.origin.y);
        CellRange {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    fn slot_entry(&self, slot: usize) -> &SlotEntry {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .expect("grid invariant violated: cell references a vacant slot")
    }

    fn unlink(&mut self, slot: usize, entry: &SlotEntry) {
        if entry.oversized {
            if let Some(pos) = self.oversized.iter().position(|&s| s == slot) {
                self.oversized.swap_remove(pos);
            }
            return;
        }
        for cell in entry.range.cells() {
            debug_assert!(
                self.cells.contains_key(&cell),
                "grid invariant violated: missing cell {cell:?}"
            );
            if let Some(members) = self.cells.get_mut(&cell) {
                if let Some(pos) = members.iter().position(|&s| s == slot) {
                    members.swap_remove(pos);
                }
                if members.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }
}

impl Backend for Grid {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if let Some(old) = self.slots[slot].take() {
            self.unlink(slot, &old);
        }
        let range = self.range_of(&rect);
        let oversized = range.count() > MAX_LINKED_CELLS;
        if oversized {
            self.oversized.push(slot);
        } else {
            for cell in range.cells() {
                self.cells.entry(cell).or_default().push(slot);
            }
            self.extent = Some(match self.extent {
                Some(extent) => extent.union(range),
                None => range,
            });
        }
        self.slots[slot] = Some(SlotEntry {
            rect,
            range,
            oversized,
        });
    }

    fn remove(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot).and_then(Option::take) {
            self.unlink(slot, &entry);
        }
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.slots.clear();
        self.oversized.clear();
        self.extent = None;
    }

    fn visit_point<F: FnMut(usize)>(&self, pt: Point, mut f: F) {
        for &slot in &self.oversized {
            if contains_point(&self.slot_entry(slot).rect, pt) {
                f(slot);
            }
        }
        let cell = (
            self.cell_coord(pt.x, self.origin.x),
            self.cell_coord(pt.y, self.origin.y),
        );
        if let Some(members) = self.cells.get(&cell) {
            for &slot in members {
                if contains_point(&self.slot_entry(slot).rect, pt) {
                    f(slot);
                }
            }
        }
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        for &slot in &self.oversized {
            if overlaps(&self.slot_entry(slot).rect, &rect) {
                f(slot);
            }
        }

        let Some(range) = self
            .extent
            .and_then(|extent| self.range_of(&rect).intersect(extent))
        else {
            return;
        };

        let mut visit_cell = |cell: (i32, i32), members: &SmallVec<[usize; 8]>| {
            for &slot in members {
                let entry = self.slot_entry(slot);
                let first_shared = entry
                    .range
                    .intersect(range)
                    .map(|shared| (shared.x0, shared.y0));
                if first_shared == Some(cell) && overlaps(&entry.rect, &rect) {
                    f(slot);
                }
            }
        };

        if range.count() > self.cells.len() as u64 {
            // Sparse grid: walking occupied cells is cheaper than walking the range.
            for (&cell, members) in &self.cells {
                if range.contains(cell) {
                    visit_cell(cell, members);
                }
            }
        } else {
            for cell in range.cells() {
                if let Some(members) = self.cells.get(&cell) {
                    visit_cell(cell, members);
                }
            }
        }
    }
}
