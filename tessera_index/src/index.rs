// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::backends::FlatVec;
use crate::geom::is_finite;

/// Generational handle for entries.
///
/// A key stays valid until its entry is removed or the index is cleared. Slots
/// are recycled, but the generation is bumped on every reuse so a stale key
/// never resolves to a newer entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Index keys are 32-bit; an index never holds more than u32::MAX slots."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Slot<P> {
    generation: u32,
    entry: Option<(Rect, P)>,
}

/// A keyed rectangle index parameterized by a spatial backend.
pub struct IndexGeneric<P, B: Backend> {
    slots: Vec<Slot<P>>,
    free_list: Vec<usize>,
    len: usize,
    backend: B,
}

impl<P, B: Backend + Debug> Debug for IndexGeneric<P, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexGeneric")
            .field("slots", &self.slots.len())
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<P, B: Backend + Default> Default for IndexGeneric<P, B> {
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}

impl<P, B: Backend + Default> IndexGeneric<P, B> {
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P, B: Backend> IndexGeneric<P, B> {
    /// Create an empty index using an explicit backend instance.
    pub fn with_backend(backend: B) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            backend,
        }
    }

    /// Reserve space for at least `n` more entries.
    pub fn reserve(&mut self, n: usize) {
        self.slots.reserve(n.saturating_sub(self.free_list.len()));
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a rectangle with its payload. The entry is queryable immediately.
    pub fn insert(&mut self, rect: Rect, payload: P) -> Key {
        debug_assert!(is_finite(&rect), "index rectangles must be finite");
        let idx = match self.free_list.pop() {
            Some(idx) => idx,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[idx];
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Some((rect, payload));
        let generation = slot.generation;
        self.backend.insert(idx, rect);
        self.len += 1;
        Key::new(idx, generation)
    }

    /// Remove an entry, returning its payload. Stale keys return `None`.
    pub fn remove(&mut self, key: Key) -> Option<P> {
        let slot = self.slots.get_mut(key.idx())?;
        if slot.generation != key.1 {
            return None;
        }
        let (_, payload) = slot.entry.take()?;
        self.backend.remove(key.idx());
        self.free_list.push(key.idx());
        self.len -= 1;
        Some(payload)
    }

    /// Drop every entry. All outstanding keys become stale.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (idx, slot) in self.slots.iter_mut().enumerate().rev() {
            slot.entry = None;
            self.free_list.push(idx);
        }
        self.backend.clear();
        self.len = 0;
    }

    /// The payload stored under `key`.
    pub fn get(&self, key: Key) -> Option<&P> {
        self.live(key).map(|(_, p)| p)
    }

    /// The rectangle stored under `key`.
    pub fn rect(&self, key: Key) -> Option<Rect> {
        self.live(key).map(|(r, _)| *r)
    }

    /// Whether `key` refers to a live entry.
    pub fn contains_key(&self, key: Key) -> bool {
        self.live(key).is_some()
    }

    /// Iterate over all live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, Rect, &P)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.entry
                .as_ref()
                .map(|(rect, payload)| (Key::new(idx, slot.generation), *rect, payload))
        })
    }

    /// Visit entries whose rectangle overlaps `rect` (does not allocate result storage).
    ///
    /// Calls `f(key, payload)` for each match. The order is backend-dependent.
    pub fn visit_rect<F: FnMut(Key, &P)>(&self, rect: Rect, mut f: F) {
        self.backend.visit_rect(rect, |idx| {
            let slot = &self.slots[idx];
            if let Some((_, payload)) = slot.entry.as_ref() {
                f(Key::new(idx, slot.generation), payload);
            }
        });
    }

    /// Visit entries whose rectangle contains the point.
    pub fn visit_point<F: FnMut(Key, &P)>(&self, pt: Point, mut f: F) {
        self.backend.visit_point(pt, |idx| {
            let slot = &self.slots[idx];
            if let Some((_, payload)) = slot.entry.as_ref() {
                f(Key::new(idx, slot.generation), payload);
            }
        });
    }

    /// Keys of entries whose rectangle overlaps `rect`.
    pub fn query_rect(&self, rect: Rect) -> Vec<Key> {
        let mut out = Vec::new();
        self.visit_rect(rect, |k, _| out.push(k));
        out
    }

    /// Keys of entries whose rectangle contains the point.
    pub fn query_point(&self, pt: Point) -> Vec<Key> {
        let mut out = Vec::new();
        self.visit_point(pt, |k, _| out.push(k));
        out
    }

    fn live(&self, key: Key) -> Option<&(Rect, P)> {
        let slot = self.slots.get(key.idx())?;
        if slot.generation != key.1 {
            return None;
        }
        slot.entry.as_ref()
    }
}

/// Default index using a flat vector backend.
pub type Index<P> = IndexGeneric<P, FlatVec>;

#[cfg(feature = "backend_grid")]
impl<P> IndexGeneric<P, crate::backends::Grid> {
    /// Create an index backed by a uniform grid with the given cell size.
    pub fn with_grid(cell_size: f64) -> Self {
        Self::with_backend(crate::backends::Grid::new(cell_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn stale_key_does_not_alias_reused_slot() {
        let mut idx: Index<u32> = Index::new();
        let a = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
        assert_eq!(idx.remove(a), Some(1));
        let b = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 2);
        assert_ne!(a, b);
        assert_eq!(idx.get(a), None);
        assert_eq!(idx.remove(a), None);
        assert_eq!(idx.get(b), Some(&2));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn mutations_are_visible_to_the_next_query() {
        let mut idx: Index<u32> = Index::new();
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(idx.query_rect(r).is_empty());
        let k = idx.insert(r, 7);
        assert_eq!(idx.query_rect(r), vec![k]);
        idx.remove(k);
        assert!(idx.query_rect(r).is_empty());
    }

    #[test]
    fn clear_invalidates_keys_and_recycles_slots() {
        let mut idx: Index<u32> = Index::new();
        let k1 = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 1);
        let k2 = idx.insert(Rect::new(2.0, 2.0, 3.0, 3.0), 2);
        idx.clear();
        assert!(idx.is_empty());
        assert!(!idx.contains_key(k1));
        assert!(!idx.contains_key(k2));
        assert!(idx.query_point(Point::new(0.5, 0.5)).is_empty());

        let k3 = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 3);
        assert_eq!(k3.idx(), k1.idx());
        assert_eq!(idx.iter().count(), 1);
    }

    #[test]
    fn visit_point_and_rect_match_query_counts() {
        let mut idx: Index<u32> = Index::new();
        idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
        idx.insert(Rect::new(5.0, 5.0, 15.0, 15.0), 2);

        let pt = Point::new(6.0, 6.0);
        let mut visits = 0;
        idx.visit_point(pt, |_, _| visits += 1);
        assert_eq!(visits, idx.query_point(pt).len());

        let r = Rect::new(12.0, 12.0, 20.0, 20.0);
        let mut payloads = Vec::new();
        idx.visit_rect(r, |_, p| payloads.push(*p));
        assert_eq!(payloads, vec![2]);
    }

    #[cfg(feature = "backend_grid")]
    #[test]
    fn grid_and_flat_backends_agree() {
        let rects = [
            Rect::new(0.0, 0.0, 40.0, 20.0),
            Rect::new(35.0, 10.0, 80.0, 30.0),
            Rect::new(-50.0, -50.0, -10.0, -10.0),
            Rect::new(200.0, 200.0, 201.0, 201.0),
        ];
        let mut flat: Index<usize> = Index::new();
        let mut grid = IndexGeneric::<usize, crate::backends::Grid>::with_grid(32.0);
        for (i, r) in rects.iter().enumerate() {
            flat.insert(*r, i);
            grid.insert(*r, i);
        }
        for q in [
            Rect::new(30.0, 5.0, 36.0, 12.0),
            Rect::new(-20.0, -20.0, 0.0, 0.0),
            Rect::new(100.0, 100.0, 150.0, 150.0),
            Rect::new(-1000.0, -1000.0, 1000.0, 1000.0),
        ] {
            let mut a = Vec::new();
            flat.visit_rect(q, |_, p| a.push(*p));
            let mut b = Vec::new();
            grid.visit_rect(q, |_, p| b.push(*p));
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b, "backends disagree for query {q:?}");
        }
    }
}
