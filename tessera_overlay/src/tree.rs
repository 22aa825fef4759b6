// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy, priority-ordered placement of overlay handles.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use kurbo::Rect;
use smallvec::SmallVec;
use tessera_index::backends::Grid;
use tessera_index::{Backend, IndexGeneric, Key, overlaps};
use tessera_view::ScreenView;
use tracing::{debug, trace};

use crate::handle::OverlayHandle;

/// Counter value meaning "placement is due this frame".
const FRAME_SENTINEL: i32 = -1;

/// Tuning knobs for an [`OverlayTree`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayTreeConfig {
    /// Frames between automatic placement cycles.
    pub update_period: u32,
    /// Candidate capacity reserved up front.
    pub reserve: usize,
    /// Cell size of the spatial grid, in pixels.
    pub grid_cell_size: f64,
}

impl Default for OverlayTreeConfig {
    fn default() -> Self {
        Self {
            update_period: 10,
            reserve: 500,
            grid_cell_size: 128.0,
        }
    }
}

/// Outcome of one placement cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlacementStats {
    /// Candidates that survived geometry update and viewport culling.
    pub submitted: usize,
    /// Handles left in the tree.
    pub committed: usize,
    /// Candidates dropped because a committed handle outranked them.
    pub rejected: usize,
    /// Committed handles displaced by a stronger candidate.
    pub evicted: usize,
}

/// Placement order of a candidate: higher priority first, then earlier submission.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rank {
    priority: f64,
    seq: u64,
}

impl Rank {
    fn placement_order(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then(self.seq.cmp(&other.seq))
    }

    fn outranks(&self, other: &Self) -> bool {
        self.placement_order(other) == Ordering::Less
    }
}

struct OverlayInfo<H: ?Sized> {
    handle: Rc<H>,
    transparent: bool,
    rank: Rank,
}

struct Candidate<H: ?Sized> {
    handle: Rc<H>,
    transparent: bool,
    pixel_rect: Rect,
    rank: Rank,
}

/// Decides which screen decorations are drawn in the current view.
///
/// Placement runs in cycles. Every frame the caller ticks [`frame`](Self::frame);
/// a fresh tree is due immediately. When [`is_need_update`](Self::is_need_update)
/// reports a cycle is due the caller opens it with
/// [`start_overlay_placing`](Self::start_overlay_placing), submits every candidate
/// with [`add`](Self::add), and closes the cycle with
/// [`end_overlay_placing`](Self::end_overlay_placing).
///
/// Candidates are placed greedily from highest priority down; one that collides
/// with an already placed handle of the same transparency class is dropped.
/// Transparent and opaque handles never conflict with each other.
///
/// Outside a cycle the tree holds the accepted handles, all marked visible,
/// until the next cycle or [`force_update`](Self::force_update) clears them.
///
/// ```rust
/// use std::rc::Rc;
/// use kurbo::{Point, Rect, Size};
/// use tessera_overlay::{OverlayHandle, OverlayTree, RectHandle};
/// use tessera_view::ScreenView;
///
/// let view = ScreenView::new(Rect::new(0.0, 0.0, 200.0, 200.0));
/// let city = Rc::new(RectHandle::new(Point::ORIGIN, Size::new(40.0, 12.0), 10.0));
/// let village = Rc::new(RectHandle::new(Point::new(5.0, 0.0), Size::new(40.0, 12.0), 1.0));
///
/// let mut tree: OverlayTree<RectHandle> = OverlayTree::new();
/// if tree.is_need_update() {
///     tree.start_overlay_placing(&view);
///     tree.add(Rc::clone(&village), false);
///     tree.add(Rc::clone(&city), false);
///     tree.end_overlay_placing();
/// }
/// tree.frame();
/// assert!(city.is_visible());
/// assert!(!village.is_visible());
/// ```
pub struct OverlayTree<H: OverlayHandle + ?Sized, B: Backend = Grid> {
    index: IndexGeneric<OverlayInfo<H>, B>,
    pending: Vec<Candidate<H>>,
    view: ScreenView,
    placing: bool,
    frame_counter: i32,
    update_period: i32,
    next_seq: u64,
}

impl<H: OverlayHandle + ?Sized, B: Backend + fmt::Debug> fmt::Debug for OverlayTree<H, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayTree")
            .field("committed", &self.index.len())
            .field("pending", &self.pending.len())
            .field("placing", &self.placing)
            .field("frame_counter", &self.frame_counter)
            .field("update_period", &self.update_period)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl<H: OverlayHandle + ?Sized> Default for OverlayTree<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: OverlayHandle + ?Sized> OverlayTree<H> {
    /// A grid-backed tree with default tuning.
    pub fn new() -> Self {
        Self::with_config(OverlayTreeConfig::default())
    }

    /// A grid-backed tree with explicit tuning.
    pub fn with_config(config: OverlayTreeConfig) -> Self {
        Self::with_backend(config, Grid::new(config.grid_cell_size))
    }
}

impl<H: OverlayHandle + ?Sized, B: Backend> OverlayTree<H, B> {
    /// A tree over an explicit spatial backend. `config.grid_cell_size` is ignored.
    pub fn with_backend(config: OverlayTreeConfig, backend: B) -> Self {
        let mut index = IndexGeneric::with_backend(backend);
        index.reserve(config.reserve);
        Self {
            index,
            pending: Vec::with_capacity(config.reserve),
            view: ScreenView::default(),
            placing: false,
            frame_counter: FRAME_SENTINEL,
            update_period: i32::try_from(config.update_period).unwrap_or(i32::MAX),
            next_seq: 0,
        }
    }

    /// Advance the frame counter. Wraps back to "update due" once per period.
    pub fn frame(&mut self) {
        self.frame_counter += 1;
        if self.frame_counter >= self.update_period {
            self.frame_counter = FRAME_SENTINEL;
        }
    }

    /// Whether a placement cycle is due.
    pub fn is_need_update(&self) -> bool {
        self.frame_counter == FRAME_SENTINEL
    }

    /// Drop every handle and make the next frame run a placement cycle.
    ///
    /// Dropped handles keep whatever visibility flag they had.
    pub fn force_update(&mut self) {
        self.index.clear();
        self.pending.clear();
        self.frame_counter = FRAME_SENTINEL;
    }

    /// Whether a placement cycle is open.
    pub fn is_placing(&self) -> bool {
        self.placing
    }

    /// Open a placement cycle for `view`.
    ///
    /// # Panics
    ///
    /// Panics if no update is due ([`is_need_update`](Self::is_need_update) is false).
    pub fn start_overlay_placing(&mut self, view: &ScreenView) {
        assert!(
            self.is_need_update(),
            "start_overlay_placing called while no placement update is due"
        );
        self.index.clear();
        self.pending.clear();
        self.view = view.clone();
        self.placing = true;
        self.next_seq = 0;
    }

    /// Submit a candidate to the open cycle.
    ///
    /// The handle is hidden immediately and only becomes visible if it is placed.
    /// Candidates that decline their geometry update or fall outside the viewport
    /// are not queued.
    ///
    /// # Panics
    ///
    /// Panics if no placement cycle is open.
    pub fn add(&mut self, handle: Rc<H>, is_transparent: bool) {
        assert!(self.placing, "add called outside of a placement cycle");
        handle.set_visible(false);
        if !handle.update(&self.view) {
            trace!("overlay candidate declined geometry update");
            return;
        }
        let pixel_rect = handle.pixel_rect(&self.view);
        if !overlaps(&self.view.pixel_rect(), &pixel_rect) {
            trace!(?pixel_rect, "overlay candidate outside viewport");
            return;
        }
        let rank = Rank {
            priority: handle.priority(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.push(Candidate {
            handle,
            transparent: is_transparent,
            pixel_rect,
            rank,
        });
    }

    /// Resolve the queued candidates and close the cycle.
    ///
    /// # Panics
    ///
    /// Panics if no placement cycle is open.
    pub fn end_overlay_placing(&mut self) -> PlacementStats {
        assert!(
            self.placing,
            "end_overlay_placing called without start_overlay_placing"
        );
        let mut candidates = core::mem::take(&mut self.pending);
        candidates.sort_by(|a, b| a.rank.placement_order(&b.rank));

        let mut stats = PlacementStats {
            submitted: candidates.len(),
            ..PlacementStats::default()
        };
        for candidate in candidates.drain(..) {
            self.insert_candidate(candidate, &mut stats);
        }
        self.pending = candidates;
        self.placing = false;

        for (_, _, info) in self.index.iter() {
            info.handle.set_visible(true);
        }
        stats.committed = self.index.len();
        debug!(
            submitted = stats.submitted,
            committed = stats.committed,
            rejected = stats.rejected,
            evicted = stats.evicted,
            "overlay placement finished"
        );
        stats
    }

    fn insert_candidate(&mut self, candidate: Candidate<H>, stats: &mut PlacementStats) {
        let view = &self.view;
        let mut conflicts: SmallVec<[(Key, Rank); 8]> = SmallVec::new();
        self.index.visit_rect(candidate.pixel_rect, |key, info| {
            if info.transparent != candidate.transparent {
                return;
            }
            let shape = info.handle.pixel_shape(view);
            if candidate.handle.intersects(view, &shape) {
                conflicts.push((key, info.rank));
            }
        });

        if conflicts
            .iter()
            .any(|(_, rank)| rank.outranks(&candidate.rank))
        {
            stats.rejected += 1;
            return;
        }
        for (key, _) in conflicts {
            if self.index.remove(key).is_some() {
                stats.evicted += 1;
            }
        }
        let Candidate {
            handle,
            transparent,
            pixel_rect,
            rank,
        } = candidate;
        self.index.insert(
            pixel_rect,
            OverlayInfo {
                handle,
                transparent,
                rank,
            },
        );
    }

    /// Visible handles with a valid feature whose shape touches `rect` (pixel space).
    pub fn select(&self, rect: Rect) -> Vec<Rc<H>> {
        let mut out = Vec::new();
        self.select_into(rect, &mut out);
        out
    }

    /// Like [`select`](Self::select) but appends into `out`.
    pub fn select_into(&self, rect: Rect, out: &mut Vec<Rc<H>>) {
        self.index.visit_rect(rect, |_, info| {
            let handle = &info.handle;
            if !handle.is_visible() || !handle.feature_id().is_valid() {
                return;
            }
            if handle
                .pixel_shape(&self.view)
                .iter()
                .any(|r| overlaps(r, &rect))
            {
                out.push(Rc::clone(handle));
            }
        });
    }

    /// Handles accepted by the last completed cycle.
    pub fn committed(&self) -> impl Iterator<Item = &Rc<H>> + '_ {
        self.index.iter().map(|(_, _, info)| &info.handle)
    }

    /// Number of handles in the tree.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tree holds no handles.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// View captured by the last [`start_overlay_placing`](Self::start_overlay_placing).
    pub fn view(&self) -> &ScreenView {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::RectHandle;
    use kurbo::{Point, Size};

    fn view() -> ScreenView {
        ScreenView::new(Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    fn boxed(x: f64, priority: f64) -> Rc<RectHandle> {
        Rc::new(RectHandle::new(
            Point::new(x, 0.0),
            Size::new(10.0, 10.0),
            priority,
        ))
    }

    #[test]
    fn rank_orders_priority_then_submission() {
        let hi = Rank {
            priority: 2.0,
            seq: 5,
        };
        let lo = Rank {
            priority: 1.0,
            seq: 0,
        };
        let tie = Rank {
            priority: 2.0,
            seq: 7,
        };
        assert!(hi.outranks(&lo));
        assert!(hi.outranks(&tie));
        assert!(!tie.outranks(&hi));
        assert!(!hi.outranks(&hi));
    }

    #[test]
    fn stronger_out_of_order_candidate_evicts() {
        let mut tree: OverlayTree<RectHandle> = OverlayTree::new();
        tree.start_overlay_placing(&view());
        let mut stats = PlacementStats::default();

        let weak = boxed(0.0, 1.0);
        let strong = boxed(4.0, 9.0);
        for (handle, seq) in [(&weak, 0), (&strong, 1)] {
            let candidate = Candidate {
                handle: Rc::clone(handle),
                transparent: false,
                pixel_rect: handle.pixel_rect(&tree.view),
                rank: Rank {
                    priority: handle.priority(),
                    seq,
                },
            };
            tree.insert_candidate(candidate, &mut stats);
        }

        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.rejected, 0);
        assert_eq!(tree.len(), 1);
        assert!(tree.committed().all(|h| Rc::ptr_eq(h, &strong)));
    }

    #[test]
    #[should_panic(expected = "outside of a placement cycle")]
    fn add_outside_cycle_panics() {
        let mut tree: OverlayTree<RectHandle> = OverlayTree::new();
        tree.add(boxed(0.0, 1.0), false);
    }

    #[test]
    #[should_panic(expected = "no placement update is due")]
    fn start_requires_due_update() {
        let mut tree: OverlayTree<RectHandle> = OverlayTree::new();
        tree.frame();
        tree.frame();
        tree.start_overlay_placing(&view());
    }
}
