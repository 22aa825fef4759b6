// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interfaces of the components a render policy coordinates.

use crossbeam_channel::{Receiver, Sender, bounded};
use kurbo::Rect;
use tessera_view::ScreenView;

/// Paint target for one frame.
pub trait Drawer {
    /// Start recording the frame.
    fn begin_frame(&mut self);
    /// Fill the surface with an RGBA color.
    fn clear(&mut self, rgba: [u8; 4]);
    /// Finish recording the frame.
    fn end_frame(&mut self);
}

/// Country/region identifier in the map data catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RegionIndex {
    /// Country group.
    pub group: u16,
    /// Country within the group.
    pub country: u16,
    /// Region within the country.
    pub region: u16,
}

/// Identifier of a benchmark fence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u32);

/// Waiting side of a benchmark fence.
///
/// A fence marks a point in a generator's work queue. The matching
/// [`FenceSignal`] fires once everything queued before that point has run.
#[derive(Debug)]
pub struct BenchmarkFence {
    id: FenceId,
    done: Receiver<()>,
}

/// Completing side of a benchmark fence, kept by the generator.
#[derive(Debug)]
pub struct FenceSignal {
    id: FenceId,
    done: Sender<()>,
}

impl BenchmarkFence {
    /// Create a linked fence/signal pair.
    pub fn new(id: FenceId) -> (Self, FenceSignal) {
        let (tx, rx) = bounded(1);
        (Self { id, done: rx }, FenceSignal { id, done: tx })
    }

    /// Fence identifier.
    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Whether the fence has been passed, without blocking.
    pub fn is_signaled(&self) -> bool {
        !self.done.is_empty()
    }

    /// Block until the fence is passed.
    ///
    /// Returns immediately if the signal was dropped unfired, since no work can
    /// reach the fence any more.
    pub fn wait(self) {
        let _ = self.done.recv();
    }
}

impl FenceSignal {
    /// Fence identifier.
    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Mark the fence passed.
    pub fn signal(self) {
        let _ = self.done.send(());
    }
}

/// Background producer of screen coverage (the set of rendered tiles for a view).
///
/// Shared with its own worker threads behind a mutex; the policy holds that
/// mutex for the whole draw step of a frame.
pub trait CoverageGenerator: Send {
    /// Recompute which tiles cover `view`. `force` discards cached decisions.
    fn cover_screen(&mut self, view: &ScreenView, force: bool);
    /// Drop cached tiles intersecting `rect` (world space) at `start_scale` and above.
    fn invalidate_tiles(&mut self, rect: Rect, start_scale: u8);
    /// Draw the current coverage.
    fn draw(&mut self, drawer: &mut dyn Drawer, view: &ScreenView);
    /// Scale level of the coverage last drawn.
    fn draw_scale(&self) -> i32;
    /// Whether the last draw found no map data.
    fn is_empty_drawing(&self) -> bool;
    /// Region under the view center, when known.
    fn country_index_at_center(&self) -> Option<RegionIndex>;
    /// Whether the generator wants a forced cover pass.
    fn does_force_update(&self) -> bool;
    /// Stop background work.
    fn pause(&mut self);
    /// Restart background work.
    fn resume(&mut self);
    /// Place a fence behind the work queued so far.
    fn insert_benchmark_fence(&mut self) -> BenchmarkFence;
}

/// Renderer that rasterizes tiles in the background.
pub trait TileRenderer {
    /// Stop or restart taking new commands.
    fn set_is_paused(&mut self, paused: bool);
    /// Whether paused.
    fn is_paused(&self) -> bool;
    /// Discard queued commands and flag in-flight ones as canceled.
    fn cancel_commands(&mut self);
}

/// Worker pool whose results are applied on the render thread each frame.
pub trait QueuedRenderer {
    /// A frame is starting.
    fn begin_frame(&mut self);
    /// Apply work completed since the last frame.
    fn draw_frame(&mut self);
    /// The frame is over.
    fn end_frame(&mut self);
    /// Park `worker_count` workers when `partial`, or run all of them otherwise.
    ///
    /// The target is absolute, so repeating a call has no further effect.
    fn set_partial_execution(&mut self, worker_count: usize, partial: bool);
    /// Whether completed work is waiting to be applied.
    fn need_redraw(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_completes_on_signal_or_drop() {
        let (fence, signal) = BenchmarkFence::new(FenceId(3));
        assert_eq!(fence.id(), signal.id());
        assert!(!fence.is_signaled());
        signal.signal();
        assert!(fence.is_signaled());
        fence.wait();

        let (fence, signal) = BenchmarkFence::new(FenceId(4));
        drop(signal);
        fence.wait();
    }

    #[test]
    fn fence_wait_blocks_until_signaled_from_another_thread() {
        let (fence, signal) = BenchmarkFence::new(FenceId(1));
        let worker = std::thread::spawn(move || signal.signal());
        fence.wait();
        worker.join().expect("signal thread panicked");
    }
}
