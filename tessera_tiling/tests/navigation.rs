// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Navigation and frame behavior with real worker pools.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kurbo::Rect;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tessera_tiling::{
    BenchmarkFence, CoverageGenerator, DeviceClass, Drawer, FenceId, FenceSignal, PolicyConfig,
    PoolHandle, QueuedRenderer, RegionIndex, TileRenderer, TilingRenderPolicy, WorkerPool,
};
use tessera_view::ScreenView;

/// A generator that counts its calls and completes fences on its own thread.
#[derive(Debug, Default)]
struct Coverage {
    covers: usize,
    forced_covers: usize,
    pauses: usize,
    resumes: usize,
    paused: bool,
    next_fence: u32,
    signals: Vec<FenceSignal>,
}

impl CoverageGenerator for Coverage {
    fn cover_screen(&mut self, _view: &ScreenView, force: bool) {
        assert!(!self.paused, "cover requested while paused");
        self.covers += 1;
        if force {
            self.forced_covers += 1;
        }
    }

    fn invalidate_tiles(&mut self, _rect: Rect, _start_scale: u8) {}

    fn draw(&mut self, _drawer: &mut dyn Drawer, _view: &ScreenView) {}

    fn draw_scale(&self) -> i32 {
        5
    }

    fn is_empty_drawing(&self) -> bool {
        false
    }

    fn country_index_at_center(&self) -> Option<RegionIndex> {
        None
    }

    fn does_force_update(&self) -> bool {
        false
    }

    fn pause(&mut self) {
        self.paused = true;
        self.pauses += 1;
    }

    fn resume(&mut self) {
        self.paused = false;
        self.resumes += 1;
    }

    fn insert_benchmark_fence(&mut self) -> BenchmarkFence {
        self.next_fence += 1;
        let (fence, signal) = BenchmarkFence::new(FenceId(self.next_fence));
        self.signals.push(signal);
        fence
    }
}

#[derive(Debug, Default)]
struct NullDrawer;

impl Drawer for NullDrawer {
    fn begin_frame(&mut self) {}
    fn clear(&mut self, _rgba: [u8; 4]) {}
    fn end_frame(&mut self) {}
}

type Policy = TilingRenderPolicy<Coverage, PoolHandle<u32>, WorkerPool<u32>>;

struct Rig {
    policy: Policy,
    tiles: WorkerPool<u32>,
}

fn rig(cores: usize) -> Rig {
    let config = PolicyConfig::new(1280, 800, cores, DeviceClass::Pro);
    let tiles = WorkerPool::from_config(&config).expect("spawn tile workers");
    let queued = WorkerPool::from_config(&config).expect("spawn queued workers");
    let policy = TilingRenderPolicy::new(
        config,
        Arc::new(Mutex::new(Coverage::default())),
        tiles.handle(),
        Some(queued),
    )
    .expect("valid config");
    Rig { policy, tiles }
}

fn view() -> ScreenView {
    ScreenView::new(Rect::new(0.0, 0.0, 1280.0, 800.0))
}

fn frame(policy: &mut Policy) {
    policy.begin_frame();
    policy.draw_frame(&mut NullDrawer, &view()).end_frame();
}

#[test_log::test]
fn repeated_gestures_pause_and_resume_symmetrically() {
    let Rig { mut policy, tiles } = rig(3);
    let queued_total = 4;

    for _ in 0..5 {
        policy.start_drag();
        policy.start_scale();
        policy.start_drag();
        assert!(policy.tile_renderer().is_paused());
        assert_eq!(
            policy.queued_renderer().map(WorkerPool::active_workers),
            Some(1)
        );
        frame(&mut policy);

        policy.stop_scale();
        policy.stop_drag();
        policy.stop_drag();
        assert!(!policy.tile_renderer().is_paused());
        assert_eq!(
            policy.queued_renderer().map(WorkerPool::active_workers),
            Some(queued_total)
        );
        frame(&mut policy);
    }

    let coverage = policy.coverage().lock();
    assert_eq!(coverage.pauses, 5);
    assert_eq!(coverage.resumes, 5);
    assert!(!coverage.paused);
    // Covers only happen outside gestures, each one right after a resume.
    assert_eq!(coverage.covers, 5);
    assert_eq!(coverage.forced_covers, 5);
    drop(coverage);
    drop(tiles);
}

#[test_log::test]
fn navigation_cancels_queued_tile_work() {
    let Rig { mut policy, mut tiles } = rig(2);
    let handle = tiles.handle();
    let ran = Arc::new(AtomicUsize::new(0));

    // Park the tile workers so submitted commands stay queued.
    let mut parked = tiles.handle();
    parked.set_is_paused(true);
    for i in 0..6 {
        let ran = Arc::clone(&ran);
        handle
            .submit(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
                Some(i)
            })
            .expect("room in queue");
    }
    assert_eq!(handle.pending(), 6);

    policy.start_rotate(0.0, 0.2);
    assert_eq!(handle.pending(), 0);
    policy.stop_rotate(1.0, 0.2);

    handle.submit(|_| Some(99)).expect("room in queue");
    tiles.wait_idle();
    tiles.draw_frame();
    assert_eq!(tiles.take_ready(), vec![99]);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test_log::test]
fn queued_results_request_redraw_until_applied() {
    let Rig { mut policy, tiles: _tiles } = rig(1);
    frame(&mut policy);
    assert!(!policy.need_redraw());

    let queued = policy.queued_renderer().expect("queued renderer");
    queued.submit(|_| Some(7)).expect("room in queue");
    queued.wait_idle();
    assert!(policy.need_redraw());

    frame(&mut policy);
    let applied = policy
        .queued_renderer_mut()
        .expect("queued renderer")
        .take_ready();
    assert_eq!(applied, vec![7]);
    assert!(!policy.need_redraw());
}

#[test_log::test]
fn benchmark_fence_waits_for_generator_thread() {
    let Rig { mut policy, tiles: _tiles } = rig(1);
    let id = policy.insert_benchmark_fence();

    let coverage = Arc::clone(policy.coverage());
    let worker = std::thread::spawn(move || {
        let signals = std::mem::take(&mut coverage.lock().signals);
        for signal in signals {
            signal.signal();
        }
    });
    policy.join_benchmark_fence(id);
    worker.join().expect("generator thread panicked");
}

#[test_log::test]
fn tile_size_follows_screen() {
    let Rig { policy, tiles: _tiles } = rig(1);
    assert_eq!(policy.tile_size(), 512);
    assert_eq!(policy.draw_scale(), 0);
}
