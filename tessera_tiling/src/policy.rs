// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tiling render policy: frame sequencing and background pause/resume.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use kurbo::Rect;
use parking_lot::{Mutex, MutexGuard};
use tessera_index::overlaps;
use tessera_view::ScreenView;
use tracing::{debug, info, trace, warn};

use crate::base::{Interaction, RenderBase};
use crate::collab::{
    BenchmarkFence, CoverageGenerator, Drawer, FenceId, QueuedRenderer, RegionIndex, TileRenderer,
};
use crate::config::PolicyConfig;
use crate::error::ConfigError;

/// Drives the frames of a tiled map view.
///
/// Each frame is `begin_frame`, then `draw_frame`, which returns a [`FrameScope`]
/// holding the coverage lock until the frame ends:
///
/// ```text
/// policy.begin_frame();
/// let frame = policy.draw_frame(&mut drawer, &view);
/// // ... draw overlays while coverage stays locked ...
/// frame.end_frame();
/// ```
///
/// While the user drags, zooms or rotates, or while an animation runs,
/// background rendering is paused: the tile renderer stops and drops its queue,
/// the coverage generator pauses, and the queued renderer shrinks to a single
/// worker. It resumes once all of those have stopped, and the next frame then
/// rebuilds coverage from scratch.
pub struct TilingRenderPolicy<G, R, Q>
where
    G: CoverageGenerator,
    R: TileRenderer,
    Q: QueuedRenderer,
{
    config: PolicyConfig,
    base: RenderBase,
    coverage: Arc<Mutex<G>>,
    tile_renderer: R,
    queued: Option<Q>,
    fences: HashMap<FenceId, BenchmarkFence>,
    tile_size: u32,
    draw_scale: i32,
    is_empty_model: bool,
    country_index: Option<RegionIndex>,
    is_navigating: bool,
    was_animating_last_frame: bool,
    background_paused: bool,
    recreate_coverage: bool,
}

impl<G, R, Q> fmt::Debug for TilingRenderPolicy<G, R, Q>
where
    G: CoverageGenerator,
    R: TileRenderer,
    Q: QueuedRenderer,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TilingRenderPolicy")
            .field("config", &self.config)
            .field("base", &self.base)
            .field("tile_size", &self.tile_size)
            .field("draw_scale", &self.draw_scale)
            .field("is_empty_model", &self.is_empty_model)
            .field("is_navigating", &self.is_navigating)
            .field("background_paused", &self.background_paused)
            .field("recreate_coverage", &self.recreate_coverage)
            .field("has_queued_renderer", &self.queued.is_some())
            .field("fences", &self.fences.len())
            .finish_non_exhaustive()
    }
}

impl<G, R, Q> TilingRenderPolicy<G, R, Q>
where
    G: CoverageGenerator,
    R: TileRenderer,
    Q: QueuedRenderer,
{
    /// Build a policy around its collaborators.
    ///
    /// `coverage` is shared with the generator's own threads. `queued` is the
    /// optional worker pool whose results are applied each frame.
    pub fn new(
        config: PolicyConfig,
        coverage: Arc<Mutex<G>>,
        tile_renderer: R,
        queued: Option<Q>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tile_size = config.tile_size();
        info!(
            screen_width = config.screen_width,
            screen_height = config.screen_height,
            tile_size,
            "tiling render policy created"
        );
        Ok(Self {
            config,
            base: RenderBase::new(),
            coverage,
            tile_renderer,
            queued,
            fences: HashMap::new(),
            tile_size,
            draw_scale: 0,
            is_empty_model: false,
            country_index: None,
            is_navigating: false,
            was_animating_last_frame: false,
            background_paused: false,
            recreate_coverage: false,
        })
    }

    /// Open a frame.
    ///
    /// # Panics
    ///
    /// Panics if the previous frame is still open.
    pub fn begin_frame(&mut self) {
        self.base.begin_frame();
        if let Some(queued) = self.queued.as_mut() {
            queued.begin_frame();
        }
    }

    /// Refresh and draw the coverage for `view`.
    ///
    /// Invalidation and re-covering lock the generator only for each call. The
    /// draw step takes the lock that the returned scope keeps; ending or
    /// dropping it closes the frame.
    ///
    /// # Panics
    ///
    /// Panics if no frame is open.
    pub fn draw_frame<D: Drawer>(
        &mut self,
        drawer: &mut D,
        view: &ScreenView,
    ) -> FrameScope<'_, G, Q> {
        assert!(
            self.base.in_frame(),
            "draw_frame called outside begin_frame/end_frame"
        );
        if let Some(queued) = self.queued.as_mut() {
            queued.draw_frame();
        }
        self.check_animation_transition();

        let force = self.base.does_force_update();
        let global = view.global_rect();
        let invalid = self.base.invalid_rect().unwrap_or(global);
        let intersects_view = overlaps(&invalid, &global);

        // Short-lived guards: generator threads may run between these calls.
        let forced_by_generator = self.coverage.lock().does_force_update();
        if force {
            self.coverage
                .lock()
                .invalidate_tiles(invalid, self.config.first_invalidated_scale());
        }
        if !self.is_navigating && !self.base.is_animating() {
            self.coverage.lock().cover_screen(
                view,
                forced_by_generator || self.recreate_coverage || (force && intersects_view),
            );
        }
        self.base.set_force_update(false);
        self.recreate_coverage = false;

        drawer.begin_frame();
        drawer.clear(self.config.background);
        // The frame lock covers the draw step and lasts until the scope ends.
        let mut coverage = self.coverage.lock();
        coverage.draw(&mut *drawer, view);
        self.draw_scale = coverage.draw_scale();
        self.is_empty_model = coverage.is_empty_drawing();
        if self.is_empty_model {
            self.country_index = coverage.country_index_at_center();
        }
        drawer.end_frame();
        trace!(
            frame = self.base.frame_index(),
            draw_scale = self.draw_scale,
            empty = self.is_empty_model,
            "coverage drawn"
        );

        FrameScope {
            coverage: Some(coverage),
            queued: self.queued.as_mut(),
            base: &mut self.base,
        }
    }

    /// Pan gesture started.
    pub fn start_drag(&mut self) {
        self.start_navigation(Interaction::DRAG);
    }

    /// Pan gesture finished.
    pub fn stop_drag(&mut self) {
        self.stop_navigation(Interaction::DRAG);
        self.base.stop_drag();
    }

    /// Zoom gesture started.
    pub fn start_scale(&mut self) {
        self.start_navigation(Interaction::SCALE);
    }

    /// Zoom gesture finished.
    pub fn stop_scale(&mut self) {
        self.stop_navigation(Interaction::SCALE);
        self.base.stop_scale();
    }

    /// Rotation gesture started.
    pub fn start_rotate(&mut self, _angle: f64, _duration_secs: f64) {
        self.start_navigation(Interaction::ROTATE);
    }

    /// Rotation gesture finished at `angle` after `duration_secs`.
    pub fn stop_rotate(&mut self, angle: f64, duration_secs: f64) {
        self.stop_navigation(Interaction::ROTATE);
        self.base.stop_rotate(angle, duration_secs);
    }

    fn start_navigation(&mut self, axis: Interaction) {
        self.base.begin_interaction(axis);
        self.is_navigating = true;
        self.sync_background();
    }

    fn stop_navigation(&mut self, axis: Interaction) {
        self.base.end_interaction(axis);
        self.is_navigating = !self.base.interaction().is_empty();
        self.sync_background();
    }

    fn check_animation_transition(&mut self) {
        let animating = self.base.is_animating();
        if animating != self.was_animating_last_frame {
            debug!(animating, "animation state changed");
        }
        self.was_animating_last_frame = animating;
        self.sync_background();
    }

    // Background work runs only while neither navigating nor animating.
    fn sync_background(&mut self) {
        let should_pause = self.is_navigating || self.base.is_animating();
        if should_pause == self.background_paused {
            return;
        }
        if should_pause {
            self.pause_background_rendering();
        } else {
            self.resume_background_rendering();
        }
    }

    fn pause_background_rendering(&mut self) {
        self.background_paused = true;
        self.tile_renderer.set_is_paused(true);
        self.tile_renderer.cancel_commands();
        self.coverage.lock().pause();
        if let Some(queued) = self.queued.as_mut() {
            queued.set_partial_execution(self.config.partial_worker_count(), true);
        }
        debug!("background rendering paused");
    }

    fn resume_background_rendering(&mut self) {
        self.background_paused = false;
        self.tile_renderer.set_is_paused(false);
        self.coverage.lock().resume();
        self.recreate_coverage = true;
        if let Some(queued) = self.queued.as_mut() {
            queued.set_partial_execution(self.config.partial_worker_count(), false);
        }
        debug!("background rendering resumed");
    }

    /// Place a fence behind the coverage work queued so far.
    pub fn insert_benchmark_fence(&mut self) -> FenceId {
        let fence = self.coverage.lock().insert_benchmark_fence();
        let id = fence.id();
        self.fences.insert(id, fence);
        id
    }

    /// Block until the fence `id` is passed. Unknown ids return at once.
    pub fn join_benchmark_fence(&mut self, id: FenceId) {
        match self.fences.remove(&id) {
            Some(fence) => fence.wait(),
            None => warn!(?id, "join on unknown benchmark fence"),
        }
    }

    /// Scale level of the coverage last drawn.
    pub fn draw_scale(&self) -> i32 {
        self.draw_scale
    }

    /// Tile edge length in pixels, fixed at construction.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Reference size for scale computations; equals the tile size.
    pub fn scale_etalon_size(&self) -> u32 {
        self.tile_size
    }

    /// Always true: this policy renders through tiles.
    pub fn is_tiling(&self) -> bool {
        true
    }

    /// Whether the last frame found no map data.
    pub fn is_empty_model(&self) -> bool {
        self.is_empty_model
    }

    /// Region under the view center, recorded when the model was last empty.
    pub fn country_index(&self) -> Option<RegionIndex> {
        self.country_index
    }

    /// Whether another frame is wanted by the policy or the queued renderer.
    pub fn need_redraw(&self) -> bool {
        self.base.need_redraw() || self.queued.as_ref().is_some_and(Q::need_redraw)
    }

    /// Whether a navigation gesture is in progress.
    pub fn is_navigating(&self) -> bool {
        self.is_navigating
    }

    /// Whether background rendering is paused.
    pub fn is_background_paused(&self) -> bool {
        self.background_paused
    }

    /// Mark a world-space region stale; the next frame invalidates and re-covers it.
    pub fn invalidate(&mut self, rect: Rect) {
        self.base.invalidate(rect);
    }

    /// Base frame and interaction state.
    pub fn base(&self) -> &RenderBase {
        &self.base
    }

    /// Mutable base state, for animation bookkeeping.
    pub fn base_mut(&mut self) -> &mut RenderBase {
        &mut self.base
    }

    /// The settings the policy was built with.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Shared coverage generator.
    pub fn coverage(&self) -> &Arc<Mutex<G>> {
        &self.coverage
    }

    /// The tile renderer.
    pub fn tile_renderer(&self) -> &R {
        &self.tile_renderer
    }

    /// The queued renderer, if any.
    pub fn queued_renderer(&self) -> Option<&Q> {
        self.queued.as_ref()
    }

    /// Mutable queued renderer, for collecting applied results.
    pub fn queued_renderer_mut(&mut self) -> Option<&mut Q> {
        self.queued.as_mut()
    }
}

/// The rest of a frame after [`TilingRenderPolicy::draw_frame`].
///
/// Holds the coverage lock. [`end_frame`](Self::end_frame), or dropping the
/// scope on any other path, releases the lock, then ends the queued renderer's
/// frame, then the base frame.
#[must_use = "dropping the scope ends the frame immediately"]
pub struct FrameScope<'a, G, Q>
where
    G: CoverageGenerator,
    Q: QueuedRenderer,
{
    coverage: Option<MutexGuard<'a, G>>,
    queued: Option<&'a mut Q>,
    base: &'a mut RenderBase,
}

impl<G, Q> fmt::Debug for FrameScope<'_, G, Q>
where
    G: CoverageGenerator,
    Q: QueuedRenderer,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScope")
            .field("locked", &self.coverage.is_some())
            .field("frame", &self.base.frame_index())
            .finish_non_exhaustive()
    }
}

impl<G, Q> FrameScope<'_, G, Q>
where
    G: CoverageGenerator,
    Q: QueuedRenderer,
{
    /// The locked coverage generator.
    pub fn coverage(&self) -> &G {
        self.coverage
            .as_deref()
            .expect("frame scope holds the coverage lock until it ends")
    }

    /// The locked coverage generator, mutably.
    pub fn coverage_mut(&mut self) -> &mut G {
        self.coverage
            .as_deref_mut()
            .expect("frame scope holds the coverage lock until it ends")
    }

    /// Close the frame.
    pub fn end_frame(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.coverage.take().is_none() {
            return;
        }
        if let Some(queued) = self.queued.as_deref_mut() {
            queued.end_frame();
        }
        self.base.end_frame();
    }
}

impl<G, Q> Drop for FrameScope<'_, G, Q>
where
    G: CoverageGenerator,
    Q: QueuedRenderer,
{
    fn drop(&mut self) {
        self.finish();
    }
}
