// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame and interaction bookkeeping shared by render policies.

use bitflags::bitflags;
use kurbo::Rect;
use tracing::trace;

bitflags! {
    /// Interaction axes currently in progress.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Interaction: u8 {
        /// Panning.
        const DRAG = 1 << 0;
        /// Zooming.
        const SCALE = 1 << 1;
        /// Rotating.
        const ROTATE = 1 << 2;
    }
}

/// The last rotation gesture reported to [`RenderBase::stop_rotate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    /// Final angle in radians.
    pub angle: f64,
    /// Gesture duration in seconds.
    pub duration_secs: f64,
}

/// Base frame lifecycle, invalidation and interaction state.
///
/// Policies layer their own behavior on top and forward to these hooks.
#[derive(Debug, Default)]
pub struct RenderBase {
    frame_index: u64,
    in_frame: bool,
    force_update: bool,
    invalid_rect: Option<Rect>,
    need_redraw: bool,
    animations: usize,
    interaction: Interaction,
    last_rotation: Option<Rotation>,
}

impl RenderBase {
    /// Fresh bookkeeping with nothing invalid and no interaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame.
    ///
    /// # Panics
    ///
    /// Panics if the previous frame was not ended.
    pub fn begin_frame(&mut self) {
        assert!(!self.in_frame, "begin_frame called before the previous frame ended");
        self.in_frame = true;
        self.need_redraw = false;
        trace!(frame = self.frame_index, "frame begin");
    }

    /// Close the frame opened by [`begin_frame`](Self::begin_frame).
    pub fn end_frame(&mut self) {
        debug_assert!(self.in_frame, "end_frame called without begin_frame");
        self.in_frame = false;
        self.frame_index += 1;
    }

    /// Whether a frame is open.
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// Number of frames ended so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Mark a world-space region stale. Accumulates until the next forced update runs.
    pub fn invalidate(&mut self, rect: Rect) {
        self.invalid_rect = Some(match self.invalid_rect {
            Some(r) => r.union(rect),
            None => rect,
        });
        self.force_update = true;
        self.need_redraw = true;
    }

    /// Whether the next frame must refresh invalidated content.
    pub fn does_force_update(&self) -> bool {
        self.force_update
    }

    /// Set or clear the force flag. Clearing also forgets the invalid region.
    pub fn set_force_update(&mut self, force: bool) {
        self.force_update = force;
        if force {
            self.need_redraw = true;
        } else {
            self.invalid_rect = None;
        }
    }

    /// Accumulated invalid region, if any.
    pub fn invalid_rect(&self) -> Option<Rect> {
        self.invalid_rect
    }

    /// Ask for another frame.
    pub fn request_redraw(&mut self) {
        self.need_redraw = true;
    }

    /// Whether another frame is wanted. Running animations always want one.
    pub fn need_redraw(&self) -> bool {
        self.need_redraw || self.is_animating()
    }

    /// Register a running animation.
    pub fn start_animation(&mut self) {
        self.animations += 1;
    }

    /// Unregister a running animation. Extra calls are ignored.
    pub fn finish_animation(&mut self) {
        self.animations = self.animations.saturating_sub(1);
        self.need_redraw = true;
    }

    /// Whether any animation is running.
    pub fn is_animating(&self) -> bool {
        self.animations > 0
    }

    /// Mark `axis` as in progress. Returns whether it was idle before.
    pub fn begin_interaction(&mut self, axis: Interaction) -> bool {
        let started = !self.interaction.contains(axis);
        self.interaction.insert(axis);
        started
    }

    /// Mark `axis` as finished. Returns whether it was in progress.
    pub fn end_interaction(&mut self, axis: Interaction) -> bool {
        let stopped = self.interaction.intersects(axis);
        self.interaction.remove(axis);
        stopped
    }

    /// Axes currently in progress.
    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Drag finished: the settled view needs a frame.
    pub fn stop_drag(&mut self) {
        self.request_redraw();
    }

    /// Zoom finished: the settled view needs a frame.
    pub fn stop_scale(&mut self) {
        self.request_redraw();
    }

    /// Rotation finished.
    pub fn stop_rotate(&mut self, angle: f64, duration_secs: f64) {
        self.last_rotation = Some(Rotation {
            angle,
            duration_secs,
        });
        self.request_redraw();
    }

    /// The last finished rotation.
    pub fn last_rotation(&self) -> Option<Rotation> {
        self.last_rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_regions_accumulate_until_cleared() {
        let mut base = RenderBase::new();
        base.invalidate(Rect::new(0.0, 0.0, 1.0, 1.0));
        base.invalidate(Rect::new(4.0, 4.0, 5.0, 6.0));
        assert!(base.does_force_update());
        assert_eq!(base.invalid_rect(), Some(Rect::new(0.0, 0.0, 5.0, 6.0)));

        base.set_force_update(false);
        assert!(!base.does_force_update());
        assert_eq!(base.invalid_rect(), None);
    }

    #[test]
    fn redraw_request_lasts_until_next_frame() {
        let mut base = RenderBase::new();
        base.stop_drag();
        assert!(base.need_redraw());
        base.begin_frame();
        assert!(!base.need_redraw());
        base.end_frame();
        assert_eq!(base.frame_index(), 1);
    }

    #[test]
    fn animations_keep_redrawing() {
        let mut base = RenderBase::new();
        base.start_animation();
        base.start_animation();
        base.begin_frame();
        assert!(base.need_redraw());
        base.finish_animation();
        assert!(base.is_animating());
        base.finish_animation();
        base.finish_animation();
        assert!(!base.is_animating());
        base.end_frame();
    }

    #[test]
    fn interaction_axes_are_tracked_independently() {
        let mut base = RenderBase::new();
        assert!(base.begin_interaction(Interaction::DRAG));
        assert!(!base.begin_interaction(Interaction::DRAG));
        assert!(base.begin_interaction(Interaction::SCALE));
        assert!(base.end_interaction(Interaction::DRAG));
        assert_eq!(base.interaction(), Interaction::SCALE);
        assert!(!base.end_interaction(Interaction::ROTATE));
        base.stop_rotate(0.5, 0.25);
        assert_eq!(
            base.last_rotation(),
            Some(Rotation {
                angle: 0.5,
                duration_secs: 0.25
            })
        );
    }

    #[test]
    #[should_panic(expected = "previous frame ended")]
    fn nested_frames_panic() {
        let mut base = RenderBase::new();
        base.begin_frame();
        base.begin_frame();
    }
}
