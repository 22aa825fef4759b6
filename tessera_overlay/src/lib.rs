// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Overlay: decides which screen decorations of a map frame are shown.
//!
//! Labels, icons and path texts compete for screen space. Each one is wrapped in
//! an [`OverlayHandle`] and submitted to an [`OverlayTree`] during a placement
//! cycle; when the cycle closes, the tree keeps a conflict-free subset chosen
//! greedily by priority and marks exactly those handles visible. Between cycles
//! the tree answers pixel-space selection queries over the visible handles.
//!
//! - [`OverlayHandle`]: the interface a candidate implements.
//! - [`RectHandle`] and [`PathHandle`]: stock single-box and multi-box handles.
//! - [`OverlayTree`]: the placement engine and its frame gating.
//!
//! Handles are shared with the tree through [`Rc`](alloc::rc::Rc); trait objects
//! (`OverlayTree<dyn OverlayHandle>`) and concrete types both work.
//!
//! ```rust
//! use std::rc::Rc;
//! use kurbo::{Point, Rect, Size};
//! use tessera_overlay::{FeatureId, OverlayHandle, OverlayTree, RectHandle};
//! use tessera_view::ScreenView;
//!
//! let view = ScreenView::new(Rect::new(0.0, 0.0, 400.0, 300.0));
//! let label: Rc<dyn OverlayHandle> = Rc::new(
//!     RectHandle::new(Point::ORIGIN, Size::new(60.0, 14.0), 5.0)
//!         .with_feature(FeatureId::new(0, 42)),
//! );
//!
//! let mut tree: OverlayTree<dyn OverlayHandle> = OverlayTree::new();
//! tree.start_overlay_placing(&view);
//! tree.add(Rc::clone(&label), false);
//! let stats = tree.end_overlay_placing();
//! assert_eq!(stats.committed, 1);
//!
//! let picked = tree.select(Rect::new(195.0, 145.0, 205.0, 155.0));
//! assert_eq!(picked.len(), 1);
//! assert_eq!(picked[0].feature_id(), FeatureId::new(0, 42));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod handle;
mod shapes;
mod tree;

pub use handle::{FeatureId, OverlayHandle, PixelShape};
pub use shapes::{Anchor, PathHandle, RectHandle};
pub use tree::{OverlayTree, OverlayTreeConfig, PlacementStats};
