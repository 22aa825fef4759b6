// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Index: a keyed 2D rectangle index for screen-space decorations.
//!
//! Tessera Index is the spatial building block under the overlay placement layer.
//!
//! - Insert rectangles with owned payloads and get back a generational [`Key`].
//! - Remove entries by key; stale keys are rejected instead of aliasing a reused slot.
//! - Query by intersecting rectangle or by point, either by visiting matches in place
//!   or by collecting keys.
//!
//! Unlike a batched scene index, every mutation is visible to the very next query.
//! This matters for greedy conflict resolution, where each accepted candidate must
//! immediately block the candidates processed after it.
//!
//! Rectangle intersection is *inclusive*: two rectangles that only share an edge or a
//! corner are considered to overlap. See [`overlaps`].
//!
//! ## Features
//!
//! - `std` *(default)*: forwards to `kurbo/std`.
//! - `libm`: forwards to `kurbo/libm` for `no_std` targets.
//! - `backend_grid` *(default)*: enables the uniform [`Grid`](backends::Grid) backend,
//!   backed by `hashbrown` and `smallvec`.
//!
//! # Example
//!
//! ```rust
//! use kurbo::Rect;
//! use tessera_index::Index;
//!
//! let mut idx: Index<&str> = Index::new();
//! let a = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), "a");
//! let _b = idx.insert(Rect::new(20.0, 0.0, 30.0, 10.0), "b");
//!
//! let hits = idx.query_rect(Rect::new(5.0, 5.0, 8.0, 8.0));
//! assert_eq!(hits, vec![a]);
//!
//! assert_eq!(idx.remove(a), Some("a"));
//! assert!(idx.query_rect(Rect::new(5.0, 5.0, 8.0, 8.0)).is_empty());
//! ```
//!
//! ## Choosing a backend
//!
//! - [`FlatVec`](backends::FlatVec) (default for [`Index`]): linear scans. Fine for a
//!   few dozen entries.
//! - [`Grid`](backends::Grid) *(feature `backend_grid`)*: uniform grid with a configurable
//!   cell size. Screen-space overlays are small relative to the viewport and fairly evenly
//!   spread, which is exactly the case a grid handles well. Entries spanning more than
//!   [`MAX_LINKED_CELLS`](backends::MAX_LINKED_CELLS) cells are scanned linearly instead.
//!
//! Coordinates are assumed to be finite. Debug builds assert on NaN input.

#![no_std]

extern crate alloc;

mod backend;
pub mod backends;
mod geom;
mod index;

pub use backend::Backend;
pub use geom::{contains_point, overlaps};
pub use index::{Index, IndexGeneric, Key};
