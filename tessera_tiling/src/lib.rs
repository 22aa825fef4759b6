// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Tiling: the frame and navigation controller of a tiled map view.
//!
//! A [`TilingRenderPolicy`] sequences each frame over three collaborators:
//! - a [`CoverageGenerator`] that decides which tiles cover the view and draws them,
//! - a [`TileRenderer`] rasterizing tiles in the background,
//! - an optional [`QueuedRenderer`] whose results are applied on the render thread.
//!
//! It also pauses background work during navigation gestures and animations,
//! and resumes it exactly once when they end. [`WorkerPool`] is a ready-made
//! pool that serves as the queued renderer and, through a [`PoolHandle`], as the
//! tile renderer.
//!
//! Platform facts come in through [`PolicyConfig`]; the tile edge length is
//! derived from the screen size by [`calculate_tile_size`].
//!
//! ```rust
//! use tessera_tiling::{DeviceClass, PolicyConfig};
//!
//! let config = PolicyConfig::new(1920, 1080, 4, DeviceClass::Pro);
//! config.validate().unwrap();
//! assert_eq!(config.tile_size(), 1024);
//! assert_eq!(config.worker_count(), 5);
//! ```

mod base;
mod collab;
mod config;
mod error;
mod policy;
mod tile_size;
mod worker_pool;

pub use base::{Interaction, RenderBase, Rotation};
pub use collab::{
    BenchmarkFence, CoverageGenerator, Drawer, FenceId, FenceSignal, QueuedRenderer, RegionIndex,
    TileRenderer,
};
pub use config::{DeviceClass, PolicyConfig};
pub use error::{ConfigError, PoolError};
pub use policy::{FrameScope, TilingRenderPolicy};
pub use tile_size::{MAX_TILE_SIZE, MIN_TILE_SIZE, calculate_tile_size};
pub use worker_pool::{CancelToken, PoolHandle, WorkerPool};
