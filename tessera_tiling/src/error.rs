// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for policy configuration and the worker pool.

use thiserror::Error;

/// A [`PolicyConfig`](crate::PolicyConfig) that cannot drive a render policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One of the screen dimensions is zero.
    #[error("screen size {width}x{height} has no area")]
    EmptyScreen {
        /// Configured width in pixels.
        width: u32,
        /// Configured height in pixels.
        height: u32,
    },

    /// No CPU cores were reported.
    #[error("at least one CPU core is required")]
    NoCores,

    /// The pending command queue has no room.
    #[error("max_pending_commands must be at least 1")]
    NoQueueCapacity,

    /// Tiles above the upper world scale cannot be addressed.
    #[error("upper world scale {0} leaves no scale above it")]
    UpperScaleOutOfRange(u8),
}

/// Failure to submit work to, or start, a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Error)]
pub enum PoolError {
    /// The bounded command queue is full.
    #[error("command queue is full ({capacity} pending)")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },

    /// The pool is shutting down.
    #[error("worker pool has shut down")]
    ShutDown,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}
