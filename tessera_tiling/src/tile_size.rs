// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile edge length derived from the screen size.

/// Smallest tile edge handed out, in pixels.
pub const MIN_TILE_SIZE: u32 = 256;
/// Largest tile edge handed out, in pixels.
pub const MAX_TILE_SIZE: u32 = 1024;

/// Tile edge length for a screen of the given size.
///
/// The larger screen dimension is rounded to a power of two (up for screens
/// under 1024 px, to the nearest one otherwise, ties rounding down), halved,
/// and clamped to [`MIN_TILE_SIZE`]..=[`MAX_TILE_SIZE`].
///
/// ```rust
/// use tessera_tiling::calculate_tile_size;
///
/// assert_eq!(calculate_tile_size(800, 600), 512);
/// assert_eq!(calculate_tile_size(2000, 1200), 1024);
/// ```
pub fn calculate_tile_size(screen_width: u32, screen_height: u32) -> u32 {
    let max = u64::from(screen_width.max(screen_height));
    let ceiled = (max + 1).next_power_of_two();
    let rounded = if max < 1024 {
        ceiled
    } else {
        let floored = ceiled / 2;
        if ceiled - max < max - floored {
            ceiled
        } else {
            floored
        }
    };
    let size = (rounded / 2).clamp(u64::from(MIN_TILE_SIZE), u64::from(MAX_TILE_SIZE));
    u32::try_from(size).unwrap_or(MAX_TILE_SIZE)
}
