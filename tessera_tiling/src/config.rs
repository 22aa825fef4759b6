// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time settings of a [`TilingRenderPolicy`](crate::TilingRenderPolicy).
//!
//! Platform facts (screen size, core count, device class) are passed in here
//! rather than queried from the environment, so policies are reproducible in
//! tests.

use crate::error::ConfigError;
use crate::tile_size::calculate_tile_size;

/// Hardware tier of the device; sizes the pending-command budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Entry-level device.
    #[default]
    Lite,
    /// High-end device.
    Pro,
}

impl DeviceClass {
    /// Default bound on queued render commands for this tier.
    pub const fn default_pending_commands(self) -> usize {
        match self {
            Self::Lite => 64,
            Self::Pro => 256,
        }
    }
}

/// Settings of a tiling render policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Surface width in pixels.
    pub screen_width: u32,
    /// Surface height in pixels.
    pub screen_height: u32,
    /// Number of CPU cores available for background rendering.
    pub cpu_cores: usize,
    /// Device tier.
    pub device_class: DeviceClass,
    /// RGBA color the surface is cleared to before coverage is drawn.
    pub background: [u8; 4],
    /// Highest scale of the world overview; forced updates invalidate the scales above it.
    pub upper_world_scale: u8,
    /// Bound on commands queued in a worker pool.
    pub max_pending_commands: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::new(800, 600, 1, DeviceClass::Lite)
    }
}

impl PolicyConfig {
    /// Settings for a screen and machine, with tier-derived defaults for the rest.
    pub fn new(
        screen_width: u32,
        screen_height: u32,
        cpu_cores: usize,
        device_class: DeviceClass,
    ) -> Self {
        Self {
            screen_width,
            screen_height,
            cpu_cores,
            device_class,
            background: [0xEE, 0xEE, 0xDD, 0xFF],
            upper_world_scale: 9,
            max_pending_commands: device_class.default_pending_commands(),
        }
    }

    /// Replace the clear color.
    #[must_use]
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    /// Check the settings can drive a policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ConfigError::EmptyScreen {
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        if self.cpu_cores == 0 {
            return Err(ConfigError::NoCores);
        }
        if self.max_pending_commands == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.upper_world_scale == u8::MAX {
            return Err(ConfigError::UpperScaleOutOfRange(self.upper_world_scale));
        }
        Ok(())
    }

    /// Threads in a worker pool: one per core plus one.
    pub fn worker_count(&self) -> usize {
        self.cpu_cores + 1
    }

    /// Workers parked while navigating; leaves a single worker running.
    pub fn partial_worker_count(&self) -> usize {
        self.cpu_cores
    }

    /// First scale invalidated by a forced update.
    pub fn first_invalidated_scale(&self) -> u8 {
        self.upper_world_scale.saturating_add(1)
    }

    /// Tile edge length for this screen.
    pub fn tile_size(&self) -> u32 {
        calculate_tile_size(self.screen_width, self.screen_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_degenerate_settings() {
        assert_eq!(PolicyConfig::default().validate(), Ok(()));
        assert_eq!(
            PolicyConfig::new(0, 600, 2, DeviceClass::Pro).validate(),
            Err(ConfigError::EmptyScreen {
                width: 0,
                height: 600
            })
        );
        assert_eq!(
            PolicyConfig::new(800, 600, 0, DeviceClass::Pro).validate(),
            Err(ConfigError::NoCores)
        );
        let mut config = PolicyConfig::default();
        config.max_pending_commands = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoQueueCapacity));
        let mut config = PolicyConfig::default();
        config.upper_world_scale = u8::MAX;
        assert_eq!(
            config.validate(),
            Err(ConfigError::UpperScaleOutOfRange(u8::MAX))
        );
    }

    #[test]
    fn worker_counts_follow_cores() {
        let config = PolicyConfig::new(1280, 720, 4, DeviceClass::Pro);
        assert_eq!(config.worker_count(), 5);
        assert_eq!(config.partial_worker_count(), 4);
        assert_eq!(config.max_pending_commands, 256);
        assert_eq!(config.first_invalidated_scale(), 10);
        assert_eq!(config.tile_size(), 512);
    }
}
