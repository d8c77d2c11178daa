//! Configuration for tile loading and the initial view
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a working setup. Call [`MapOptions::validate`] before use; the
//! builder does this for you.

use crate::core::constants::{
    DEFAULT_MAX_CACHED_TILES, DEFAULT_MAX_SIMULTANEOUS_LOADS, DEFAULT_STALE_AFTER_FRAMES,
    TILE_SIZE,
};
use crate::core::geo::Location;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    /// Edge length of a tile in canvas pixels
    pub tile_size: u32,
    /// Decoded tiles kept after each render pass
    pub max_cached_tiles: usize,
    /// Fetches allowed in flight at once
    pub max_simultaneous_loads: usize,
    /// Queued requests older than this many render passes are dropped
    pub stale_after_frames: u64,
}

impl TileLoadingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(MapError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.max_cached_tiles == 0 {
            return Err(MapError::InvalidConfig(
                "max_cached_tiles must be at least 1".into(),
            ));
        }
        if self.max_simultaneous_loads == 0 {
            return Err(MapError::InvalidConfig(
                "max_simultaneous_loads must be at least 1".into(),
            ));
        }
        if self.stale_after_frames == 0 {
            return Err(MapError::InvalidConfig(
                "stale_after_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn for_testing() -> Self {
        Self {
            max_cached_tiles: 4,
            max_simultaneous_loads: 2,
            ..Self::default()
        }
    }
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            max_cached_tiles: DEFAULT_MAX_CACHED_TILES,
            max_simultaneous_loads: DEFAULT_MAX_SIMULTANEOUS_LOADS,
            stale_after_frames: DEFAULT_STALE_AFTER_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub tile_loading: TileLoadingConfig,
    /// Where the camera starts; the whole pyramid when unset
    pub initial_location: Option<Location>,
    /// `{z}/{x}/{y}` style template; OpenStreetMap when unset
    pub url_template: Option<String>,
}

impl MapOptions {
    /// Parse options from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self> {
        let options: MapOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        self.tile_loading.validate()?;
        if let Some(location) = &self.initial_location {
            if !location.is_valid() {
                return Err(MapError::InvalidConfig(format!(
                    "initial_location must be finite with a positive scale: {:?}",
                    location
                )));
            }
        }
        Ok(())
    }
}
