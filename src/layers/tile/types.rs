//! Core data types for tile layer functionality

use crate::core::bounds::Bounds;
use crate::core::constants::MAX_ZOOM;
use crate::core::geo::Point;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Address of one tile in the power-of-two grid.
///
/// `x` and `y` are signed so that ranges reaching past the grid edge can be
/// expressed; such keys are simply invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u8,
    pub x: i64,
    pub y: i64,
}

impl TileKey {
    pub fn new(z: u8, x: i64, y: i64) -> Self {
        Self { z, x, y }
    }

    /// Tiles per axis at `zoom`, saturating past what an `i64` holds
    pub fn grid_size(zoom: u8) -> i64 {
        1_i64
            .checked_shl(zoom.into())
            .filter(|n| *n > 0)
            .unwrap_or(i64::MAX)
    }

    /// Checks if the tile lies inside the grid for its zoom level
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = Self::grid_size(self.z);
        (0..n).contains(&self.x) && (0..n).contains(&self.y)
    }

    /// World-space rectangle covered by this tile
    pub fn world_rect(&self) -> Bounds {
        let unit = 1.0 / Self::grid_size(self.z) as f64;
        Bounds::new(
            Point::new(self.x as f64 * unit, self.y as f64 * unit),
            Point::new((self.x + 1) as f64 * unit, (self.y + 1) as f64 * unit),
        )
    }
}

/// Canonical `"zoom,x,y"` form
impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MapError::InvalidTileKey(s.to_string());
        let mut parts = s.split(',').map(str::trim);
        let (Some(z), Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(TileKey::new(
            z.parse().map_err(|_| invalid())?,
            x.parse().map_err(|_| invalid())?,
            y.parse().map_err(|_| invalid())?,
        ))
    }
}

/// Decoded RGBA8 tile image. Cloning shares the pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    pixels: Arc<Vec<u8>>,
}

impl TileImage {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }

    /// Decode a PNG/JPEG/... byte stream
    #[cfg(feature = "render")]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::from_rgba(width, height, rgba.into_raw()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True when the buffer holds every pixel of a non-empty image
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 4
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Requested; fetch queued or in flight
    Pending,
    Loaded,
    /// Terminal; never retried
    Failed,
}

/// Cache entry for one requested tile
#[derive(Debug, Clone)]
pub struct TileRecord {
    serial: u64,
    pub(crate) last_draw_request: u64,
    image: Option<TileImage>,
    failed: bool,
}

impl TileRecord {
    pub(crate) fn new(serial: u64, frame: u64) -> Self {
        Self {
            serial,
            last_draw_request: frame,
            image: None,
            failed: false,
        }
    }

    /// Identity of this record; a record re-created for the same key gets a
    /// new serial
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Frame in which the tile was last needed for drawing
    pub fn last_draw_request(&self) -> u64 {
        self.last_draw_request
    }

    pub fn image(&self) -> Option<&TileImage> {
        self.image.as_ref()
    }

    pub fn state(&self) -> TileState {
        if self.image.is_some() {
            TileState::Loaded
        } else if self.failed {
            TileState::Failed
        } else {
            TileState::Pending
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == TileState::Pending
    }

    pub(crate) fn mark_loaded(&mut self, image: TileImage) {
        self.image = Some(image);
    }

    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }
}
