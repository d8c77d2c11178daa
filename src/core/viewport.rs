//! Viewer ↔ world mapping and viewport-to-tile-range computation.
//!
//! World space is the unit square tiled as a power-of-two grid: at zoom `z`
//! the square is split into `2^z × 2^z` tiles.

use crate::core::bounds::Bounds;
use crate::core::constants::MAX_ZOOM;
use crate::core::geo::Point;
use crate::layers::tile::types::TileKey;
use crate::traits::{MatrixTransform, IDENTITY_MATRIX};
use serde::{Deserialize, Serialize};

/// Pins a viewer-space point to a world-space point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub viewer: Point,
    pub world: Point,
}

impl Constraint {
    pub fn new(viewer: Point, world: Point) -> Self {
        Self { viewer, world }
    }
}

/// Contract of the gesture/zoom transform provider.
pub trait ViewerTransform: Send {
    /// Map a canvas pixel position to world coordinates
    fn world_pos_from_viewer_pos(&self, viewer: Point) -> Point;

    /// World length covered by `pixels` canvas pixels
    fn world_distance_from_viewer_distance(&self, pixels: f64) -> f64;

    /// Re-solve the transform so each constraint's viewer point lands on its
    /// world point
    fn process_constraints(&mut self, constraints: &[Constraint]);

    /// World → canvas matrix handed to the drawing backend
    fn canvas_matrix(&self) -> [f64; 6];

    /// Returns true once after every change, then false until the next one
    fn take_changed(&mut self) -> bool;
}

/// Uniform scale, rotation and translation from viewer to world space.
///
/// Stored as `world = m · viewer + t` with `m` a complex number, which is
/// the matrix `[m.re, m.im, -m.im, m.re, t.x, t.y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    m: Point,
    t: Point,
    #[serde(skip)]
    changed: bool,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self {
            m: Point::new(1.0, 0.0),
            t: Point::new(0.0, 0.0),
            changed: false,
        }
    }

    /// `scale` world units per viewer pixel, viewer origin at `origin`
    pub fn from_scale_and_origin(scale: f64, origin: Point) -> Self {
        Self {
            m: Point::new(scale, 0.0),
            t: origin,
            changed: false,
        }
    }

    /// Viewer → world matrix
    pub fn matrix(&self) -> [f64; 6] {
        [self.m.x, self.m.y, -self.m.y, self.m.x, self.t.x, self.t.y]
    }

    /// World units per viewer pixel
    pub fn scale(&self) -> f64 {
        self.m.norm()
    }

    fn multiply(a: Point, b: Point) -> Point {
        Point::new(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x)
    }

    fn divide(a: Point, b: Point) -> Option<Point> {
        let denom = b.x * b.x + b.y * b.y;
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }
        Some(Point::new(
            (a.x * b.x + a.y * b.y) / denom,
            (a.y * b.x - a.x * b.y) / denom,
        ))
    }

    fn pin(&mut self, constraint: &Constraint) {
        self.t = constraint.world - Self::multiply(self.m, constraint.viewer);
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewerTransform for SimilarityTransform {
    fn world_pos_from_viewer_pos(&self, viewer: Point) -> Point {
        viewer.apply_transform(&self.matrix())
    }

    fn world_distance_from_viewer_distance(&self, pixels: f64) -> f64 {
        pixels * self.scale()
    }

    fn process_constraints(&mut self, constraints: &[Constraint]) {
        match constraints {
            [] => return,
            [only] => self.pin(only),
            [first, second, ..] => {
                let solved = Self::divide(second.world - first.world, second.viewer - first.viewer)
                    .filter(|m| m.is_finite() && m.norm() > 0.0);
                if let Some(m) = solved {
                    self.m = m;
                }
                self.pin(first);
            }
        }
        self.changed = true;
    }

    fn canvas_matrix(&self) -> [f64; 6] {
        Point::invert_matrix(&self.matrix()).unwrap_or(IDENTITY_MATRIX)
    }

    fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

/// Inclusive rectangle of tile indices at one zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl TileRange {
    /// Number of tiles in the range, saturating at `u64::MAX`
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let columns = (i128::from(self.max_x) - i128::from(self.min_x) + 1) as u128;
        let rows = (i128::from(self.max_y) - i128::from(self.min_y) + 1) as u128;
        columns
            .checked_mul(rows)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(u64::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        key.z == self.zoom
            && (self.min_x..=self.max_x).contains(&key.x)
            && (self.min_y..=self.max_y).contains(&key.y)
    }

    /// Intersect with the valid grid `[0, 2^zoom)²`
    pub fn clamp_to_grid(&self) -> Option<TileRange> {
        let last = TileKey::grid_size(self.zoom) - 1;
        let clamped = TileRange {
            zoom: self.zoom,
            min_x: self.min_x.max(0),
            min_y: self.min_y.max(0),
            max_x: self.max_x.min(last),
            max_y: self.max_y.min(last),
        };
        (!clamped.is_empty()).then_some(clamped)
    }

    /// Keys in row-major order: y outer, x inner
    pub fn keys(&self) -> impl Iterator<Item = TileKey> {
        let TileRange {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| TileKey::new(zoom, x, y)))
    }
}

/// What a canvas currently shows, in world and tile terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleArea {
    /// Axis-aligned world box around the four canvas corners
    pub world_bounds: Bounds,
    /// World units per tile that would give `canvas_width / tile_size` tiles across
    pub target_units_per_tile: f64,
    pub zoom: u8,
    /// Covered tile indices; may reach outside the grid
    pub tiles: TileRange,
}

/// Coarsest zoom level whose tiles are at least as fine as `units_per_tile`
pub fn zoom_for_units_per_tile(units_per_tile: f64) -> u8 {
    let level = (-units_per_tile.log2()).ceil();
    if level.is_nan() || level <= 0.0 {
        0
    } else if level >= MAX_ZOOM as f64 {
        MAX_ZOOM
    } else {
        level as u8
    }
}

/// Index of the tile containing world coordinate `u` at `zoom`
pub fn tile_index(u: f64, zoom: u8) -> i64 {
    (u * TileKey::grid_size(zoom) as f64).floor() as i64
}

/// Map the canvas through `transform` and pick the zoom level and tile range
/// covering it.
///
/// Rotated transforms over-approximate the visible region; that only costs
/// extra tile requests.
pub fn visible_area(transform: &dyn ViewerTransform, canvas_size: Point, tile_size: u32) -> VisibleArea {
    let canvas = Bounds::new(Point::default(), canvas_size);
    let corners = canvas
        .corners()
        .map(|corner| transform.world_pos_from_viewer_pos(corner));
    let world_bounds = Bounds::from_points(corners).unwrap_or_default();

    let num_tiles = canvas_size.x / tile_size as f64;
    let target_units_per_tile = world_bounds.width() / num_tiles;
    let zoom = zoom_for_units_per_tile(target_units_per_tile);

    let tiles = TileRange {
        zoom,
        min_x: tile_index(world_bounds.min.x, zoom),
        min_y: tile_index(world_bounds.min.y, zoom),
        max_x: tile_index(world_bounds.max.x, zoom),
        max_y: tile_index(world_bounds.max.y, zoom),
    };

    VisibleArea {
        world_bounds,
        target_units_per_tile,
        zoom,
        tiles,
    }
}
