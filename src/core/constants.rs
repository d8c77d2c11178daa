//! Engine-wide defaults and limits.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Default number of decoded tiles kept after a render pass.
pub const DEFAULT_MAX_CACHED_TILES: usize = 64;

/// Default number of tile fetches allowed in flight at once.
pub const DEFAULT_MAX_SIMULTANEOUS_LOADS: usize = 3;

/// A queued tile not requested for this many render passes is dropped
/// before its fetch starts.
pub const DEFAULT_STALE_AFTER_FRAMES: u64 = 3;

/// Finest zoom level the viewport mapper will pick; `2^MAX_ZOOM` tile
/// indices fit comfortably in an `i64`.
pub const MAX_ZOOM: u8 = 30;

/// Margin applied around waypoints when framing them.
pub const DEFAULT_FRAME_MARGIN: f64 = 1.1;

/// Tile template used when no source is configured.
pub const OSM_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// User-Agent header for tile requests.
pub const USER_AGENT: &str = concat!("tilecanvas/", env!("CARGO_PKG_VERSION"));
