//! # tilecanvas
//!
//! The core of a pannable, zoomable raster map viewer built from small
//! fixed-size tiles fetched on demand.
//!
//! The crate maps a continuous viewport onto a discrete power-of-two tile
//! grid, schedules bounded-concurrency tile loads prioritised by how recently
//! each tile was needed, caches decoded tiles and evicts them under a tile
//! budget. Drawing, gestures and image fetching sit behind traits so hosts can
//! plug in their own canvas, transform provider and network stack.

pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::{Bounds, Margin},
    builder::MapBuilder,
    config::{MapOptions, TileLoadingConfig},
    geo::{Location, Point},
    guard::{DrawGuard, DrawToken},
    map::{DrawOutcome, DrawStats, Map},
    viewport::{Constraint, SimilarityTransform, TileRange, ViewerTransform, VisibleArea},
};

pub use crate::layers::tile::{
    LoadJob, LoadScheduler, ManualTileLoader, TileCache, TileImage, TileKey, TileLayer,
    TileLoader, TileRecord, TileSource, TileState, UrlTemplate,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::layers::tile::{AsyncTileLoader, ImageFetcher};

#[cfg(all(feature = "tokio-runtime", feature = "render"))]
pub use crate::layers::tile::HttpImageFetcher;

pub use crate::rendering::context::{DrawCommand, DrawingBackend, RenderContext};

/// Result type used throughout the library
pub type Result<T, E = MapError> = std::result::Result<T, E>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[cfg(feature = "render")]
    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid tile key: {0}")]
    InvalidTileKey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tile load error: {0}")]
    TileLoad(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Install `env_logger` as the `log` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
