//! Tile layer: request-on-draw cache, bounded load scheduling and URL
//! templates for slippy-map style tile servers.

pub mod cache;
pub mod layer;
pub mod loader;
pub mod source;
pub mod types;

pub use cache::{TileCache, TileEntry};
pub use layer::TileLayer;
#[cfg(all(feature = "tokio-runtime", feature = "render"))]
pub use loader::HttpImageFetcher;
pub use loader::{
    CompletionSummary, LoadCompletion, LoadJob, LoadRequest, LoadScheduler, LoadStats,
    ManualTileLoader, TileLoader,
};
#[cfg(feature = "tokio-runtime")]
pub use loader::{AsyncTileLoader, ImageFetcher};
pub use source::{TileSource, UrlTemplate};
pub use types::{TileImage, TileKey, TileRecord, TileState};
