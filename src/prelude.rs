//! Prelude module for common tilecanvas types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilecanvas::prelude::*;`

pub use crate::core::{
    bounds::{Bounds, Margin},
    builder::MapBuilder,
    config::{MapOptions, TileLoadingConfig},
    geo::{Location, Point},
    guard::DrawGuard,
    map::{DrawOutcome, DrawStats, Map},
    viewport::{Constraint, SimilarityTransform, TileRange, ViewerTransform, VisibleArea},
};

pub use crate::layers::tile::{
    cache::TileCache,
    layer::TileLayer,
    loader::{CompletionSummary, LoadJob, LoadScheduler, LoadStats, ManualTileLoader, TileLoader},
    source::{TileSource, UrlTemplate},
    types::{TileImage, TileKey, TileRecord, TileState},
};

#[cfg(feature = "tokio-runtime")]
pub use crate::layers::tile::loader::{AsyncTileLoader, ImageFetcher};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::{runtime, spawn, AsyncHandle, AsyncSpawner};

pub use crate::rendering::context::{DrawCommand, DrawingBackend, RenderContext};

pub use crate::traits::MatrixTransform;

pub use crate::{Error as MapError, Result};

pub use std::sync::{Arc, Mutex};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

#[cfg(feature = "tokio-runtime")]
pub use futures::Future;

#[cfg(feature = "tokio-runtime")]
pub use std::pin::Pin;
