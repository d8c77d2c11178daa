//! Core TileLayer implementation

use super::cache::TileCache;
use super::loader::{CompletionSummary, LoadRequest, LoadScheduler, TileLoader};
use super::source::TileSource;
use super::types::{TileKey, TileRecord};
use crate::core::config::TileLoadingConfig;
use crate::Result;

/// Owns the tile cache, the load scheduler and the URL source, and counts
/// render passes.
///
/// The frame counter is the clock for both eviction and staleness: every
/// [`TileLayer::get_tile`] stamps the tile with the current frame, and
/// [`TileLayer::finish_frame`] advances it.
pub struct TileLayer {
    config: TileLoadingConfig,
    source: Box<dyn TileSource>,
    cache: TileCache,
    scheduler: LoadScheduler,
    num_draw: u64,
}

impl TileLayer {
    pub fn new(
        config: TileLoadingConfig,
        source: Box<dyn TileSource>,
        loader: Box<dyn TileLoader>,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = LoadScheduler::new(&config, loader);
        Ok(Self {
            config,
            source,
            cache: TileCache::new(),
            scheduler,
            num_draw: 0,
        })
    }

    /// Fetch-or-request: returns the tile's record, requesting a load the
    /// first time a key is seen. `None` for keys outside the grid.
    pub fn get_tile(&mut self, key: TileKey) -> Option<&TileRecord> {
        let frame = self.num_draw;
        let (created, serial) = {
            let entry = self.cache.get(key, frame)?;
            (entry.is_created(), entry.record().serial())
        };

        if created {
            let request = LoadRequest {
                key,
                url: self.source.url(key),
                serial,
            };
            self.scheduler.enqueue(request, &mut self.cache, frame);
        }

        self.cache.record(&key)
    }

    /// Apply finished loads and start queued ones in the freed slots
    pub fn process_completions(&mut self) -> CompletionSummary {
        self.scheduler
            .process_completions(&mut self.cache, self.num_draw)
    }

    /// Close the current render pass: advance the frame counter and evict
    /// down to the cache budget. Returns the number of evicted tiles.
    pub fn finish_frame(&mut self) -> usize {
        self.num_draw += 1;
        self.cache.evict(self.config.max_cached_tiles)
    }

    /// Number of completed render passes
    pub fn frame(&self) -> u64 {
        self.num_draw
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &LoadScheduler {
        &self.scheduler
    }
}

impl std::fmt::Debug for TileLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLayer")
            .field("config", &self.config)
            .field("num_draw", &self.num_draw)
            .field("cached", &self.cache.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
