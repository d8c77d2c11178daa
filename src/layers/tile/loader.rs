//! Bounded-concurrency tile load scheduling.
//!
//! Requests wait in a queue that is re-sorted by draw recency every time a
//! slot frees up, so tiles needed by the latest frame are fetched first and
//! requests nobody has drawn for a while are dropped before they start.
//! Fetches themselves run elsewhere (a spawned task, a host callback) and
//! report back through a channel that the owner drains between frames.

use super::cache::TileCache;
use super::types::{TileImage, TileKey};
use crate::core::config::TileLoadingConfig;
use crate::prelude::{Arc, Mutex};
use crate::{MapError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// A tile waiting for a load slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub key: TileKey,
    pub url: String,
    /// Serial of the cache record the request was made for
    pub serial: u64,
}

/// Outcome of a load, posted back to the scheduler
#[derive(Debug)]
pub struct LoadCompletion {
    pub key: TileKey,
    pub serial: u64,
    pub url: String,
    pub result: Result<TileImage>,
}

/// Handle for one started load.
///
/// Must be resolved exactly once through [`LoadJob::succeed`],
/// [`LoadJob::fail`] or [`LoadJob::complete`]. A job dropped unresolved
/// reports a failure so its slot is always given back.
#[derive(Debug)]
pub struct LoadJob {
    key: TileKey,
    url: String,
    serial: u64,
    completion: Option<Sender<LoadCompletion>>,
}

impl LoadJob {
    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn succeed(self, image: TileImage) {
        self.complete(Ok(image));
    }

    pub fn fail(self, error: MapError) {
        self.complete(Err(error));
    }

    pub fn complete(mut self, result: Result<TileImage>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<TileImage>) {
        if let Some(completion) = self.completion.take() {
            // The scheduler may already be gone; nothing left to update then.
            let _ = completion.send(LoadCompletion {
                key: self.key,
                serial: self.serial,
                url: std::mem::take(&mut self.url),
                result,
            });
        }
    }
}

impl Drop for LoadJob {
    fn drop(&mut self) {
        if self.completion.is_some() {
            self.send(Err(MapError::TileLoad("load abandoned".into())));
        }
    }
}

/// Starts tile fetches. Must not block; the result goes back through the
/// job.
pub trait TileLoader: Send {
    fn start(&self, job: LoadJob);
}

/// Running totals of scheduler decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// What one [`LoadScheduler::process_completions`] call applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionSummary {
    pub loaded: usize,
    pub failed: usize,
}

impl CompletionSummary {
    pub fn is_empty(&self) -> bool {
        self.loaded == 0 && self.failed == 0
    }
}

pub struct LoadScheduler {
    queue: Vec<LoadRequest>,
    num_loading: usize,
    max_concurrent: usize,
    stale_after: u64,
    loader: Box<dyn TileLoader>,
    completion_tx: Sender<LoadCompletion>,
    completion_rx: Receiver<LoadCompletion>,
    stats: LoadStats,
}

impl LoadScheduler {
    pub fn new(config: &TileLoadingConfig, loader: Box<dyn TileLoader>) -> Self {
        let (completion_tx, completion_rx) = unbounded();
        Self {
            queue: Vec::new(),
            num_loading: 0,
            max_concurrent: config.max_simultaneous_loads.max(1),
            stale_after: config.stale_after_frames.max(1),
            loader,
            completion_tx,
            completion_rx,
            stats: LoadStats::default(),
        }
    }

    /// Queue a load and start whatever fits
    pub fn enqueue(&mut self, request: LoadRequest, cache: &mut TileCache, frame: u64) {
        log::debug!("queue tile {} ({})", request.key, request.url);
        self.queue.push(request);
        self.drain(cache, frame);
    }

    /// Start queued loads, most recently drawn first, until every slot is
    /// taken or the queue is empty. Requests that have not been drawn for
    /// `stale_after_frames` frames are cancelled instead.
    pub fn drain(&mut self, cache: &mut TileCache, frame: u64) {
        if self.num_loading >= self.max_concurrent || self.queue.is_empty() {
            return;
        }

        self.queue.sort_by_key(|request| {
            cache
                .record(&request.key)
                .map_or(0, |record| record.last_draw_request())
        });

        while self.num_loading < self.max_concurrent {
            let Some(request) = self.queue.pop() else {
                break;
            };

            let last_draw_request = match cache.record(&request.key) {
                Some(record) if record.serial() == request.serial && record.is_pending() => {
                    record.last_draw_request()
                }
                _ => {
                    log::debug!("drop orphaned request for {}", request.key);
                    continue;
                }
            };

            if frame.saturating_sub(last_draw_request) >= self.stale_after {
                cache.cancel(&request.key, request.serial);
                self.stats.cancelled += 1;
                log::debug!(
                    "cancel stale tile {} (last drawn in frame {}, now {})",
                    request.key,
                    last_draw_request,
                    frame
                );
                continue;
            }

            self.num_loading += 1;
            self.stats.started += 1;
            self.loader.start(LoadJob {
                key: request.key,
                url: request.url,
                serial: request.serial,
                completion: Some(self.completion_tx.clone()),
            });
        }
    }

    /// Apply every completion posted since the last call
    pub fn process_completions(&mut self, cache: &mut TileCache, frame: u64) -> CompletionSummary {
        let mut summary = CompletionSummary::default();

        while let Ok(completion) = self.completion_rx.try_recv() {
            self.num_loading = self.num_loading.saturating_sub(1);
            match completion.result {
                Ok(image) => {
                    if cache.attach_image(&completion.key, completion.serial, image) {
                        summary.loaded += 1;
                    }
                    self.stats.succeeded += 1;
                }
                Err(error) => {
                    log::warn!(
                        "failed to load tile {} from {}: {}",
                        completion.key,
                        completion.url,
                        error
                    );
                    if cache.mark_failed(&completion.key, completion.serial) {
                        summary.failed += 1;
                    }
                    self.stats.failed += 1;
                }
            }
            self.drain(cache, frame);
        }

        summary
    }

    pub fn num_loading(&self) -> usize {
        self.num_loading
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }
}

impl std::fmt::Debug for LoadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadScheduler")
            .field("queued", &self.queue.len())
            .field("num_loading", &self.num_loading)
            .field("max_concurrent", &self.max_concurrent)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Loader that hands jobs to the caller instead of fetching.
///
/// Clones share the same job list, so one clone can be given to the map and
/// another kept to resolve loads in whatever order is needed.
#[derive(Debug, Clone, Default)]
pub struct ManualTileLoader {
    jobs: Arc<Mutex<Vec<LoadJob>>>,
    started: Arc<Mutex<Vec<TileKey>>>,
}

impl ManualTileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of started, unresolved jobs in start order
    pub fn pending_keys(&self) -> Vec<TileKey> {
        self.jobs
            .lock()
            .map(|jobs| jobs.iter().map(LoadJob::key).collect())
            .unwrap_or_default()
    }

    /// Every key ever started, in start order
    pub fn started_keys(&self) -> Vec<TileKey> {
        self.started
            .lock()
            .map(|started| started.clone())
            .unwrap_or_default()
    }

    /// Resolve the oldest unresolved job for `key`. Returns false if there
    /// is none.
    pub fn resolve(&self, key: TileKey, result: Result<TileImage>) -> bool {
        let job = match self.jobs.lock() {
            Ok(mut jobs) => jobs
                .iter()
                .position(|job| job.key() == key)
                .map(|index| jobs.remove(index)),
            Err(_) => None,
        };
        match job {
            Some(job) => {
                job.complete(result);
                true
            }
            None => false,
        }
    }

    /// Take every unresolved job, leaving the list empty
    pub fn take_jobs(&self) -> Vec<LoadJob> {
        self.jobs
            .lock()
            .map(|mut jobs| std::mem::take(&mut *jobs))
            .unwrap_or_default()
    }
}

impl TileLoader for ManualTileLoader {
    fn start(&self, job: LoadJob) {
        if let Ok(mut started) = self.started.lock() {
            started.push(job.key());
        }
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job);
        }
    }
}

#[cfg(feature = "tokio-runtime")]
pub use self::async_loader::{AsyncTileLoader, ImageFetcher};

#[cfg(all(feature = "tokio-runtime", feature = "render"))]
pub use self::async_loader::HttpImageFetcher;

#[cfg(feature = "tokio-runtime")]
mod async_loader {
    use super::{LoadJob, TileLoader};
    use crate::layers::tile::types::TileImage;
    use crate::prelude::Arc;
    use crate::runtime::spawn;
    use crate::Result;
    use async_trait::async_trait;

    /// Fetches and decodes one tile image
    #[async_trait]
    pub trait ImageFetcher: Send + Sync + 'static {
        async fn fetch(&self, url: &str) -> Result<TileImage>;
    }

    /// Runs each load as a task on the async runtime
    pub struct AsyncTileLoader<F> {
        fetcher: Arc<F>,
    }

    impl<F: ImageFetcher> AsyncTileLoader<F> {
        pub fn new(fetcher: F) -> Self {
            Self::from_shared(Arc::new(fetcher))
        }

        pub fn from_shared(fetcher: Arc<F>) -> Self {
            Self { fetcher }
        }

        pub fn fetcher(&self) -> &Arc<F> {
            &self.fetcher
        }
    }

    impl<F: ImageFetcher> TileLoader for AsyncTileLoader<F> {
        fn start(&self, job: LoadJob) {
            let fetcher = Arc::clone(&self.fetcher);
            let key = job.key();
            // Detached: in-flight loads are never cancelled. A task that
            // cannot be spawned drops its job, reporting the load abandoned.
            let spawned = spawn(async move {
                let url = job.url().to_string();
                let result = fetcher.fetch(&url).await;
                job.complete(result);
            });
            if let Err(err) = spawned {
                log::warn!("tile {} not loaded: {}", key, err);
            }
        }
    }

    #[cfg(feature = "render")]
    pub use self::http::HttpImageFetcher;

    #[cfg(feature = "render")]
    mod http {
        use super::ImageFetcher;
        use crate::core::constants::USER_AGENT;
        use crate::layers::tile::types::TileImage;
        use crate::{MapError, Result};
        use async_trait::async_trait;
        use once_cell::sync::OnceCell;
        use std::time::Duration;

        static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

        fn shared_client() -> Result<&'static reqwest::Client> {
            HTTP_CLIENT.get_or_try_init(|| {
                reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .timeout(Duration::from_secs(30))
                    .pool_idle_timeout(Duration::from_secs(90))
                    .build()
                    .map_err(MapError::from)
            })
        }

        /// HTTP GET + image decode. Non-2xx responses are errors.
        #[derive(Debug, Clone)]
        pub struct HttpImageFetcher {
            client: reqwest::Client,
        }

        impl HttpImageFetcher {
            /// Fetcher on the process-wide client
            pub fn new() -> Result<Self> {
                Ok(Self::with_client(shared_client()?.clone()))
            }

            pub fn with_client(client: reqwest::Client) -> Self {
                Self { client }
            }
        }

        #[async_trait]
        impl ImageFetcher for HttpImageFetcher {
            async fn fetch(&self, url: &str) -> Result<TileImage> {
                let bytes = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                tokio::task::spawn_blocking(move || TileImage::decode(&bytes))
                    .await
                    .map_err(|e| MapError::TileLoad(format!("decode task failed: {e}")))?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel() -> TileImage {
        TileImage::from_rgba(1, 1, vec![0, 0, 0, 255])
    }

    fn config(max_loads: usize) -> TileLoadingConfig {
        TileLoadingConfig {
            max_simultaneous_loads: max_loads,
            ..TileLoadingConfig::for_testing()
        }
    }

    fn request(cache: &mut TileCache, key: TileKey, frame: u64) -> LoadRequest {
        let entry = cache.get(key, frame).unwrap();
        assert!(entry.is_created());
        LoadRequest {
            key,
            url: format!("test://{key}"),
            serial: entry.record().serial(),
        }
    }

    #[test]
    fn test_concurrency_ceiling() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(2), Box::new(loader.clone()));
        let mut cache = TileCache::new();

        for x in 0..4 {
            let req = request(&mut cache, TileKey::new(2, x, 0), 0);
            scheduler.enqueue(req, &mut cache, 0);
        }
        assert_eq!(scheduler.num_loading(), 2);
        assert_eq!(scheduler.queued_len(), 2);
        assert_eq!(loader.pending_keys().len(), 2);

        let first = loader.pending_keys()[0];
        assert!(loader.resolve(first, Ok(pixel())));
        let summary = scheduler.process_completions(&mut cache, 0);
        assert_eq!(summary, CompletionSummary { loaded: 1, failed: 0 });
        assert_eq!(scheduler.num_loading(), 2);
        assert_eq!(scheduler.queued_len(), 1);
        assert!(cache.record(&first).unwrap().is_loaded());
    }

    #[test]
    fn test_most_recent_request_starts_first() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(1), Box::new(loader.clone()));
        let mut cache = TileCache::new();

        let busy = TileKey::new(2, 0, 0);
        let old = TileKey::new(2, 1, 0);
        let recent = TileKey::new(2, 2, 0);
        let req = request(&mut cache, busy, 0);
        scheduler.enqueue(req, &mut cache, 0);
        let req = request(&mut cache, old, 0);
        scheduler.enqueue(req, &mut cache, 0);
        let req = request(&mut cache, recent, 1);
        scheduler.enqueue(req, &mut cache, 1);

        loader.resolve(busy, Ok(pixel()));
        scheduler.process_completions(&mut cache, 1);
        assert_eq!(loader.started_keys(), vec![busy, recent]);
    }

    #[test]
    fn test_stale_request_is_cancelled_without_starting() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(1), Box::new(loader.clone()));
        let mut cache = TileCache::new();

        let busy = TileKey::new(1, 0, 0);
        let stale = TileKey::new(1, 1, 0);
        let req = request(&mut cache, busy, 10);
        scheduler.enqueue(req, &mut cache, 10);
        let req = request(&mut cache, stale, 10);
        scheduler.enqueue(req, &mut cache, 10);
        assert_eq!(scheduler.queued_len(), 1);

        loader.resolve(busy, Ok(pixel()));
        scheduler.process_completions(&mut cache, 13);

        assert_eq!(loader.started_keys(), vec![busy]);
        assert!(!cache.contains(&stale));
        assert_eq!(scheduler.queued_len(), 0);
        assert_eq!(scheduler.stats().cancelled, 1);
        assert_eq!(scheduler.num_loading(), 0);
    }

    #[test]
    fn test_recent_enough_request_survives() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(1), Box::new(loader.clone()));
        let mut cache = TileCache::new();

        let busy = TileKey::new(1, 0, 0);
        let waiting = TileKey::new(1, 1, 0);
        let req = request(&mut cache, busy, 10);
        scheduler.enqueue(req, &mut cache, 10);
        let req = request(&mut cache, waiting, 10);
        scheduler.enqueue(req, &mut cache, 10);

        loader.resolve(busy, Ok(pixel()));
        scheduler.process_completions(&mut cache, 12);
        assert_eq!(loader.pending_keys(), vec![waiting]);
        assert_eq!(scheduler.stats().cancelled, 0);
    }

    #[test]
    fn test_failure_is_terminal() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(2), Box::new(loader.clone()));
        let mut cache = TileCache::new();
        let key = TileKey::new(0, 0, 0);

        let req = request(&mut cache, key, 0);
        scheduler.enqueue(req, &mut cache, 0);
        loader.resolve(key, Err(MapError::TileLoad("404".into())));
        let summary = scheduler.process_completions(&mut cache, 0);

        assert_eq!(summary.failed, 1);
        assert_eq!(scheduler.stats().failed, 1);
        let entry = cache.get(key, 1).unwrap();
        assert!(!entry.is_created());
        assert_eq!(entry.record().state(), crate::layers::tile::types::TileState::Failed);
    }

    #[test]
    fn test_dropped_job_reports_failure() {
        let loader = ManualTileLoader::new();
        let mut scheduler = LoadScheduler::new(&config(1), Box::new(loader.clone()));
        let mut cache = TileCache::new();
        let key = TileKey::new(0, 0, 0);

        let req = request(&mut cache, key, 0);
        scheduler.enqueue(req, &mut cache, 0);
        drop(loader.take_jobs());

        let summary = scheduler.process_completions(&mut cache, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(scheduler.num_loading(), 0);
    }
}
