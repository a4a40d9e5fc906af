use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::point::Point;

use super::path_cache::PathCache;

/// Computes a fresh path for a cache entry that was invalidated.
pub trait PathRecompute: Send + Sync {
    fn recompute(&self, origin: Point, destination: Point) -> Option<Vec<Point>>;
}

/// Background workers draining the cache refresh queue.
///
/// A failed recomputation is logged and dropped, it is never retried.
pub struct CacheRefresher {
    cache: Arc<PathCache>,
    workers: Vec<JoinHandle<()>>,
}

impl CacheRefresher {
    pub fn start(
        cache: Arc<PathCache>,
        recompute: Arc<dyn PathRecompute>,
        num_threads: usize,
    ) -> std::io::Result<Self> {
        let mut workers = Vec::with_capacity(num_threads);

        for thread_index in 0..num_threads {
            let cache = Arc::clone(&cache);
            let recompute = Arc::clone(&recompute);
            let builder = thread::Builder::new().name(format!("cache-refresh-{thread_index}"));

            workers.push(builder.spawn(move || {
                while let Some(request) = cache.refresh_queue().pop_blocking() {
                    match recompute.recompute(request.origin, request.destination) {
                        Some(path) => {
                            cache.store(request.origin, request.destination, path);
                            cache.statistics().record_refreshed();
                        }
                        None => {
                            cache.statistics().record_refresh_failure();
                            warn!(
                                origin = %request.origin,
                                destination = %request.destination,
                                "Could not recompute invalidated path, dropping it"
                            );
                        }
                    }
                }
                debug!(thread_index, "Cache refresh worker stopped");
            })?);
        }

        Ok(CacheRefresher { cache, workers })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue and waits up to `timeout` for workers to exit. Workers
    /// still busy after the deadline are detached. Returns true when every
    /// worker was joined.
    pub fn shutdown(self, timeout: Duration) -> bool {
        self.cache.refresh_queue().close();

        let deadline = Instant::now() + timeout;
        let mut pending = self.workers;

        while !pending.is_empty() && Instant::now() < deadline {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|worker| worker.is_finished());
            for worker in finished {
                if worker.join().is_err() {
                    warn!("Cache refresh worker panicked");
                }
            }
            pending = running;
            if !pending.is_empty() {
                thread::sleep(Duration::from_millis(1));
            }
        }

        if !pending.is_empty() {
            warn!(
                workers = pending.len(),
                "Cache refresh workers did not stop in time, detaching them"
            );
            return false;
        }

        true
    }
}
