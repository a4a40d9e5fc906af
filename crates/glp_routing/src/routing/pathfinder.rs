use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::Instant,
};

use parking_lot::RwLock;
use thread_local::ThreadLocal;
use tracing::{debug, warn};

use crate::{
    cache::{path_cache::PathCache, refresher::PathRecompute},
    grid::{grid_bounds::GridBounds, obstacle_grid::ObstacleGrid},
    point::Point,
    utils::timeout_collector::collect_with_timeout,
};

use super::{
    astar_heuristic::WeightedManhattan,
    path_result::{PathError, PathResult, SearchMetrics},
    pathfinder_statistics::PathfinderStatistics,
    search_engines::{GridSearch, SearchEngines, SearchLimits},
    search_params::{PathfinderParams, SearchParams},
};

/// Obstacle-aware shortest paths over the grid.
///
/// Searches run on the caller thread for `find_path` and on an owned rayon
/// pool for `find_paths_parallel`. Search buffers are kept per thread and
/// reused between calls.
pub struct Pathfinder {
    grid: RwLock<Option<Arc<ObstacleGrid>>>,
    cache: Option<Arc<PathCache>>,
    engines: ThreadLocal<RefCell<SearchEngines>>,
    statistics: Arc<PathfinderStatistics>,
    params: PathfinderParams,
    pool: rayon::ThreadPool,
}

impl Pathfinder {
    pub fn new(
        params: PathfinderParams,
        grid: Option<Arc<ObstacleGrid>>,
        cache: Option<Arc<PathCache>>,
        statistics: Arc<PathfinderStatistics>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads.number_of_threads())
            .thread_name(|index| format!("pathfinder-{index}"))
            .build()?;

        let pathfinder = Pathfinder {
            grid: RwLock::new(grid),
            cache,
            engines: ThreadLocal::new(),
            statistics,
            params,
            pool,
        };

        if pathfinder.params.prewarm {
            pathfinder.prewarm();
        }

        Ok(pathfinder)
    }

    pub fn params(&self) -> &PathfinderParams {
        &self.params
    }

    pub fn statistics(&self) -> &Arc<PathfinderStatistics> {
        &self.statistics
    }

    pub fn cache(&self) -> Option<&Arc<PathCache>> {
        self.cache.as_ref()
    }

    pub fn grid(&self) -> Option<Arc<ObstacleGrid>> {
        self.grid.read().clone()
    }

    pub fn attach_grid(&self, grid: Arc<ObstacleGrid>) {
        *self.grid.write() = Some(grid);
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs a tiny search on every pool thread so the first real batch does
    /// not pay for engine allocation.
    fn prewarm(&self) {
        self.pool.broadcast(|_| self.warm_up_thread());
        debug!(threads = self.thread_count(), "Pathfinder pool pre-warmed");
    }

    /// Allocates the search engines of the calling thread with a throwaway
    /// search. Statistics and cache are left untouched.
    pub fn warm_up_thread(&self) {
        let warmup_grid = ObstacleGrid::new(GridBounds::with_size(4, 4));
        let limits = SearchLimits {
            max_nodes: 64,
            deadline: Instant::now() + std::time::Duration::from_millis(50),
            cancel: None,
        };

        let mut engines = self.engines.get_or_default().borrow_mut();
        let _ = engines.astar.calc_path(
            &warmup_grid,
            Point::new(0, 0),
            Point::new(4, 4),
            &WeightedManhattan::default(),
            &limits,
        );
    }

    pub fn find_path(&self, origin: Point, destination: Point, params: &SearchParams) -> PathResult {
        let result = self.search(origin, destination, params, None);
        self.statistics.record(&result);
        result
    }

    fn search(
        &self,
        origin: Point,
        destination: Point,
        params: &SearchParams,
        cancel: Option<&AtomicBool>,
    ) -> PathResult {
        if origin == destination {
            return PathResult::trivial(origin);
        }

        let Some(grid) = self.grid() else {
            return PathResult::failed(
                origin,
                destination,
                PathError::MapUnavailable,
                SearchMetrics::default(),
            );
        };

        if !grid.is_valid(&origin) {
            return PathResult::failed(
                origin,
                destination,
                PathError::OriginInvalid(origin),
                SearchMetrics::default(),
            );
        }

        if !grid.is_valid(&destination) {
            return PathResult::failed(
                origin,
                destination,
                PathError::DestinationInvalid(destination),
                SearchMetrics::default(),
            );
        }

        let start = Instant::now();

        if params.use_cache {
            if let Some(path) = self
                .cache
                .as_ref()
                .and_then(|cache| cache.lookup(origin, destination))
            {
                return PathResult::found(
                    origin,
                    destination,
                    path,
                    SearchMetrics {
                        elapsed: start.elapsed(),
                        cache_hit: true,
                        ..SearchMetrics::default()
                    },
                );
            }
        }

        let heuristic = WeightedManhattan::new(params.effective_heuristic_weight());
        let limits = SearchLimits {
            max_nodes: params.max_nodes,
            deadline: start + params.time_budget.unsigned_abs(),
            cancel,
        };

        let outcome = {
            let mut engines = self.engines.get_or_default().borrow_mut();
            if params.bidirectional {
                engines
                    .bidirectional
                    .calc_path(&grid, origin, destination, &heuristic, &limits)
            } else {
                engines
                    .astar
                    .calc_path(&grid, origin, destination, &heuristic, &limits)
            }
        };

        let metrics = SearchMetrics {
            nodes_explored: outcome.nodes_explored,
            elapsed: start.elapsed(),
            cache_hit: false,
            bidirectional: params.bidirectional,
        };

        match outcome.path {
            Ok(path) => {
                let path: Arc<[Point]> = path.into();
                if params.use_cache && params.finds_shortest() {
                    if let Some(cache) = &self.cache {
                        cache.store(origin, destination, Arc::clone(&path));
                    }
                }
                PathResult::found(origin, destination, path, metrics)
            }
            Err(error) => PathResult::failed(origin, destination, error, metrics),
        }
    }

    /// Runs every pair on the pathfinder pool.
    ///
    /// The batch waits at most `BatchParams::batch_timeout(pairs.len())`. Searches
    /// still running afterwards are cancelled and reported as `Timeout`. If a
    /// worker panics, the whole batch is recomputed sequentially.
    pub fn find_paths_parallel(
        self: &Arc<Self>,
        pairs: &[(Point, Point)],
        params: &SearchParams,
    ) -> Vec<PathResult> {
        if pairs.is_empty() {
            return Vec::new();
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();

        for (index, &(origin, destination)) in pairs.iter().enumerate() {
            let pathfinder = Arc::clone(self);
            let cancel = Arc::clone(&cancel);
            let sender = sender.clone();
            let params = params.clone();

            self.pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pathfinder.search(origin, destination, &params, Some(&cancel))
                }));
                // The receiver is gone once the batch gave up on this search
                let _ = sender.send((index, result));
            });
        }
        drop(sender);

        let batch = &self.params.batch;
        let outcome = collect_with_timeout(
            &receiver,
            pairs.len(),
            batch.batch_timeout(pairs.len()),
            batch.harvest_grace.unsigned_abs(),
        );
        cancel.store(true, Ordering::Relaxed);

        if outcome
            .results
            .iter()
            .any(|result| matches!(result, Some(Err(_))))
        {
            warn!(
                pairs = pairs.len(),
                "Parallel path search failed, running the batch sequentially"
            );
            self.statistics.record_batch(outcome.timed_out, true);
            return pairs
                .iter()
                .map(|&(origin, destination)| self.find_path(origin, destination, params))
                .collect();
        }

        if outcome.timed_out {
            warn!(
                pairs = pairs.len(),
                missing = outcome.missing(),
                "Path batch timed out"
            );
        }
        self.statistics.record_batch(outcome.timed_out, false);

        outcome
            .results
            .into_iter()
            .zip(pairs)
            .map(|(result, &(origin, destination))| {
                let result = match result {
                    Some(Ok(result)) => result,
                    _ => PathResult::failed(
                        origin,
                        destination,
                        PathError::Timeout,
                        SearchMetrics::default(),
                    ),
                };
                self.statistics.record(&result);
                result
            })
            .collect()
    }
}

impl PathRecompute for Pathfinder {
    fn recompute(&self, origin: Point, destination: Point) -> Option<Vec<Point>> {
        // Refreshed paths land in the cache, they must be shortest ones
        let params = SearchParams {
            use_cache: false,
            heuristic_weight: 1.0,
            bidirectional: false,
            ..self.params.search.clone()
        };
        let result = self.find_path(origin, destination, &params);
        result.success().then(|| result.path.to_vec())
    }
}
