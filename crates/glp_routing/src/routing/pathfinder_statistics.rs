use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::path_result::{PathError, PathResult};

#[derive(Default)]
pub struct PathfinderStatistics {
    searches: AtomicU64,
    successes: AtomicU64,
    cache_hits: AtomicU64,
    timeouts: AtomicU64,
    node_limits: AtomicU64,
    no_path: AtomicU64,
    invalid_inputs: AtomicU64,
    nodes_explored: AtomicU64,
    batches: AtomicU64,
    batch_timeouts: AtomicU64,
    batch_fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathfinderStatisticsSnapshot {
    pub searches: u64,
    pub successes: u64,
    pub cache_hits: u64,
    pub timeouts: u64,
    pub node_limits: u64,
    pub no_path: u64,
    pub invalid_inputs: u64,
    pub nodes_explored: u64,
    pub batches: u64,
    pub batch_timeouts: u64,
    pub batch_fallbacks: u64,
}

impl PathfinderStatistics {
    pub(crate) fn record(&self, result: &PathResult) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        self.nodes_explored
            .fetch_add(result.metrics.nodes_explored as u64, Ordering::Relaxed);

        if result.metrics.cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }

        let counter = match result.error {
            None => &self.successes,
            Some(PathError::Timeout) => &self.timeouts,
            Some(PathError::NodeLimitReached(_)) => &self.node_limits,
            Some(PathError::NoPathExists) => &self.no_path,
            Some(
                PathError::OriginInvalid(_)
                | PathError::DestinationInvalid(_)
                | PathError::MapUnavailable,
            ) => &self.invalid_inputs,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, timed_out: bool, fell_back: bool) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.batch_timeouts.fetch_add(1, Ordering::Relaxed);
        }
        if fell_back {
            self.batch_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> PathfinderStatisticsSnapshot {
        PathfinderStatisticsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            node_limits: self.node_limits.load(Ordering::Relaxed),
            no_path: self.no_path.load(Ordering::Relaxed),
            invalid_inputs: self.invalid_inputs.load(Ordering::Relaxed),
            nodes_explored: self.nodes_explored.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            batch_timeouts: self.batch_timeouts.load(Ordering::Relaxed),
            batch_fallbacks: self.batch_fallbacks.load(Ordering::Relaxed),
        }
    }
}
