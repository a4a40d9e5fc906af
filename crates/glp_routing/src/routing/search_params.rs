use jiff::SignedDuration;
use serde::Deserialize;

use crate::utils::threads::Threads;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub max_nodes: usize,
    pub time_budget: SignedDuration,
    pub heuristic_weight: f64,
    pub use_cache: bool,
    pub bidirectional: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            max_nodes: 100_000,
            time_budget: SignedDuration::from_secs(2),
            heuristic_weight: 1.0,
            use_cache: true,
            bidirectional: false,
        }
    }
}

impl SearchParams {
    /// Weights above 1 are accepted as a greedy mode; anything that is not a
    /// positive finite number falls back to the admissible 1.0.
    pub fn effective_heuristic_weight(&self) -> f64 {
        if self.heuristic_weight.is_finite() && self.heuristic_weight > 0.0 {
            self.heuristic_weight
        } else {
            1.0
        }
    }

    /// Only plain A* with an admissible heuristic guarantees a shortest path.
    /// Paths from other configurations are not shared through the cache.
    pub fn finds_shortest(&self) -> bool {
        !self.bidirectional && self.effective_heuristic_weight() <= 1.0
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BatchParams {
    /// Global batch timeout is `per_pair_timeout * pairs`, never below `timeout_floor`
    pub per_pair_timeout: SignedDuration,
    pub timeout_floor: SignedDuration,
    /// How long to wait for each already-finished search after the batch timed out
    pub harvest_grace: SignedDuration,
}

impl Default for BatchParams {
    fn default() -> Self {
        BatchParams {
            per_pair_timeout: SignedDuration::from_millis(250),
            timeout_floor: SignedDuration::from_secs(2),
            harvest_grace: SignedDuration::from_millis(20),
        }
    }
}

impl BatchParams {
    pub fn batch_timeout(&self, pairs: usize) -> std::time::Duration {
        let per_pair = self.per_pair_timeout.unsigned_abs();
        let scaled = per_pair.saturating_mul(pairs.min(u32::MAX as usize) as u32);
        scaled.max(self.timeout_floor.unsigned_abs())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PathfinderParams {
    pub threads: Threads,
    pub search: SearchParams,
    pub batch: BatchParams,
    /// Run a dummy search on every worker thread at startup
    pub prewarm: bool,
}

impl Default for PathfinderParams {
    fn default() -> Self {
        PathfinderParams {
            threads: Threads::Auto,
            search: SearchParams::default(),
            batch: BatchParams::default(),
            prewarm: true,
        }
    }
}
