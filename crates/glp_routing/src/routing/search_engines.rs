use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use crate::{grid::obstacle_grid::ObstacleGrid, point::Point};

use super::{
    astar::AStar, astar_heuristic::AStarHeuristic, bidirectional_astar::BidirectionalAStar,
    path_result::PathError,
};

/// The clock is only read every `TIME_CHECK_INTERVAL` expanded nodes.
const TIME_CHECK_INTERVAL: usize = 64;

pub struct SearchLimits<'a> {
    pub max_nodes: usize,
    pub deadline: Instant,
    /// Set by the batch API when the whole batch timed out
    pub cancel: Option<&'a AtomicBool>,
}

impl SearchLimits<'_> {
    pub fn exceeded(&self, nodes_explored: usize) -> Option<PathError> {
        if nodes_explored >= self.max_nodes {
            return Some(PathError::NodeLimitReached(self.max_nodes));
        }

        if nodes_explored % TIME_CHECK_INTERVAL == 1 {
            if Instant::now() >= self.deadline {
                return Some(PathError::Timeout);
            }
            if self
                .cancel
                .is_some_and(|cancel| cancel.load(Ordering::Relaxed))
            {
                return Some(PathError::Timeout);
            }
        }

        None
    }
}

pub struct SearchOutcome {
    pub path: Result<Vec<Point>, PathError>,
    pub nodes_explored: usize,
}

pub trait GridSearch {
    fn calc_path<H: AStarHeuristic>(
        &mut self,
        grid: &ObstacleGrid,
        origin: Point,
        destination: Point,
        heuristic: &H,
        limits: &SearchLimits,
    ) -> SearchOutcome;
}

/// Reusable search state, one per worker thread. Buffers are cleared, not
/// freed, between searches so batch runs do not churn allocations.
#[derive(Default)]
pub struct SearchEngines {
    pub astar: AStar,
    pub bidirectional: BidirectionalAStar,
}
