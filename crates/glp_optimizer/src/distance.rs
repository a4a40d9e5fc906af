use std::sync::Arc;

use glp_routing::{
    grid::obstacle_grid::ObstacleGrid,
    point::Point,
    routing::{path_result::PathResult, pathfinder::Pathfinder, search_params::SearchParams},
};

/// Grid paths and distances for the optimizer stages, backed by the pathfinder
/// and its cache.
#[derive(Clone)]
pub struct PathOracle {
    pathfinder: Arc<Pathfinder>,
    search: SearchParams,
}

impl PathOracle {
    pub fn new(pathfinder: Arc<Pathfinder>, search: SearchParams) -> Self {
        PathOracle { pathfinder, search }
    }

    pub fn pathfinder(&self) -> &Arc<Pathfinder> {
        &self.pathfinder
    }

    pub fn grid(&self) -> Option<Arc<ObstacleGrid>> {
        self.pathfinder.grid()
    }

    pub fn is_valid(&self, point: &Point) -> bool {
        self.grid().is_some_and(|grid| grid.is_valid(point))
    }

    pub fn path(&self, origin: Point, destination: Point) -> PathResult {
        self.pathfinder.find_path(origin, destination, &self.search)
    }

    pub fn paths(&self, pairs: &[(Point, Point)]) -> Vec<PathResult> {
        self.pathfinder.find_paths_parallel(pairs, &self.search)
    }

    /// Grid steps between two points, `None` when no path was found.
    pub fn grid_distance(&self, origin: Point, destination: Point) -> Option<u32> {
        self.path(origin, destination).grid_distance()
    }
}
