use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fxhash::FxHashMap;

use crate::{grid::obstacle_grid::ObstacleGrid, point::Point};

use super::{
    astar_heuristic::AStarHeuristic,
    path_result::PathError,
    search_engines::{GridSearch, SearchLimits, SearchOutcome},
};

/// https://en.wikipedia.org/wiki/A*_search_algorithm

#[derive(Copy, Clone, Debug)]
pub(crate) struct HeapItem {
    pub point: Point,

    /// g_score is the number of unit steps from the search start to `point`
    pub g_score: u32,

    /// f_score = g_score + h_score
    pub f_score: f64,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &HeapItem) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &HeapItem) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flip weight to make this a min-heap
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.g_score.cmp(&self.g_score))
            .then_with(|| self.point.cmp(&other.point))
    }
}

pub(crate) struct NodeData {
    pub settled: bool,
    pub g_score: u32,
    pub parent: Option<Point>,
}

impl NodeData {
    fn new() -> Self {
        NodeData {
            settled: false,
            g_score: u32::MAX,
            parent: None,
        }
    }
}

/// Walks parent links from `from` back to the search root. The returned path
/// starts at `from`.
pub(crate) fn walk_parents(data: &FxHashMap<Point, NodeData>, from: Point) -> Vec<Point> {
    let mut path = Vec::with_capacity(32);
    let mut current = Some(from);
    while let Some(point) = current {
        path.push(point);
        current = data.get(&point).and_then(|node| node.parent);
    }
    path
}

#[derive(Default)]
pub struct AStar {
    heap: BinaryHeap<HeapItem>,
    data: FxHashMap<Point, NodeData>,
}

impl AStar {
    fn init(&mut self, origin: Point, h_score: f64) {
        self.heap.clear();
        self.data.clear();
        self.heap.push(HeapItem {
            point: origin,
            g_score: 0,
            f_score: h_score,
        });
        self.update_node_data(origin, 0, None);
    }

    fn update_node_data(&mut self, point: Point, g_score: u32, parent: Option<Point>) {
        let data = self.data.entry(point).or_insert_with(NodeData::new);
        data.settled = false;
        data.g_score = g_score;
        data.parent = parent;
    }

    #[inline(always)]
    fn is_settled(&self, point: &Point) -> bool {
        self.data.get(point).is_some_and(|data| data.settled)
    }

    #[inline(always)]
    fn current_shortest_weight(&self, point: &Point) -> u32 {
        self.data.get(point).map_or(u32::MAX, |data| data.g_score)
    }

    fn set_settled(&mut self, point: &Point) {
        if let Some(data) = self.data.get_mut(point) {
            data.settled = true;
        }
    }

    fn build_path(&self, destination: Point) -> Vec<Point> {
        let mut path = walk_parents(&self.data, destination);
        path.reverse();
        path
    }
}

impl GridSearch for AStar {
    fn calc_path<H: AStarHeuristic>(
        &mut self,
        grid: &ObstacleGrid,
        origin: Point,
        destination: Point,
        heuristic: &H,
        limits: &SearchLimits,
    ) -> SearchOutcome {
        self.init(origin, heuristic.estimate(&origin, &destination));

        let mut nodes_explored = 0;

        while let Some(HeapItem { point, g_score, .. }) = self.heap.pop() {
            // Node is already settled, skip
            if self.is_settled(&point) {
                continue;
            }

            // The weight is bigger than the current shortest weight, skip
            if g_score > self.current_shortest_weight(&point) {
                continue;
            }

            self.set_settled(&point);
            nodes_explored += 1;

            if point == destination {
                return SearchOutcome {
                    path: Ok(self.build_path(destination)),
                    nodes_explored,
                };
            }

            if let Some(error) = limits.exceeded(nodes_explored) {
                return SearchOutcome {
                    path: Err(error),
                    nodes_explored,
                };
            }

            for neighbor in grid.neighbors(&point) {
                if self.is_settled(&neighbor) {
                    continue;
                }

                let next_weight = g_score + 1;
                if next_weight < self.current_shortest_weight(&neighbor) {
                    self.update_node_data(neighbor, next_weight, Some(point));
                    self.heap.push(HeapItem {
                        point: neighbor,
                        g_score: next_weight,
                        f_score: next_weight as f64 + heuristic.estimate(&neighbor, &destination),
                    });
                }
            }
        }

        SearchOutcome {
            path: Err(PathError::NoPathExists),
            nodes_explored,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::{
        grid::{grid_bounds::GridBounds, obstacle::Obstacle},
        routing::astar_heuristic::WeightedManhattan,
    };

    use super::*;

    fn limits(max_nodes: usize) -> SearchLimits<'static> {
        SearchLimits {
            max_nodes,
            deadline: Instant::now() + Duration::from_secs(10),
            cancel: None,
        }
    }

    fn assert_connected(path: &[Point], origin: Point, destination: Point) {
        assert_eq!(path.first(), Some(&origin));
        assert_eq!(path.last(), Some(&destination));
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_open_grid_shortest_path() {
        let grid = ObstacleGrid::new(GridBounds::with_size(100, 100));
        let mut astar = AStar::default();

        let outcome = astar.calc_path(
            &grid,
            Point::new(0, 0),
            Point::new(10, 10),
            &WeightedManhattan::default(),
            &limits(100_000),
        );

        let path = outcome.path.unwrap();
        assert_eq!(path.len(), 21);
        assert_connected(&path, Point::new(0, 0), Point::new(10, 10));
    }

    #[test]
    fn test_detours_around_wall() {
        let grid = ObstacleGrid::new(GridBounds::with_size(100, 100));
        grid.add_obstacle(Obstacle::VerticalLine { x: 5, y1: 0, y2: 20 });
        let mut astar = AStar::default();

        let outcome = astar.calc_path(
            &grid,
            Point::new(0, 10),
            Point::new(10, 10),
            &WeightedManhattan::default(),
            &limits(100_000),
        );

        let path = outcome.path.unwrap();
        assert_connected(&path, Point::new(0, 10), Point::new(10, 10));
        assert!(path.iter().all(|p| grid.is_valid(p)));
        // Up to y = 21, across, and back down
        assert_eq!(path.len() - 1, 10 + 2 * 11);
    }

    #[test]
    fn test_enclosed_destination() {
        let grid = ObstacleGrid::new(GridBounds::with_size(20, 20));
        grid.add_obstacle(Obstacle::Polygon {
            vertices: vec![
                Point::new(8, 8),
                Point::new(12, 8),
                Point::new(12, 12),
                Point::new(8, 12),
                Point::new(8, 8),
            ],
        });
        let mut astar = AStar::default();

        let outcome = astar.calc_path(
            &grid,
            Point::new(0, 0),
            Point::new(10, 10),
            &WeightedManhattan::default(),
            &limits(100_000),
        );

        assert_eq!(outcome.path, Err(PathError::NoPathExists));
    }

    #[test]
    fn test_node_limit() {
        let grid = ObstacleGrid::new(GridBounds::with_size(100, 100));
        let mut astar = AStar::default();

        let outcome = astar.calc_path(
            &grid,
            Point::new(0, 0),
            Point::new(50, 50),
            &WeightedManhattan::default(),
            &limits(10),
        );

        assert_eq!(outcome.path, Err(PathError::NodeLimitReached(10)));
        assert_eq!(outcome.nodes_explored, 10);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let grid = ObstacleGrid::new(GridBounds::with_size(100, 100));
        let mut astar = AStar::default();

        let outcome = astar.calc_path(
            &grid,
            Point::new(0, 0),
            Point::new(50, 50),
            &WeightedManhattan::default(),
            &SearchLimits {
                max_nodes: 100_000,
                deadline: Instant::now(),
                cancel: None,
            },
        );

        assert_eq!(outcome.path, Err(PathError::Timeout));
    }

    #[test]
    fn test_engine_reuse_between_searches() {
        let grid = ObstacleGrid::new(GridBounds::with_size(30, 30));
        let mut astar = AStar::default();
        let heuristic = WeightedManhattan::default();

        let first = astar
            .calc_path(&grid, Point::new(0, 0), Point::new(5, 0), &heuristic, &limits(1000))
            .path
            .unwrap();
        let second = astar
            .calc_path(&grid, Point::new(20, 20), Point::new(20, 25), &heuristic, &limits(1000))
            .path
            .unwrap();

        assert_eq!(first.len(), 6);
        assert_connected(&second, Point::new(20, 20), Point::new(20, 25));
        assert_eq!(second.len(), 6);
    }
}
