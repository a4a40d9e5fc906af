use fxhash::FxHashMap;
use glp_routing::point::Point;
use tracing::debug;

use crate::distance::PathOracle;

/// Square matrix of grid distances between route nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_fn(size: usize, distance: impl Fn(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(size * size);
        for from in 0..size {
            for to in 0..size {
                values.push(if from == to { 0.0 } else { distance(from, to) });
            }
        }
        DistanceMatrix { size, values }
    }

    /// Grid distances between every pair of `points`, one pathfinder query per
    /// distinct unordered pair. Pairs without a path fall back to the
    /// Manhattan distance.
    pub fn from_paths(points: &[Point], oracle: &PathOracle) -> Self {
        let mut pairs: Vec<(Point, Point)> = Vec::new();
        let mut memo: FxHashMap<(Point, Point), f64> = FxHashMap::default();

        for (i, &a) in points.iter().enumerate() {
            for &b in &points[i + 1..] {
                let key = pair_key(a, b);
                if a != b && !memo.contains_key(&key) {
                    memo.insert(key, f64::NAN);
                    pairs.push(key);
                }
            }
        }

        let mut fallbacks = 0;
        for (result, key) in oracle.paths(&pairs).into_iter().zip(&pairs) {
            let distance = match result.grid_distance() {
                Some(distance) => distance,
                None => {
                    fallbacks += 1;
                    key.0.manhattan_distance(&key.1)
                }
            };
            memo.insert(*key, f64::from(distance));
        }

        if fallbacks > 0 {
            debug!(
                fallbacks,
                pairs = pairs.len(),
                "Using Manhattan distance for pairs without a path"
            );
        }

        DistanceMatrix::from_fn(points.len(), |from, to| {
            let (a, b) = (points[from], points[to]);
            memo.get(&pair_key(a, b))
                .copied()
                .unwrap_or_else(|| f64::from(a.manhattan_distance(&b)))
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from * self.size + to]
    }

    /// Length of the open path visiting `nodes` in order.
    pub fn path_length(&self, nodes: &[usize]) -> f64 {
        nodes
            .windows(2)
            .map(|pair| self.get(pair[0], pair[1]))
            .sum()
    }
}

fn pair_key(a: Point, b: Point) -> (Point, Point) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use glp_routing::grid::obstacle::Obstacle;

    use crate::test_utils;

    use super::*;

    #[test]
    fn test_from_paths_uses_grid_distance() {
        let grid = test_utils::open_grid();
        grid.add_obstacle(Obstacle::VerticalLine { x: 5, y1: 0, y2: 20 });
        let oracle = test_utils::oracle(grid);

        let points = [Point::new(0, 10), Point::new(10, 10), Point::new(0, 10)];
        let matrix = DistanceMatrix::from_paths(&points, &oracle);

        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.get(0, 0), 0.0);
        assert!(matrix.get(0, 1) > 10.0);
        assert_eq!(matrix.get(0, 1), matrix.get(1, 0));
        assert_eq!(matrix.get(0, 2), 0.0);
        // one distinct pair, one search
        assert_eq!(oracle.pathfinder().statistics().snapshot().searches, 1);
    }

    #[test]
    fn test_unreachable_pair_falls_back_to_manhattan() {
        let grid = test_utils::open_grid();
        grid.add_obstacle(Obstacle::Polygon {
            vertices: vec![
                Point::new(8, 8),
                Point::new(12, 8),
                Point::new(12, 12),
                Point::new(8, 12),
                Point::new(8, 8),
            ],
        });
        let oracle = test_utils::oracle(grid);

        let matrix = DistanceMatrix::from_paths(&[Point::new(0, 0), Point::new(10, 10)], &oracle);
        assert_eq!(matrix.get(0, 1), 20.0);
    }

    #[test]
    fn test_path_length() {
        let points = [Point::new(0, 0), Point::new(3, 0), Point::new(3, 4)];
        let matrix = DistanceMatrix::from_fn(3, |a, b| {
            f64::from(points[a].manhattan_distance(&points[b]))
        });
        assert_eq!(matrix.path_length(&[0, 1, 2]), 7.0);
        assert_eq!(matrix.path_length(&[0, 2, 1]), 10.0);
        assert_eq!(matrix.path_length(&[0]), 0.0);
    }
}
