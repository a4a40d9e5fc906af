use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::point::Point;

use super::rasterize::{chain_cells, segment_cells};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u64);

impl ObstacleId {
    pub const fn new(id: u64) -> Self {
        ObstacleId(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Obstacle {
    Point {
        at: Point,
    },
    HorizontalLine {
        y: i32,
        x1: i32,
        x2: i32,
    },
    VerticalLine {
        x: i32,
        y1: i32,
        y2: i32,
    },
    /// Blocked street chain through consecutive vertices.
    Polygon {
        vertices: Vec<Point>,
    },
    /// Polygon that only blocks during `[start, end)`. A block with a missing
    /// bound is never active.
    TemporalBlock {
        vertices: Vec<Point>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    },
}

impl Obstacle {
    pub fn is_temporal(&self) -> bool {
        matches!(self, Obstacle::TemporalBlock { .. })
    }

    pub fn is_active(&self, now: Option<Timestamp>) -> bool {
        match self {
            Obstacle::TemporalBlock { start, end, .. } => match (start, end, now) {
                (Some(start), Some(end), Some(now)) => *start <= now && now < *end,
                _ => false,
            },
            _ => true,
        }
    }

    /// Cells covered by the obstacle, ignoring whether it is currently active.
    pub fn cells(&self) -> Vec<Point> {
        match self {
            Obstacle::Point { at } => vec![*at],
            Obstacle::HorizontalLine { y, x1, x2 } => {
                segment_cells(Point::new(*x1, *y), Point::new(*x2, *y))
            }
            Obstacle::VerticalLine { x, y1, y2 } => {
                segment_cells(Point::new(*x, *y1), Point::new(*x, *y2))
            }
            Obstacle::Polygon { vertices } | Obstacle::TemporalBlock { vertices, .. } => {
                chain_cells(vertices)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_temporal_block_activity() {
        let block = Obstacle::TemporalBlock {
            vertices: vec![Point::new(0, 0), Point::new(0, 5)],
            start: Some(ts("2025-01-01T08:00:00Z")),
            end: Some(ts("2025-01-01T10:00:00Z")),
        };

        assert!(!block.is_active(Some(ts("2025-01-01T07:59:59Z"))));
        assert!(block.is_active(Some(ts("2025-01-01T08:00:00Z"))));
        assert!(block.is_active(Some(ts("2025-01-01T09:59:59Z"))));
        assert!(!block.is_active(Some(ts("2025-01-01T10:00:00Z"))));
        assert!(!block.is_active(None));
    }

    #[test]
    fn test_temporal_block_without_bounds_is_inactive() {
        let block = Obstacle::TemporalBlock {
            vertices: vec![Point::new(0, 0)],
            start: Some(ts("2025-01-01T08:00:00Z")),
            end: None,
        };
        assert!(!block.is_active(Some(ts("2025-01-01T09:00:00Z"))));
    }

    #[test]
    fn test_line_cells() {
        let line = Obstacle::VerticalLine { x: 5, y1: 0, y2: 20 };
        let cells = line.cells();
        assert_eq!(cells.len(), 21);
        assert!(cells.iter().all(|c| c.x == 5));
    }

    #[test]
    fn test_deserialize_tagged() {
        let json = r#"{"type":"horizontal_line","y":3,"x1":0,"x2":4}"#;
        let obstacle: Obstacle = serde_json::from_str(json).unwrap();
        assert_eq!(obstacle, Obstacle::HorizontalLine { y: 3, x1: 0, x2: 4 });
    }
}
