use glp_routing::{
    grid::obstacle::{Obstacle, ObstacleId},
    point::Point,
};
use serde::{Deserialize, Serialize};

/// Live update to the road network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ObstacleChange {
    Added { obstacle: Obstacle },
    Removed { id: ObstacleId },
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleChangeOutcome {
    /// Id of the added or removed obstacle, `None` when the id was unknown
    pub obstacle: Option<ObstacleId>,
    pub invalidated_paths: usize,
}

/// Area of the cache touched by an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvalidationArea {
    Cell(Point),
    Region { center: Point, radius: u32 },
}

impl InvalidationArea {
    /// Smallest square around the obstacle cells. `None` for an obstacle
    /// without cells.
    pub(crate) fn of(obstacle: &Obstacle) -> Option<Self> {
        let cells = obstacle.cells();
        match cells.as_slice() {
            [] => None,
            [cell] => Some(InvalidationArea::Cell(*cell)),
            [first, ..] => {
                let (mut min, mut max) = (*first, *first);
                for cell in &cells {
                    min.x = min.x.min(cell.x);
                    min.y = min.y.min(cell.y);
                    max.x = max.x.max(cell.x);
                    max.y = max.y.max(cell.y);
                }
                let center = Point::new(
                    min.x + (max.x - min.x) / 2,
                    min.y + (max.y - min.y) / 2,
                );
                let radius = cells
                    .iter()
                    .map(|cell| center.chebyshev_distance(cell))
                    .max()
                    .unwrap_or(0);
                Some(InvalidationArea::Region { center, radius })
            }
        }
    }

    /// One more ring of cells. Detours around an obstacle hug its border, so
    /// a cleared obstacle invalidates the widened area.
    pub(crate) fn widened(self) -> Self {
        match self {
            InvalidationArea::Cell(center) => InvalidationArea::Region { center, radius: 1 },
            InvalidationArea::Region { center, radius } => InvalidationArea::Region {
                center,
                radius: radius.saturating_add(1),
            },
        }
    }
}
