use std::{sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;

use crate::point::Point;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathError {
    #[error("Origin {0} is outside the grid or blocked")]
    OriginInvalid(Point),
    #[error("Destination {0} is outside the grid or blocked")]
    DestinationInvalid(Point),
    #[error("Obstacle map is not available")]
    MapUnavailable,
    #[error("Search exceeded its time budget")]
    Timeout,
    #[error("Search explored the maximum of {0} nodes")]
    NodeLimitReached(usize),
    #[error("No path exists")]
    NoPathExists,
}

impl PathError {
    /// Resource-limit failures may succeed with relaxed limits.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, PathError::Timeout | PathError::NodeLimitReached(_))
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PathError::OriginInvalid(_) | PathError::DestinationInvalid(_) | PathError::MapUnavailable
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SearchMetrics {
    pub nodes_explored: usize,
    pub elapsed: Duration,
    /// The path came from the cache, no search was run
    pub cache_hit: bool,
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    pub origin: Point,
    pub destination: Point,
    /// Empty when the search failed
    pub path: Arc<[Point]>,
    pub error: Option<PathError>,
    pub metrics: SearchMetrics,
}

impl PathResult {
    pub fn found(origin: Point, destination: Point, path: Arc<[Point]>, metrics: SearchMetrics) -> Self {
        PathResult {
            origin,
            destination,
            path,
            error: None,
            metrics,
        }
    }

    pub fn trivial(point: Point) -> Self {
        PathResult::found(point, point, Arc::from([point]), SearchMetrics::default())
    }

    pub fn failed(origin: Point, destination: Point, error: PathError, metrics: SearchMetrics) -> Self {
        PathResult {
            origin,
            destination,
            path: Arc::from([]),
            error: Some(error),
            metrics,
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of unit steps along the path.
    pub fn grid_distance(&self) -> Option<u32> {
        if self.success() {
            Some(self.path.len().saturating_sub(1) as u32)
        } else {
            None
        }
    }
}
