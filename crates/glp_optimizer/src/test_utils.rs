use std::sync::Arc;

use glp_routing::{
    cache::{cache_params::CacheParams, cache_statistics::CacheStatistics, path_cache::PathCache},
    grid::{grid_bounds::GridBounds, obstacle_grid::ObstacleGrid},
    point::Point,
    routing::{
        pathfinder::Pathfinder,
        pathfinder_statistics::PathfinderStatistics,
        search_params::{PathfinderParams, SearchParams},
    },
    utils::threads::Threads,
};
use jiff::{SignedDuration, Timestamp};

use crate::{
    distance::PathOracle,
    problem::{order::Order, planning_input::PlanningInput, truck::Truck, warehouse::Warehouse},
};

pub fn now() -> Timestamp {
    "2025-06-10T08:00:00Z".parse().unwrap()
}

/// Order registered at `now()` and due `hours` later.
pub fn order(id: &str, x: i32, y: i32, volume_m3: f64, hours: i64) -> Order {
    Order::new(
        id,
        Point::new(x, y),
        volume_m3,
        now(),
        SignedDuration::from_hours(hours),
    )
}

pub fn input(orders: Vec<Order>, trucks: Vec<Truck>, warehouses: Vec<Warehouse>) -> PlanningInput {
    PlanningInput::new(now(), orders, trucks, warehouses)
}

pub fn open_grid() -> Arc<ObstacleGrid> {
    Arc::new(ObstacleGrid::new(GridBounds::default()))
}

pub fn pathfinder(grid: Arc<ObstacleGrid>) -> Arc<Pathfinder> {
    let cache = Arc::new(PathCache::new(
        CacheParams::default(),
        Arc::new(CacheStatistics::default()),
    ));
    Arc::new(
        Pathfinder::new(
            PathfinderParams {
                threads: Threads::Multi(2),
                prewarm: false,
                ..PathfinderParams::default()
            },
            Some(grid),
            Some(cache),
            Arc::new(PathfinderStatistics::default()),
        )
        .unwrap(),
    )
}

pub fn oracle(grid: Arc<ObstacleGrid>) -> PathOracle {
    PathOracle::new(pathfinder(grid), SearchParams::default())
}
