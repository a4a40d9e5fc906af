use glp_routing::{
    cache::cache_params::CacheParams, routing::search_params::PathfinderParams,
    utils::threads::Threads,
};
use jiff::SignedDuration;
use serde::Deserialize;

use crate::{
    fuel::fuel_params::FuelParams, packing::packing_params::PackingParams,
    sequencing::ant_colony_params::AntColonyParams,
    validation::validation_params::ValidationParams,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PlannerParams {
    /// Planner pool, one truck per task
    pub threads: Threads,
    pub parallel_trucks: bool,
    /// How long a planning run waits for all trucks
    pub truck_timeout: SignedDuration,
    /// Trucks away from a warehouse drive to the nearest one to load first
    pub load_at_warehouse_first: bool,
    pub prewarm: bool,

    pub pathfinder: PathfinderParams,
    pub cache: CacheParams,
    pub packing: PackingParams,
    pub ant_colony: AntColonyParams,
    pub fuel: FuelParams,
    pub validation: ValidationParams,
}

impl Default for PlannerParams {
    fn default() -> Self {
        PlannerParams {
            threads: Threads::Auto,
            parallel_trucks: true,
            truck_timeout: SignedDuration::from_secs(30),
            load_at_warehouse_first: false,
            prewarm: true,
            pathfinder: PathfinderParams::default(),
            cache: CacheParams::default(),
            packing: PackingParams::default(),
            ant_colony: AntColonyParams::default(),
            fuel: FuelParams::default(),
            validation: ValidationParams::default(),
        }
    }
}
