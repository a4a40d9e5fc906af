pub mod astar;
pub mod astar_heuristic;
pub mod bidirectional_astar;
pub mod path_result;
pub mod pathfinder;
pub mod pathfinder_statistics;
mod search_direction;
pub mod search_engines;
pub mod search_params;
