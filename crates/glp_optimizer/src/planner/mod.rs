pub mod obstacle_change;
pub mod planner_params;
pub mod planning_outcome;
pub mod route_builder;
pub mod route_planner;
pub mod truck_planner;
