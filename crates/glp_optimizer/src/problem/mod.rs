pub mod delivery;
pub mod optimized_route;
pub mod order;
pub mod planning_input;
pub mod route_segment;
pub mod truck;
pub mod truck_assignment;
pub mod truck_type;
pub mod warehouse;
