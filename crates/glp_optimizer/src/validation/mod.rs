pub mod return_planner;
pub mod route_validator;
pub mod validation_params;
pub mod validation_result;
