use glp_routing::point::Point;
use serde::Serialize;
use thiserror::Error;

use crate::fuel::warehouse_selection::WarehouseOption;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequencingError {
    #[error("Invalid ant colony parameter `{0}`")]
    InvalidParameter(&'static str),
    #[error("Distance matrix is empty")]
    EmptyMatrix,
    #[error("Distance from node {from} to node {to} is not a finite non-negative number")]
    InvalidDistance { from: usize, to: usize },
    #[error("No ant completed a tour")]
    NoTourConstructed,
}

/// Failures that prevent a truck from getting a route at all.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingError {
    #[error(
        "Truck {truck} cannot reach any warehouse from {position} even empty with {fuel_available_gal:.2} gal"
    )]
    NoWarehouseReachable {
        truck: String,
        position: Point,
        fuel_available_gal: f64,
        options: Vec<WarehouseOption>,
    },
    #[error("Planning for truck {truck} did not finish in time")]
    PlanningTimeout { truck: String },
    #[error("Truck {truck} has no deliveries")]
    EmptyAssignment { truck: String },
    #[error("Truck {truck} has no position and there is no open warehouse to start from")]
    NoStartPoint { truck: String },
    #[error("Planning for truck {truck} crashed")]
    PlanningFailed { truck: String },
}

impl RoutingError {
    /// Fatal errors need an operator, the others may go away on the next run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RoutingError::NoWarehouseReachable { .. } | RoutingError::NoStartPoint { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("Order `{0}` must have a positive finite volume")]
    InvalidVolume(String),
    #[error("Order `{0}` has an invalid deadline")]
    InvalidDeadline(String),
    #[error("Warehouse `{0}` must have a non-negative capacity")]
    InvalidWarehouseCapacity(String),
    #[error("Truck `{0}` has an invalid fuel level")]
    InvalidFuel(String),
}

#[derive(Error, Debug)]
pub enum PlannerBuildError {
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to start cache refresh workers: {0}")]
    Refresher(#[from] std::io::Error),
    #[error("Invalid fuel parameter `{0}`")]
    InvalidParameter(&'static str),
}
