use std::{sync::Arc, time::Duration};

use glp_routing::{
    cache::cache_statistics::CacheStatisticsSnapshot,
    routing::pathfinder_statistics::PathfinderStatisticsSnapshot,
};
use serde::Serialize;

use crate::{
    error::RoutingError,
    packing::{packing_result::UnassignedOrder, packing_strategy::PackingStrategy},
    problem::{
        delivery::Delivery,
        optimized_route::{OptimizedRoute, RouteStateError},
        planning_input::PlanningInput,
        truck::TruckIdx,
        warehouse::WarehouseIdx,
    },
    sequencing::delivery_sequencer::SequencingMethod,
    validation::{
        return_planner::ReturnDecision,
        validation_result::{QualityScore, ValidationIssue, ValidationResult},
    },
};

#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub route: OptimizedRoute,
    pub validation: ValidationResult,
    pub return_warehouse: WarehouseIdx,
    pub return_decision: ReturnDecision,
    /// Deliveries given up to get the truck back to a warehouse
    pub dropped: Vec<Delivery>,
    pub sequencing: SequencingMethod,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    Routing { error: RoutingError },
    Validation {
        issues: Vec<ValidationIssue>,
        quality: QualityScore,
    },
}

impl RejectionReason {
    pub fn is_fatal(&self) -> bool {
        match self {
            RejectionReason::Routing { error } => error.is_fatal(),
            RejectionReason::Validation { .. } => false,
        }
    }
}

/// A truck that had deliveries but did not get a route.
#[derive(Debug, Clone)]
pub struct RejectedRoute {
    pub truck: TruckIdx,
    pub deliveries: Vec<Delivery>,
    pub reason: RejectionReason,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct PlanningStatistics {
    pub strategy: PackingStrategy,
    pub trucks_planned: usize,
    pub routes: usize,
    pub rejected: usize,
    pub timed_out: bool,
    pub elapsed: Duration,
    pub pathfinder: PathfinderStatisticsSnapshot,
    pub cache: CacheStatisticsSnapshot,
}

/// Everything one planning run produced, including what it could not do.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    pub input: Arc<PlanningInput>,
    pub routes: Vec<PlannedRoute>,
    pub rejected: Vec<RejectedRoute>,
    pub unassigned: Vec<UnassignedOrder>,
    pub statistics: PlanningStatistics,
}

impl PlanningOutcome {
    pub fn requires_intervention(&self) -> bool {
        self.rejected.iter().any(|rejected| rejected.reason.is_fatal())
            || self
                .routes
                .iter()
                .any(|planned| planned.validation.requires_intervention)
    }

    pub fn route_for(&self, truck: TruckIdx) -> Option<&PlannedRoute> {
        self.routes
            .iter()
            .find(|planned| planned.route.truck() == truck)
    }

    pub fn dropped_deliveries(&self) -> impl Iterator<Item = &Delivery> {
        self.routes.iter().flat_map(|planned| planned.dropped.iter())
    }

    /// Starts every planned route that does not need an operator. Routes
    /// flagged for intervention stay planned. Returns the number started.
    pub fn dispatch(&mut self) -> usize {
        let mut started = 0;
        for planned in &mut self.routes {
            if planned.validation.requires_intervention {
                continue;
            }
            if planned.route.start().is_ok() {
                started += 1;
            }
        }
        started
    }

    /// Marks the truck's route as driven. Returns `Ok(false)` when the truck
    /// has no route in this run.
    pub fn complete(&mut self, truck: TruckIdx) -> Result<bool, RouteStateError> {
        match self
            .routes
            .iter_mut()
            .find(|planned| planned.route.truck() == truck)
        {
            Some(planned) => planned.route.complete().map(|_| true),
            None => Ok(false),
        }
    }
}
