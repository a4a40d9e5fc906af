use std::sync::atomic::{AtomicBool, Ordering};

use glp_routing::{point::Point, timer_debug};
use tracing::debug;

use crate::{
    distance::PathOracle,
    error::RoutingError,
    fuel::fuel_model::FuelModel,
    problem::{
        optimized_route::OptimizedRoute, planning_input::PlanningInput,
        truck_assignment::TruckAssignment, warehouse::WarehouseIdx,
    },
    sequencing::delivery_sequencer::DeliverySequencer,
    validation::{return_planner::ReturnPlanner, route_validator::RouteValidator},
};

use super::{
    planner_params::PlannerParams,
    planning_outcome::{PlannedRoute, RejectedRoute, RejectionReason},
    route_builder::RouteBuilder,
};

/// Turns one truck assignment into a validated route.
pub struct TruckPlanner {
    oracle: PathOracle,
    fuel: FuelModel,
    sequencer: DeliverySequencer,
    validator: RouteValidator,
    load_at_warehouse_first: bool,
}

impl TruckPlanner {
    pub fn new(params: &PlannerParams, oracle: PathOracle) -> Self {
        let fuel = FuelModel::new(params.fuel.clone());
        TruckPlanner {
            oracle,
            sequencer: DeliverySequencer::new(params.ant_colony.clone()),
            validator: RouteValidator::new(params.validation.clone(), fuel.clone()),
            fuel,
            load_at_warehouse_first: params.load_at_warehouse_first,
        }
    }

    pub fn oracle(&self) -> &PathOracle {
        &self.oracle
    }

    pub fn plan(
        &self,
        input: &PlanningInput,
        assignment: &TruckAssignment,
    ) -> Result<PlannedRoute, RejectedRoute> {
        self.plan_cancellable(input, assignment, None)
    }

    /// Gives up with `PlanningTimeout` between phases once `cancel` is set.
    pub fn plan_cancellable(
        &self,
        input: &PlanningInput,
        assignment: &TruckAssignment,
        cancel: Option<&AtomicBool>,
    ) -> Result<PlannedRoute, RejectedRoute> {
        let reject = |reason: RejectionReason| RejectedRoute {
            truck: assignment.truck(),
            deliveries: assignment.deliveries().to_vec(),
            reason,
        };
        let routing = |error: RoutingError| reject(RejectionReason::Routing { error });

        let truck_idx = assignment.truck();
        let truck = input.truck(truck_idx);
        let check_cancelled = || {
            if cancel.is_some_and(|cancel| cancel.load(Ordering::Relaxed)) {
                debug!(truck = truck.id(), "Truck planning cancelled");
                return Err(routing(RoutingError::PlanningTimeout {
                    truck: truck.id().to_owned(),
                }));
            }
            Ok(())
        };

        if assignment.is_empty() {
            return Err(routing(RoutingError::EmptyAssignment {
                truck: truck.id().to_owned(),
            }));
        }

        let Some(start) = start_point(input, truck.position()) else {
            return Err(routing(RoutingError::NoStartPoint {
                truck: truck.id().to_owned(),
            }));
        };

        check_cancelled()?;

        let loading = self.loading_warehouse(input, start);
        let first_stop = loading.map_or(start, |idx| input.warehouse(idx).location());

        let sequenced = timer_debug!(
            "Sequencing",
            self.sequencer.sequence_cancellable(
                assignment.deliveries(),
                first_stop,
                input,
                &self.oracle,
                cancel,
            )
        );
        check_cancelled()?;

        let builder = RouteBuilder::new(input, &self.oracle, &self.fuel);
        let plan = ReturnPlanner::new(&builder)
            .plan(truck_idx, start, loading, &sequenced.deliveries)
            .map_err(routing)?;
        check_cancelled()?;

        let mut segments = plan.chain.segments.clone();
        segments.push(builder.return_segment(truck, &plan.chain, plan.warehouse));
        let route = OptimizedRoute::new(
            truck_idx,
            segments,
            self.validator.params().service_duration,
        );

        let validation = self.validator.validate(&route, input, &self.oracle);
        if !validation.is_feasible() {
            return Err(reject(RejectionReason::Validation {
                issues: validation.hard_failures().cloned().collect(),
                quality: validation.quality,
            }));
        }

        debug!(
            truck = truck.id(),
            deliveries = route.delivery_count(),
            distance_km = route.total_distance_km(),
            fuel_gal = route.total_fuel_gal(),
            decision = ?plan.decision,
            "Route planned"
        );

        Ok(PlannedRoute {
            route,
            validation,
            return_warehouse: plan.warehouse,
            return_decision: plan.decision,
            dropped: plan.dropped,
            sequencing: sequenced.method,
        })
    }

    fn loading_warehouse(&self, input: &PlanningInput, start: Point) -> Option<WarehouseIdx> {
        if !self.load_at_warehouse_first || input.warehouse_at(start).is_some() {
            return None;
        }
        input.nearest_warehouse(start)
    }
}

/// The truck's own position, else the principal warehouse, else any open one.
fn start_point(input: &PlanningInput, position: Option<Point>) -> Option<Point> {
    position.or_else(|| {
        input
            .principal_warehouse()
            .or_else(|| input.open_warehouses().next())
            .map(|idx| input.warehouse(idx).location())
    })
}

#[cfg(test)]
mod tests {
    use glp_routing::grid::obstacle::Obstacle;

    use crate::{
        problem::{
            order::OrderIdx,
            route_segment::RouteSegmentKind,
            truck::{Truck, TruckIdx},
            truck_type::TruckType,
            warehouse::{Warehouse, WarehouseStatus},
        },
        sequencing::delivery_sequencer::SequencingMethod,
        test_utils,
        validation::{return_planner::ReturnDecision, validation_result::ValidationIssue},
    };

    use super::*;

    fn assignment(truck: TruckIdx, capacity: f64, orders: &[(usize, f64)]) -> TruckAssignment {
        let mut assignment = TruckAssignment::new(truck, capacity);
        for &(order, volume) in orders {
            assert!(assignment.assign(OrderIdx::new(order), volume, 500));
        }
        assignment
    }

    fn planner(params: &PlannerParams) -> TruckPlanner {
        TruckPlanner::new(params, test_utils::oracle(test_utils::open_grid()))
    }

    fn seeded_params() -> PlannerParams {
        let mut params = PlannerParams::default();
        params.ant_colony.seed = Some(11);
        params
    }

    #[test]
    fn test_route_starts_at_principal_and_returns() {
        let input = test_utils::input(
            vec![
                test_utils::order("A", 10, 5, 3.0, 8),
                test_utils::order("B", 20, 5, 3.0, 8),
                test_utils::order("C", 30, 5, 3.0, 8),
            ],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![
                Warehouse::new("north", Point::new(40, 40), 50.0),
                Warehouse::new("main", Point::new(0, 0), 160.0).principal(),
            ],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0), (1, 3.0), (2, 3.0)]);

        let planned = planner(&seeded_params()).plan(&input, &assignment).unwrap();

        let segments = planned.route.segments();
        assert_eq!(segments[0].origin, Point::new(0, 0));
        assert!(planned.route.is_chained());
        assert_eq!(planned.route.delivery_count(), 3);
        assert!(segments.last().unwrap().is_return());
        assert_eq!(planned.return_decision, ReturnDecision::Optimal);
        assert_eq!(planned.sequencing, SequencingMethod::AntColony);
        assert!(planned.validation.is_feasible());
        // Sweeping east is the shortest open path
        let order: Vec<usize> = segments
            .iter()
            .filter_map(|segment| segment.delivery())
            .map(|(order, _)| order.get())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_loads_at_warehouse_first() {
        let input = test_utils::input(
            vec![test_utils::order("A", 10, 5, 3.0, 8)],
            vec![Truck::new("TC01", TruckType::TC).with_position(Point::new(30, 30))],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0)]);
        let params = PlannerParams {
            load_at_warehouse_first: true,
            ..seeded_params()
        };

        let planned = planner(&params).plan(&input, &assignment).unwrap();

        let first = &planned.route.segments()[0];
        assert_eq!(first.origin, Point::new(30, 30));
        assert_eq!(first.destination, Point::new(0, 0));
        assert!(matches!(first.kind, RouteSegmentKind::Move { warehouse: Some(_) }));
        assert_eq!(first.weight_before_ton, TruckType::TC.tare_weight_ton());
    }

    #[test]
    fn test_empty_assignment_is_rejected() {
        let input = test_utils::input(
            vec![],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );

        let rejected = planner(&seeded_params())
            .plan(&input, &TruckAssignment::new(TruckIdx::new(0), 10.0))
            .unwrap_err();

        assert!(matches!(
            rejected.reason,
            RejectionReason::Routing {
                error: RoutingError::EmptyAssignment { .. }
            }
        ));
    }

    #[test]
    fn test_cancelled_planning_times_out() {
        let input = test_utils::input(
            vec![
                test_utils::order("A", 10, 5, 3.0, 8),
                test_utils::order("B", 20, 5, 3.0, 8),
                test_utils::order("C", 30, 5, 3.0, 8),
            ],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0), (1, 3.0), (2, 3.0)]);
        let cancel = AtomicBool::new(true);

        let rejected = planner(&seeded_params())
            .plan_cancellable(&input, &assignment, Some(&cancel))
            .unwrap_err();

        assert!(matches!(
            rejected.reason,
            RejectionReason::Routing {
                error: RoutingError::PlanningTimeout { .. }
            }
        ));
        assert_eq!(rejected.deliveries.len(), 3);
    }

    #[test]
    fn test_no_start_point() {
        let input = test_utils::input(
            vec![test_utils::order("A", 10, 5, 3.0, 8)],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).with_status(WarehouseStatus::Closed)],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0)]);

        let rejected = planner(&seeded_params()).plan(&input, &assignment).unwrap_err();

        assert!(rejected.reason.is_fatal());
        assert_eq!(rejected.deliveries.len(), 1);
    }

    #[test]
    fn test_walled_delivery_is_dropped() {
        let grid = test_utils::open_grid();
        grid.add_obstacle(Obstacle::Polygon {
            vertices: vec![
                Point::new(18, 8),
                Point::new(22, 8),
                Point::new(22, 12),
                Point::new(18, 12),
                Point::new(18, 8),
            ],
        });
        let input = test_utils::input(
            vec![test_utils::order("walled", 20, 10, 3.0, 8)],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0)]);
        let planner = TruckPlanner::new(&seeded_params(), test_utils::oracle(grid));

        let planned = planner.plan(&input, &assignment).unwrap();

        assert_eq!(planned.return_decision, ReturnDecision::Emergency);
        assert_eq!(planned.dropped.len(), 1);
        assert_eq!(planned.route.delivery_count(), 0);
    }

    #[test]
    fn test_missed_deadline_is_rejected() {
        // 60 km at 50 km/h arrives 12 minutes late
        let input = test_utils::input(
            vec![test_utils::order("far", 60, 0, 3.0, 1)],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );
        let assignment = assignment(TruckIdx::new(0), 10.0, &[(0, 3.0)]);

        let rejected = planner(&seeded_params()).plan(&input, &assignment).unwrap_err();

        let RejectionReason::Validation { issues, .. } = rejected.reason else {
            panic!("expected a validation rejection");
        };
        assert!(
            issues
                .iter()
                .any(|issue| matches!(issue, ValidationIssue::DeadlineMissed { .. }))
        );
        assert!(!RejectionReason::Validation {
            issues,
            quality: Default::default()
        }
        .is_fatal());
    }
}
