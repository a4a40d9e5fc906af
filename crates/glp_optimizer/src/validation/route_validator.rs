use jiff::SignedDuration;
use tracing::debug;

use crate::{
    distance::PathOracle,
    fuel::fuel_model::FuelModel,
    problem::{optimized_route::OptimizedRoute, planning_input::PlanningInput, truck::Truck},
};

use super::{
    validation_params::ValidationParams,
    validation_result::{FuelMarginTier, QualityScore, ValidationIssue, ValidationResult},
};

struct FuelCheck {
    issues: Vec<ValidationIssue>,
    remaining_gal: f64,
    tier: FuelMarginTier,
    failed: bool,
}

struct RatioCheck {
    issues: Vec<ValidationIssue>,
    /// Share of the checked items that passed
    ratio: f64,
}

/// Certifies that a route can be driven as planned.
pub struct RouteValidator {
    params: ValidationParams,
    fuel: FuelModel,
}

impl RouteValidator {
    pub fn new(params: ValidationParams, fuel: FuelModel) -> Self {
        RouteValidator { params, fuel }
    }

    pub fn params(&self) -> &ValidationParams {
        &self.params
    }

    pub fn validate(
        &self,
        route: &OptimizedRoute,
        input: &PlanningInput,
        oracle: &PathOracle,
    ) -> ValidationResult {
        let truck = input.truck(route.truck());

        let fuel = self.check_fuel(route, truck);
        let weight = self.check_weight(route, truck);
        let accessibility = self.check_accessibility(route, oracle);
        let time = self.check_time(route, input);
        let ordering = self.check_priority_order(route, input);

        let delivered: f64 = route
            .segments()
            .iter()
            .filter_map(|segment| segment.delivery())
            .map(|(_, volume)| volume)
            .sum();
        let utilization = if truck.capacity_m3() > 0.0 {
            delivered / truck.capacity_m3()
        } else {
            0.0
        };
        let fuel_margin = if fuel.failed || truck.fuel_tank_capacity_gal() <= 0.0 {
            0.0
        } else {
            fuel.remaining_gal / truck.fuel_tank_capacity_gal()
        };

        let quality = QualityScore::new(
            fuel_margin,
            utilization,
            ordering.ratio,
            time.ratio,
            accessibility.ratio,
        );

        let mut issues = fuel.issues;
        issues.extend(weight);
        issues.extend(accessibility.issues);
        issues.extend(time.issues);
        issues.extend(ordering.issues);
        if quality.total < self.params.min_quality_score {
            issues.push(ValidationIssue::LowQualityScore {
                score: quality.total,
                minimum: self.params.min_quality_score,
            });
        }

        let mut result = ValidationResult {
            issues,
            quality,
            fuel_tier: fuel.tier,
            fuel_remaining_gal: fuel.remaining_gal,
            requires_intervention: false,
        };
        result.requires_intervention =
            !result.is_feasible() || quality.total < self.params.min_quality_score;

        debug!(
            truck = truck.id(),
            score = quality.total,
            issues = result.issues.len(),
            feasible = result.is_feasible(),
            "Route validated"
        );

        result
    }

    /// Replays the route and stops at the first segment the truck cannot
    /// finish with the fuel on board.
    fn check_fuel(&self, route: &OptimizedRoute, truck: &Truck) -> FuelCheck {
        let tank = truck.fuel_tank_capacity_gal();
        let mut fuel = truck.fuel_available_gal();

        for (index, segment) in route.segments().iter().enumerate() {
            let required = self.fuel.segment_consumption(
                segment.distance_km,
                segment.weight_before_ton,
                segment.weight_after_ton,
            );
            if required > fuel + 1e-9 {
                return FuelCheck {
                    issues: vec![ValidationIssue::InsufficientFuel {
                        segment: index,
                        required_gal: required,
                        available_gal: fuel,
                        shortfall_gal: required - fuel,
                    }],
                    remaining_gal: fuel - required,
                    tier: FuelMarginTier::Emergency,
                    failed: true,
                };
            }
            fuel -= required;
        }

        let remaining_fraction = if tank > 0.0 { fuel / tank } else { 0.0 };
        let tier =
            FuelMarginTier::from_remaining_fraction(remaining_fraction, self.params.low_fuel_threshold);
        let issues = if tier == FuelMarginTier::Normal {
            Vec::new()
        } else {
            vec![ValidationIssue::LowFuelMargin {
                tier,
                remaining_fraction,
            }]
        };

        FuelCheck {
            issues,
            remaining_gal: fuel,
            tier,
            failed: false,
        }
    }

    fn check_weight(&self, route: &OptimizedRoute, truck: &Truck) -> Option<ValidationIssue> {
        let limit = truck.max_weight_ton() * self.params.weight_safety_factor;
        let heaviest = route
            .segments()
            .iter()
            .map(|segment| segment.weight_before_ton.max(segment.weight_after_ton))
            .fold(truck.tare_weight_ton(), f64::max);

        (heaviest > limit + 1e-9).then_some(ValidationIssue::Overweight {
            weight_ton: heaviest,
            limit_ton: limit,
        })
    }

    /// Endpoints must be drivable cells and the pathfinder must still find a
    /// path between them.
    fn check_accessibility(&self, route: &OptimizedRoute, oracle: &PathOracle) -> RatioCheck {
        let mut issues = Vec::new();
        let mut accessible = 0;

        for (index, segment) in route.segments().iter().enumerate() {
            let mut ok = true;
            for point in [segment.origin, segment.destination] {
                if !oracle.is_valid(&point) {
                    issues.push(ValidationIssue::InvalidPoint {
                        segment: index,
                        point,
                    });
                    ok = false;
                }
            }

            if ok {
                let result = oracle.path(segment.origin, segment.destination);
                if let Some(error) = result.error {
                    issues.push(ValidationIssue::Unreachable {
                        segment: index,
                        error,
                    });
                    ok = false;
                }
            }

            if ok {
                accessible += 1;
            }
        }

        RatioCheck {
            issues,
            ratio: ratio(accessible, route.segments().len()),
        }
    }

    fn check_time(&self, route: &OptimizedRoute, input: &PlanningInput) -> RatioCheck {
        let departure = input.now();
        let stops = route.delivery_count();
        let mut elapsed = SignedDuration::ZERO;
        let mut stop = 0;
        let mut on_time = 0;
        let mut issues = Vec::new();

        for (index, segment) in route.segments().iter().enumerate() {
            elapsed = elapsed.saturating_add(segment.travel_time);
            let Some((order_idx, _)) = segment.delivery() else {
                continue;
            };

            let order = input.order(order_idx);
            let arrival = departure.saturating_add(elapsed).unwrap_or(departure);
            if arrival > order.deadline() {
                issues.push(ValidationIssue::DeadlineMissed {
                    segment: index,
                    order: order_idx,
                    arrival,
                    deadline: order.deadline(),
                    already_overdue: order.is_overdue(departure),
                });
            } else {
                on_time += 1;
            }

            stop += 1;
            let priority = input.priority(order_idx);
            let stop_fraction = stop as f64 / stops as f64;
            if priority >= self.params.urgent_priority
                && stop_fraction > self.params.urgent_route_fraction
            {
                issues.push(ValidationIssue::LateUrgentDelivery {
                    segment: index,
                    order: order_idx,
                    priority,
                    stop_fraction,
                });
            }

            elapsed = elapsed.saturating_add(self.params.service_duration);
        }

        RatioCheck {
            issues,
            ratio: ratio(on_time, stops),
        }
    }

    /// Consecutive stops should not climb in priority. Any climb lowers the
    /// score, a climb above the inversion gap is also reported.
    fn check_priority_order(&self, route: &OptimizedRoute, input: &PlanningInput) -> RatioCheck {
        let stops: Vec<(usize, u32)> = route
            .segments()
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| {
                segment
                    .delivery()
                    .map(|(order, _)| (index, input.priority(order)))
            })
            .collect();

        let mut issues = Vec::new();
        let mut ordered = 0;
        for pair in stops.windows(2) {
            let (_, earlier) = pair[0];
            let (segment, later) = pair[1];
            if later <= earlier {
                ordered += 1;
            } else if later - earlier > self.params.inversion_gap {
                issues.push(ValidationIssue::PriorityInversion {
                    segment,
                    earlier_priority: earlier,
                    later_priority: later,
                });
            }
        }

        RatioCheck {
            issues,
            ratio: ratio(ordered, stops.len().saturating_sub(1)),
        }
    }
}

fn ratio(passed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        passed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glp_routing::{grid::obstacle::Obstacle, point::Point};

    use crate::{
        problem::{
            order::OrderIdx,
            route_segment::{RouteSegment, RouteSegmentKind},
            truck::{Truck, TruckIdx},
            truck_type::TruckType,
            warehouse::WarehouseIdx,
        },
        test_utils,
        validation::validation_result::Severity,
    };

    use super::*;

    fn validator() -> RouteValidator {
        RouteValidator::new(ValidationParams::default(), FuelModel::default())
    }

    fn straight(
        origin: Point,
        destination: Point,
        kind: RouteSegmentKind,
        weight_before: f64,
        weight_after: f64,
    ) -> RouteSegment {
        let fuel = FuelModel::default();
        let distance = f64::from(origin.manhattan_distance(&destination));
        RouteSegment {
            origin,
            destination,
            kind,
            path: Arc::from([origin, destination]),
            distance_km: distance,
            travel_time: SignedDuration::from_secs_f64(distance / 50.0 * 3600.0),
            fuel_consumed_gal: fuel.segment_consumption(distance, weight_before, weight_after),
            weight_before_ton: weight_before,
            weight_after_ton: weight_after,
        }
    }

    fn deliver(order: usize, volume_m3: f64) -> RouteSegmentKind {
        RouteSegmentKind::Delivery {
            order: OrderIdx::new(order),
            volume_m3,
        }
    }

    #[test]
    fn test_feasible_route() {
        let input = test_utils::input(
            vec![
                test_utils::order("A", 10, 0, 5.0, 8),
                test_utils::order("B", 10, 10, 5.0, 8),
            ],
            vec![Truck::new("TC01", TruckType::TC)],
            vec![],
        );
        let route = OptimizedRoute::new(
            TruckIdx::new(0),
            vec![
                straight(Point::new(0, 0), Point::new(10, 0), deliver(0, 5.0), 6.5, 4.0),
                straight(Point::new(10, 0), Point::new(10, 10), deliver(1, 5.0), 4.0, 1.5),
                straight(
                    Point::new(10, 10),
                    Point::new(0, 0),
                    RouteSegmentKind::ReturnToWarehouse {
                        warehouse: WarehouseIdx::new(0),
                    },
                    1.5,
                    1.5,
                ),
            ],
            SignedDuration::from_mins(15),
        );
        let oracle = test_utils::oracle(test_utils::open_grid());

        let result = validator().validate(&route, &input, &oracle);

        assert!(result.is_feasible(), "{:?}", result.issues);
        assert!(!result.requires_intervention);
        assert_eq!(result.fuel_tier, FuelMarginTier::Normal);
        assert_eq!(result.quality.capacity_utilization, 1.0);
        assert_eq!(result.quality.accessibility, 1.0);
        assert_eq!(result.quality.time_compliance, 1.0);
        assert!(result.quality.total > 0.9);
    }

    #[test]
    fn test_fuel_fails_at_first_short_segment() {
        // Each 30 km leg at 10 t burns 30 * 10 / 180 * 1.1 = 1.83 gal on top
        // of what the previous legs burnt. A 25 gal tank runs dry on leg 14.
        let input = test_utils::input(
            vec![test_utils::order("A", 30, 0, 1.0, 48)],
            vec![Truck::new("TA01", TruckType::TA)],
            vec![],
        );
        let legs: Vec<RouteSegment> = (0..16)
            .map(|leg| {
                let x = if leg % 2 == 0 { 0 } else { 30 };
                let next = 30 - x;
                straight(
                    Point::new(x, 0),
                    Point::new(next, 0),
                    RouteSegmentKind::Move { warehouse: None },
                    10.0,
                    10.0,
                )
            })
            .collect();
        let total: f64 = legs.iter().map(|leg| leg.fuel_consumed_gal).sum();
        assert!(total > 25.0);
        let route = OptimizedRoute::new(TruckIdx::new(0), legs, SignedDuration::ZERO);
        let oracle = test_utils::oracle(test_utils::open_grid());

        let result = validator().validate(&route, &input, &oracle);

        assert!(!result.is_feasible());
        assert!(result.requires_intervention);
        let failure = result
            .issues
            .iter()
            .find_map(|issue| match issue {
                ValidationIssue::InsufficientFuel {
                    segment,
                    shortfall_gal,
                    ..
                } => Some((*segment, *shortfall_gal)),
                _ => None,
            })
            .unwrap();
        assert_eq!(failure.0, 13);
        assert!(failure.1 > 0.0);
        assert_eq!(result.quality.fuel_margin, 0.0);
    }

    #[test]
    fn test_low_fuel_margin_tier() {
        let input = test_utils::input(
            vec![test_utils::order("A", 30, 0, 1.0, 48)],
            vec![Truck::new("TA01", TruckType::TA).with_fuel(2.0)],
            vec![],
        );
        // 30 km at 10 t: 1.83 gal out of 2 leaves 0.17 gal, under 5% of 25 gal
        let route = OptimizedRoute::new(
            TruckIdx::new(0),
            vec![straight(
                Point::new(0, 0),
                Point::new(30, 0),
                RouteSegmentKind::Move { warehouse: None },
                10.0,
                10.0,
            )],
            SignedDuration::ZERO,
        );
        let oracle = test_utils::oracle(test_utils::open_grid());

        let result = validator().validate(&route, &input, &oracle);

        assert!(result.is_feasible());
        assert_eq!(result.fuel_tier, FuelMarginTier::Emergency);
        assert_eq!(result.max_severity(), Severity::Critical);
    }

    #[test]
    fn test_overweight() {
        let input = test_utils::input(
            vec![test_utils::order("A", 5, 0, 5.0, 48)],
            vec![Truck::new("TD01", TruckType::TD)],
            vec![],
        );
        let route = OptimizedRoute::new(
            TruckIdx::new(0),
            vec![straight(Point::new(0, 0), Point::new(5, 0), deliver(0, 5.0), 4.0, 1.0)],
            SignedDuration::ZERO,
        );
        let oracle = test_utils::oracle(test_utils::open_grid());

        let result = validator().validate(&route, &input, &oracle);

        assert!(result.issues.contains(&ValidationIssue::Overweight {
            weight_ton: 4.0,
            limit_ton: 3.5
        }));
        assert!(!result.is_feasible());
    }

    #[test]
    fn test_blocked_destination_is_inaccessible() {
        let grid = test_utils::open_grid();
        grid.add_obstacle(Obstacle::Point {
            at: Point::new(10, 0),
        });
        let input = test_utils::input(
            vec![test_utils::order("A", 10, 0, 1.0, 48)],
            vec![Truck::new("TD01", TruckType::TD)],
            vec![],
        );
        let route = OptimizedRoute::new(
            TruckIdx::new(0),
            vec![straight(Point::new(0, 0), Point::new(10, 0), deliver(0, 1.0), 1.5, 1.0)],
            SignedDuration::ZERO,
        );
        let oracle = test_utils::oracle(grid);

        let result = validator().validate(&route, &input, &oracle);

        assert!(result.issues.contains(&ValidationIssue::InvalidPoint {
            segment: 0,
            point: Point::new(10, 0)
        }));
        assert_eq!(result.quality.accessibility, 0.0);
    }

    #[test]
    fn test_deadline_and_ordering_checks() {
        // 60 km at 50 km/h takes 72 minutes, the first order is due in 1 hour
        let input = test_utils::input(
            vec![
                test_utils::order("tight", 60, 0, 1.0, 1),
                test_utils::order("relaxed", 60, 10, 1.0, 30),
                test_utils::order("urgent", 60, 20, 1.0, 3),
            ],
            vec![Truck::new("TA01", TruckType::TA)],
            vec![],
        );
        let route = OptimizedRoute::new(
            TruckIdx::new(0),
            vec![
                straight(Point::new(0, 0), Point::new(60, 0), deliver(0, 1.0), 3.5, 3.0),
                straight(Point::new(60, 0), Point::new(60, 10), deliver(1, 1.0), 3.0, 3.0),
                straight(Point::new(60, 10), Point::new(60, 20), deliver(2, 1.0), 3.0, 2.5),
            ],
            SignedDuration::from_mins(15),
        );
        let oracle = test_utils::oracle(test_utils::open_grid());

        let result = validator().validate(&route, &input, &oracle);

        assert!(result.issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::DeadlineMissed { segment: 0, already_overdue: false, .. }
        )));
        // 100 -> 700 climbs by more than the gap
        assert!(result.issues.contains(&ValidationIssue::PriorityInversion {
            segment: 2,
            earlier_priority: 100,
            later_priority: 700,
        }));
        assert!(result.issues.iter().any(|issue| matches!(
            issue,
            ValidationIssue::LateUrgentDelivery { segment: 2, .. }
        )));
        assert!((result.quality.time_compliance - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.quality.priority_ordering, 0.5);
        assert!(!result.is_feasible());
    }
}
