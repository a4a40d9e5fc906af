use glp_routing::point::Point;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::{
    planner::planning_outcome::{PlannedRoute, PlanningOutcome, PlanningStatistics, RejectionReason},
    problem::{
        delivery::Delivery, optimized_route::RouteState, planning_input::PlanningInput,
        route_segment::RouteSegmentKind,
    },
    sequencing::delivery_sequencer::SequencingMethod,
    validation::{
        return_planner::ReturnDecision,
        validation_result::{FuelMarginTier, QualityScore, ValidationIssue},
    },
};

/// Serializable summary of a planning run, with orders, trucks and
/// warehouses referred to by their external ids.
#[derive(Serialize)]
#[serde(rename = "PlanningReport")]
pub struct PlanningReport {
    pub now: Timestamp,
    pub requires_intervention: bool,
    pub routes: Vec<JsonRoute>,
    pub rejected: Vec<JsonRejectedRoute>,
    pub unassigned: Vec<JsonDelivery>,
    pub statistics: PlanningStatistics,
}

#[derive(Serialize)]
#[serde(rename = "Route")]
pub struct JsonRoute {
    pub truck: String,
    pub state: RouteState,
    pub return_warehouse: String,
    pub return_decision: ReturnDecision,
    pub sequencing: SequencingMethod,
    pub total_distance_km: f64,
    pub total_fuel_gal: f64,
    pub total_duration: SignedDuration,
    pub fuel_tier: FuelMarginTier,
    pub fuel_remaining_gal: f64,
    pub quality: QualityScore,
    pub issues: Vec<ValidationIssue>,
    pub stops: Vec<JsonStop>,
    pub dropped: Vec<JsonDelivery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
}

#[derive(Serialize)]
#[serde(rename = "Stop")]
pub struct JsonStop {
    /// Order id, or warehouse id for moves and returns
    pub id: String,
    pub kind: &'static str,
    pub location: Point,
    pub volume_m3: f64,
    pub distance_km: f64,
    pub fuel_gal: f64,
    pub weight_before_ton: f64,
    pub arrival: Timestamp,
}

#[derive(Serialize)]
#[serde(rename = "Delivery")]
pub struct JsonDelivery {
    pub order: String,
    pub volume_m3: f64,
}

#[derive(Serialize)]
#[serde(rename = "RejectedRoute")]
pub struct JsonRejectedRoute {
    pub truck: String,
    pub orders: Vec<JsonDelivery>,
    pub fatal: bool,
    pub reason: RejectionReason,
}

impl PlanningReport {
    /// `include_paths` adds the full cell path of every route.
    pub fn from_outcome(outcome: &PlanningOutcome, include_paths: bool) -> Self {
        let input = &outcome.input;

        PlanningReport {
            now: input.now(),
            requires_intervention: outcome.requires_intervention(),
            routes: outcome
                .routes
                .iter()
                .map(|planned| JsonRoute::new(planned, input, include_paths))
                .collect(),
            rejected: outcome
                .rejected
                .iter()
                .map(|rejected| JsonRejectedRoute {
                    truck: input.truck(rejected.truck).id().to_owned(),
                    orders: deliveries(&rejected.deliveries, input),
                    fatal: rejected.reason.is_fatal(),
                    reason: rejected.reason.clone(),
                })
                .collect(),
            unassigned: outcome
                .unassigned
                .iter()
                .map(|unassigned| JsonDelivery {
                    order: input.order(unassigned.order).id().to_owned(),
                    volume_m3: unassigned.volume_m3,
                })
                .collect(),
            statistics: outcome.statistics,
        }
    }
}

impl JsonRoute {
    fn new(planned: &PlannedRoute, input: &PlanningInput, include_paths: bool) -> Self {
        let route = &planned.route;
        let service = route.service_time();
        let mut clock = input.now();
        let mut stops = Vec::with_capacity(route.segments().len());

        for segment in route.segments() {
            clock = clock.saturating_add(segment.travel_time).unwrap_or(clock);
            let (id, kind, volume_m3) = match segment.kind {
                RouteSegmentKind::Delivery { order, volume_m3 } => {
                    (input.order(order).id().to_owned(), "delivery", volume_m3)
                }
                RouteSegmentKind::ReturnToWarehouse { warehouse } => {
                    (input.warehouse(warehouse).id().to_owned(), "return", 0.0)
                }
                RouteSegmentKind::Move { warehouse } => (
                    warehouse.map_or_else(String::new, |idx| input.warehouse(idx).id().to_owned()),
                    "move",
                    0.0,
                ),
            };

            stops.push(JsonStop {
                id,
                kind,
                location: segment.destination,
                volume_m3,
                distance_km: segment.distance_km,
                fuel_gal: segment.fuel_consumed_gal,
                weight_before_ton: segment.weight_before_ton,
                arrival: clock,
            });

            if segment.delivery().is_some() {
                clock = clock.saturating_add(service).unwrap_or(clock);
            }
        }

        let path = include_paths.then(|| {
            let mut cells: Vec<Point> = Vec::new();
            for segment in route.segments() {
                let skip = usize::from(!cells.is_empty());
                cells.extend(segment.path.iter().skip(skip).copied());
            }
            cells
        });

        JsonRoute {
            truck: input.truck(route.truck()).id().to_owned(),
            state: route.state(),
            return_warehouse: input.warehouse(planned.return_warehouse).id().to_owned(),
            return_decision: planned.return_decision,
            sequencing: planned.sequencing,
            total_distance_km: route.total_distance_km(),
            total_fuel_gal: route.total_fuel_gal(),
            total_duration: route.total_duration(),
            fuel_tier: planned.validation.fuel_tier,
            fuel_remaining_gal: planned.validation.fuel_remaining_gal,
            quality: planned.validation.quality,
            issues: planned.validation.issues.clone(),
            stops,
            dropped: deliveries(&planned.dropped, input),
            path,
        }
    }
}

fn deliveries(deliveries: &[Delivery], input: &PlanningInput) -> Vec<JsonDelivery> {
    deliveries
        .iter()
        .map(|delivery| JsonDelivery {
            order: input.order(delivery.order).id().to_owned(),
            volume_m3: delivery.volume_m3,
        })
        .collect()
}
