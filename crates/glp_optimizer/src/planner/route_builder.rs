use std::sync::Arc;

use glp_routing::point::Point;

use crate::{
    distance::PathOracle,
    fuel::fuel_model::FuelModel,
    problem::{
        delivery::Delivery,
        planning_input::PlanningInput,
        route_segment::{RouteSegment, RouteSegmentKind},
        truck::Truck,
        warehouse::WarehouseIdx,
    },
};

/// Segments from the start point through every delivery, before the return
/// trip is chosen.
#[derive(Debug, Clone)]
pub struct DeliveryChain {
    pub segments: Vec<RouteSegment>,
    pub end_position: Point,
    /// Negative when the truck runs dry on the way
    pub fuel_remaining_gal: f64,
    pub weight_ton: f64,
}

impl DeliveryChain {
    pub fn runs_dry(&self) -> bool {
        self.fuel_remaining_gal < 0.0
    }
}

/// Builds route segments strictly in order: the weight and fuel of a segment
/// depend on the end state of the previous one.
pub struct RouteBuilder<'a> {
    input: &'a PlanningInput,
    oracle: &'a PathOracle,
    fuel: &'a FuelModel,
}

impl<'a> RouteBuilder<'a> {
    pub fn new(input: &'a PlanningInput, oracle: &'a PathOracle, fuel: &'a FuelModel) -> Self {
        RouteBuilder {
            input,
            oracle,
            fuel,
        }
    }

    pub fn input(&self) -> &'a PlanningInput {
        self.input
    }

    pub fn oracle(&self) -> &'a PathOracle {
        self.oracle
    }

    pub fn fuel_model(&self) -> &'a FuelModel {
        self.fuel
    }

    /// Grid distance in km, `None` when the pathfinder finds no path.
    pub fn distance_km(&self, origin: Point, destination: Point) -> Option<f64> {
        self.oracle
            .grid_distance(origin, destination)
            .map(|steps| self.fuel.distance_km(steps))
    }

    /// A segment without a path keeps a Manhattan estimate of its distance so
    /// that fuel and time stay meaningful for the validator to report on.
    pub fn segment(
        &self,
        truck: &Truck,
        origin: Point,
        destination: Point,
        kind: RouteSegmentKind,
        weight_before_ton: f64,
        weight_after_ton: f64,
    ) -> RouteSegment {
        let result = self.oracle.path(origin, destination);
        let (path, steps) = match result.grid_distance() {
            Some(steps) => (result.path, steps),
            None => (Arc::from([]), origin.manhattan_distance(&destination)),
        };
        let distance_km = self.fuel.distance_km(steps);

        RouteSegment {
            origin,
            destination,
            kind,
            path,
            distance_km,
            travel_time: self.fuel.travel_time(truck, distance_km),
            fuel_consumed_gal: self.fuel.segment_consumption(
                distance_km,
                weight_before_ton,
                weight_after_ton,
            ),
            weight_before_ton,
            weight_after_ton,
        }
    }

    /// Drives from `start` through `deliveries` in the given order. With a
    /// `loading` warehouse the truck first drives there empty and loads.
    pub fn delivery_chain(
        &self,
        truck: &Truck,
        start: Point,
        loading: Option<WarehouseIdx>,
        deliveries: &[Delivery],
    ) -> DeliveryChain {
        let mut segments = Vec::with_capacity(deliveries.len() + 2);
        let mut position = start;
        let mut fuel = truck.fuel_available_gal();

        if let Some(warehouse) = loading {
            let location = self.input.warehouse(warehouse).location();
            if location != position {
                let tare = truck.tare_weight_ton();
                let segment = self.segment(
                    truck,
                    position,
                    location,
                    RouteSegmentKind::Move {
                        warehouse: Some(warehouse),
                    },
                    tare,
                    tare,
                );
                fuel -= segment.fuel_consumed_gal;
                position = location;
                segments.push(segment);
            }
        }

        let mut weight = self.fuel.initial_weight(truck, deliveries);
        for delivery in deliveries {
            let destination = self.input.order(delivery.order).location();
            let weight_after =
                (weight - self.fuel.cargo_weight(truck, delivery.volume_m3)).max(truck.tare_weight_ton());
            let segment = self.segment(
                truck,
                position,
                destination,
                RouteSegmentKind::Delivery {
                    order: delivery.order,
                    volume_m3: delivery.volume_m3,
                },
                weight,
                weight_after,
            );
            fuel -= segment.fuel_consumed_gal;
            weight = weight_after;
            position = destination;
            segments.push(segment);
        }

        DeliveryChain {
            segments,
            end_position: position,
            fuel_remaining_gal: fuel,
            weight_ton: weight,
        }
    }

    pub fn return_segment(&self, truck: &Truck, chain: &DeliveryChain, warehouse: WarehouseIdx) -> RouteSegment {
        self.segment(
            truck,
            chain.end_position,
            self.input.warehouse(warehouse).location(),
            RouteSegmentKind::ReturnToWarehouse { warehouse },
            chain.weight_ton,
            chain.weight_ton,
        )
    }
}

#[cfg(test)]
mod tests {
    use glp_routing::grid::obstacle::Obstacle;

    use crate::{
        problem::{order::OrderIdx, truck::TruckIdx, truck_type::TruckType, warehouse::Warehouse},
        test_utils,
    };

    use super::*;

    fn delivery(order: usize, volume_m3: f64) -> Delivery {
        Delivery {
            order: OrderIdx::new(order),
            truck: TruckIdx::new(0),
            volume_m3,
        }
    }

    fn input() -> PlanningInput {
        test_utils::input(
            vec![
                test_utils::order("A", 10, 0, 5.0, 8),
                test_utils::order("B", 10, 10, 5.0, 8),
            ],
            vec![Truck::new("TC01", TruckType::TC).with_position(Point::new(20, 20))],
            vec![Warehouse::new("central", Point::new(0, 0), 160.0).principal()],
        )
    }

    #[test]
    fn test_chain_weights_and_fuel() {
        let input = input();
        let oracle = test_utils::oracle(test_utils::open_grid());
        let fuel = FuelModel::default();
        let builder = RouteBuilder::new(&input, &oracle, &fuel);
        let truck = input.truck(TruckIdx::new(0));

        let chain = builder.delivery_chain(
            truck,
            Point::new(0, 0),
            None,
            &[delivery(0, 5.0), delivery(1, 5.0)],
        );

        assert_eq!(chain.segments.len(), 2);
        let first = &chain.segments[0];
        assert_eq!(first.distance_km, 10.0);
        // 1.5 t tare plus the full 5 t cargo, half of it delivered at A
        assert_eq!(first.weight_before_ton, 6.5);
        assert_eq!(first.weight_after_ton, 4.0);
        assert_eq!(chain.segments[1].weight_before_ton, 4.0);
        assert_eq!(chain.segments[1].weight_after_ton, 1.5);
        assert_eq!(chain.weight_ton, 1.5);
        assert_eq!(chain.end_position, Point::new(10, 10));

        let burnt: f64 = chain.segments.iter().map(|s| s.fuel_consumed_gal).sum();
        assert!((chain.fuel_remaining_gal - (25.0 - burnt)).abs() < 1e-9);
        assert!(!chain.runs_dry());
    }

    #[test]
    fn test_loading_move_runs_empty() {
        let input = input();
        let oracle = test_utils::oracle(test_utils::open_grid());
        let fuel = FuelModel::default();
        let builder = RouteBuilder::new(&input, &oracle, &fuel);
        let truck = input.truck(TruckIdx::new(0));

        let chain = builder.delivery_chain(
            truck,
            Point::new(20, 20),
            Some(WarehouseIdx::new(0)),
            &[delivery(0, 5.0)],
        );

        assert_eq!(chain.segments.len(), 2);
        let load = &chain.segments[0];
        assert!(matches!(load.kind, RouteSegmentKind::Move { warehouse: Some(_) }));
        assert_eq!(load.weight_before_ton, 1.5);
        assert_eq!(load.destination, Point::new(0, 0));
        assert_eq!(chain.segments[1].origin, Point::new(0, 0));
    }

    #[test]
    fn test_segment_without_path_keeps_estimate() {
        let grid = test_utils::open_grid();
        grid.add_obstacle(Obstacle::Polygon {
            vertices: vec![
                Point::new(8, -1),
                Point::new(12, -1),
                Point::new(12, 3),
                Point::new(8, 3),
                Point::new(8, -1),
            ],
        });
        let input = input();
        let oracle = test_utils::oracle(grid);
        let fuel = FuelModel::default();
        let builder = RouteBuilder::new(&input, &oracle, &fuel);
        let truck = input.truck(TruckIdx::new(0));

        let segment = builder.segment(
            truck,
            Point::new(0, 0),
            Point::new(10, 0),
            RouteSegmentKind::Move { warehouse: None },
            1.5,
            1.5,
        );

        assert!(!segment.has_path());
        assert_eq!(segment.distance_km, 10.0);
        assert!(segment.fuel_consumed_gal > 0.0);
    }
}
