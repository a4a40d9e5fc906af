use glp_routing::point::Point;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::RoutingError,
    fuel::warehouse_selection::{ReturnOrigin, WarehouseOption, best_option, nearest_option},
    planner::route_builder::{DeliveryChain, RouteBuilder},
    problem::{delivery::Delivery, truck::TruckIdx, warehouse::WarehouseIdx},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDecision {
    /// Best scored warehouse, reached with the fuel reserve intact
    Optimal,
    /// Nearest reachable warehouse, the reserve is eaten into
    Suboptimal,
    /// Deliveries were dropped to get back to a warehouse
    Emergency,
}

#[derive(Debug, Clone)]
pub struct ReturnPlan {
    pub decision: ReturnDecision,
    pub warehouse: WarehouseIdx,
    pub chain: DeliveryChain,
    pub deliveries: Vec<Delivery>,
    pub dropped: Vec<Delivery>,
    /// Every warehouse evaluated for the final chain
    pub options: Vec<WarehouseOption>,
}

/// Picks the warehouse a truck returns to after its deliveries, degrading
/// step by step when the full load makes every warehouse unreachable.
pub struct ReturnPlanner<'a> {
    builder: &'a RouteBuilder<'a>,
}

impl<'a> ReturnPlanner<'a> {
    pub fn new(builder: &'a RouteBuilder<'a>) -> Self {
        ReturnPlanner { builder }
    }

    pub fn plan(
        &self,
        truck_idx: TruckIdx,
        start: Point,
        loading: Option<WarehouseIdx>,
        deliveries: &[Delivery],
    ) -> Result<ReturnPlan, RoutingError> {
        let truck = self.builder.input().truck(truck_idx);
        let reserve_gal =
            self.builder.fuel_model().params().return_reserve * truck.fuel_tank_capacity_gal();

        let chain = self.builder.delivery_chain(truck, start, loading, deliveries);
        let options = self.evaluate(truck_idx, &chain);

        let optimal = options
            .iter()
            .filter(|option| {
                option
                    .fuel_remaining_gal(chain.fuel_remaining_gal)
                    .is_some_and(|remaining| remaining >= reserve_gal)
            })
            .cloned()
            .collect::<Vec<_>>();
        if let Some(option) = best_option(&optimal) {
            return Ok(ReturnPlan {
                decision: ReturnDecision::Optimal,
                warehouse: option.warehouse,
                chain,
                deliveries: deliveries.to_vec(),
                dropped: Vec::new(),
                options,
            });
        }

        if let Some(option) = nearest_option(&options) {
            info!(
                truck = truck.id(),
                warehouse = option.warehouse_id,
                "Returning to the nearest warehouse, fuel reserve not kept"
            );
            return Ok(ReturnPlan {
                decision: ReturnDecision::Suboptimal,
                warehouse: option.warehouse,
                chain,
                deliveries: deliveries.to_vec(),
                dropped: Vec::new(),
                options,
            });
        }

        self.emergency(truck_idx, start, loading, deliveries)
    }

    /// Drops the lowest priority delivery until a warehouse is reachable. The
    /// kept deliveries stay in their original order.
    fn emergency(
        &self,
        truck_idx: TruckIdx,
        start: Point,
        loading: Option<WarehouseIdx>,
        deliveries: &[Delivery],
    ) -> Result<ReturnPlan, RoutingError> {
        let input = self.builder.input();
        let truck = input.truck(truck_idx);
        let mut kept = deliveries.to_vec();
        let mut dropped = Vec::new();

        loop {
            let Some(victim) = self.lowest_priority(&kept) else {
                break;
            };
            dropped.push(kept.remove(victim));

            let chain = self.builder.delivery_chain(truck, start, loading, &kept);
            let options = self.evaluate(truck_idx, &chain);
            if let Some(option) = best_option(&options) {
                warn!(
                    truck = truck.id(),
                    warehouse = option.warehouse_id,
                    dropped = dropped.len(),
                    "Emergency return, deliveries dropped"
                );
                return Ok(ReturnPlan {
                    decision: ReturnDecision::Emergency,
                    warehouse: option.warehouse,
                    chain,
                    deliveries: kept,
                    dropped,
                    options,
                });
            }
        }

        // Even with nothing to deliver the truck is stranded
        let chain = self.builder.delivery_chain(truck, start, loading, &[]);
        let options = self.evaluate(truck_idx, &chain);
        Err(RoutingError::NoWarehouseReachable {
            truck: truck.id().to_owned(),
            position: chain.end_position,
            fuel_available_gal: chain.fuel_remaining_gal,
            options,
        })
    }

    fn evaluate(&self, truck_idx: TruckIdx, chain: &DeliveryChain) -> Vec<WarehouseOption> {
        let input = self.builder.input();
        let origin = ReturnOrigin {
            truck: input.truck(truck_idx),
            position: chain.end_position,
            cargo_volume_m3: 0.0,
            fuel_available_gal: chain.fuel_remaining_gal,
        };

        self.builder.fuel_model().evaluate_return_warehouses(
            &origin,
            input.warehouses(),
            |_, warehouse| self.builder.distance_km(chain.end_position, warehouse.location()),
        )
    }

    /// Lowest priority first, then the larger volume, then the later stop.
    fn lowest_priority(&self, deliveries: &[Delivery]) -> Option<usize> {
        let input = self.builder.input();
        deliveries
            .iter()
            .enumerate()
            .min_by(|(a_index, a), (b_index, b)| {
                input
                    .priority(a.order)
                    .cmp(&input.priority(b.order))
                    .then_with(|| b.volume_m3.total_cmp(&a.volume_m3))
                    .then_with(|| b_index.cmp(a_index))
            })
            .map(|(index, _)| index)
    }
}
