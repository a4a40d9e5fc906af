use glp_routing::point::Point;
use serde::Serialize;

use crate::problem::{
    truck::Truck,
    warehouse::{Warehouse, WarehouseIdx},
};

use super::fuel_model::FuelModel;

const DISTANCE_WEIGHT: f64 = 0.30;
const CAPACITY_WEIGHT: f64 = 0.25;
const FUEL_WEIGHT: f64 = 0.20;
const PRINCIPAL_WEIGHT: f64 = 0.15;
const STATUS_WEIGHT: f64 = 0.10;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WarehouseRejection {
    Closed,
    NoPath,
    InsufficientFuel { required_gal: f64, available_gal: f64 },
}

/// One warehouse as seen from a truck that needs to return.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WarehouseOption {
    pub warehouse: WarehouseIdx,
    pub warehouse_id: String,
    pub distance_km: Option<f64>,
    pub fuel_required_gal: Option<f64>,
    pub score: f64,
    pub rejection: Option<WarehouseRejection>,
}

impl WarehouseOption {
    pub fn is_reachable(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn fuel_remaining_gal(&self, fuel_available_gal: f64) -> Option<f64> {
        self.fuel_required_gal
            .map(|required| fuel_available_gal - required)
    }
}

/// Where the truck returns from and what it still carries.
#[derive(Debug, Clone, Copy)]
pub struct ReturnOrigin<'a> {
    pub truck: &'a Truck,
    pub position: Point,
    pub cargo_volume_m3: f64,
    pub fuel_available_gal: f64,
}

impl FuelModel {
    /// Scores every warehouse for a return trip. `distance_km` yields the
    /// driving distance to a warehouse, `None` when no path exists.
    ///
    /// Unreachable warehouses are kept in the result with a rejection and a
    /// zero score so callers can report them.
    pub fn evaluate_return_warehouses<F>(
        &self,
        origin: &ReturnOrigin,
        warehouses: &[Warehouse],
        distance_km: F,
    ) -> Vec<WarehouseOption>
    where
        F: Fn(WarehouseIdx, &Warehouse) -> Option<f64>,
    {
        let weight = self.loaded_weight(origin.truck, origin.cargo_volume_m3);

        let mut options: Vec<WarehouseOption> = warehouses
            .iter()
            .enumerate()
            .map(|(index, warehouse)| {
                let idx = WarehouseIdx::new(index);
                let mut option = WarehouseOption {
                    warehouse: idx,
                    warehouse_id: warehouse.id().to_owned(),
                    distance_km: None,
                    fuel_required_gal: None,
                    score: 0.0,
                    rejection: None,
                };

                if !warehouse.is_open() {
                    option.rejection = Some(WarehouseRejection::Closed);
                    return option;
                }

                let Some(distance) = distance_km(idx, warehouse) else {
                    option.rejection = Some(WarehouseRejection::NoPath);
                    return option;
                };

                let required = self.segment_consumption(distance, weight, weight);
                option.distance_km = Some(distance);
                option.fuel_required_gal = Some(required);
                if required > origin.fuel_available_gal {
                    option.rejection = Some(WarehouseRejection::InsufficientFuel {
                        required_gal: required,
                        available_gal: origin.fuel_available_gal,
                    });
                }
                option
            })
            .collect();

        let reachable = || options.iter().filter(|option| option.is_reachable());
        let max_distance = reachable()
            .filter_map(|option| option.distance_km)
            .fold(0.0, f64::max);
        let max_capacity = reachable()
            .map(|option| warehouses[option.warehouse].capacity_m3())
            .fold(0.0, f64::max);
        let tank = origin.truck.fuel_tank_capacity_gal();

        for option in options.iter_mut().filter(|option| option.is_reachable()) {
            let warehouse = &warehouses[option.warehouse];
            let distance = option.distance_km.unwrap_or(0.0);

            let distance_score = if max_distance > 0.0 {
                1.0 - distance / max_distance
            } else {
                1.0
            };
            let capacity_score = if max_capacity > 0.0 {
                warehouse.capacity_m3() / max_capacity
            } else {
                1.0
            };
            let fuel_score = if tank > 0.0 {
                (option
                    .fuel_remaining_gal(origin.fuel_available_gal)
                    .unwrap_or(0.0)
                    / tank)
                    .clamp(0.0, 1.0)
            } else {
                0.0
            };
            let principal_score = if warehouse.is_principal() { 1.0 } else { 0.0 };

            option.score = DISTANCE_WEIGHT * distance_score
                + CAPACITY_WEIGHT * capacity_score
                + FUEL_WEIGHT * fuel_score
                + PRINCIPAL_WEIGHT * principal_score
                + STATUS_WEIGHT * warehouse.status().factor();
        }

        options
    }

    /// Highest scored reachable warehouse.
    pub fn best_return_warehouse<F>(
        &self,
        origin: &ReturnOrigin,
        warehouses: &[Warehouse],
        distance_km: F,
    ) -> Option<WarehouseOption>
    where
        F: Fn(WarehouseIdx, &Warehouse) -> Option<f64>,
    {
        best_option(&self.evaluate_return_warehouses(origin, warehouses, distance_km)).cloned()
    }
}

pub fn best_option(options: &[WarehouseOption]) -> Option<&WarehouseOption> {
    options
        .iter()
        .filter(|option| option.is_reachable())
        .max_by(|a, b| {
            a.score.total_cmp(&b.score).then_with(|| {
                // closer wins on equal score
                b.distance_km
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&a.distance_km.unwrap_or(f64::INFINITY))
            })
        })
}

pub fn nearest_option(options: &[WarehouseOption]) -> Option<&WarehouseOption> {
    options
        .iter()
        .filter(|option| option.is_reachable())
        .min_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        })
}
