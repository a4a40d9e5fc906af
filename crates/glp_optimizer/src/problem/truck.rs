use glp_routing::point::Point;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::truck_type::{DEFAULT_FUEL_TANK_GAL, DEFAULT_SPEED_KMPH, TruckType};

define_index_newtype!(TruckIdx, Truck);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruckStatus {
    #[default]
    Available,
    Maintenance,
    Broken,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Truck {
    id: String,
    truck_type: TruckType,
    capacity_m3: f64,
    fuel_tank_capacity_gal: f64,
    speed_kmph: f64,
    status: TruckStatus,
    position: Option<Point>,
    current_fuel_gal: Option<f64>,
}

impl Truck {
    pub fn new(id: impl Into<String>, truck_type: TruckType) -> Self {
        Truck {
            id: id.into(),
            truck_type,
            capacity_m3: truck_type.capacity_m3(),
            fuel_tank_capacity_gal: DEFAULT_FUEL_TANK_GAL,
            speed_kmph: DEFAULT_SPEED_KMPH,
            status: TruckStatus::Available,
            position: None,
            current_fuel_gal: None,
        }
    }

    pub fn with_status(mut self, status: TruckStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_fuel(mut self, fuel_gal: f64) -> Self {
        self.current_fuel_gal = Some(fuel_gal);
        self
    }

    pub fn with_fuel_tank(mut self, fuel_tank_capacity_gal: f64) -> Self {
        self.fuel_tank_capacity_gal = fuel_tank_capacity_gal;
        self
    }

    pub fn with_capacity(mut self, capacity_m3: f64) -> Self {
        self.capacity_m3 = capacity_m3;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn truck_type(&self) -> TruckType {
        self.truck_type
    }

    pub fn capacity_m3(&self) -> f64 {
        self.capacity_m3
    }

    pub fn fuel_tank_capacity_gal(&self) -> f64 {
        self.fuel_tank_capacity_gal
    }

    pub fn speed_kmph(&self) -> f64 {
        self.speed_kmph
    }

    pub fn status(&self) -> TruckStatus {
        self.status
    }

    pub fn is_available(&self) -> bool {
        self.status == TruckStatus::Available
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn tare_weight_ton(&self) -> f64 {
        self.truck_type.tare_weight_ton()
    }

    pub fn max_cargo_weight_ton(&self) -> f64 {
        self.truck_type.max_cargo_weight_ton()
    }

    pub fn max_weight_ton(&self) -> f64 {
        self.truck_type.max_weight_ton()
    }

    /// Fuel on board at the start of planning, a full tank when unknown.
    pub fn fuel_available_gal(&self) -> f64 {
        self.current_fuel_gal
            .unwrap_or(self.fuel_tank_capacity_gal)
            .clamp(0.0, self.fuel_tank_capacity_gal)
    }
}
