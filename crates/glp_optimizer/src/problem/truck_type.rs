use serde::{Deserialize, Serialize};

/// Truck classes of the fleet. Each class fixes the tank capacity, the tare
/// weight and the weight of a full cargo.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruckType {
    TA,
    TB,
    TC,
    TD,
}

pub const DEFAULT_FUEL_TANK_GAL: f64 = 25.0;
pub const DEFAULT_SPEED_KMPH: f64 = 50.0;

impl TruckType {
    pub fn capacity_m3(&self) -> f64 {
        match self {
            TruckType::TA => 25.0,
            TruckType::TB => 15.0,
            TruckType::TC => 10.0,
            TruckType::TD => 5.0,
        }
    }

    pub fn tare_weight_ton(&self) -> f64 {
        match self {
            TruckType::TA => 2.5,
            TruckType::TB => 2.0,
            TruckType::TC => 1.5,
            TruckType::TD => 1.0,
        }
    }

    pub fn max_cargo_weight_ton(&self) -> f64 {
        match self {
            TruckType::TA => 12.5,
            TruckType::TB => 7.5,
            TruckType::TC => 5.0,
            TruckType::TD => 2.5,
        }
    }

    pub fn max_weight_ton(&self) -> f64 {
        self.tare_weight_ton() + self.max_cargo_weight_ton()
    }
}
