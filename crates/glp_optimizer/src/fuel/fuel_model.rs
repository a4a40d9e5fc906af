use jiff::SignedDuration;

use crate::problem::{delivery::Delivery, truck::Truck};

use super::fuel_params::FuelParams;

/// Fuel and weight arithmetic shared by route building and validation.
#[derive(Clone, Debug, Default)]
pub struct FuelModel {
    params: FuelParams,
}

impl FuelModel {
    pub fn new(params: FuelParams) -> Self {
        FuelModel { params }
    }

    pub fn params(&self) -> &FuelParams {
        &self.params
    }

    fn margin_factor(&self) -> f64 {
        1.0 + self.params.safety_margin.max(0.0)
    }

    /// Gallons burnt driving `distance_km` while the weight goes from
    /// `weight_before_ton` to `weight_after_ton`, safety margin included.
    pub fn segment_consumption(
        &self,
        distance_km: f64,
        weight_before_ton: f64,
        weight_after_ton: f64,
    ) -> f64 {
        let average_weight = (weight_before_ton + weight_after_ton) / 2.0;
        distance_km.max(0.0) * average_weight / self.params.consumption_divisor
            * self.margin_factor()
    }

    pub fn distance_km(&self, grid_steps: u32) -> f64 {
        f64::from(grid_steps) * self.params.km_per_cell
    }

    /// Cargo weight is proportional to the share of the tank volume in use.
    pub fn cargo_weight(&self, truck: &Truck, volume_m3: f64) -> f64 {
        if truck.capacity_m3() <= 0.0 {
            return 0.0;
        }
        volume_m3.max(0.0) / truck.capacity_m3() * truck.max_cargo_weight_ton()
    }

    pub fn loaded_weight(&self, truck: &Truck, volume_m3: f64) -> f64 {
        truck.tare_weight_ton() + self.cargo_weight(truck, volume_m3)
    }

    pub fn initial_weight(&self, truck: &Truck, deliveries: &[Delivery]) -> f64 {
        let volume = deliveries.iter().map(|delivery| delivery.volume_m3).sum();
        self.loaded_weight(truck, volume)
    }

    /// Longest distance the truck can drive carrying `cargo_volume_m3`
    /// without unloading anything on the way.
    pub fn max_reachable_distance(&self, truck: &Truck, cargo_volume_m3: f64, fuel_gal: f64) -> f64 {
        let weight = self.loaded_weight(truck, cargo_volume_m3);
        if weight <= 0.0 {
            return f64::INFINITY;
        }
        fuel_gal.max(0.0) * self.params.consumption_divisor / (weight * self.margin_factor())
    }

    pub fn travel_time(&self, truck: &Truck, distance_km: f64) -> SignedDuration {
        if truck.speed_kmph() <= 0.0 {
            return SignedDuration::MAX;
        }
        SignedDuration::try_from_secs_f64(distance_km.max(0.0) / truck.speed_kmph() * 3600.0)
            .unwrap_or(SignedDuration::MAX)
    }
}
