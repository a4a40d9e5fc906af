use jiff::SignedDuration;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    /// Multiplies the truck's maximum weight
    pub weight_safety_factor: f64,
    /// Fuel left, as a share of the tank, under which the margin is low
    pub low_fuel_threshold: f64,
    pub min_quality_score: f64,
    /// Time spent unloading at every stop
    pub service_duration: SignedDuration,
    /// Orders at or above this priority are urgent
    pub urgent_priority: u32,
    /// Urgent deliveries should happen within this share of the stops
    pub urgent_route_fraction: f64,
    /// Largest tolerated priority increase between consecutive stops
    pub inversion_gap: u32,
}

impl Default for ValidationParams {
    fn default() -> Self {
        ValidationParams {
            weight_safety_factor: 1.0,
            low_fuel_threshold: 0.15,
            min_quality_score: 0.6,
            service_duration: SignedDuration::from_mins(15),
            urgent_priority: 700,
            urgent_route_fraction: 0.6,
            inversion_gap: 200,
        }
    }
}
