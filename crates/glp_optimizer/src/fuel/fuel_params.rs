use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FuelParams {
    /// Ton-kilometers driven per gallon
    pub consumption_divisor: f64,
    /// Added on top of the computed consumption, 0.1 = 10%
    pub safety_margin: f64,
    pub km_per_cell: f64,
    /// Share of the tank a return trip should leave untouched for the
    /// return warehouse to count as an optimal choice
    pub return_reserve: f64,
}

impl Default for FuelParams {
    fn default() -> Self {
        FuelParams {
            consumption_divisor: 180.0,
            safety_margin: 0.10,
            km_per_cell: 1.0,
            return_reserve: 0.05,
        }
    }
}

impl FuelParams {
    /// Returns the name of the first parameter that would make fuel
    /// estimates meaningless.
    pub fn invalid_parameter(&self) -> Option<&'static str> {
        if !(self.consumption_divisor.is_finite() && self.consumption_divisor > 0.0) {
            return Some("consumption_divisor");
        }
        if !(self.safety_margin.is_finite() && self.safety_margin >= 0.0) {
            return Some("safety_margin");
        }
        if !(self.km_per_cell.is_finite() && self.km_per_cell > 0.0) {
            return Some("km_per_cell");
        }
        if !(0.0..1.0).contains(&self.return_reserve) {
            return Some("return_reserve");
        }
        None
    }
}
