use serde::Deserialize;

use super::packing_strategy::PackingStrategy;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PackingParams {
    /// Order fragments smaller than this are not worth a stop
    pub min_fragment_m3: f64,
    /// Strategies to evaluate, all of them when empty
    pub strategies: Vec<PackingStrategy>,
}

impl Default for PackingParams {
    fn default() -> Self {
        PackingParams {
            min_fragment_m3: 0.5,
            strategies: PackingStrategy::ALL.to_vec(),
        }
    }
}
