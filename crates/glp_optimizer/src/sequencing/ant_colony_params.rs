use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AntColonyParams {
    pub ants: usize,
    pub iterations: usize,
    /// Pheromone exponent
    pub alpha: f64,
    /// Visibility (1 / distance) exponent
    pub beta: f64,
    /// Evaporation rate
    pub rho: f64,
    /// Probability of taking the most attractive edge instead of a roulette draw
    pub q0: f64,
    pub initial_pheromone: f64,
    /// Stop after this many iterations without a better tour
    pub max_stagnation: usize,
    pub seed: Option<u64>,
}

impl Default for AntColonyParams {
    fn default() -> Self {
        AntColonyParams {
            ants: 10,
            iterations: 100,
            alpha: 1.0,
            beta: 2.0,
            rho: 0.1,
            q0: 0.9,
            initial_pheromone: 1.0,
            max_stagnation: 20,
            seed: None,
        }
    }
}
