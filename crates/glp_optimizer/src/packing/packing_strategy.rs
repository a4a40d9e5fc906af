use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackingStrategy {
    FirstFit,
    BestFit,
    BestFitDecreasing,
    WorstFit,
}

impl PackingStrategy {
    pub const ALL: [PackingStrategy; 4] = [
        PackingStrategy::FirstFit,
        PackingStrategy::BestFit,
        PackingStrategy::BestFitDecreasing,
        PackingStrategy::WorstFit,
    ];
}
