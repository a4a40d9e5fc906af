use serde::Serialize;

use crate::problem::{order::OrderIdx, truck_assignment::TruckAssignment};

use super::packing_strategy::PackingStrategy;

/// Volume of an order no truck could take.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct UnassignedOrder {
    pub order: OrderIdx,
    pub volume_m3: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct PackingResult {
    pub strategy: PackingStrategy,
    /// Only trucks with at least one delivery
    pub assignments: Vec<TruckAssignment>,
    pub unassigned: Vec<UnassignedOrder>,
}

impl PackingResult {
    /// Used volume over capacity, across the trucks that carry something.
    pub fn utilization(&self) -> f64 {
        let (used, capacity) = self
            .assignments
            .iter()
            .fold((0.0, 0.0), |(used, capacity), assignment| {
                (
                    used + assignment.used_capacity_m3(),
                    capacity + assignment.capacity_m3(),
                )
            });

        if capacity > 0.0 { used / capacity } else { 0.0 }
    }

    pub fn unassigned_volume_m3(&self) -> f64 {
        self.unassigned.iter().map(|order| order.volume_m3).sum()
    }

    pub fn assigned_volume_m3(&self, order: OrderIdx) -> f64 {
        self.assignments
            .iter()
            .map(|assignment| assignment.volume_for(order))
            .sum()
    }
}
