use serde::Serialize;

use super::{delivery::Delivery, order::OrderIdx, truck::TruckIdx};

pub(crate) const VOLUME_EPSILON: f64 = 1e-9;

/// Deliveries loaded on one truck.
///
/// The used capacity never exceeds the truck capacity: `assign` refuses any
/// volume that does not fit.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TruckAssignment {
    truck: TruckIdx,
    capacity_m3: f64,
    deliveries: Vec<Delivery>,
    used_capacity_m3: f64,
    priority_sum: u64,
}

impl TruckAssignment {
    pub fn new(truck: TruckIdx, capacity_m3: f64) -> Self {
        TruckAssignment {
            truck,
            capacity_m3,
            deliveries: Vec::new(),
            used_capacity_m3: 0.0,
            priority_sum: 0,
        }
    }

    pub fn truck(&self) -> TruckIdx {
        self.truck
    }

    pub fn capacity_m3(&self) -> f64 {
        self.capacity_m3
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub fn used_capacity_m3(&self) -> f64 {
        self.used_capacity_m3
    }

    pub fn available_capacity_m3(&self) -> f64 {
        (self.capacity_m3 - self.used_capacity_m3).max(0.0)
    }

    pub fn fits(&self, volume_m3: f64) -> bool {
        volume_m3 <= self.available_capacity_m3() + VOLUME_EPSILON
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity_m3 <= 0.0 {
            return 0.0;
        }
        self.used_capacity_m3 / self.capacity_m3
    }

    /// Mean priority of the loaded deliveries, 0 for an empty truck.
    pub fn average_priority(&self) -> f64 {
        if self.deliveries.is_empty() {
            return 0.0;
        }
        self.priority_sum as f64 / self.deliveries.len() as f64
    }

    /// Loads `volume_m3` of `order`. Returns false, leaving the assignment
    /// untouched, when the volume is not positive or does not fit.
    pub fn assign(&mut self, order: OrderIdx, volume_m3: f64, priority: u32) -> bool {
        if volume_m3 <= 0.0 || !self.fits(volume_m3) {
            return false;
        }

        self.deliveries.push(Delivery {
            order,
            truck: self.truck,
            volume_m3,
        });
        self.used_capacity_m3 = (self.used_capacity_m3 + volume_m3).min(self.capacity_m3);
        self.priority_sum += u64::from(priority);
        true
    }

    pub fn volume_for(&self, order: OrderIdx) -> f64 {
        self.deliveries
            .iter()
            .filter(|delivery| delivery.order == order)
            .map(|delivery| delivery.volume_m3)
            .sum()
    }
}
