use std::cmp::Ordering;

use glp_routing::timer_debug;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::problem::{
    order::OrderIdx,
    planning_input::PlanningInput,
    truck_assignment::{TruckAssignment, VOLUME_EPSILON},
};

use super::{
    packing_params::PackingParams,
    packing_result::{PackingResult, UnassignedOrder},
    packing_strategy::PackingStrategy,
};

/// Priority-driven bin packing of order volumes onto the available trucks.
pub struct OrderPacker {
    params: PackingParams,
}

impl OrderPacker {
    pub fn new(params: PackingParams) -> Self {
        OrderPacker { params }
    }

    pub fn params(&self) -> &PackingParams {
        &self.params
    }

    /// Runs every configured strategy and keeps the one that leaves the least
    /// volume behind, then the one with the best utilization.
    pub fn pack(&self, input: &PlanningInput) -> PackingResult {
        let strategies: &[PackingStrategy] = if self.params.strategies.is_empty() {
            &PackingStrategy::ALL
        } else {
            &self.params.strategies
        };

        let results: Vec<PackingResult> = timer_debug!(
            "Packing",
            strategies
                .par_iter()
                .map(|&strategy| self.pack_with(input, strategy))
                .collect()
        );

        for result in &results {
            debug!(
                strategy = ?result.strategy,
                utilization = result.utilization(),
                unassigned_m3 = result.unassigned_volume_m3(),
                "Packing candidate"
            );
        }

        let best = results
            .into_iter()
            .reduce(|best, candidate| {
                if is_better(&candidate, &best) {
                    candidate
                } else {
                    best
                }
            })
            .unwrap_or_else(|| PackingResult {
                strategy: PackingStrategy::FirstFit,
                assignments: Vec::new(),
                unassigned: Vec::new(),
            });

        info!(
            strategy = ?best.strategy,
            trucks = best.assignments.len(),
            unassigned = best.unassigned.len(),
            "Orders packed"
        );

        best
    }

    pub fn pack_with(&self, input: &PlanningInput, strategy: PackingStrategy) -> PackingResult {
        let mut assignments: Vec<TruckAssignment> = input
            .available_trucks()
            .map(|truck| TruckAssignment::new(truck, input.truck(truck).capacity_m3()))
            .collect();
        let mut unassigned = Vec::new();

        for order in order_sequence(input, strategy) {
            let volume = input.order(order).volume_m3();
            let priority = input.priority(order);
            if volume <= 0.0 {
                continue;
            }

            if let Some(slot) = select_whole(&assignments, volume, strategy) {
                assignments[slot].assign(order, volume, priority);
                continue;
            }

            let min_fragment = self.params.min_fragment_m3;
            let slots = ranked_slots(&assignments);
            let mut remaining = volume;
            for (position, &slot) in slots.iter().enumerate() {
                if remaining <= VOLUME_EPSILON {
                    break;
                }
                let room_after = slots[position + 1..].iter().any(|&later| {
                    assignments[later].available_capacity_m3() + VOLUME_EPSILON >= min_fragment
                });
                let Some(fragment) = fragment_size(
                    assignments[slot].available_capacity_m3(),
                    remaining,
                    min_fragment,
                    room_after,
                ) else {
                    continue;
                };
                if assignments[slot].assign(order, fragment, priority) {
                    remaining -= fragment;
                }
            }

            if remaining > VOLUME_EPSILON {
                unassigned.push(UnassignedOrder {
                    order,
                    volume_m3: remaining,
                });
            }
        }

        assignments.retain(|assignment| !assignment.is_empty());

        PackingResult {
            strategy,
            assignments,
            unassigned,
        }
    }
}

fn is_better(candidate: &PackingResult, best: &PackingResult) -> bool {
    let unassigned = candidate.unassigned_volume_m3() - best.unassigned_volume_m3();
    if unassigned.abs() > VOLUME_EPSILON {
        return unassigned < 0.0;
    }
    candidate.utilization() > best.utilization() + VOLUME_EPSILON
}

/// Piece of the remaining volume a truck with `available` free space takes.
/// When the leftover would fall below `min_fragment`, the piece shrinks so that
/// exactly `min_fragment` is left for a later truck with room.
fn fragment_size(available: f64, remaining: f64, min_fragment: f64, room_after: bool) -> Option<f64> {
    let fragment = available.min(remaining);
    if fragment + VOLUME_EPSILON < min_fragment {
        return None;
    }

    let leftover = remaining - fragment;
    if room_after && leftover > VOLUME_EPSILON && leftover + VOLUME_EPSILON < min_fragment {
        let shrunk = remaining - min_fragment;
        if shrunk + VOLUME_EPSILON >= min_fragment {
            return Some(shrunk);
        }
    }

    Some(fragment)
}

/// Orders by descending priority. Decreasing strategies put big orders first
/// inside a priority bucket, the others the earliest deadline.
fn order_sequence(input: &PlanningInput, strategy: PackingStrategy) -> Vec<OrderIdx> {
    let mut orders: Vec<OrderIdx> = input.order_indices().collect();
    orders.sort_by(|&a, &b| {
        input.priority(b).cmp(&input.priority(a)).then_with(|| {
            let (a, b) = (input.order(a), input.order(b));
            match strategy {
                PackingStrategy::BestFitDecreasing => b.volume_m3().total_cmp(&a.volume_m3()),
                _ => a.deadline().cmp(&b.deadline()),
            }
        })
    });
    orders
}

/// Trucks ranked by average load priority, then by free space.
fn ranked_slots(assignments: &[TruckAssignment]) -> Vec<usize> {
    let mut slots: Vec<usize> = (0..assignments.len()).collect();
    slots.sort_by(|&a, &b| rank(&assignments[a], &assignments[b]));
    slots
}

fn rank(a: &TruckAssignment, b: &TruckAssignment) -> Ordering {
    b.average_priority()
        .total_cmp(&a.average_priority())
        .then_with(|| {
            b.available_capacity_m3()
                .total_cmp(&a.available_capacity_m3())
        })
        .then_with(|| a.truck().cmp(&b.truck()))
}

fn select_whole(
    assignments: &[TruckAssignment],
    volume: f64,
    strategy: PackingStrategy,
) -> Option<usize> {
    let mut fitting = ranked_slots(assignments)
        .into_iter()
        .filter(|&slot| assignments[slot].fits(volume));

    match strategy {
        PackingStrategy::FirstFit => fitting.next(),
        PackingStrategy::BestFit | PackingStrategy::BestFitDecreasing => {
            // min_by keeps the first of equal elements, i.e. the best ranked
            fitting.min_by(|&a, &b| {
                assignments[a]
                    .available_capacity_m3()
                    .total_cmp(&assignments[b].available_capacity_m3())
            })
        }
        PackingStrategy::WorstFit => fitting.reduce(|best, slot| {
            if assignments[slot].available_capacity_m3()
                > assignments[best].available_capacity_m3()
            {
                slot
            } else {
                best
            }
        }),
    }
}
