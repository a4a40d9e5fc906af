use std::{
    panic::{self, AssertUnwindSafe},
    sync::atomic::AtomicBool,
};

use glp_routing::{point::Point, timer_debug};
use rand::{SeedableRng, rngs::SmallRng};
use serde::Serialize;
use tracing::warn;

use crate::{
    distance::PathOracle,
    problem::{delivery::Delivery, planning_input::PlanningInput},
};

use super::{
    ant_colony::AntColony, ant_colony_params::AntColonyParams, distance_matrix::DistanceMatrix,
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencingMethod {
    PrioritySort,
    AntColony,
    /// The colony failed and the priority order was used instead
    PriorityFallback,
}

#[derive(Debug, Clone)]
pub struct SequencedDeliveries {
    pub deliveries: Vec<Delivery>,
    pub method: SequencingMethod,
    /// Grid length of the open path from the start point, when known
    pub tour_length: Option<f64>,
}

pub struct DeliverySequencer {
    params: AntColonyParams,
}

impl DeliverySequencer {
    pub fn new(params: AntColonyParams) -> Self {
        DeliverySequencer { params }
    }

    pub fn params(&self) -> &AntColonyParams {
        &self.params
    }

    pub fn sequence(
        &self,
        deliveries: &[Delivery],
        start: Point,
        input: &PlanningInput,
        oracle: &PathOracle,
    ) -> SequencedDeliveries {
        self.sequence_cancellable(deliveries, start, input, oracle, None)
    }

    /// Same as `sequence`, the colony stops early once `cancel` is set.
    pub fn sequence_cancellable(
        &self,
        deliveries: &[Delivery],
        start: Point,
        input: &PlanningInput,
        oracle: &PathOracle,
        cancel: Option<&AtomicBool>,
    ) -> SequencedDeliveries {
        if deliveries.len() <= 2 {
            return SequencedDeliveries {
                deliveries: priority_sorted(deliveries, input),
                method: SequencingMethod::PrioritySort,
                tour_length: None,
            };
        }

        let points: Vec<Point> = std::iter::once(start)
            .chain(
                deliveries
                    .iter()
                    .map(|delivery| input.order(delivery.order).location()),
            )
            .collect();
        let matrix = timer_debug!("Distance matrix", DistanceMatrix::from_paths(&points, oracle));

        let mut rng = match self.params.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let mut colony = AntColony::new(&self.params, &matrix);
        if let Some(cancel) = cancel {
            colony = colony.with_cancel(cancel);
        }
        let outcome = timer_debug!(
            "Ant colony",
            panic::catch_unwind(AssertUnwindSafe(|| colony.run(&mut rng)))
        );
        match outcome {
            Ok(Ok(tour)) => {
                return SequencedDeliveries {
                    deliveries: tour.nodes[1..]
                        .iter()
                        .map(|&node| deliveries[node - 1])
                        .collect(),
                    method: SequencingMethod::AntColony,
                    tour_length: Some(tour.length),
                };
            }
            Ok(Err(error)) => {
                warn!(%error, "Ant colony failed, falling back to priority order");
            }
            Err(_) => {
                warn!("Ant colony panicked, falling back to priority order");
            }
        }

        SequencedDeliveries {
            deliveries: priority_sorted(deliveries, input),
            method: SequencingMethod::PriorityFallback,
            tour_length: None,
        }
    }
}

/// Highest priority first, then earliest deadline. Stable otherwise.
pub fn priority_sorted(deliveries: &[Delivery], input: &PlanningInput) -> Vec<Delivery> {
    let mut sorted = deliveries.to_vec();
    sorted.sort_by(|a, b| {
        input
            .priority(b.order)
            .cmp(&input.priority(a.order))
            .then_with(|| {
                input
                    .order(a.order)
                    .deadline()
                    .cmp(&input.order(b.order).deadline())
            })
    });
    sorted
}
