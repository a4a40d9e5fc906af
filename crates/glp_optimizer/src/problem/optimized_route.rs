use jiff::SignedDuration;
use serde::Serialize;
use thiserror::Error;

use super::{route_segment::RouteSegment, truck::TruckIdx};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Planned,
    InProgress,
    Completed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Route cannot move from {from:?} to {to:?}")]
pub struct RouteStateError {
    pub from: RouteState,
    pub to: RouteState,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OptimizedRoute {
    truck: TruckIdx,
    segments: Vec<RouteSegment>,
    total_distance_km: f64,
    total_fuel_gal: f64,
    total_duration: SignedDuration,
    service_time: SignedDuration,
    state: RouteState,
}

impl OptimizedRoute {
    /// `service_time` is spent at every delivery stop on top of driving.
    pub fn new(truck: TruckIdx, segments: Vec<RouteSegment>, service_time: SignedDuration) -> Self {
        let total_distance_km = segments.iter().map(|segment| segment.distance_km).sum();
        let total_fuel_gal = segments.iter().map(|segment| segment.fuel_consumed_gal).sum();
        let total_duration = segments.iter().fold(SignedDuration::ZERO, |total, segment| {
            let stop = if segment.delivery().is_some() {
                service_time
            } else {
                SignedDuration::ZERO
            };
            total
                .saturating_add(segment.travel_time)
                .saturating_add(stop)
        });

        OptimizedRoute {
            truck,
            segments,
            total_distance_km,
            total_fuel_gal,
            total_duration,
            service_time,
            state: RouteState::Planned,
        }
    }

    pub fn truck(&self) -> TruckIdx {
        self.truck
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn total_fuel_gal(&self) -> f64 {
        self.total_fuel_gal
    }

    pub fn total_duration(&self) -> SignedDuration {
        self.total_duration
    }

    /// Unloading time at each delivery stop
    pub fn service_time(&self) -> SignedDuration {
        self.service_time
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    pub fn delivery_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| segment.delivery().is_some())
            .count()
    }

    /// Every segment starts where the previous one ended.
    pub fn is_chained(&self) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[0].destination == pair[1].origin)
    }

    pub fn start(&mut self) -> Result<(), RouteStateError> {
        self.transition(RouteState::Planned, RouteState::InProgress)
    }

    pub fn complete(&mut self) -> Result<(), RouteStateError> {
        self.transition(RouteState::InProgress, RouteState::Completed)
    }

    fn transition(&mut self, expected: RouteState, to: RouteState) -> Result<(), RouteStateError> {
        if self.state != expected {
            return Err(RouteStateError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
